pub mod domain;
pub mod gate;
pub mod http;
