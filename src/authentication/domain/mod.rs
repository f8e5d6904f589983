pub mod pending;
pub mod session;
