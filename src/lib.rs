pub mod authentication;
pub mod cli;
pub mod client_ip;
mod cors;
pub mod database;
pub mod email;
pub mod http_err;
pub mod identities;
pub mod passwords;
pub mod paths;
pub mod rate_limit;
pub mod repos;
pub mod server;
