pub mod config;
pub mod domain;
pub mod http;
pub mod ledger;
pub mod models;
pub mod provider;
pub mod services;
