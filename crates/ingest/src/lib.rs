pub mod app;
pub mod auth;
pub mod configuration;
pub mod credentials;
pub mod findings;
pub mod metric;
pub mod server;
