pub mod auth;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod images;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod server;
pub mod storage;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

#[cfg(test)]
mod test_support;
