// Library for tests to access modules

pub mod api_client;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod models;
pub mod prometheus;
pub mod reconstruct;
pub mod registry;
pub mod routes;
pub mod worker;
