// Library for tests to access modules

pub mod aggregation_worker;
pub mod collector;
pub mod config;
pub mod host;
pub mod models;
pub mod query;
pub mod routes;
pub mod usage_repo;
pub mod version;
