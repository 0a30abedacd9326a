// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod health;
pub mod models;
pub mod probe;
pub mod resource_repo;
pub mod retention;
pub mod routes;
pub mod sample_repo;
pub mod scheduler;
pub mod target_repo;
pub mod version;
