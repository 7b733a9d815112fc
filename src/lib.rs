pub mod access_policy;
pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod error_handling;
pub mod purge_worker;
pub mod redis_store;
pub mod repository;
pub mod response;
pub mod routes;
pub mod startup;
pub mod telemetry;
