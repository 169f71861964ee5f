pub mod configuration;
pub mod domain;
pub mod mailchimp_client;
pub mod member_locks;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod telemetry;
