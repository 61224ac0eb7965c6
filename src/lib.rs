pub mod clock;
pub mod comic_client;
pub mod configuration;
pub mod digest_worker;
pub mod domain;
pub mod email_client;
pub mod routes;
pub mod startup;
pub mod store;
pub mod subscribers;
pub mod telemetry;
pub mod utils;
pub mod verification;
