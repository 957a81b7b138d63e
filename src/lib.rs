pub mod api;
pub mod archive;
pub mod config;
pub mod jobs;
pub mod observability;
pub mod queue;
pub mod store;
pub mod worker;
