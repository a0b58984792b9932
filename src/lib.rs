pub mod apis;
pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod merge;
pub mod observability;
pub mod pipeline;
pub mod storage;
pub mod summary;
pub mod types;
