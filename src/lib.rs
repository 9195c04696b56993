pub mod config;
pub mod constants;
pub mod dedupe;
pub mod domain;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod storage;
