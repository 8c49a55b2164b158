pub mod config;
pub mod error;
pub mod logging;

pub mod archive;
pub mod batch;
pub mod http;
pub mod naming;
pub mod options;
pub mod pipeline;
pub mod plan;
pub mod retry;
pub mod select;
pub mod storage;
