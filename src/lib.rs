//! lucid-log - tail CloudWatch log groups and render structured log lines.

pub mod cli;
pub mod config;
pub mod cw_source;
pub mod dedup;
pub mod error;
pub mod normalize;
pub mod paginate;
pub mod query;
pub mod render;
pub mod runner;
pub mod scripted;
pub mod show;
pub mod source;
pub mod tail;
pub mod time_windows;
pub mod traceback;
pub mod types;
