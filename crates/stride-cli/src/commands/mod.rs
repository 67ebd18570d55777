pub mod common;
pub mod completions;
pub mod config;
pub mod list;
pub mod maintenance;
pub mod records;
pub mod remove;
pub mod sync;
