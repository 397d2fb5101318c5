#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod remote;
pub mod schema_cache;
pub mod sql;

pub use cli::app::{Cli, Command};
