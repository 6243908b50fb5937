// Shared foundations: configuration files and the run log.

pub mod config;
pub mod run_log;
