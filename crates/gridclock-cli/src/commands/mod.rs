//! CLI command implementations.

pub mod config;
pub mod preset;
pub mod run;
