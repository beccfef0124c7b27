//! # linkguard-cli
//!
//! Command-line front end for the linkguard URL risk engine.
//!
//! ## Features
//!
//! - **check**: composite verdict for one URL, with per-source explanation
//! - **feeds**: download the local blocklists and inspect their freshness
//! - **config**: TOML configuration in the platform config directory, API
//!   keys overridable from the environment
//! - **Multiple output formats**: pretty text, JSON, CSV, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
