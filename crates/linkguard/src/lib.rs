//! Multi-source URL risk assessment.
//!
//! [`Engine::assess`] normalizes a submitted URL, asks every configured
//! threat-intelligence source about it concurrently, and reconciles the
//! answers into one [`CompositeVerdict`] with a score, tier, confidence and
//! a line-by-line explanation. Slow or failing sources degrade the
//! confidence instead of failing the request; high-risk results can be
//! escalated to a deep online analysis.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use linkguard::{AdapterSet, AssessOptions, Engine, EngineConfig, FeedStore, SourcesConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> linkguard::Result<()> {
//!     let store = Arc::new(FeedStore::default());
//!     let adapters = AdapterSet::from_config(&SourcesConfig::default(), store);
//!     let engine = Engine::new(adapters, EngineConfig::default());
//!
//!     let verdict = engine.assess("bit.ly/3xyz", AssessOptions::default()).await?;
//!     println!("{}", linkguard::verdict_to_human_text(&verdict));
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/linkguard/0.3.0")]

mod cache;
mod config;
pub mod deep;
mod engine;
mod explain;
pub mod scoring;

pub use cache::{Entry, InFlight, Pending, ResultCache};
pub use config::EngineConfig;
pub use deep::should_escalate;
pub use engine::{AssessOptions, Engine};
pub use explain::verdict_to_human_text;

// Re-export the building blocks
pub use linkguard_core::*;
pub use linkguard_feeds::{
    refresh_all, refresh_from, spawn_refresh_loop, FeedFetcher, FeedSourceConfig, FeedStatus,
    FeedStore, HttpFeedFetcher, RefreshOutcome,
};
pub use linkguard_sources::{
    AdapterSet, ApiSourceConfig, RateLimitConfig, SourceAdapter, SourcesConfig, Unconfigured,
};
