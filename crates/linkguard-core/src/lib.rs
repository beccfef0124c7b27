//! Core types and error taxonomy for the linkguard URL risk engine.
//!
//! This crate provides the foundational types shared by every linkguard crate:
//!
//! - **Types**: [`NormalizedUrl`], per-source [`SourceVerdict`]s and the
//!   engine's [`CompositeVerdict`]
//! - **Errors**: the request-level error taxonomy rooted at [`LinkGuardError`]
//!
//! # Example
//!
//! ```rust
//! use linkguard_core::NormalizedUrl;
//!
//! let a = NormalizedUrl::parse("http://Example.com/a").unwrap();
//! let b = NormalizedUrl::parse("http://example.com/a?").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "http://example.com/a");
//! ```

#![doc(html_root_url = "https://docs.rs/linkguard-core/0.3.0")]

mod error;
pub mod types;

pub use error::{LinkGuardError, Result, ValidationError};
pub use types::*;
