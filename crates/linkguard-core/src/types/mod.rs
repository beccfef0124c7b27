//! Data model shared by the feed store, the adapters and the engine.

mod composite;
mod normalized;
mod verdict;

pub use composite::*;
pub use normalized::*;
pub use verdict::*;
