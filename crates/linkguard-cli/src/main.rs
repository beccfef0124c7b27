//! linkguard - check a link against feeds, reputation services and
//! heuristics before opening it.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    linkguard_cli::run().await
}
