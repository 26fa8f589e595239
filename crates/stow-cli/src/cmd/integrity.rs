//! Integrity command (digest generation)

use anyhow::{Context, Result};
use stow_core::{Config, IntegrityCache};
use stow_schema::Locator;

use crate::ui::Output;

/// Print `<locator> <sri>` for each input.
///
/// Remote locators are downloaded fresh, replacing any cached copy.
pub async fn integrity(config: &Config, locators: &[String], output: &Output) -> Result<()> {
    let cache = IntegrityCache::from_config(config)?;

    for raw in locators {
        let locator = Locator::parse(raw).with_context(|| format!("Invalid locator '{raw}'"))?;
        let digest = cache
            .resolve_digest(&locator, output)
            .await
            .with_context(|| format!("Failed to compute integrity of {locator}"))?;
        println!("{locator} {digest}");
    }

    Ok(())
}
