//! Fetch command

use anyhow::{Context, Result};
use stow_core::{Config, IntegrityCache};
use stow_schema::{Integrity, Locator};

use crate::ui::Output;

/// Print a local path whose bytes match `integrity`.
pub async fn fetch(
    config: &Config,
    locator: &str,
    integrity: Option<&str>,
    output: &Output,
) -> Result<()> {
    let locator =
        Locator::parse(locator).with_context(|| format!("Invalid locator '{locator}'"))?;
    let expected = integrity
        .map(|sri| Integrity::parse(sri).with_context(|| format!("Invalid integrity '{sri}'")))
        .transpose()?;

    let cache = IntegrityCache::from_config(config)?;
    let path = cache
        .fetch_verified(&locator, expected.as_ref(), output)
        .await
        .with_context(|| format!("Failed to fetch {locator}"))?;

    println!("{}", path.display());
    Ok(())
}
