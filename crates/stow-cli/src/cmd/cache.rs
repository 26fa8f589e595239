//! Cache command

use anyhow::{Context, Result};
use stow_core::{Config, IntegrityCache};

use crate::ui::Output;
use crate::ui::progress::format_bytes;

/// Print the cache directory.
pub fn path(config: &Config) {
    println!("{}", config.cache_root.path().display());
}

/// Remove every cached artifact.
pub async fn clean(config: &Config, output: &Output) -> Result<()> {
    let cache = IntegrityCache::from_config(config)?;
    let freed = cache
        .clean()
        .await
        .with_context(|| format!("Failed to clean {}", config.cache_root.path().display()))?;
    output.success(&format!("Freed {}", format_bytes(freed)));
    Ok(())
}
