//! Materialize command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stow_core::{MaterializeReport, Materializer, SearchPaths};
use stow_schema::ModuleId;

use crate::ui::Output;

/// Copy `modules` and their dependencies into `dest`.
///
/// Default search paths are the `node_modules` ancestors of `from` (or the
/// current directory) followed by `NODE_PATH`.
pub async fn materialize(
    modules: &[String],
    dest: &Path,
    search_paths: &[PathBuf],
    from: Option<&Path>,
    output: &Output,
) -> Result<()> {
    let ids = modules
        .iter()
        .map(|m| ModuleId::new(m.as_str()).with_context(|| format!("Invalid module id '{m}'")))
        .collect::<Result<Vec<_>>>()?;

    let start = match from {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let materializer = Materializer::new(SearchPaths::from_ancestors(&start).with_env());
    tracing::debug!(
        search = ?materializer.search_paths().dirs(),
        extra = ?search_paths,
        "search paths"
    );

    let mut total = MaterializeReport::default();
    for id in &ids {
        let report = materializer
            .materialize(id, dest, search_paths, output)
            .await
            .with_context(|| format!("Failed to materialize '{id}'"))?;
        total.copied.extend(report.copied);
        total.skipped.extend(report.skipped);
    }

    output.success(&format!(
        "{} module(s) copied, {} already present in {}",
        total.copied.len(),
        total.skipped.len(),
        dest.display()
    ));
    Ok(())
}
