//! Flat dependency materialization.
//!
//! Copies a module and, transitively, everything it declares as a dependency
//! into one destination directory, `node_modules` style: every module lands
//! directly under the destination, never nested. A module whose manifest is
//! already present at the destination is treated as satisfied, which is also
//! what stops dependency cycles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stow_schema::{DEPENDENCY_DIR, ModuleId, ModuleIdError, PackageManifest};
use thiserror::Error;

use crate::Reporter;
use crate::io::copy::copy_package;
use crate::locks::PathLocks;
use crate::paths::node_modules_ancestors;

/// How many times a copy is attempted before giving up on a module.
pub const COPY_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Module '{id}' not found in any of {} search path(s)", .searched.len())]
    ModuleNotFound { id: ModuleId, searched: Vec<PathBuf> },

    #[error("Module '{id}' was copied {attempts} times but its manifest never appeared")]
    CopyVerification { id: ModuleId, attempts: u32 },

    #[error("Invalid manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidModuleId(#[from] ModuleIdError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Ordered list of directories that may contain module roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `node_modules` directories of `start` and each of its ancestors.
    pub fn from_ancestors(start: &Path) -> Self {
        Self::new(node_modules_ancestors(start))
    }

    /// Append the directories listed in `NODE_PATH`.
    #[must_use]
    pub fn with_env(self) -> Self {
        let node_path = crate::config::Config::from_env().node_path;
        self.with_dirs(node_path)
    }

    /// Append `dirs` after the existing entries.
    #[must_use]
    pub fn with_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.dirs.extend(dirs);
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Package root of `id`: the first `<dir>/<id>` holding a manifest,
    /// looking through the default directories and then `extra`.
    pub fn resolve(&self, id: &ModuleId, extra: &[PathBuf]) -> Option<PathBuf> {
        self.dirs
            .iter()
            .chain(extra)
            .map(|dir| dir.join(id.rel_path()))
            .find(|root| PackageManifest::path_in(root).is_file())
    }

    fn searched(&self, extra: &[PathBuf]) -> Vec<PathBuf> {
        self.dirs.iter().chain(extra).cloned().collect()
    }
}

/// What a materialization did, in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Modules copied into the destination.
    pub copied: Vec<ModuleId>,
    /// Modules skipped because they were already present.
    pub skipped: Vec<ModuleId>,
}

/// Copies module trees into a flat destination.
///
/// Clones share the per-destination locks, so concurrent calls through
/// clones of one materializer never copy the same module twice.
#[derive(Debug, Clone)]
pub struct Materializer {
    search: Arc<SearchPaths>,
    locks: PathLocks,
}

enum Visit {
    Present,
    Copied {
        dependencies: Vec<ModuleId>,
        nested: PathBuf,
        retries: u32,
    },
}

impl Materializer {
    pub fn new(search: SearchPaths) -> Self {
        Self {
            search: Arc::new(search),
            locks: PathLocks::new(),
        }
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search
    }

    /// Copy `id` and its transitive dependencies into `dest`.
    ///
    /// `extra` is searched after the default search paths when resolving `id`
    /// itself. Each dependency is resolved with its parent's own `node_modules`
    /// as the only extra search path.
    ///
    /// # Errors
    ///
    /// The first failure aborts the whole call. Modules copied before the
    /// failure stay in place.
    pub async fn materialize<R: Reporter>(
        &self,
        id: &ModuleId,
        dest: &Path,
        extra: &[PathBuf],
        reporter: &R,
    ) -> Result<MaterializeReport, MaterializeError> {
        let mut report = MaterializeReport::default();
        let mut stack: Vec<(ModuleId, Vec<PathBuf>)> = vec![(id.clone(), extra.to_vec())];

        while let Some((module, extra)) = stack.pop() {
            let target = dest.join(module.rel_path());
            let _guard = self.locks.lock(&target).await;

            let search = self.search.clone();
            let visit_id = module.clone();
            let visit = tokio::task::spawn_blocking(move || {
                visit_module(&search, &visit_id, &target, &extra)
            })
            .await
            .map_err(|e| MaterializeError::io("Copy task failed", std::io::Error::other(e)))??;

            match visit {
                Visit::Present => {
                    tracing::trace!(module = %module, "already present");
                    reporter.skipped(&module);
                    report.skipped.push(module);
                }
                Visit::Copied {
                    dependencies,
                    nested,
                    retries,
                } => {
                    if retries > 0 {
                        reporter.warning(&format!(
                            "{module}: copy needed {} attempt(s)",
                            retries + 1
                        ));
                    }
                    tracing::debug!(module = %module, deps = dependencies.len(), "copied");
                    reporter.copied(&module, &dest.join(module.rel_path()));
                    report.copied.push(module);

                    // Reverse so the first dependency is visited first.
                    for dep in dependencies.into_iter().rev() {
                        stack.push((dep, vec![nested.clone()]));
                    }
                }
            }
        }

        Ok(report)
    }
}

fn visit_module(
    search: &SearchPaths,
    id: &ModuleId,
    target: &Path,
    extra: &[PathBuf],
) -> Result<Visit, MaterializeError> {
    if PackageManifest::path_in(target).is_file() {
        return Ok(Visit::Present);
    }

    let Some(source) = search.resolve(id, extra) else {
        return Err(MaterializeError::ModuleNotFound {
            id: id.clone(),
            searched: search.searched(extra),
        });
    };
    tracing::debug!(module = %id, from = %source.display(), to = %target.display(), "copying");

    let manifest_path = PackageManifest::path_in(target);
    let mut attempt = 0;
    loop {
        attempt += 1;
        copy_package(&source, target).map_err(|e| {
            MaterializeError::io(format!("Failed to copy {}", source.display()), e)
        })?;
        if manifest_path.is_file() {
            break;
        }
        if attempt >= COPY_ATTEMPTS {
            return Err(MaterializeError::CopyVerification {
                id: id.clone(),
                attempts: attempt,
            });
        }
        tracing::warn!(module = %id, attempt, "manifest missing after copy, retrying");
    }

    let content = std::fs::read_to_string(&manifest_path).map_err(|e| {
        MaterializeError::io(format!("Failed to read {}", manifest_path.display()), e)
    })?;
    let manifest =
        PackageManifest::parse(&content).map_err(|source| MaterializeError::Manifest {
            path: manifest_path.clone(),
            source,
        })?;

    let dependencies = manifest
        .dependency_ids()
        .map(ModuleId::new)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Visit::Copied {
        dependencies,
        nested: source.join(DEPENDENCY_DIR),
        retries: attempt - 1,
    })
}
