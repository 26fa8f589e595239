//! Reporter trait for dependency injection
//!
//! Lets the cache and materializer report progress without being coupled
//! to a terminal. Every method is a side effect only; none can fail.

use std::path::Path;
use stow_schema::{Locator, ModuleId};

pub trait Reporter: Send + Sync {
    /// Download progress. `total` is `None` when the server sent no length.
    fn downloading(&self, locator: &Locator, current: u64, total: Option<u64>);

    /// Hashing an artifact before use.
    fn verifying(&self, locator: &Locator);

    /// A verified cache entry was reused without any transfer.
    fn cached(&self, locator: &Locator, path: &Path);

    /// An artifact was downloaded and verified.
    fn done(&self, locator: &Locator, path: &Path);

    /// An artifact could not be produced.
    fn failed(&self, locator: &Locator, reason: &str);

    /// A module was copied into the destination tree.
    fn copied(&self, id: &ModuleId, dest: &Path);

    /// A module was already present at the destination.
    fn skipped(&self, id: &ModuleId);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn downloading(&self, locator: &Locator, current: u64, total: Option<u64>) {
        (**self).downloading(locator, current, total);
    }
    fn verifying(&self, locator: &Locator) {
        (**self).verifying(locator);
    }
    fn cached(&self, locator: &Locator, path: &Path) {
        (**self).cached(locator, path);
    }
    fn done(&self, locator: &Locator, path: &Path) {
        (**self).done(locator, path);
    }
    fn failed(&self, locator: &Locator, reason: &str) {
        (**self).failed(locator, reason);
    }
    fn copied(&self, id: &ModuleId, dest: &Path) {
        (**self).copied(id, dest);
    }
    fn skipped(&self, id: &ModuleId) {
        (**self).skipped(id);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn downloading(&self, _: &Locator, _: u64, _: Option<u64>) {}
    fn verifying(&self, _: &Locator) {}
    fn cached(&self, _: &Locator, _: &Path) {}
    fn done(&self, _: &Locator, _: &Path) {}
    fn failed(&self, _: &Locator, _: &str) {}
    fn copied(&self, _: &ModuleId, _: &Path) {}
    fn skipped(&self, _: &ModuleId) {}
    fn warning(&self, _: &str) {}
}
