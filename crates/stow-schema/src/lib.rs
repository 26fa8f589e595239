//! Shared types for stow.
//!
//! Pure data: integrity digests, source locators, module ids and the
//! package manifest subset. Nothing here touches the network.

pub mod integrity;
pub mod locator;
pub mod module;

// Re-exports
pub use integrity::{Algorithm, Integrity, IntegrityEntry, IntegrityError, IntegrityHasher};
pub use locator::{Locator, LocatorError};
pub use module::{DEPENDENCY_DIR, MANIFEST_FILE, ModuleId, ModuleIdError, PackageManifest};
