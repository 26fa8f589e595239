//! Module identifiers and package manifests.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of a package manifest inside a package root.
pub const MANIFEST_FILE: &str = "package.json";

/// Directory inside a package root that holds its vendored dependencies.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Reasons a module id is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleIdError {
    /// The id was empty.
    #[error("Module id cannot be empty")]
    Empty,

    /// The id would escape its parent directory or is otherwise not a plain name.
    #[error("Invalid module id '{0}': expected 'name' or '@scope/name'")]
    Invalid(String),
}

/// A module identifier: `name` or `@scope/name`.
///
/// Validated on construction so it can be joined onto a directory without
/// escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId(String);

impl ModuleId {
    /// Validate and wrap a module id.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleIdError`] for empty ids, absolute paths, `.`/`..`
    /// components, backslashes, NUL bytes, or more than one `/` (unless scoped).
    pub fn new(id: impl Into<String>) -> Result<Self, ModuleIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ModuleIdError::Empty);
        }

        if id.contains('\\') || id.contains('\0') {
            return Err(ModuleIdError::Invalid(id));
        }

        let parts: Vec<&str> = id.split('/').collect();
        let ok = match parts.as_slice() {
            [name] => is_plain_component(name) && !name.starts_with('@'),
            [scope, name] => {
                scope.len() > 1
                    && scope.starts_with('@')
                    && is_plain_component(&scope[1..])
                    && is_plain_component(name)
            }
            _ => false,
        };

        if ok {
            Ok(Self(id))
        } else {
            Err(ModuleIdError::Invalid(id))
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative path of this module's directory (`name` or `@scope/name`).
    pub fn rel_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

fn is_plain_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(':')
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleId {
    type Error = ModuleIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ModuleId {
    type Error = ModuleIdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}

/// The subset of `package.json` the materializer reads.
///
/// Version constraints are kept verbatim and never compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Declared package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Declared package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Module id to version constraint. Sorted by id.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Parse a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed documents.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Manifest path inside a package root.
    pub fn path_in(package_root: &Path) -> PathBuf {
        package_root.join(MANIFEST_FILE)
    }

    /// Dependency ids in iteration order.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_id_accepts_plain_and_scoped() {
        assert!(ModuleId::new("lodash").is_ok());
        assert!(ModuleId::new("node-appc").is_ok());
        assert!(ModuleId::new("@babel/core").is_ok());
        assert!(ModuleId::new("lodash.merge").is_ok());
    }

    #[test]
    fn test_module_id_rejects_traversal() {
        assert_eq!(ModuleId::new(""), Err(ModuleIdError::Empty));
        for bad in ["..", ".", "../etc", "a/b", "@scope", "@/x", "@s/..", "/abs", "a\\b", "c:x"] {
            assert!(ModuleId::new(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_module_id_rel_path_splits_scope() {
        let id = ModuleId::new("@scope/pkg").unwrap();
        assert_eq!(id.rel_path(), Path::new("@scope").join("pkg"));
    }

    #[test]
    fn test_manifest_reads_dependency_keys_only() {
        let manifest = PackageManifest::parse(
            r#"{
                "name": "a",
                "version": "1.0.0",
                "main": "index.js",
                "dependencies": { "zeta": "^1.0.0", "alpha": "git+https://x/y.git" }
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.name.as_deref(), Some("a"));
        let deps: Vec<&str> = manifest.dependency_ids().collect();
        assert_eq!(deps, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_manifest_without_dependencies() {
        let manifest = PackageManifest::parse(r#"{"name": "leaf"}"#).unwrap();
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_manifest_rejects_malformed_json() {
        assert!(PackageManifest::parse("{ not json").is_err());
    }
}
