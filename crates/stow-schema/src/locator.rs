//! Source locators: where an artifact's bytes come from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix marking a local artifact.
pub const FILE_SCHEME: &str = "file://";

/// Errors produced when parsing a locator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// The input was empty.
    #[error("Locator is empty")]
    Empty,

    /// A `file://` locator did not carry an absolute path.
    #[error("File locator must use an absolute path: '{0}'")]
    RelativePath(String),

    /// Neither `file://` nor `http(s)://`.
    #[error("Unsupported locator scheme (expected file://, http:// or https://): '{0}'")]
    UnsupportedScheme(String),
}

/// A local file or a remote HTTP(S) URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// `file://<absolute path>`
    Local(PathBuf),
    /// `http://...` or `https://...`
    Remote(String),
}

impl Locator {
    /// Parse a locator string.
    ///
    /// # Errors
    ///
    /// See [`LocatorError`].
    pub fn parse(s: &str) -> Result<Self, LocatorError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocatorError::Empty);
        }

        if let Some(path) = s.strip_prefix(FILE_SCHEME) {
            let path = PathBuf::from(path);
            if !path.is_absolute() {
                return Err(LocatorError::RelativePath(s.to_string()));
            }
            return Ok(Self::Local(path));
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Remote(s.to_string()));
        }

        Err(LocatorError::UnsupportedScheme(s.to_string()))
    }

    /// Build a local locator from a path.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::RelativePath`] if `path` is relative.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, LocatorError> {
        let path = path.into();
        if path.is_absolute() {
            Ok(Self::Local(path))
        } else {
            Err(LocatorError::RelativePath(path.display().to_string()))
        }
    }

    /// Whether the bytes live behind a URL.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The local path, for `file://` locators.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// Cache file name for a remote locator: the text after the final `/`.
    ///
    /// Distinct URLs sharing a trailing segment map to the same name; callers
    /// are responsible for avoiding such collisions. Returns `None` for local
    /// locators, for URLs ending in `/`, and for `.` or `..` segments.
    pub fn cache_file_name(&self) -> Option<&str> {
        match self {
            Self::Local(_) => None,
            Self::Remote(url) => url
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty() && *name != "." && *name != ".."),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{FILE_SCHEME}{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_parse_local() {
        let locator = Locator::parse("file:///tmp/sdk.zip").unwrap();
        assert_eq!(locator.local_path(), Some(Path::new("/tmp/sdk.zip")));
        assert!(!locator.is_remote());
        assert_eq!(locator.to_string(), "file:///tmp/sdk.zip");
        assert_eq!(locator.cache_file_name(), None);
    }

    #[test]
    fn test_parse_local_rejects_relative() {
        assert!(matches!(
            Locator::parse("file://relative/x.zip"),
            Err(LocatorError::RelativePath(_))
        ));
    }

    #[test]
    fn test_parse_remote() {
        let locator = Locator::parse("https://example.com/dl/ti.map-1.0.0.zip").unwrap();
        assert!(locator.is_remote());
        assert_eq!(locator.cache_file_name(), Some("ti.map-1.0.0.zip"));
        assert_eq!(locator.to_string(), "https://example.com/dl/ti.map-1.0.0.zip");
    }

    #[test]
    fn test_cache_name_collides_on_shared_filename() {
        let a = Locator::parse("https://a.example.com/x/module.zip").unwrap();
        let b = Locator::parse("http://b.example.com/y/module.zip").unwrap();
        assert_eq!(a.cache_file_name(), b.cache_file_name());
    }

    #[test]
    fn test_cache_name_missing_for_trailing_slash() {
        let locator = Locator::parse("https://example.com/dir/").unwrap();
        assert_eq!(locator.cache_file_name(), None);
    }

    #[test]
    fn test_cache_name_missing_for_dot_segments() {
        for url in ["https://example.com/x/..", "https://example.com/x/.", "http://h/.."] {
            let locator = Locator::parse(url).unwrap();
            assert_eq!(locator.cache_file_name(), None, "{url}");
        }
        let dotted = Locator::parse("https://example.com/x/..tar").unwrap();
        assert_eq!(dotted.cache_file_name(), Some("..tar"));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert_eq!(Locator::parse(""), Err(LocatorError::Empty));
        assert!(matches!(
            Locator::parse("ftp://example.com/a"),
            Err(LocatorError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            Locator::parse("/just/a/path"),
            Err(LocatorError::UnsupportedScheme(_))
        ));
    }
}
