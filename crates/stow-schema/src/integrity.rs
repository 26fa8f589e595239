//! Subresource-Integrity (SRI) digests.
//!
//! An integrity string is one or more whitespace-separated entries of the form
//! `<algorithm>-<base64 digest>`, optionally followed by `?options` which are
//! ignored. This is the format used by npm lockfiles and module listings.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Read buffer size used when hashing streams.
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Hash algorithms accepted in an integrity string.
///
/// Variants are ordered weakest to strongest, so `Ord` picks the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512 (the npm default)
    Sha512,
}

impl Algorithm {
    /// The SRI prefix for this algorithm (e.g. `sha512`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Look up an algorithm by its SRI prefix. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Length in bytes of a raw digest produced by this algorithm.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Start an incremental hasher for this algorithm.
    pub fn hasher(self) -> IntegrityHasher {
        IntegrityHasher::new(self)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while parsing an integrity string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// The input was empty or whitespace only.
    #[error("Integrity string is empty")]
    Empty,

    /// No entry used a supported algorithm with a well-formed digest.
    #[error("No usable sha256/sha384/sha512 entry in integrity string '{0}'")]
    NoUsableEntry(String),
}

/// A single `<algorithm>-<base64>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegrityEntry {
    /// Hash algorithm of this entry.
    pub algorithm: Algorithm,
    /// Canonical (padded, standard alphabet) base64 encoding of the digest.
    pub digest: String,
}

impl IntegrityEntry {
    fn parse(raw: &str) -> Option<Self> {
        let (algo, rest) = raw.split_once('-')?;
        let algorithm = Algorithm::from_name(algo)?;
        let encoded = rest.split_once('?').map_or(rest, |(d, _)| d);
        let bytes = BASE64.decode(encoded.as_bytes()).ok()?;
        if bytes.len() != algorithm.output_len() {
            return None;
        }
        Some(Self {
            algorithm,
            digest: BASE64.encode(bytes),
        })
    }

    fn from_raw(algorithm: Algorithm, raw: &[u8]) -> Self {
        Self {
            algorithm,
            digest: BASE64.encode(raw),
        }
    }
}

impl fmt::Display for IntegrityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm, self.digest)
    }
}

/// A parsed, normalized integrity digest.
///
/// Always holds at least one entry. Two values are equal iff their
/// normalized string forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integrity {
    entries: Vec<IntegrityEntry>,
}

impl Integrity {
    /// Parse an SRI string.
    ///
    /// Entries with unknown algorithms or malformed digests are skipped, matching
    /// how npm tooling treats forward-compatible integrity strings. Exact duplicate
    /// entries collapse into one.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::Empty`] for blank input and
    /// [`IntegrityError::NoUsableEntry`] if nothing could be parsed.
    pub fn parse(s: &str) -> Result<Self, IntegrityError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IntegrityError::Empty);
        }

        let mut entries: Vec<IntegrityEntry> = Vec::new();
        for entry in trimmed.split_whitespace().filter_map(IntegrityEntry::parse) {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            return Err(IntegrityError::NoUsableEntry(trimmed.to_string()));
        }
        Ok(Self { entries })
    }

    /// Compute the digest of an in-memory buffer.
    pub fn compute(algorithm: Algorithm, data: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        hasher.finish()
    }

    /// Compute the digest of everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates any read error.
    pub fn from_reader<R: Read>(algorithm: Algorithm, mut reader: R) -> std::io::Result<Self> {
        let mut hasher = algorithm.hasher();
        let mut buf = vec![0u8; HASH_BUF_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }

    /// All entries, in their original order.
    pub fn entries(&self) -> &[IntegrityEntry] {
        &self.entries
    }

    /// The strongest algorithm present.
    pub fn strongest(&self) -> Algorithm {
        self.entries
            .iter()
            .map(|e| e.algorithm)
            .max()
            .unwrap_or(Algorithm::Sha512)
    }

    /// First entry using `algorithm`, if any.
    pub fn entry_for(&self, algorithm: Algorithm) -> Option<&IntegrityEntry> {
        self.entries.iter().find(|e| e.algorithm == algorithm)
    }

    /// Whether `actual` satisfies this (expected) digest.
    ///
    /// Only the strongest algorithm of `self` is consulted: `actual` must carry
    /// an entry for it equal to one of the expected entries of that algorithm.
    pub fn matches(&self, actual: &Integrity) -> bool {
        let algorithm = self.strongest();
        let Some(computed) = actual.entry_for(algorithm) else {
            return false;
        };
        self.entries
            .iter()
            .any(|e| e.algorithm == algorithm && e.digest == computed.digest)
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl FromStr for Integrity {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Integrity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Integrity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher yielding an [`Integrity`] with a single entry.
#[derive(Debug, Clone)]
pub enum IntegrityHasher {
    /// SHA-256 state
    Sha256(Sha256),
    /// SHA-384 state
    Sha384(Sha384),
    /// SHA-512 state
    Sha512(Sha512),
}

impl IntegrityHasher {
    /// Create a hasher for `algorithm`.
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha256 => Self::Sha256(Sha256::new()),
            Algorithm::Sha384 => Self::Sha384(Sha384::new()),
            Algorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Finalize into an integrity value.
    pub fn finish(self) -> Integrity {
        let entry = match self {
            Self::Sha256(h) => IntegrityEntry::from_raw(Algorithm::Sha256, &h.finalize()),
            Self::Sha384(h) => IntegrityEntry::from_raw(Algorithm::Sha384, &h.finalize()),
            Self::Sha512(h) => IntegrityEntry::from_raw(Algorithm::Sha512, &h.finalize()),
        };
        Integrity {
            entries: vec![entry],
        }
    }
}

impl std::io::Write for IntegrityHasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
