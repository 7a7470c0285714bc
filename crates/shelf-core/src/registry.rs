//! In-memory entry registry.
//!
//! A flat composite-key map `(distro, distro_version, arch, filename) -> Entry`.
//! Keys order bucket-first, so all entries of one bucket are contiguous and
//! can be read with a range scan.

use std::collections::BTreeMap;

use shelf_schema::{FileDigests, PackageType};

/// One `(distribution, distribution-version, architecture)` combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    /// Distribution name (e.g. `ubuntu`).
    pub distro: String,
    /// Distribution version (e.g. `20.04`).
    pub distro_version: String,
    /// Architecture (e.g. `all`, `x86_64`).
    pub arch: String,
}

impl BucketKey {
    /// Create a new `BucketKey`.
    pub fn new(
        distro: impl Into<String>,
        distro_version: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            distro: distro.into(),
            distro_version: distro_version.into(),
            arch: arch.into(),
        }
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.distro, self.distro_version, self.arch)
    }
}

/// Full key of one registered file.
///
/// Derived ordering compares the bucket first, then the filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    /// The bucket the file is registered under.
    pub bucket: BucketKey,
    /// The uploaded filename.
    pub filename: String,
}

impl EntryKey {
    /// Create a new `EntryKey`.
    pub fn new(bucket: BucketKey, filename: impl Into<String>) -> Self {
        Self {
            bucket,
            filename: filename.into(),
        }
    }
}

/// Metadata recorded for one registered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Storage path relative to the repository root (`<package>/<filename>`).
    pub path: String,
    /// Resolved package type.
    pub kind: PackageType,
    /// Content digests.
    pub digests: FileDigests,
    /// File size in bytes.
    pub size: u64,
}

/// The set of registered files, at most one [`Entry`] per [`EntryKey`].
///
/// Lives only for the process lifetime; it is never loaded back from the
/// manifests it produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<EntryKey, Entry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the one it replaced, if any.
    pub fn insert(&mut self, key: EntryKey, entry: Entry) -> Option<Entry> {
        self.entries.insert(key, entry)
    }

    /// Remove an entry, returning it if it was present.
    pub fn remove(&mut self, key: &EntryKey) -> Option<Entry> {
        self.entries.remove(key)
    }

    /// Look up one entry.
    pub fn get(&self, key: &EntryKey) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Iterate `(filename, entry)` pairs of one bucket in filename order.
    ///
    /// An unknown bucket yields nothing.
    pub fn bucket<'a>(&'a self, bucket: &'a BucketKey) -> impl Iterator<Item = (&'a str, &'a Entry)> {
        let start = EntryKey::new(bucket.clone(), String::new());
        self.entries
            .range(start..)
            .take_while(move |(key, _)| key.bucket == *bucket)
            .map(|(key, entry)| (key.filename.as_str(), entry))
    }

    /// Buckets holding at least one entry, in key order.
    pub fn populated_buckets(&self) -> Vec<&BucketKey> {
        let mut buckets: Vec<&BucketKey> = Vec::new();
        for key in self.entries.keys() {
            if buckets.last() != Some(&&key.bucket) {
                buckets.push(&key.bucket);
            }
        }
        buckets
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
