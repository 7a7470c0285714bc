//! Manifest wire format.
//!
//! A manifest lists every package file available for one
//! `(distribution, distribution-version, architecture)` combination:
//!
//! ```text
//! { "<package>": [ { "md5": .., "path": .., "sha1": .., "sha256": ..,
//!                    "size": .., "type": .., "version": .. } ] }
//! ```
//!
//! Output is deterministic: package keys come from a [`BTreeMap`], record
//! fields are declared in alphabetical order, and indentation is fixed.
//! Signatures are computed over these exact bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digest::{Md5Hash, Sha1Hash, Sha256Hash};
use crate::kind::PackageType;

/// Suffix appended to a manifest path to name its detached signature.
pub const SIGNATURE_SUFFIX: &str = ".gpg";

/// Package name to the records of every file of that package.
pub type Manifest = BTreeMap<String, Vec<ManifestRecord>>;

/// One file entry in a manifest.
///
/// Fields are declared in alphabetical order; serde emits them in
/// declaration order, which keeps the JSON keys sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// MD5 of the file contents.
    pub md5: Md5Hash,
    /// Storage path relative to the repository root (`<package>/<filename>`).
    pub path: String,
    /// SHA-1 of the file contents.
    pub sha1: Sha1Hash,
    /// SHA-256 of the file contents.
    pub sha256: Sha256Hash,
    /// File size in bytes.
    pub size: u64,
    /// Resolved package type.
    #[serde(rename = "type")]
    pub kind: PackageType,
    /// Version parsed from the filename, `null` when absent.
    pub version: Option<String>,
}

/// Serialize a manifest to its canonical JSON text.
///
/// Two-space indentation, sorted keys, no trailing newline. An empty manifest
/// serializes as `{}`.
///
/// # Errors
///
/// Returns an error only if serialization itself fails, which cannot happen
/// for well-formed records.
pub fn to_json(manifest: &Manifest) -> serde_json::Result<String> {
    serde_json::to_string_pretty(manifest)
}

/// Parse manifest JSON text.
///
/// # Errors
///
/// Returns an error if `text` is not valid JSON or does not match the
/// manifest schema.
pub fn from_json(text: &str) -> serde_json::Result<Manifest> {
    serde_json::from_str(text)
}

/// File name of the manifest for one combination.
///
/// # Example
///
/// ```
/// use shelf_schema::manifest::manifest_file_name;
///
/// assert_eq!(manifest_file_name("ubuntu", "20.04", "all"), "MANIFEST_ubuntu-20.04-all.json");
/// ```
pub fn manifest_file_name(distro: &str, distro_version: &str, arch: &str) -> String {
    format!("MANIFEST_{distro}-{distro_version}-{arch}.json")
}

/// File name of the detached signature for one combination.
pub fn signature_file_name(distro: &str, distro_version: &str, arch: &str) -> String {
    format!(
        "{}{SIGNATURE_SUFFIX}",
        manifest_file_name(distro, distro_version, arch)
    )
}
