//! Manifest generation.

use std::fs;
use std::path::PathBuf;

use shelf_schema::manifest::{self, Manifest, ManifestRecord};
use shelf_schema::PackageFilename;

use crate::config::RepoConfig;
use crate::error::RepoError;
use crate::registry::{BucketKey, Registry};

/// Writes one manifest per configured combination.
///
/// Every write is a full regeneration from registry state; existing files are
/// overwritten in place.
#[derive(Debug, Clone, Copy)]
pub struct ManifestWriter<'a> {
    config: &'a RepoConfig,
}

impl<'a> ManifestWriter<'a> {
    /// Create a writer for `config`.
    pub fn new(config: &'a RepoConfig) -> Self {
        Self { config }
    }

    /// Project one bucket into a manifest grouped by package name.
    ///
    /// An unknown or empty bucket yields an empty manifest. Records within a
    /// package follow filename order.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Filename`] if a registered filename no longer
    /// parses, which registration prevents.
    pub fn build(registry: &Registry, bucket: &BucketKey) -> Result<Manifest, RepoError> {
        let mut manifest = Manifest::new();

        for (filename, entry) in registry.bucket(bucket) {
            let parsed = PackageFilename::parse(filename)?;
            manifest
                .entry(parsed.package)
                .or_default()
                .push(ManifestRecord {
                    md5: entry.digests.md5.clone(),
                    path: entry.path.clone(),
                    sha1: entry.digests.sha1.clone(),
                    sha256: entry.digests.sha256.clone(),
                    size: entry.size,
                    kind: entry.kind.clone(),
                    version: parsed.version,
                });
        }

        Ok(manifest)
    }

    /// Write the manifest of every configured combination, including empty
    /// ones, and return the paths written.
    ///
    /// Creates the metadata directory if absent.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Io`] if the directory cannot be created or a
    /// manifest cannot be written. Manifests written before the failure stay
    /// on disk.
    pub fn write_all(&self, registry: &Registry) -> Result<Vec<PathBuf>, RepoError> {
        let dir = self.config.metadata_dir();
        fs::create_dir_all(&dir).map_err(RepoError::io_at(&dir))?;

        let mut written = Vec::new();
        for bucket in self.config.combinations() {
            tracing::debug!(
                "Writing distro {}, distro version {}, arch {}",
                bucket.distro,
                bucket.distro_version,
                bucket.arch
            );

            let manifest = Self::build(registry, &bucket)?;
            let json = manifest::to_json(&manifest)?;
            let path = self.config.manifest_path(&bucket);
            fs::write(&path, json).map_err(RepoError::io_at(&path))?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Entry, EntryKey};
    use shelf_schema::{FileDigests, Md5Hash, PackageType, Sha1Hash, Sha256Hash};

    fn entry(path: &str) -> Entry {
        Entry {
            path: path.to_string(),
            kind: PackageType::Tar,
            digests: FileDigests {
                sha1: Sha1Hash::from_bytes(&[1; 20]),
                sha256: Sha256Hash::from_bytes(&[2; 32]),
                md5: Md5Hash::from_bytes(&[3; 16]),
            },
            size: 42,
        }
    }

    #[test]
    fn test_build_groups_by_package() {
        let bucket = BucketKey::new("ubuntu", "20.04", "all");
        let mut registry = Registry::new();
        for filename in ["foo_1.0.tar.gz", "foo_1.1.tar.gz", "bar.respkg"] {
            registry.insert(
                EntryKey::new(bucket.clone(), filename),
                entry(&format!("x/{filename}")),
            );
        }

        let manifest = ManifestWriter::build(&registry, &bucket).unwrap();
        assert_eq!(manifest.len(), 2);

        let versions: Vec<Option<&str>> = manifest["foo"]
            .iter()
            .map(|r| r.version.as_deref())
            .collect();
        assert_eq!(versions, vec![Some("1.0"), Some("1.1")]);
        assert_eq!(manifest["bar"][0].version, None);
    }

    #[test]
    fn test_build_unknown_bucket_is_empty() {
        let registry = Registry::new();
        let manifest =
            ManifestWriter::build(&registry, &BucketKey::new("ubuntu", "20.04", "all")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_write_all_covers_every_combination() {
        let dir = tempfile::tempdir().unwrap();
        let config = RepoConfig::new(dir.path(), "prod")
            .with_distribution("ubuntu", ["20.04", "22.04"])
            .with_distribution("centos", ["7"]);

        let written = ManifestWriter::new(&config)
            .write_all(&Registry::new())
            .unwrap();

        assert_eq!(written.len(), 3);
        for path in &written {
            assert_eq!(fs::read_to_string(path).unwrap(), "{}");
        }
    }
}
