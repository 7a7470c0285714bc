//! JSON manifest repository.
//!
//! [`Repository`] owns the configuration, the entry registry, and the hashing
//! collaborator, and exposes the operations the upload agent drives:
//! registering and removing files, placing uploads, and publishing metadata.

use std::fs;
use std::path::{Path, PathBuf};

use shelf_schema::{PackageFilename, PackageType};

use crate::config::RepoConfig;
use crate::error::RepoError;
use crate::hashing::{FileHasher, StreamingHasher};
use crate::registry::{BucketKey, Entry, EntryKey, Registry};
use crate::signer::ManifestSigner;
use crate::writer::ManifestWriter;

/// A package repository publishing signed JSON manifests.
#[derive(Debug)]
pub struct Repository {
    config: RepoConfig,
    registry: Registry,
    hasher: Box<dyn FileHasher>,
}

impl Repository {
    /// Create a repository hashing files with [`StreamingHasher`].
    pub fn new(config: RepoConfig) -> Self {
        Self::with_hasher(config, StreamingHasher)
    }

    /// Create a repository with a custom hashing collaborator.
    pub fn with_hasher(config: RepoConfig, hasher: impl FileHasher + 'static) -> Self {
        Self {
            config,
            registry: Registry::new(),
            hasher: Box::new(hasher),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// The current registry state.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Storage location of `filename`: `<root>/<package>/<filename>`.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::UnsafeFilename`] if `filename` is not a bare file
    /// name, or [`RepoError::Filename`] if it is empty.
    pub fn file_path(&self, filename: &str) -> Result<PathBuf, RepoError> {
        let relative = relative_path(filename)?;
        Ok(self.config.root.join(relative))
    }

    /// Register `filename` for one combination, overwriting any previous entry
    /// under the same key.
    ///
    /// The file must already be stored at [`file_path`](Self::file_path); its
    /// size and digests are read from there. A generic `hint` is refined from
    /// the filename suffix.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Io`] if the stored file cannot be hashed, in which
    /// case the registry is left untouched, or a filename error if `filename`
    /// is unusable.
    pub fn add_entry(
        &mut self,
        hint: &PackageType,
        filename: &str,
        distro: &str,
        distro_version: &str,
        arch: &str,
    ) -> Result<(), RepoError> {
        tracing::debug!(
            "Got entry for package: {filename} arch: {arch} distro: {distro} {distro_version}"
        );

        let path = relative_path(filename)?;
        let full_path = self.config.root.join(&path);
        let hashed = self
            .hasher
            .hash_file(&full_path)
            .map_err(RepoError::io_at(&full_path))?;

        let key = EntryKey::new(BucketKey::new(distro, distro_version, arch), filename);
        let entry = Entry {
            path,
            kind: PackageType::classify(hint, filename),
            digests: hashed.digests,
            size: hashed.size,
        };

        if self.registry.insert(key, entry).is_some() {
            tracing::debug!("Replaced existing entry for {filename}");
        }
        Ok(())
    }

    /// Unregister `filename` from one combination.
    ///
    /// An unknown key is ignored with a warning. Returns whether an entry was
    /// removed.
    pub fn remove_entry(
        &mut self,
        filename: &str,
        distro: &str,
        distro_version: &str,
        arch: &str,
    ) -> bool {
        let key = EntryKey::new(BucketKey::new(distro, distro_version, arch), filename);
        if self.registry.remove(&key).is_some() {
            return true;
        }

        tracing::warn!(
            "Unable to remove entry \"{filename}\" \"{distro}\" \"{distro_version}\" \"{arch}\", ignored."
        );
        false
    }

    /// Move an uploaded temporary file into its storage location, creating the
    /// package directory if needed. Returns the final path.
    ///
    /// Falls back to copy-and-delete when a rename is not possible (for
    /// example across filesystems).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Io`] if the directory cannot be created or the file
    /// cannot be moved, or a filename error if `filename` is unusable.
    pub fn load_file(&self, filename: &str, temp_file: &Path) -> Result<PathBuf, RepoError> {
        let dest = self.file_path(filename)?;
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir).map_err(RepoError::io_at(dir))?;
        }

        if fs::rename(temp_file, &dest).is_err() {
            fs::copy(temp_file, &dest).map_err(RepoError::io_at(temp_file))?;
            fs::remove_file(temp_file).map_err(RepoError::io_at(temp_file))?;
        }

        tracing::debug!("Stored {} at {}", filename, dest.display());
        Ok(dest)
    }

    /// Regenerate every manifest and, if a signing key is configured, sign
    /// the manifests of populated combinations.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Io`] or [`RepoError::Json`] if writing fails, and
    /// [`RepoError::Sign`] if the key cannot be resolved or a signature cannot
    /// be produced. Manifests written before a failure stay on disk.
    pub fn write_metadata(&self) -> Result<(), RepoError> {
        let written = ManifestWriter::new(&self.config).write_all(&self.registry)?;
        tracing::debug!("Wrote {} manifests", written.len());

        if let Some(signer) = ManifestSigner::from_config(&self.config)? {
            let signed = signer.sign_populated(&self.registry)?;
            tracing::debug!("Wrote {} signatures", signed.len());
        }

        Ok(())
    }

    /// Every manifest and signature path a successful
    /// [`write_metadata`](Self::write_metadata) should leave behind.
    pub fn metadata_files(&self) -> Vec<PathBuf> {
        self.config.metadata_files()
    }
}

/// `<package>/<filename>` for a bare filename.
fn relative_path(filename: &str) -> Result<String, RepoError> {
    if filename.contains(['/', '\\']) || filename == "." || filename == ".." {
        return Err(RepoError::UnsafeFilename(filename.to_string()));
    }
    let parsed = PackageFilename::parse(filename)?;
    Ok(format!("{}/{filename}", parsed.package))
}
