//! Repository configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! root = "/srv/repo"
//! component = "prod"
//! arches = ["all"]
//! signing_key = "release"
//!
//! [distributions]
//! ubuntu = ["20.04", "22.04"]
//! centos = ["7"]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shelf_schema::manifest::{manifest_file_name, signature_file_name};
use thiserror::Error;

use crate::paths::{METADATA_DIR_PREFIX, default_keyring_dir};
use crate::registry::BucketKey;

/// Errors that can occur when loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a configuration.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration supplied by the repository manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Storage root. Package files live at `<root>/<package>/<filename>`.
    pub root: PathBuf,
    /// Component name; manifests go under `<root>/_repo_<component>`.
    pub component: String,
    /// Distribution name to its supported versions, both in declaration order.
    #[serde(default)]
    pub distributions: IndexMap<String, Vec<String>>,
    /// Architectures served for every distribution version.
    #[serde(default = "default_arches")]
    pub arches: Vec<String>,
    /// Signing key identifier. Signing is skipped when unset.
    #[serde(default)]
    pub signing_key: Option<String>,
    /// Directory holding signing keys. Defaults to `~/.shelf/keys`.
    #[serde(default)]
    pub keyring: Option<PathBuf>,
}

fn default_arches() -> Vec<String> {
    vec!["all".to_string()]
}

impl RepoConfig {
    /// Create a configuration with the default `all` architecture and no
    /// distributions or signing key.
    pub fn new(root: impl Into<PathBuf>, component: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            component: component.into(),
            distributions: IndexMap::new(),
            arches: default_arches(),
            signing_key: None,
            keyring: None,
        }
    }

    /// Builder-style helper to declare a distribution and its versions.
    pub fn with_distribution<I, S>(mut self, distro: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distributions
            .insert(distro.into(), versions.into_iter().map(Into::into).collect());
        self
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Check the configuration for values that would produce broken paths or
    /// ambiguous combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the component, a distribution, a
    /// version, or an architecture is empty or contains a path separator, if
    /// no architecture is declared, if a distribution lists a version twice,
    /// or if two combinations would share one manifest file (for example
    /// `centos = ["7-stream"]` next to `centos-7 = ["stream"]`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_segment("component", &self.component)?;

        if self.arches.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one architecture is required".to_string(),
            ));
        }
        check_unique("architecture", "arches", &self.arches)?;
        for arch in &self.arches {
            check_segment("architecture", arch)?;
        }

        for (distro, versions) in &self.distributions {
            check_segment("distribution", distro)?;
            check_unique("version", distro, versions)?;
            for version in versions {
                check_segment("distribution version", version)?;
            }
        }

        let mut manifests = HashSet::new();
        for bucket in self.combinations() {
            let name = manifest_file_name(&bucket.distro, &bucket.distro_version, &bucket.arch);
            if !manifests.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "distribution {} version {} arch {} collides with another combination's manifest",
                    bucket.distro, bucket.distro_version, bucket.arch
                )));
            }
        }

        if let Some(key_id) = &self.signing_key {
            if key_id.trim().is_empty() {
                return Err(ConfigError::Invalid("signing_key is empty".to_string()));
            }
        }

        Ok(())
    }

    /// The configured cross-product of distribution, version, and
    /// architecture.
    ///
    /// Everything in declaration order: distributions, then versions, then
    /// architectures.
    pub fn combinations(&self) -> impl Iterator<Item = BucketKey> + '_ {
        self.distributions.iter().flat_map(move |(distro, versions)| {
            versions.iter().flat_map(move |version| {
                self.arches
                    .iter()
                    .map(move |arch| BucketKey::new(distro, version, arch))
            })
        })
    }

    /// Directory holding manifests and signatures: `<root>/_repo_<component>`.
    pub fn metadata_dir(&self) -> PathBuf {
        self.root
            .join(format!("{METADATA_DIR_PREFIX}{}", self.component))
    }

    /// Manifest path for one combination.
    pub fn manifest_path(&self, bucket: &BucketKey) -> PathBuf {
        self.metadata_dir().join(manifest_file_name(
            &bucket.distro,
            &bucket.distro_version,
            &bucket.arch,
        ))
    }

    /// Detached signature path for one combination.
    pub fn signature_path(&self, bucket: &BucketKey) -> PathBuf {
        self.metadata_dir().join(signature_file_name(
            &bucket.distro,
            &bucket.distro_version,
            &bucket.arch,
        ))
    }

    /// Every manifest and signature path a successful publish should leave
    /// behind, manifest before signature, in combination order.
    ///
    /// Derived from configuration alone; the registry is not consulted.
    pub fn metadata_files(&self) -> Vec<PathBuf> {
        self.combinations()
            .flat_map(|bucket| [self.manifest_path(&bucket), self.signature_path(&bucket)])
            .collect()
    }

    /// Keyring directory: the configured one, else the default under the
    /// shelf home.
    pub fn keyring_dir(&self) -> Option<PathBuf> {
        self.keyring.clone().or_else(default_keyring_dir)
    }
}

fn check_segment(what: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{what} must not be empty")));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::Invalid(format!(
            "{what} '{value}' is not a valid path segment"
        )));
    }
    Ok(())
}

fn check_unique(what: &str, owner: &str, values: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate {what} '{value}' in {owner}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_CONFIG: &str = r#"
root = "/srv/repo"
component = "prod"
arches = ["all", "x86_64"]
signing_key = "release"

[distributions]
ubuntu = ["22.04", "20.04"]
centos = ["7"]
"#;

    #[test]
    fn test_parse_config() {
        let config = RepoConfig::parse(EXAMPLE_CONFIG).unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/repo"));
        assert_eq!(config.component, "prod");
        assert_eq!(config.signing_key.as_deref(), Some("release"));
        assert_eq!(config.distributions["ubuntu"], vec!["22.04", "20.04"]);
    }

    #[test]
    fn test_default_arch_is_all() {
        let config = RepoConfig::parse("root = \"/r\"\ncomponent = \"c\"\n").unwrap();
        assert_eq!(config.arches, vec!["all"]);
        assert!(config.signing_key.is_none());
        assert_eq!(config.combinations().count(), 0);
    }

    #[test]
    fn test_combination_order() {
        let config = RepoConfig::parse(EXAMPLE_CONFIG).unwrap();
        let combos: Vec<String> = config.combinations().map(|b| b.to_string()).collect();
        assert_eq!(
            combos,
            vec![
                "ubuntu-22.04-all",
                "ubuntu-22.04-x86_64",
                "ubuntu-20.04-all",
                "ubuntu-20.04-x86_64",
                "centos-7-all",
                "centos-7-x86_64",
            ]
        );
    }

    #[test]
    fn test_metadata_files() {
        let config = RepoConfig::new("/srv/repo", "prod").with_distribution("ubuntu", ["20.04"]);
        assert_eq!(
            config.metadata_files(),
            vec![
                PathBuf::from("/srv/repo/_repo_prod/MANIFEST_ubuntu-20.04-all.json"),
                PathBuf::from("/srv/repo/_repo_prod/MANIFEST_ubuntu-20.04-all.json.gpg"),
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = RepoConfig::parse("root = \"/r\"\ncomponent = \"c\"\nbogus = 1\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_rejects_duplicate_versions() {
        let config = RepoConfig::new("/r", "c").with_distribution("ubuntu", ["20.04", "20.04"]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_colliding_manifest_names() {
        let config = RepoConfig::new("/r", "c")
            .with_distribution("centos", ["7-stream"])
            .with_distribution("centos-7", ["stream"]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let result = RepoConfig::parse(
            "root = \"/r\"\ncomponent = \"c\"\narches = [\"all\"]\n\n[distributions]\nfoo = [\"1-2\"]\nfoo-1 = [\"2\"]\n",
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_distinct_names_with_dashes_are_accepted() {
        let config = RepoConfig::new("/r", "c")
            .with_distribution("centos", ["7-stream"])
            .with_distribution("centos-8", ["stream"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.combinations().count(), 2);
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(RepoConfig::new("/r", "").validate().is_err());
        assert!(RepoConfig::new("/r", "a/b").validate().is_err());
        assert!(
            RepoConfig::new("/r", "c")
                .with_distribution("..", ["1"])
                .validate()
                .is_err()
        );

        let mut config = RepoConfig::new("/r", "c");
        config.arches.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_keyring_wins() {
        let mut config = RepoConfig::new("/r", "c");
        config.keyring = Some(PathBuf::from("/etc/shelf/keys"));
        assert_eq!(config.keyring_dir(), Some(PathBuf::from("/etc/shelf/keys")));
    }
}
