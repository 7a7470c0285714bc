//! Operations files consumed by `shelf-pkg publish`.
//!
//! ```toml
//! [[add]]
//! type = "rsc"
//! filename = "foo_1.2.tar.gz"
//! distro = "ubuntu"
//! version = "20.04"
//! arch = "all"
//!
//! [[remove]]
//! filename = "foo_1.1.tar.gz"
//! distro = "ubuntu"
//! version = "20.04"
//! arch = "all"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use shelf_core::Repository;
use shelf_schema::PackageType;
use shelf_schema::kind::GENERIC_HINT;

/// A batch of registry mutations.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct OpsFile {
    /// Files to register.
    #[serde(default)]
    pub(crate) add: Vec<AddOp>,
    /// Files to unregister.
    #[serde(default)]
    pub(crate) remove: Vec<RemoveOp>,
}

/// One `[[add]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AddOp {
    /// Type hint from the uploader; `rsc` when omitted.
    #[serde(rename = "type", default = "default_hint")]
    pub(crate) kind: String,
    pub(crate) filename: String,
    pub(crate) distro: String,
    pub(crate) version: String,
    pub(crate) arch: String,
}

/// One `[[remove]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RemoveOp {
    pub(crate) filename: String,
    pub(crate) distro: String,
    pub(crate) version: String,
    pub(crate) arch: String,
}

fn default_hint() -> String {
    GENERIC_HINT.to_string()
}

/// Counts reported after applying a batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Applied {
    pub(crate) added: usize,
    pub(crate) removed: usize,
    pub(crate) ignored: usize,
}

impl OpsFile {
    pub(crate) fn parse(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Failed to parse operations file")
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    /// Apply every add, then every remove, in file order.
    ///
    /// Stops at the first add that fails; removes never fail.
    pub(crate) fn apply(&self, repo: &mut Repository) -> Result<Applied> {
        let mut applied = Applied::default();

        for op in &self.add {
            let hint = PackageType::from(op.kind.as_str());
            repo.add_entry(&hint, &op.filename, &op.distro, &op.version, &op.arch)
                .with_context(|| format!("Failed to add {}", op.filename))?;
            applied.added += 1;
        }

        for op in &self.remove {
            if repo.remove_entry(&op.filename, &op.distro, &op.version, &op.arch) {
                applied.removed += 1;
            } else {
                applied.ignored += 1;
            }
        }

        Ok(applied)
    }
}
