//! Core library for shelf.
//!
//! Tracks which package files are registered for which
//! `(distribution, distribution-version, architecture)` targets and
//! materializes that state into signed JSON manifests.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── <package>/<filename>                       # stored package files
//! └── _repo_<component>/
//!     ├── MANIFEST_<distro>-<version>-<arch>.json
//!     └── MANIFEST_<distro>-<version>-<arch>.json.gpg
//! ```
//!
//! The `.gpg` files are armored Ed25519 signatures (see [`signer`]), not
//! OpenPGP data, so standard `gpg --verify` clients cannot check them.
//!
//! # Execution model
//!
//! Everything here is synchronous and unlocked. Callers serialize
//! `add_entry` / `remove_entry` / `write_metadata` against one
//! [`Repository`]; independent repositories do not share state.

pub mod config;
pub mod error;
pub mod hashing;
pub mod paths;
pub mod registry;
pub mod repository;
pub mod signer;
pub mod writer;

pub use config::{ConfigError, RepoConfig};
pub use error::RepoError;
pub use hashing::{FileHasher, HashedFile, StreamingHasher};
pub use paths::*;
pub use registry::{BucketKey, Entry, EntryKey, Registry};
pub use repository::Repository;
pub use signer::{Keyring, ManifestSigner, SignError};
pub use writer::ManifestWriter;

pub use shelf_schema::{PackageFilename, PackageType};
