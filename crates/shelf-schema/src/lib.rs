//! Shared types and manifest wire format for shelf.
//!
//! Everything in this crate is pure: no filesystem access, no clocks. The
//! filename heuristics in particular are exercised exhaustively by unit tests
//! without touching disk.

pub mod digest;
pub mod filename;
pub mod kind;
pub mod manifest;

// Re-exports
pub use digest::*;
pub use filename::PackageFilename;
pub use kind::PackageType;
pub use manifest::{Manifest, ManifestRecord, SIGNATURE_SUFFIX};
