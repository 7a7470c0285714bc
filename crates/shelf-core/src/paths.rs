//! Well-known filesystem locations.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the shelf home directory, or None if the user's home cannot be resolved.
///
/// `SHELF_HOME` overrides the default of `~/.shelf`.
pub fn try_shelf_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("SHELF_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".shelf"))
}

/// Default keyring directory: ~/.shelf/keys
pub fn default_keyring_dir() -> Option<PathBuf> {
    try_shelf_home().map(|h| h.join("keys"))
}

/// Prefix of the metadata directory under the storage root.
pub const METADATA_DIR_PREFIX: &str = "_repo_";
