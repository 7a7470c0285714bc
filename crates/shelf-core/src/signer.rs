//! Detached manifest signatures.
//!
//! Keys are Ed25519 secrets stored base64-encoded in `<keyring>/<key_id>.key`.
//! Signatures are armored so they survive text-only transports:
//!
//! ```text
//! -----BEGIN SHELF SIGNATURE-----
//! Key-Id: release
//!
//! <base64 signature>
//! -----END SHELF SIGNATURE-----
//! ```
//!
//! The companion files keep the `.gpg` suffix for layout compatibility, but
//! they are not OpenPGP packets: `gpg --verify` cannot read them. Clients
//! check them with [`verify_detached`] and the base64 public key printed by
//! `shelf-pkg keygen`.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use thiserror::Error;

use crate::config::RepoConfig;
use crate::registry::{BucketKey, Registry};

/// First line of an armored signature.
pub const ARMOR_BEGIN: &str = "-----BEGIN SHELF SIGNATURE-----";
/// Last line of an armored signature.
pub const ARMOR_END: &str = "-----END SHELF SIGNATURE-----";
/// Extension of key files in a keyring directory.
pub const KEY_FILE_EXTENSION: &str = "key";

const ARMOR_LINE_WIDTH: usize = 64;
const KEY_ID_HEADER: &str = "Key-Id";

/// Errors raised while resolving keys, signing, or verifying.
#[derive(Error, Debug)]
pub enum SignError {
    /// No key file exists for the configured key id.
    #[error("Signing key '{key_id}' not found in {}", dir.display())]
    KeyNotFound {
        /// The requested key id.
        key_id: String,
        /// The keyring directory searched.
        dir: PathBuf,
    },

    /// A key with this id already exists and would be overwritten.
    #[error("Signing key '{0}' already exists")]
    KeyExists(String),

    /// The key id cannot name a key file.
    #[error("Invalid key id '{0}'")]
    InvalidKeyId(String),

    /// The key file exists but does not hold a 32-byte Ed25519 secret.
    #[error("Invalid key '{key_id}': {reason}")]
    InvalidKey {
        /// The key id (or `public key` for verification keys).
        key_id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Signing is configured but no keyring directory can be determined.
    #[error("No keyring directory configured and no home directory found")]
    NoKeyring,

    /// Reading or writing a key, manifest, or signature failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The armored text could not be decoded.
    #[error("Malformed signature: {0}")]
    Malformed(String),

    /// The signature does not match the data and key.
    #[error("Signature verification failed")]
    BadSignature,
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> SignError + '_ {
    move |source| SignError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A directory of signing keys addressed by key id.
#[derive(Debug, Clone)]
pub struct Keyring {
    dir: PathBuf,
}

impl Keyring {
    /// Create a keyring rooted at `dir`. The directory need not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the key file for `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKeyId`] if the id is empty, starts with a
    /// dot, or contains a path separator.
    pub fn key_path(&self, key_id: &str) -> Result<PathBuf, SignError> {
        if key_id.is_empty() || key_id.starts_with('.') || key_id.contains(['/', '\\']) {
            return Err(SignError::InvalidKeyId(key_id.to_string()));
        }
        Ok(self.dir.join(format!("{key_id}.{KEY_FILE_EXTENSION}")))
    }

    /// Load the signing key for `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::KeyNotFound`] if no key file exists,
    /// [`SignError::InvalidKey`] if it does not decode to a 32-byte secret, or
    /// [`SignError::Io`] for other read failures.
    pub fn resolve(&self, key_id: &str) -> Result<SigningKey, SignError> {
        let path = self.key_path(key_id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SignError::KeyNotFound {
                    key_id: key_id.to_string(),
                    dir: self.dir.clone(),
                });
            }
            Err(e) => return Err(io_at(&path)(e)),
        };

        let bytes = decode_key_bytes(key_id, &content)?;
        Ok(SigningKey::from_bytes(&bytes))
    }

    /// Store `key` under `key_id`, creating the keyring directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::KeyExists`] rather than overwrite an existing key,
    /// or [`SignError::Io`] if the file cannot be written.
    pub fn store(&self, key_id: &str, key: &SigningKey) -> Result<PathBuf, SignError> {
        let path = self.key_path(key_id)?;
        if path.exists() {
            return Err(SignError::KeyExists(key_id.to_string()));
        }
        fs::create_dir_all(&self.dir).map_err(io_at(&self.dir))?;
        fs::write(&path, STANDARD.encode(key.to_bytes())).map_err(io_at(&path))?;
        Ok(path)
    }
}

fn decode_key_bytes(key_id: &str, text: &str) -> Result<[u8; 32], SignError> {
    let invalid = |reason: String| SignError::InvalidKey {
        key_id: key_id.to_string(),
        reason,
    };
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| invalid(format!("not base64: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))
}

/// Base64 text of a verification key, for distribution to clients.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.to_bytes())
}

/// Parse a base64 verification key.
///
/// # Errors
///
/// Returns [`SignError::InvalidKey`] if the text is not a valid Ed25519 public key.
pub fn decode_public_key(text: &str) -> Result<VerifyingKey, SignError> {
    let bytes = decode_key_bytes("public key", text)?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| SignError::InvalidKey {
        key_id: "public key".to_string(),
        reason: e.to_string(),
    })
}

/// Produce an armored detached signature over `data`.
pub fn sign_detached(key: &SigningKey, key_id: &str, data: &[u8]) -> String {
    let signature = key.sign(data);
    let encoded = STANDARD.encode(signature.to_bytes());

    let mut out = format!("{ARMOR_BEGIN}\n{KEY_ID_HEADER}: {key_id}\n\n");
    // Base64 is ASCII, so byte chunks are valid UTF-8.
    for line in encoded.as_bytes().chunks(ARMOR_LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push_str(ARMOR_END);
    out.push('\n');
    out
}

/// Check an armored detached signature against `data`.
///
/// # Errors
///
/// Returns [`SignError::Malformed`] if the armor cannot be decoded, or
/// [`SignError::BadSignature`] if it does not verify.
pub fn verify_detached(key: &VerifyingKey, data: &[u8], armored: &str) -> Result<(), SignError> {
    let signature = parse_armor(armored)?;
    key.verify(data, &signature)
        .map_err(|_| SignError::BadSignature)
}

fn parse_armor(armored: &str) -> Result<Signature, SignError> {
    let mut lines = armored.lines().map(str::trim).skip_while(|l| l.is_empty());

    if lines.next() != Some(ARMOR_BEGIN) {
        return Err(SignError::Malformed("missing begin marker".to_string()));
    }

    // Headers run until the first blank line.
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
    }

    let mut body = String::new();
    let mut terminated = false;
    for line in lines {
        if line == ARMOR_END {
            terminated = true;
            break;
        }
        body.push_str(line);
    }
    if !terminated {
        return Err(SignError::Malformed("missing end marker".to_string()));
    }

    let bytes = STANDARD
        .decode(&body)
        .map_err(|e| SignError::Malformed(format!("invalid base64: {e}")))?;
    let bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignError::Malformed(format!("expected 64 bytes, got {}", bytes.len())))?;
    Ok(Signature::from_bytes(&bytes))
}

/// Signs the manifests of populated buckets with one resolved key.
#[derive(Debug)]
pub struct ManifestSigner<'a> {
    config: &'a RepoConfig,
    key_id: &'a str,
    key: SigningKey,
}

impl<'a> ManifestSigner<'a> {
    /// Resolve the configured signing key.
    ///
    /// Returns `Ok(None)` when no key id is configured; signing is then
    /// skipped entirely.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::NoKeyring`] if no keyring directory can be
    /// determined, or any error from [`Keyring::resolve`]. A key that cannot be
    /// located aborts the whole signing phase.
    pub fn from_config(config: &'a RepoConfig) -> Result<Option<Self>, SignError> {
        let Some(key_id) = config.signing_key.as_deref() else {
            return Ok(None);
        };
        let dir = config.keyring_dir().ok_or(SignError::NoKeyring)?;
        let key = Keyring::new(dir).resolve(key_id)?;
        Ok(Some(Self {
            config,
            key_id,
            key,
        }))
    }

    /// Sign the manifest of every bucket that holds at least one entry.
    ///
    /// Buckets with no entries are left unsigned. A populated bucket outside
    /// the configured cross-product had no manifest written and is skipped
    /// with a warning. Returns the signature paths written.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Io`] if a manifest cannot be read or a signature
    /// cannot be written. Signatures already written stay on disk.
    pub fn sign_populated(&self, registry: &Registry) -> Result<Vec<PathBuf>, SignError> {
        let declared: BTreeSet<BucketKey> = self.config.combinations().collect();
        let mut written = Vec::new();

        for bucket in registry.populated_buckets() {
            if !declared.contains(bucket) {
                tracing::warn!(
                    "Skipping signature for undeclared distro {}, distro version {}, arch {}",
                    bucket.distro,
                    bucket.distro_version,
                    bucket.arch
                );
                continue;
            }

            tracing::info!(
                "Signing distro {}, distro version {}, arch {}",
                bucket.distro,
                bucket.distro_version,
                bucket.arch
            );
            written.push(self.sign_manifest(bucket)?);
        }

        Ok(written)
    }

    /// Sign the current on-disk manifest of one bucket.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Io`] if the manifest cannot be read or the
    /// signature cannot be written.
    pub fn sign_manifest(&self, bucket: &BucketKey) -> Result<PathBuf, SignError> {
        let manifest_path = self.config.manifest_path(bucket);
        let data = fs::read(&manifest_path).map_err(io_at(&manifest_path))?;

        let armored = sign_detached(&self.key, self.key_id, &data);
        let signature_path = self.config.signature_path(bucket);
        fs::write(&signature_path, armored).map_err(io_at(&signature_path))?;
        Ok(signature_path)
    }
}
