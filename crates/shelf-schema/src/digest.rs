//! Content digest newtypes.
//!
//! Each registered file carries three digests from distinct algorithms so
//! that clients with only one of them available can still verify downloads.

use serde::{Deserialize, Deserializer, Serialize};

macro_rules! hex_digest {
    ($(#[$meta:meta])* $name:ident, $algo:literal, $bytes:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Length of the digest in hex characters.
            pub const HEX_LEN: usize = $bytes * 2;

            /// Create a validated digest from a hex string.
            ///
            /// Upper-case input is normalised to lower case.
            ///
            /// # Errors
            ///
            /// Returns [`DigestError`] if `s` is not exactly
            #[doc = concat!(stringify!($bytes), " bytes of ASCII hex.")]
            pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
                let s = s.into();
                if s.len() != Self::HEX_LEN {
                    return Err(DigestError::Length {
                        algorithm: $algo,
                        expected: Self::HEX_LEN,
                        actual: s.len(),
                    });
                }
                if !s.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(DigestError::NotHex {
                        algorithm: $algo,
                        value: s,
                    });
                }
                Ok(Self(s.to_ascii_lowercase()))
            }

            /// Hex-encode a finished raw digest.
            ///
            /// # Panics
            ///
            /// Panics if `bytes` has the wrong length for this algorithm.
            pub fn from_bytes(bytes: &[u8]) -> Self {
                assert_eq!(bytes.len(), $bytes, concat!("raw ", $algo, " digest has wrong length"));
                Self(hex::encode(bytes))
            }

            /// Return the inner hex string as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_digest!(
    /// A SHA-1 digest (40 hex characters).
    Sha1Hash,
    "SHA-1",
    20
);

hex_digest!(
    /// A SHA-256 digest (64 hex characters).
    Sha256Hash,
    "SHA-256",
    32
);

hex_digest!(
    /// An MD5 digest (32 hex characters).
    Md5Hash,
    "MD5",
    16
);

/// Errors raised when validating a hex digest.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The string has the wrong number of characters for the algorithm.
    #[error("Invalid {algorithm} digest: expected {expected} hex chars, got {actual}")]
    Length {
        /// Algorithm name, for messages.
        algorithm: &'static str,
        /// Required length in hex characters.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// The string contains characters outside `[0-9a-fA-F]`.
    #[error("Invalid {algorithm} digest: contains non-hex characters in '{value}'")]
    NotHex {
        /// Algorithm name, for messages.
        algorithm: &'static str,
        /// The rejected input.
        value: String,
    },
}

/// The three content digests recorded for every registered file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigests {
    /// SHA-1 of the file contents.
    pub sha1: Sha1Hash,
    /// SHA-256 of the file contents.
    pub sha256: Sha256Hash,
    /// MD5 of the file contents.
    pub md5: Md5Hash,
}
