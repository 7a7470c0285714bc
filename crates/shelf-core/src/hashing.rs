//! File hashing collaborator.
//!
//! The repository asks a [`FileHasher`] for the size and digests of each
//! stored file. The default streams the file once through all three hashers.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use shelf_schema::{FileDigests, Md5Hash, Sha1Hash, Sha256Hash};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Size and digests of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    /// Content digests.
    pub digests: FileDigests,
    /// Size in bytes.
    pub size: u64,
}

/// Computes size and digests for a stored file.
///
/// Injected into [`Repository`](crate::Repository) so tests and alternative
/// backends can supply their own.
pub trait FileHasher: std::fmt::Debug {
    /// Hash the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    fn hash_file(&self, path: &Path) -> io::Result<HashedFile>;
}

/// Default [`FileHasher`]: one streaming pass computing SHA-1, SHA-256, and MD5.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingHasher;

impl StreamingHasher {
    /// Hash everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `reader`.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<HashedFile> {
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut md5 = Md5::new();
        let mut size: u64 = 0;

        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let chunk = &buf[..n];
            sha1.update(chunk);
            sha256.update(chunk);
            md5.update(chunk);
            size += n as u64;
        }

        Ok(HashedFile {
            digests: FileDigests {
                sha1: Sha1Hash::from_bytes(&sha1.finalize()),
                sha256: Sha256Hash::from_bytes(&sha256.finalize()),
                md5: Md5Hash::from_bytes(&md5.finalize()),
            },
            size,
        })
    }
}

impl FileHasher for StreamingHasher {
    fn hash_file(&self, path: &Path) -> io::Result<HashedFile> {
        let file = File::open(path)?;
        Self::hash_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        let hashed = StreamingHasher::hash_reader(&b"hello world"[..]).unwrap();
        assert_eq!(hashed.size, 11);
        assert_eq!(
            hashed.digests.sha1.as_str(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(
            hashed.digests.sha256.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            hashed.digests.md5.as_str(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn test_empty_input() {
        let hashed = StreamingHasher::hash_reader(io::empty()).unwrap();
        assert_eq!(hashed.size, 0);
        assert_eq!(
            hashed.digests.md5.as_str(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_spans_multiple_reads() {
        let data = vec![7u8; READ_BUFFER_SIZE * 2 + 13];
        let streamed = StreamingHasher::hash_reader(&data[..]).unwrap();
        assert_eq!(streamed.size, data.len() as u64);
        assert_eq!(
            streamed.digests.sha256,
            Sha256Hash::from_bytes(&Sha256::digest(&data))
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StreamingHasher.hash_file(&dir.path().join("absent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
