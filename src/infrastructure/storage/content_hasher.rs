use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::Read;

use crate::domain::errors::ModuleError;
use crate::domain::value_objects::DigestAlgorithm;

/// Buffer size for I/O operations. 256KB provides optimal throughput
/// for most modern storage systems while balancing memory usage.
pub const BUFFER_SIZE: usize = 256 * 1024;

/// Streaming hasher over the supported digest algorithms.
///
/// `NONE` accepts input and produces an empty digest, so callers that only
/// optionally checksum can keep one code path.
#[derive(Clone)]
pub enum MessageDigest {
    None,
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl MessageDigest {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::None => MessageDigest::None,
            DigestAlgorithm::Md5 => MessageDigest::Md5(Md5::new()),
            DigestAlgorithm::Sha1 => MessageDigest::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => MessageDigest::Sha256(Sha256::new()),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            MessageDigest::None => DigestAlgorithm::None,
            MessageDigest::Md5(_) => DigestAlgorithm::Md5,
            MessageDigest::Sha1(_) => DigestAlgorithm::Sha1,
            MessageDigest::Sha256(_) => DigestAlgorithm::Sha256,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            MessageDigest::None => {}
            MessageDigest::Md5(h) => h.update(data),
            MessageDigest::Sha1(h) => h.update(data),
            MessageDigest::Sha256(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            MessageDigest::None => Vec::new(),
            MessageDigest::Md5(h) => h.finalize().to_vec(),
            MessageDigest::Sha1(h) => h.finalize().to_vec(),
            MessageDigest::Sha256(h) => h.finalize().to_vec(),
        }
    }

    /// Finalize and start over with the same algorithm
    pub fn finalize_reset(&mut self) -> Vec<u8> {
        let fresh = MessageDigest::new(self.algorithm());
        std::mem::replace(self, fresh).finalize()
    }
}

/// Utility for computing digests of cell payloads and archive entries.
pub struct ContentHasher;

impl ContentHasher {
    /// Digest of an in-memory buffer
    pub fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
        let mut hasher = MessageDigest::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Stream a reader through the hasher in 256KB chunks.
    ///
    /// # Returns
    ///
    /// Tuple of (digest, size_bytes)
    pub fn digest_stream(
        algorithm: DigestAlgorithm,
        mut reader: impl Read,
    ) -> Result<(Vec<u8>, u64), ModuleError> {
        let mut hasher = MessageDigest::new(algorithm);
        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| ModuleError::with_cause("Could not read stream to digest", e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
            total_bytes += n as u64;
        }

        Ok((hasher.finalize(), total_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sha256_of_empty_input() {
        let digest = ContentHasher::digest(DigestAlgorithm::Sha256, b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_md5_known_value() {
        let digest = ContentHasher::digest(DigestAlgorithm::Md5, b"abc");
        assert_eq!(hex::encode(digest), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_sha1_known_value() {
        let digest = ContentHasher::digest(DigestAlgorithm::Sha1, b"abc");
        assert_eq!(hex::encode(digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_none_produces_empty_digest() {
        assert!(ContentHasher::digest(DigestAlgorithm::None, b"abc").is_empty());
    }

    #[test]
    fn test_digest_stream_matches_buffer_digest() {
        let data = vec![7u8; BUFFER_SIZE + 17];
        let (digest, size) =
            ContentHasher::digest_stream(DigestAlgorithm::Sha256, Cursor::new(&data)).unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(digest, ContentHasher::digest(DigestAlgorithm::Sha256, &data));
    }

    #[test]
    fn test_finalize_reset_restarts() {
        let mut hasher = MessageDigest::new(DigestAlgorithm::Md5);
        hasher.update(b"abc");
        let first = hasher.finalize_reset();
        hasher.update(b"abc");
        assert_eq!(first, hasher.finalize());
    }
}
