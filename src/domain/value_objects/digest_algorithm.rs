use serde::{Deserialize, Serialize};

/// Message digest selector for LOB checksums and Merkle hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DigestAlgorithm {
    #[serde(rename = "NONE")]
    None,
    #[default]
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl DigestAlgorithm {
    /// Output length in bytes (0 for `NONE`)
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::None => 0,
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestAlgorithm::None => write!(f, "NONE"),
            DigestAlgorithm::Md5 => write!(f, "MD5"),
            DigestAlgorithm::Sha1 => write!(f, "SHA-1"),
            DigestAlgorithm::Sha256 => write!(f, "SHA-256"),
        }
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(DigestAlgorithm::None),
            "MD5" => Ok(DigestAlgorithm::Md5),
            "SHA-1" | "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA-256" | "SHA256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(format!("Unknown digest algorithm: {}", s)),
        }
    }
}
