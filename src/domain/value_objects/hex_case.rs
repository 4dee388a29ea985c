use serde::{Deserialize, Serialize};

/// Letter case for printed digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HexCase {
    #[default]
    Lowercase,
    Uppercase,
}

impl HexCase {
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            HexCase::Lowercase => hex::encode(bytes),
            HexCase::Uppercase => hex::encode_upper(bytes),
        }
    }
}

impl std::fmt::Display for HexCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HexCase::Lowercase => write!(f, "lowercase"),
            HexCase::Uppercase => write!(f, "uppercase"),
        }
    }
}

impl std::str::FromStr for HexCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lowercase" | "lower" => Ok(HexCase::Lowercase),
            "uppercase" | "upper" => Ok(HexCase::Uppercase),
            _ => Err(format!("Invalid hex case: {}", s)),
        }
    }
}
