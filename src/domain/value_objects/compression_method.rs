use serde::{Deserialize, Serialize};

/// Entry compression used by the zip write strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    Store,
    #[default]
    Deflate,
}

impl CompressionMethod {
    pub fn to_zip(self) -> zip::CompressionMethod {
        match self {
            CompressionMethod::Store => zip::CompressionMethod::Stored,
            CompressionMethod::Deflate => zip::CompressionMethod::Deflated,
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::Store => write!(f, "store"),
            CompressionMethod::Deflate => write!(f, "deflate"),
        }
    }
}

impl std::str::FromStr for CompressionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "store" | "stored" => Ok(CompressionMethod::Store),
            "deflate" | "deflated" => Ok(CompressionMethod::Deflate),
            _ => Err(format!("Invalid compression method: {}", s)),
        }
    }
}
