use serde::{Deserialize, Serialize};

/// Role an archive container plays in one archive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerRole {
    /// Zip or folder of record
    #[default]
    Main,
    /// Externally stored LOB tree
    Auxiliary,
}

impl std::fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerRole::Main => write!(f, "MAIN"),
            ContainerRole::Auxiliary => write!(f, "AUXILIARY"),
        }
    }
}

impl std::str::FromStr for ContainerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MAIN" => Ok(ContainerRole::Main),
            "AUXILIARY" => Ok(ContainerRole::Auxiliary),
            _ => Err(format!("Invalid container role: {}", s)),
        }
    }
}
