use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::errors::ModuleError;
use crate::domain::value_objects::{ArchiveVersion, CompressionMethod, DigestAlgorithm, HexCase};
use crate::infrastructure::merkle::MerkleConfig;
use crate::infrastructure::xml::ExportSettings;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Strings longer than this many characters become CLOB files
    pub string_threshold: usize,
    /// Binaries longer than this many bytes become BLOB files
    pub binary_threshold: u64,
    pub digest_algorithm: DigestAlgorithm,
    pub compression: CompressionMethod,
    pub pretty_xml: bool,
    /// Concurrent compression jobs of the parallel zip writer
    pub parallel_batch_size: usize,
    pub archive_version: ArchiveVersion,
    pub merkle: MerkleSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MerkleSection {
    pub algorithm: DigestAlgorithm,
    pub hex_case: HexCase,
    pub explain: bool,
    /// `schema.table` to merkle column names
    pub columns: HashMap<String, Vec<String>>,
}

impl Default for MerkleSection {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            hex_case: HexCase::Lowercase,
            explain: false,
            columns: HashMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            string_threshold: 4000,
            binary_threshold: 2000,
            digest_algorithm: DigestAlgorithm::Md5,
            compression: CompressionMethod::Deflate,
            pretty_xml: true,
            parallel_batch_size: 10,
            archive_version: ArchiveVersion::V2_2,
            merkle: MerkleSection::default(),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            string_threshold: env_or("SIARD_THRESHOLD_TREAT_STRING_AS_CLOB", defaults.string_threshold),
            binary_threshold: env_or("SIARD_THRESHOLD_TREAT_BINARY_AS_BLOB", defaults.binary_threshold),
            digest_algorithm: env_or("SIARD_DIGEST_ALGORITHM", defaults.digest_algorithm),
            compression: env_or("SIARD_COMPRESSION", defaults.compression),
            pretty_xml: env_or("SIARD_PRETTY_XML", defaults.pretty_xml),
            parallel_batch_size: env_or("SIARD_PARALLEL_BATCH_SIZE", defaults.parallel_batch_size),
            archive_version: env_or("SIARD_ARCHIVE_VERSION", defaults.archive_version),
            merkle: MerkleSection {
                algorithm: env_or("SIARD_MERKLE_ALGORITHM", defaults.merkle.algorithm),
                hex_case: env_or("SIARD_MERKLE_HEX_CASE", defaults.merkle.hex_case),
                explain: env_or("SIARD_MERKLE_EXPLAIN", defaults.merkle.explain),
                columns: HashMap::new(),
            },
        }
    }

    /// Load a TOML file; keys it does not set keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModuleError::io(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| {
            ModuleError::message(format!("Invalid configuration in {}: {}", path.display(), e))
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.string_threshold == 0 {
            return Err("SIARD_THRESHOLD_TREAT_STRING_AS_CLOB must be greater than 0".to_string());
        }

        if self.binary_threshold == 0 {
            return Err("SIARD_THRESHOLD_TREAT_BINARY_AS_BLOB must be greater than 0".to_string());
        }

        if self.parallel_batch_size == 0 {
            return Err("SIARD_PARALLEL_BATCH_SIZE must be at least 1".to_string());
        }

        if self.merkle.algorithm == DigestAlgorithm::None {
            return Err("SIARD_MERKLE_ALGORITHM cannot be NONE".to_string());
        }

        Ok(())
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            string_threshold: self.string_threshold,
            binary_threshold: self.binary_threshold,
            digest_algorithm: self.digest_algorithm,
            pretty: self.pretty_xml,
        }
    }

    pub fn merkle_config(&self) -> MerkleConfig {
        MerkleConfig {
            algorithm: self.merkle.algorithm,
            hex_case: self.merkle.hex_case,
            explain: self.merkle.explain,
            columns: self.merkle.columns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.string_threshold, 4000);
        assert_eq!(config.binary_threshold, 2000);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Md5);
        assert_eq!(config.merkle.algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_toml_overrides_and_merkle_columns() {
        let config = Config::from_toml_str(
            r#"
            string_threshold = 100
            compression = "store"
            archive_version = "2.1"

            [merkle]
            algorithm = "MD5"
            hex_case = "uppercase"
            explain = true

            [merkle.columns]
            "public.person" = ["id", "name"]
            "#,
        )
        .unwrap();

        assert_eq!(config.string_threshold, 100);
        assert_eq!(config.binary_threshold, 2000);
        assert_eq!(config.compression, CompressionMethod::Store);
        assert_eq!(config.archive_version, ArchiveVersion::V2_1);
        let merkle = config.merkle_config();
        assert_eq!(merkle.algorithm, DigestAlgorithm::Md5);
        assert_eq!(merkle.hex_case, HexCase::Uppercase);
        assert!(merkle.explain);
        assert_eq!(merkle.columns["public.person"], vec!["id", "name"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            parallel_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.merkle.algorithm = DigestAlgorithm::None;
        assert_eq!(
            config.validate().unwrap_err(),
            "SIARD_MERKLE_ALGORITHM cannot be NONE"
        );

        assert!(Config::from_toml_str("string_threshold = \"many\"").is_err());
    }
}
