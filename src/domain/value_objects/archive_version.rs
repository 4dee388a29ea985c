use serde::{Deserialize, Serialize};

/// Archive format version, used for table namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArchiveVersion {
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "2.1")]
    V2_1,
    #[default]
    #[serde(rename = "2.2")]
    V2_2,
}

pub const XMLNS_SIARD: &str = "http://www.admin.ch/xmlns/siard/";

/// Folder whose single child names the archive version
pub const VERSION_MARKER_DIR: &str = "header/siardversion/";

impl ArchiveVersion {
    /// Namespace segment, e.g. `2.2`
    pub fn namespace(&self) -> &'static str {
        match self {
            ArchiveVersion::V2_0 => "2.0",
            ArchiveVersion::V2_1 => "2.1",
            ArchiveVersion::V2_2 => "2.2",
        }
    }

    /// Empty folder entry that identifies the version inside an archive
    pub fn marker_path(&self) -> String {
        format!("{}{}/", VERSION_MARKER_DIR, self.namespace())
    }

    /// Version named by an entry below `header/siardversion/`
    pub fn from_marker_path(path: &str) -> Option<Self> {
        let rest = path.trim_start_matches('/').strip_prefix(VERSION_MARKER_DIR)?;
        rest.split('/').next()?.parse().ok()
    }

    /// Namespace base every table namespace is built on
    pub fn namespace_base(&self) -> String {
        format!("{}{}/", XMLNS_SIARD, self.namespace())
    }
}

impl std::fmt::Display for ArchiveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.namespace())
    }
}

impl std::str::FromStr for ArchiveVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2.0" | "2" => Ok(ArchiveVersion::V2_0),
            "2.1" => Ok(ArchiveVersion::V2_1),
            "2.2" => Ok(ArchiveVersion::V2_2),
            _ => Err(format!("Invalid archive version: {}", s)),
        }
    }
}
