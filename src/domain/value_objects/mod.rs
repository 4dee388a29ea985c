mod archive_version;
mod compression_method;
mod container_role;
mod digest_algorithm;
mod hex_case;

pub use archive_version::{ArchiveVersion, VERSION_MARKER_DIR, XMLNS_SIARD};
pub use compression_method::CompressionMethod;
pub use container_role::ContainerRole;
pub use digest_algorithm::DigestAlgorithm;
pub use hex_case::HexCase;
