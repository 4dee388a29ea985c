mod filter;
mod json_stream;

pub use filter::{MerkleConfig, MerkleOutput, MerkleTreeFilter};
pub use json_stream::JsonStreamWriter;
