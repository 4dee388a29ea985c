use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use super::content_hasher::MessageDigest;
use crate::domain::value_objects::DigestAlgorithm;

/// Digests recorded per entry path, shared between writers and their owner
pub type DigestRegistry = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Writer that digests everything passing through it.
///
/// The digest is published to the registry under `path` when the writer is
/// dropped, so readers of the registry see a value only for completed entries.
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: Option<MessageDigest>,
    path: String,
    registry: DigestRegistry,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(
        inner: W,
        algorithm: DigestAlgorithm,
        path: impl Into<String>,
        registry: DigestRegistry,
    ) -> Self {
        Self {
            inner,
            hasher: Some(MessageDigest::new(algorithm)),
            path: path.into(),
            registry,
        }
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for DigestWriter<W> {
    fn drop(&mut self) {
        if let Some(hasher) = self.hasher.take() {
            self.registry
                .lock()
                .insert(std::mem::take(&mut self.path), hasher.finalize());
        }
    }
}
