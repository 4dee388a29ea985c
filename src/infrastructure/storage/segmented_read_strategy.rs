use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::folder_write_strategy::resolve_entry;
use super::zip_read_strategy::{ZipAndFolderReadStrategy, ZipReadStrategy};
use crate::application::ports::{EntryReader, FilepathStream, ReadStrategy};
use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::{ModuleError, ResultExt};

/// Zip archive whose missing entries may exist as split files next to it
pub type ZipSegmentedReadStrategy = SegmentedReadStrategy<ZipReadStrategy>;

/// Zip main container plus external LOB folders, both possibly split
pub type ZipAndFolderSegmentedReadStrategy = SegmentedReadStrategy<ZipAndFolderReadStrategy>;

/// Read strategy that falls back to split files when an entry is missing.
///
/// A file `P` too large for its medium is stored as `P_part001`,
/// `P_part002`, ... Once a segment directory holds no further part, the
/// numbering continues in the sibling directory `seg{n+1}` (`seg002`,
/// `seg2` or `seg_2`), where `n` comes from the digits of the current
/// directory name.
/// All parts are read back as one chained stream.
#[derive(Default)]
pub struct SegmentedReadStrategy<R> {
    inner: R,
}

impl<R: ReadStrategy> SegmentedReadStrategy<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Directory split files are looked up in: the container itself when it
    /// is a folder, the directory holding it otherwise
    fn segment_root(container: &ArchiveContainer) -> PathBuf {
        let path = container.path();
        if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        }
    }

    fn parts(container: &ArchiveContainer, path: &str) -> Vec<PathBuf> {
        discover_parts(&Self::segment_root(container), path)
    }
}

/// Segment number taken from the digits of a directory name, 1 when it has none
pub(crate) fn segment_number(dir: &Path) -> u32 {
    let digits: String = dir
        .file_name()
        .map(|name| name.to_string_lossy().chars().filter(char::is_ascii_digit).collect())
        .unwrap_or_default();
    digits.parse().unwrap_or(1)
}

fn sibling_segment(dir: &Path, segment: u32) -> Option<PathBuf> {
    let parent = dir.parent()?;
    [
        format!("seg{:03}", segment),
        format!("seg{}", segment),
        format!("seg_{}", segment),
    ]
        .into_iter()
        .map(|name| parent.join(name))
        .find(|candidate| candidate.is_dir())
}

/// Every part of `path`, in segment-then-part order
pub(crate) fn discover_parts(root: &Path, path: &str) -> Vec<PathBuf> {
    let mut parts = Vec::new();
    let mut segment_dir = root.to_path_buf();
    let mut segment = segment_number(root);
    let mut part = 1u32;

    loop {
        let mut found = false;
        while let Ok(candidate) = resolve_entry(&segment_dir, &format!("{}_part{:03}", path, part)) {
            if !candidate.is_file() {
                break;
            }
            parts.push(candidate);
            part += 1;
            found = true;
        }
        if !found {
            break;
        }

        segment += 1;
        match sibling_segment(&segment_dir, segment) {
            Some(next) => segment_dir = next,
            None => break,
        }
    }

    parts
}

/// Concatenation of part files, each opened when the previous one is exhausted
pub(crate) struct PartsReader {
    pending: VecDeque<PathBuf>,
    current: Option<BufReader<File>>,
}

impl PartsReader {
    pub fn new(parts: Vec<PathBuf>) -> Self {
        Self {
            pending: parts.into(),
            current: None,
        }
    }
}

impl Read for PartsReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.current.is_none() {
                match self.pending.pop_front() {
                    Some(path) => self.current = Some(BufReader::new(File::open(path)?)),
                    None => return Ok(0),
                }
            }
            let n = match self.current.as_mut() {
                Some(reader) => reader.read(buf)?,
                None => return Ok(0),
            };
            if n > 0 {
                return Ok(n);
            }
            self.current = None;
        }
    }
}

impl<R: ReadStrategy> ReadStrategy for SegmentedReadStrategy<R> {
    fn create_input_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryReader, ModuleError> {
        if self.inner.entry_exists(container, path) {
            return self.inner.create_input_stream(container, path);
        }

        let parts = Self::parts(container, path);
        if parts.is_empty() {
            return Err(ModuleError::message(format!(
                "File \"{}\" is missing in container",
                path
            )));
        }
        debug!("Reading {} from {} parts", path, parts.len());
        Ok(Box::new(PartsReader::new(parts)))
    }

    fn entry_size(&self, container: &ArchiveContainer, path: &str) -> Result<u64, ModuleError> {
        if self.inner.entry_exists(container, path) {
            return self.inner.entry_size(container, path);
        }

        let parts = Self::parts(container, path);
        if parts.is_empty() {
            return Err(ModuleError::message(format!(
                "File \"{}\" is missing in container",
                path
            )));
        }
        parts.iter().try_fold(0u64, |total, part| {
            let metadata = fs::metadata(part).with_path(&part.display().to_string())?;
            Ok(total + metadata.len())
        })
    }

    fn entry_exists(&self, container: &ArchiveContainer, path: &str) -> bool {
        self.inner.entry_exists(container, path) || !Self::parts(container, path).is_empty()
    }

    fn is_simultaneous_reading_supported(&self) -> bool {
        self.inner.is_simultaneous_reading_supported()
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.inner.setup(container)
    }

    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.inner.finish(container)
    }

    fn get_filepath_stream(
        &self,
        container: &ArchiveContainer,
    ) -> Result<FilepathStream, ModuleError> {
        self.inner.get_filepath_stream(container)
    }
}
