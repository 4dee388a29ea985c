use flate2::read::DeflateDecoder;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use zip::{CompressionMethod, ZipArchive};

use super::folder_read_strategy::FolderReadStrategy;
use crate::application::ports::{EntryReader, FilepathStream, ReadStrategy};
use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::{ModuleError, ResultExt};
use crate::domain::value_objects::{ArchiveVersion, ContainerRole};

type SharedZipArchive = Arc<Mutex<ZipArchive<BufReader<File>>>>;

/// Where the data of one entry sits in the archive file
struct EntryLocation {
    data_start: u64,
    compressed_size: u64,
    size: u64,
    compression: CompressionMethod,
}

/// Reads entries of zip archives.
///
/// The central directory is parsed once in `setup`. Each opened entry
/// decodes straight from its own file handle, so streams stay valid while
/// other entries are read.
#[derive(Default)]
pub struct ZipReadStrategy {
    archives: Mutex<HashMap<PathBuf, SharedZipArchive>>,
}

impl ZipReadStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn archive(&self, container: &ArchiveContainer) -> Result<SharedZipArchive, ModuleError> {
        self.archives
            .lock()
            .get(&container.key())
            .cloned()
            .ok_or_else(|| {
                ModuleError::message(format!("Method 'setup' was not called for {}", container))
            })
    }

    fn locate(&self, container: &ArchiveContainer, path: &str) -> Result<EntryLocation, ModuleError> {
        let archive = self.archive(container)?;
        let mut archive = archive.lock();
        let index = archive.index_for_name(path).ok_or_else(|| {
            ModuleError::message(format!("File \"{}\" is missing in container", path))
        })?;
        let entry = archive.by_index_raw(index).map_err(|e| {
            ModuleError::with_cause(
                format!("Error while accessing file \"{}\" in container", path),
                e,
            )
        })?;
        if entry.encrypted() {
            return Err(ModuleError::message(format!(
                "File \"{}\" is encrypted",
                path
            )));
        }

        Ok(EntryLocation {
            data_start: entry.data_start(),
            compressed_size: entry.compressed_size(),
            size: entry.size(),
            compression: entry.compression(),
        })
    }
}

impl ReadStrategy for ZipReadStrategy {
    fn create_input_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryReader, ModuleError> {
        let location = self.locate(container, path)?;
        let path_display = container.path().display().to_string();
        let mut file = File::open(container.path()).with_path(&path_display)?;
        file.seek(SeekFrom::Start(location.data_start))
            .with_path(&path_display)?;
        let raw = BufReader::new(file).take(location.compressed_size);
        debug!(
            "Streaming zip entry {} ({} of {} bytes stored)",
            path, location.compressed_size, location.size
        );

        match location.compression {
            CompressionMethod::Stored => Ok(Box::new(raw)),
            CompressionMethod::Deflated => {
                Ok(Box::new(DeflateDecoder::new(raw).take(location.size)))
            }
            other => Err(ModuleError::message(format!(
                "Unsupported compression {:?} for file \"{}\"",
                other, path
            ))),
        }
    }

    fn entry_size(&self, container: &ArchiveContainer, path: &str) -> Result<u64, ModuleError> {
        Ok(self.locate(container, path)?.size)
    }

    fn entry_exists(&self, container: &ArchiveContainer, path: &str) -> bool {
        self.archive(container)
            .map(|archive| archive.lock().index_for_name(path).is_some())
            .unwrap_or(false)
    }

    fn is_simultaneous_reading_supported(&self) -> bool {
        true
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        let mut archives = self.archives.lock();
        if archives.contains_key(&container.key()) {
            return Ok(());
        }

        let path_display = container.path().display().to_string();
        let file = File::open(container.path()).with_path(&path_display)?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            ModuleError::with_cause(format!("Could not open zip file \"{}\"", path_display), e)
        })?;

        if container.version().is_none() {
            if let Some(version) = archive.file_names().find_map(ArchiveVersion::from_marker_path) {
                container.set_version(version);
            }
        }
        info!(
            "Opened zip archive {} ({} entries, version {})",
            path_display,
            archive.len(),
            container.version_or_default()
        );

        archives.insert(container.key(), Arc::new(Mutex::new(archive)));
        Ok(())
    }

    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        if self.archives.lock().remove(&container.key()).is_some() {
            debug!("Closed zip archive {}", container.path().display());
        }
        Ok(())
    }

    fn get_filepath_stream(
        &self,
        container: &ArchiveContainer,
    ) -> Result<FilepathStream, ModuleError> {
        let archive = self.archive(container)?;
        let len = archive.lock().len();
        Ok(FilepathStream::new((0..len).filter_map(move |index| {
            archive
                .lock()
                .name_for_index(index)
                .map(|name| Ok(name.to_string()))
        })))
    }
}

/// Main container read from a zip, auxiliary containers from plain folders
#[derive(Default)]
pub struct ZipAndFolderReadStrategy {
    zip: ZipReadStrategy,
    folder: FolderReadStrategy,
    main_version: Mutex<Option<ArchiveVersion>>,
}

impl ZipAndFolderReadStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, container: &ArchiveContainer) -> &dyn ReadStrategy {
        match container.role() {
            ContainerRole::Main => &self.zip,
            ContainerRole::Auxiliary => &self.folder,
        }
    }
}

impl ReadStrategy for ZipAndFolderReadStrategy {
    fn create_input_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryReader, ModuleError> {
        self.route(container).create_input_stream(container, path)
    }

    fn entry_size(&self, container: &ArchiveContainer, path: &str) -> Result<u64, ModuleError> {
        self.route(container).entry_size(container, path)
    }

    fn entry_exists(&self, container: &ArchiveContainer, path: &str) -> bool {
        self.route(container).entry_exists(container, path)
    }

    fn is_simultaneous_reading_supported(&self) -> bool {
        true
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        match container.role() {
            ContainerRole::Main => {
                self.zip.setup(container)?;
                *self.main_version.lock() = container.version();
            }
            ContainerRole::Auxiliary => {
                self.folder.setup(container)?;
                if let Some(version) = *self.main_version.lock() {
                    container.set_version(version);
                }
            }
        }
        Ok(())
    }

    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.route(container).finish(container)
    }

    fn get_filepath_stream(
        &self,
        container: &ArchiveContainer,
    ) -> Result<FilepathStream, ModuleError> {
        self.route(container).get_filepath_stream(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(path: &std::path::Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_reads_entries_and_detects_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.siard");
        build_zip(
            &path,
            &[
                ("header/siardversion/2.1/", b""),
                ("content/schema1/table1/table1.xml", b"<table/>"),
            ],
        );

        let container = ArchiveContainer::main(&path);
        let strategy = ZipReadStrategy::new();
        strategy.setup(&container).unwrap();
        assert_eq!(container.version(), Some(ArchiveVersion::V2_1));

        let mut content = String::new();
        strategy
            .create_input_stream(&container, "content/schema1/table1/table1.xml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<table/>");
        assert_eq!(
            strategy
                .entry_size(&container, "content/schema1/table1/table1.xml")
                .unwrap(),
            8
        );

        let names: Vec<String> = strategy
            .get_filepath_stream(&container)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_missing_entry_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.siard");
        build_zip(&path, &[("x.txt", b"x")]);
        let container = ArchiveContainer::main(&path);
        let strategy = ZipReadStrategy::new();
        strategy.setup(&container).unwrap();

        let err = strategy
            .create_input_stream(&container, "missing.xml")
            .err()
            .unwrap();
        assert!(err.to_string().contains("missing.xml"));
        assert!(!strategy.entry_exists(&container, "missing.xml"));
        assert!(strategy.entry_exists(&container, "x.txt"));
    }

    #[test]
    fn test_streams_outlive_each_other() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.siard");
        build_zip(&path, &[("a", b"aaa"), ("b", b"bbb")]);
        let container = ArchiveContainer::main(&path);
        let strategy = ZipReadStrategy::new();
        strategy.setup(&container).unwrap();

        let mut a = strategy.create_input_stream(&container, "a").unwrap();
        let mut b = strategy.create_input_stream(&container, "b").unwrap();
        let mut out = String::new();
        b.read_to_string(&mut out).unwrap();
        a.read_to_string(&mut out).unwrap();
        assert_eq!(out, "bbbaaa");
    }

    #[test]
    fn test_deflated_entry_streams_from_archive_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.siard");
        let big: Vec<u8> = (0..3_000_000u32).map(|i| (i % 251) as u8).collect();
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file(
            "lob1/record1.bin",
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        )
        .unwrap();
        zip.write_all(&big).unwrap();
        zip.start_file(
            "lob1/record2.bin",
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        zip.write_all(b"stored").unwrap();
        zip.finish().unwrap();

        let container = ArchiveContainer::main(&path);
        let strategy = ZipReadStrategy::new();
        strategy.setup(&container).unwrap();
        let mut deflated = strategy
            .create_input_stream(&container, "lob1/record1.bin")
            .unwrap();
        let mut head = [0u8; 16];
        deflated.read_exact(&mut head).unwrap();
        assert_eq!(&head[..], &big[..16]);

        // The open stream keeps reading after the archive was released
        strategy.finish(&container).unwrap();
        let mut rest = Vec::new();
        deflated.read_to_end(&mut rest).unwrap();
        assert_eq!(rest.len(), big.len() - 16);
        assert_eq!(&rest[..], &big[16..]);

        strategy.setup(&container).unwrap();
        let mut stored = String::new();
        strategy
            .create_input_stream(&container, "lob1/record2.bin")
            .unwrap()
            .read_to_string(&mut stored)
            .unwrap();
        assert_eq!(stored, "stored");
        assert_eq!(
            strategy.entry_size(&container, "lob1/record1.bin").unwrap(),
            big.len() as u64
        );
    }

    #[test]
    fn test_filepath_stream_lists_names_in_archive_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.siard");
        build_zip(&path, &[("header/", b""), ("b.txt", b"b"), ("a.txt", b"a")]);
        let container = ArchiveContainer::main(&path);
        let strategy = ZipReadStrategy::new();
        strategy.setup(&container).unwrap();

        let mut names = strategy.get_filepath_stream(&container).unwrap();
        assert_eq!(names.next().unwrap().unwrap(), "header/");
        strategy.finish(&container).unwrap();
        let rest: Vec<String> = names.map(Result::unwrap).collect();
        assert_eq!(rest, vec!["b.txt".to_string(), "a.txt".to_string()]);
    }

    #[test]
    fn test_zip_and_folder_routes_by_role() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.siard");
        build_zip(&path, &[("header/siardversion/2.0/", b""), ("main.txt", b"zip")]);
        std::fs::create_dir_all(dir.path().join("lobs")).unwrap();
        std::fs::write(dir.path().join("lobs/lob.bin"), b"folder").unwrap();

        let main = ArchiveContainer::main(&path);
        let lobs = ArchiveContainer::auxiliary(dir.path().join("lobs"));
        let strategy = ZipAndFolderReadStrategy::new();
        strategy.setup(&main).unwrap();
        strategy.setup(&lobs).unwrap();
        assert_eq!(lobs.version(), Some(ArchiveVersion::V2_0));

        let mut out = String::new();
        strategy
            .create_input_stream(&main, "main.txt")
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        strategy
            .create_input_stream(&lobs, "lob.bin")
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "zipfolder");
    }
}
