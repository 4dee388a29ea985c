use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use siard_archive::{
    application::{
        filters::{DiscardSink, IdentityFilter, Pipeline},
        ports::{DatabaseHandler, ReadStrategy, WriteStrategy},
        use_cases::{ArchiveExportModule, ArchiveImportModule},
    },
    entities::{ArchiveContainer, DatabaseStructure, Row},
    infrastructure::{
        merkle::{MerkleConfig, MerkleOutput, MerkleTreeFilter},
        paths::RegisteredContentPathStrategy,
        storage::{
            BatchConfig, FolderReadStrategy, FolderWriteStrategy, ParallelZipWriteStrategy,
            SegmentedReadStrategy, ZipAndFolderReadStrategy, ZipReadStrategy,
            ZipWithExternalLobsWriteStrategy, ZipWriteStrategy,
        },
        xml::{ExportSettings, XmlContentExportStrategy, XmlContentImportStrategy},
    },
    value_objects::{ArchiveVersion, CompressionMethod, DigestAlgorithm},
};
use tempfile::TempDir;

// Import shared test fixtures
mod test_fixtures;
use test_fixtures::{
    event_rows, expected, feed, person_row, person_rows, person_structure, two_schema_structure,
    CollectingHandler, Value,
};

const PERSON: &str = "public.person";
const EVENT: &str = "audit.event";

fn export_archive(
    write: Arc<dyn WriteStrategy>,
    container: ArchiveContainer,
    lob_container: Option<ArchiveContainer>,
    settings: ExportSettings,
    structure: &DatabaseStructure,
    tables: Vec<(&str, Vec<Row>)>,
) {
    let mut content =
        XmlContentExportStrategy::new(Arc::clone(&write), container.clone(), settings).unwrap();
    let mut export = match lob_container {
        Some(lobs) => {
            content = content.with_lob_container(lobs.clone());
            ArchiveExportModule::new(write, container, Box::new(content)).with_lob_container(lobs)
        }
        None => ArchiveExportModule::new(write, container, Box::new(content)),
    };
    feed(&mut export, structure, tables).unwrap();
}

fn import_module(
    read: Arc<dyn ReadStrategy>,
    container: ArchiveContainer,
    lob_container: Option<ArchiveContainer>,
    structure: &DatabaseStructure,
) -> ArchiveImportModule {
    let mut paths = RegisteredContentPathStrategy::new();
    paths.register_structure(structure);
    let mut content = XmlContentImportStrategy::new(Arc::clone(&read), paths);
    let structure = Arc::new(structure.clone());
    match lob_container {
        Some(lobs) => {
            content = content.with_lob_container(lobs.clone());
            ArchiveImportModule::new(read, container, structure, Box::new(content))
                .with_lob_container(lobs)
        }
        None => ArchiveImportModule::new(read, container, structure, Box::new(content)),
    }
}

fn import_archive(
    read: Arc<dyn ReadStrategy>,
    container: ArchiveContainer,
    lob_container: Option<ArchiveContainer>,
    structure: &DatabaseStructure,
) -> CollectingHandler {
    let mut handler = CollectingHandler::new();
    import_module(read, container, lob_container, structure)
        .migrate_to(&mut handler)
        .unwrap();
    handler
}

fn entries(read: &dyn ReadStrategy, container: &ArchiveContainer) -> Vec<String> {
    read.setup(container).unwrap();
    let paths = read
        .get_filepath_stream(container)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    read.finish(container).unwrap();
    paths
}

fn all_tables() -> Vec<(&'static str, Vec<Row>)> {
    vec![(PERSON, person_rows()), (EVENT, event_rows())]
}

fn assert_round_trip(handler: &CollectingHandler) {
    assert_eq!(handler.rows_of(PERSON), expected(&person_rows()));
    assert_eq!(handler.rows_of(EVENT), expected(&event_rows()));
}

#[test]
fn test_folder_round_trip() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("archive");
    let structure = two_schema_structure();
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        all_tables(),
    );

    assert!(root.join("header/siardversion/2.2").is_dir());
    assert!(root.join("content/schema1/table1/table1.xml").is_file());
    assert!(root.join("content/schema1/table1/table1.xsd").is_file());
    assert!(root.join("content/schema2/table1/table1.xml").is_file());
    assert!(root.join("content/schema1/table1/lob3/record2.txt").is_file());
    assert!(root.join("content/schema1/table1/lob4/record2.bin").is_file());

    let handler = import_archive(
        Arc::new(FolderReadStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        &structure,
    );
    assert_eq!(
        handler.events,
        vec![
            "init",
            "structure sample",
            "open schema public",
            "open table public.person",
            "close table public.person",
            "close schema public",
            "open schema audit",
            "open table audit.event",
            "close table audit.event",
            "close schema audit",
            "finish",
        ]
    );
    assert_round_trip(&handler);
}

#[test]
fn test_zip_round_trip() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("db.siard");
    let structure = two_schema_structure();
    export_archive(
        Arc::new(ZipWriteStrategy::new(CompressionMethod::Deflate)),
        ArchiveContainer::main(&archive).with_version(ArchiveVersion::V2_1),
        None,
        ExportSettings::default(),
        &structure,
        all_tables(),
    );
    assert!(archive.is_file());

    let read = ZipReadStrategy::new();
    let names = entries(&read, &ArchiveContainer::main(&archive));
    assert!(names.iter().any(|n| n == "header/siardversion/2.1/"));
    assert!(names.iter().any(|n| n == "content/schema1/table1/lob4/record2.bin"));

    let container = ArchiveContainer::main(&archive);
    let handler = import_archive(Arc::new(ZipReadStrategy::new()), container.clone(), None, &structure);
    assert_eq!(container.version(), Some(ArchiveVersion::V2_1));
    assert_round_trip(&handler);
}

#[test]
fn test_parallel_zip_round_trip() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("db.siard");
    let structure = person_structure();
    let settings = ExportSettings {
        binary_threshold: 16,
        string_threshold: 16,
        ..Default::default()
    };
    let rows: Vec<Row> = (1..=20)
        .map(|i| {
            person_row(
                i,
                Some("name"),
                Some(format!("note {} {}", i, "n".repeat(i as usize * 3))),
                Some(test_fixtures::patterned_bytes(i as usize * 10)),
            )
        })
        .collect();
    let expected_rows = expected(&rows);
    export_archive(
        Arc::new(ParallelZipWriteStrategy::new(
            CompressionMethod::Deflate,
            BatchConfig::new(4),
        )),
        ArchiveContainer::main(&archive),
        None,
        settings,
        &structure,
        vec![(PERSON, rows)],
    );

    let read = ZipReadStrategy::new();
    let names = entries(&read, &ArchiveContainer::main(&archive));
    let blobs = names
        .iter()
        .filter(|n| n.starts_with("content/schema1/table1/lob4/") && n.ends_with(".bin"))
        .count();
    assert_eq!(blobs, 19);

    let handler = import_archive(
        Arc::new(ZipReadStrategy::new()),
        ArchiveContainer::main(&archive),
        None,
        &structure,
    );
    assert_eq!(handler.rows_of(PERSON), expected_rows);
}

#[test]
fn test_external_lobs_round_trip() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("db.siard");
    let lobs = dir.path().join("lobs");
    let structure = person_structure();
    let write = Arc::new(ZipWithExternalLobsWriteStrategy::new(
        CompressionMethod::Deflate,
        DigestAlgorithm::Md5,
    ));
    export_archive(
        write.clone(),
        ArchiveContainer::main(&archive),
        Some(ArchiveContainer::auxiliary(&lobs)),
        ExportSettings::default(),
        &structure,
        vec![(PERSON, person_rows())],
    );

    let folder = FolderReadStrategy::new();
    let lob_files = entries(&folder, &ArchiveContainer::auxiliary(&lobs));
    assert_eq!(lob_files.len(), 2);
    assert!(lob_files.iter().any(|p| p.ends_with("record2.bin")));
    assert!(lob_files.iter().any(|p| p.ends_with("record2.txt")));
    assert!(!write.digests().is_empty());

    let zip = ZipReadStrategy::new();
    let names = entries(&zip, &ArchiveContainer::main(&archive));
    assert!(!names.iter().any(|n| n.ends_with(".bin")));

    let handler = import_archive(
        Arc::new(ZipAndFolderReadStrategy::new()),
        ArchiveContainer::main(&archive),
        Some(ArchiveContainer::auxiliary(&lobs)),
        &structure,
    );
    assert_eq!(handler.rows_of(PERSON), expected(&person_rows()));
}

#[test]
fn test_threshold_boundaries() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("archive");
    let structure = person_structure();
    let rows = vec![
        person_row(1, Some(&"v".repeat(4001)), Some("c".repeat(4000)), Some(vec![7; 2000])),
        person_row(2, None, Some("c".repeat(4001)), Some(vec![7; 2001])),
    ];
    let expected_rows = expected(&rows);
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        vec![(PERSON, rows)],
    );

    let table = root.join("content/schema1/table1");
    assert!(!table.join("lob2").exists(), "varchar values always stay inline");
    assert!(!table.join("lob3/record1.txt").exists());
    assert!(table.join("lob3/record2.txt").is_file());
    assert!(!table.join("lob4/record1.bin").exists());
    assert!(table.join("lob4/record2.bin").is_file());

    let xml = fs::read_to_string(table.join("table1.xml")).unwrap();
    assert!(xml.contains("file=\"content/schema1/table1/lob3/record2.txt\" length=\"4001\""));
    assert!(xml.contains("digestType=\"MD5\""));

    let handler = import_archive(
        Arc::new(FolderReadStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        &structure,
    );
    assert_eq!(handler.rows_of(PERSON), expected_rows);
}

fn merkle_top_hash(output: &Path, drive: impl FnOnce(&mut dyn DatabaseHandler)) -> String {
    let mut filter = MerkleTreeFilter::new(
        MerkleConfig::default(),
        MerkleOutput::File(output.to_path_buf()),
        Box::new(DiscardSink),
    )
    .unwrap();
    drive(&mut filter);
    filter.top_hash().unwrap().to_string()
}

#[test]
fn test_merkle_of_imported_archive_matches_source_rows() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("db.siard");
    let structure = person_structure();
    export_archive(
        Arc::new(ZipWriteStrategy::new(CompressionMethod::Deflate)),
        ArchiveContainer::main(&archive),
        None,
        ExportSettings::default(),
        &structure,
        vec![(PERSON, person_rows())],
    );

    let source = merkle_top_hash(&dir.path().join("source.json"), |handler| {
        feed(handler, &structure, vec![(PERSON, person_rows())]).unwrap();
    });
    let imported_json = dir.path().join("imported.json");
    let imported = merkle_top_hash(&imported_json, |handler| {
        import_module(
            Arc::new(ZipReadStrategy::new()),
            ArchiveContainer::main(&archive),
            None,
            &structure,
        )
        .migrate_to(handler)
        .unwrap();
    });

    assert_eq!(source, imported);
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(imported_json).unwrap()).unwrap();
    assert_eq!(json["merkle"]["topHash"], source.as_str());
}

#[test]
fn test_segmented_lob_is_reassembled() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("archive");
    let structure = person_structure();
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        vec![(PERSON, person_rows())],
    );

    let lob = root.join("content/schema1/table1/lob4/record2.bin");
    let bytes = fs::read(&lob).unwrap();
    let (head, tail) = bytes.split_at(1000);
    fs::write(lob.with_file_name("record2.bin_part001"), head).unwrap();
    fs::write(lob.with_file_name("record2.bin_part002"), tail).unwrap();
    fs::remove_file(&lob).unwrap();

    let handler = import_archive(
        Arc::new(SegmentedReadStrategy::new(FolderReadStrategy::new())),
        ArchiveContainer::main(&root),
        None,
        &structure,
    );
    let rows = handler.rows_of(PERSON);
    assert_eq!(rows[1][3], Value::Bytes(bytes));
    assert_eq!(rows, expected(&person_rows()));
}

#[test]
fn test_lob_split_across_underscore_segments() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("seg_1");
    let structure = person_structure();
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        vec![(PERSON, person_rows())],
    );

    let lob_path = "content/schema1/table1/lob4/record2.bin";
    let lob = root.join(lob_path);
    let bytes = fs::read(&lob).unwrap();
    let (head, tail) = bytes.split_at(1500);
    fs::write(lob.with_file_name("record2.bin_part001"), head).unwrap();
    fs::remove_file(&lob).unwrap();

    let next = dir.path().join("seg_2").join(lob_path);
    fs::create_dir_all(next.parent().unwrap()).unwrap();
    fs::write(next.with_file_name("record2.bin_part002"), tail).unwrap();

    let handler = import_archive(
        Arc::new(SegmentedReadStrategy::new(FolderReadStrategy::new())),
        ArchiveContainer::main(&root),
        None,
        &structure,
    );
    let rows = handler.rows_of(PERSON);
    assert_eq!(rows[1][3], Value::Bytes(bytes));
    assert_eq!(rows, expected(&person_rows()));
}

#[test]
fn test_ignored_schema_is_skipped_on_import() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("archive");
    let structure = two_schema_structure();
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        all_tables(),
    );

    let mut handler = CollectingHandler::new();
    import_module(
        Arc::new(FolderReadStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        &structure,
    )
    .with_ignored_schemas(HashSet::from(["audit".to_string()]))
    .migrate_to(&mut handler)
    .unwrap();

    assert!(handler.ignored.contains("audit"));
    assert!(!handler.events.iter().any(|e| e.contains("audit")));
    assert_eq!(handler.rows_of(PERSON).len(), 3);
}

#[test]
fn test_repack_folder_into_zip_through_pipeline() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("archive");
    let repacked = dir.path().join("repacked.siard");
    let structure = two_schema_structure();
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        all_tables(),
    );

    let write: Arc<dyn WriteStrategy> = Arc::new(ZipWriteStrategy::new(CompressionMethod::Store));
    let target = ArchiveContainer::main(&repacked);
    let content = XmlContentExportStrategy::new(
        Arc::clone(&write),
        target.clone(),
        ExportSettings::default(),
    )
    .unwrap();
    let export = ArchiveExportModule::new(write, target, Box::new(content));
    let mut head = Pipeline::new()
        .stage(|next| Ok(Box::new(IdentityFilter::new(next)) as Box<dyn DatabaseHandler>))
        .build(Box::new(export))
        .unwrap();
    import_module(
        Arc::new(FolderReadStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        &structure,
    )
    .migrate_to(head.as_mut())
    .unwrap();

    let handler = import_archive(
        Arc::new(ZipReadStrategy::new()),
        ArchiveContainer::main(&repacked),
        None,
        &structure,
    );
    assert_round_trip(&handler);
}

#[test]
fn test_missing_table_file_fails_import() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("archive");
    let structure = person_structure();
    export_archive(
        Arc::new(FolderWriteStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        ExportSettings::default(),
        &structure,
        vec![(PERSON, person_rows())],
    );
    fs::remove_file(root.join("content/schema1/table1/table1.xsd")).unwrap();

    let mut handler = CollectingHandler::new();
    let err = import_module(
        Arc::new(FolderReadStrategy::new()),
        ArchiveContainer::main(&root),
        None,
        &structure,
    )
    .migrate_to(&mut handler)
    .unwrap_err();
    assert!(err.to_string().contains("public.person"), "unexpected error: {}", err);
    assert!(handler.rows.is_empty());
}
