//! Command line front end for reading, hashing and repacking archives.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use siard_archive::{
    application::{
        filters::{DiscardSink, IdentityFilter, Pipeline},
        ports::{DatabaseHandler, ReadStrategy, WriteStrategy},
        use_cases::{ArchiveExportModule, ArchiveImportModule},
    },
    entities::{ArchiveContainer, DatabaseStructure},
    infrastructure::{
        merkle::{MerkleOutput, MerkleTreeFilter},
        paths::RegisteredContentPathStrategy,
        storage::{
            BatchConfig, FolderReadStrategy, FolderWriteStrategy, ParallelZipWriteStrategy,
            ZipAndFolderReadStrategy, ZipAndFolderSegmentedReadStrategy, ZipReadStrategy,
            ZipSegmentedReadStrategy, ZipWriteStrategy,
        },
        xml::{XmlContentExportStrategy, XmlContentImportStrategy},
    },
    value_objects::{DigestAlgorithm, HexCase},
    Config,
};

#[derive(Parser)]
#[command(name = "siard-archive")]
#[command(about = "Read, hash and repack database preservation archives", long_about = None)]
struct Cli {
    /// TOML configuration file (default: SIARD_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the Merkle tree of an archive's content
    Merkle {
        /// Archive zip file or folder
        #[arg(short, long)]
        archive: PathBuf,
        /// Database structure as JSON
        #[arg(short, long)]
        structure: PathBuf,
        /// JSON file receiving the tree
        #[arg(short, long)]
        output: PathBuf,
        /// Folder holding externally stored LOBs
        #[arg(long)]
        lobs: Option<PathBuf>,
        /// Write every intermediate hash
        #[arg(long)]
        explain: bool,
        #[arg(long)]
        algorithm: Option<DigestAlgorithm>,
        #[arg(long)]
        hex_case: Option<HexCase>,
    },
    /// Print every entry path of an archive
    List {
        #[arg(short, long)]
        archive: PathBuf,
    },
    /// Import an archive and export it again
    Repack {
        #[arg(short, long)]
        archive: PathBuf,
        #[arg(short, long)]
        structure: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Folder holding externally stored LOBs of the source archive
        #[arg(long)]
        lobs: Option<PathBuf>,
        /// Compress LOB entries concurrently
        #[arg(long, conflicts_with = "folder")]
        parallel: bool,
        /// Write a folder instead of a zip file
        #[arg(long)]
        folder: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env(),
    };
    config.validate().map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Merkle {
            archive,
            structure,
            output,
            lobs,
            explain,
            algorithm,
            hex_case,
        } => {
            let mut merkle = config.merkle_config();
            merkle.explain |= explain;
            if let Some(algorithm) = algorithm {
                merkle.algorithm = algorithm;
            }
            if let Some(hex_case) = hex_case {
                merkle.hex_case = hex_case;
            }

            let mut import = import_module(&archive, &structure, lobs.as_deref())?;
            let mut filter = MerkleTreeFilter::new(
                merkle,
                MerkleOutput::File(output.clone()),
                Box::new(DiscardSink),
            )?;
            import.migrate_to(&mut filter)?;

            let top_hash = filter.top_hash().unwrap_or_default();
            info!("Merkle tree written to {}", output.display());
            println!("{}", top_hash);
        }
        Commands::List { archive } => list_entries(&archive)?,
        Commands::Repack {
            archive,
            structure,
            output,
            lobs,
            parallel,
            folder,
        } => {
            let write: Arc<dyn WriteStrategy> = if folder {
                Arc::new(FolderWriteStrategy::new())
            } else if parallel {
                Arc::new(ParallelZipWriteStrategy::new(
                    config.compression,
                    BatchConfig::new(config.parallel_batch_size),
                ))
            } else {
                Arc::new(ZipWriteStrategy::new(config.compression))
            };
            let target = ArchiveContainer::main(&output).with_version(config.archive_version);
            let content = XmlContentExportStrategy::new(
                Arc::clone(&write),
                target.clone(),
                config.export_settings(),
            )?;
            let export = ArchiveExportModule::new(write, target, Box::new(content));

            let mut head = Pipeline::new()
                .stage(|next| Ok(Box::new(IdentityFilter::new(next)) as Box<dyn DatabaseHandler>))
                .build(Box::new(export))?;

            let mut import = import_module(&archive, &structure, lobs.as_deref())?;
            import.migrate_to(head.as_mut())?;
            println!("Archive written to {}", output.display());
        }
    }

    Ok(())
}

fn load_structure(path: &Path) -> Result<DatabaseStructure> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open structure file: {:?}", path))?;
    DatabaseStructure::from_json(std::io::BufReader::new(file))
        .with_context(|| format!("Invalid database structure in {:?}", path))
}

/// Folder archives are read as files, zip archives fall back to split parts
fn read_strategy(archive: &Path, external_lobs: bool) -> Arc<dyn ReadStrategy> {
    match (archive.is_dir(), external_lobs) {
        (true, _) => Arc::new(FolderReadStrategy::new()),
        (false, true) => Arc::new(ZipAndFolderSegmentedReadStrategy::new(
            ZipAndFolderReadStrategy::new(),
        )),
        (false, false) => Arc::new(ZipSegmentedReadStrategy::new(ZipReadStrategy::new())),
    }
}

fn import_module(
    archive: &Path,
    structure: &Path,
    lobs: Option<&Path>,
) -> Result<ArchiveImportModule> {
    let structure = load_structure(structure)?;
    let read = read_strategy(archive, lobs.is_some());

    let mut paths = RegisteredContentPathStrategy::new();
    paths.register_structure(&structure);
    let mut content = XmlContentImportStrategy::new(Arc::clone(&read), paths);
    let container = ArchiveContainer::main(archive);
    let import = match lobs {
        Some(lobs) => {
            let lob_container = ArchiveContainer::auxiliary(lobs);
            content = content.with_lob_container(lob_container.clone());
            ArchiveImportModule::new(read, container, Arc::new(structure), Box::new(content))
                .with_lob_container(lob_container)
        }
        None => ArchiveImportModule::new(read, container, Arc::new(structure), Box::new(content)),
    };
    Ok(import)
}

fn list_entries(archive: &Path) -> Result<()> {
    let read = read_strategy(archive, false);
    let container = ArchiveContainer::main(archive);
    read.setup(&container)?;
    for path in read.get_filepath_stream(&container)? {
        println!("{}", path?);
    }
    read.finish(&container)?;
    Ok(())
}
