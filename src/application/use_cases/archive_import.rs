use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::ports::{ContentImportStrategy, DatabaseHandler, ReadStrategy};
use crate::domain::entities::{ArchiveContainer, DatabaseStructure};
use crate::domain::errors::ModuleError;

/// Producer that replays an archive into a handler chain
pub struct ArchiveImportModule {
    read_strategy: Arc<dyn ReadStrategy>,
    container: ArchiveContainer,
    lob_container: Option<ArchiveContainer>,
    structure: Arc<DatabaseStructure>,
    content: Box<dyn ContentImportStrategy>,
    ignored_schemas: HashSet<String>,
}

impl ArchiveImportModule {
    pub fn new(
        read_strategy: Arc<dyn ReadStrategy>,
        container: ArchiveContainer,
        structure: Arc<DatabaseStructure>,
        content: Box<dyn ContentImportStrategy>,
    ) -> Self {
        Self {
            read_strategy,
            container,
            lob_container: None,
            structure,
            content,
            ignored_schemas: HashSet::new(),
        }
    }

    /// Auxiliary container holding externally stored LOBs
    pub fn with_lob_container(mut self, lob_container: ArchiveContainer) -> Self {
        self.lob_container = Some(lob_container);
        self
    }

    pub fn with_ignored_schemas(mut self, ignored_schemas: HashSet<String>) -> Self {
        self.ignored_schemas = ignored_schemas;
        self
    }

    /// Drive `handler` through the full call sequence.
    ///
    /// The containers are released even when the handler fails; a cleanup
    /// failure after an earlier error is only logged.
    pub fn migrate_to(&mut self, handler: &mut dyn DatabaseHandler) -> Result<(), ModuleError> {
        self.read_strategy.setup(&self.container)?;
        if let Some(lob_container) = &self.lob_container {
            self.read_strategy.setup(lob_container)?;
        }
        info!("Importing archive {}", self.container);

        let result = self.replay(handler);
        let cleanup = self.release();
        match (result, cleanup) {
            (Err(e), Err(cleanup)) => {
                debug!("Could not release archive after failure: {}", cleanup);
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => {
                info!("Finished importing archive {}", self.container);
                Ok(())
            }
        }
    }

    fn replay(&mut self, handler: &mut dyn DatabaseHandler) -> Result<(), ModuleError> {
        handler.init_database()?;
        handler.set_ignored_schemas(self.ignored_schemas.clone());
        handler.handle_structure(Arc::clone(&self.structure))?;
        self.content.import_content(
            handler,
            &self.container,
            &self.structure,
            &self.ignored_schemas,
        )?;
        handler.finish_database()
    }

    fn release(&self) -> Result<(), ModuleError> {
        if let Some(lob_container) = &self.lob_container {
            self.read_strategy.finish(lob_container)?;
        }
        self.read_strategy.finish(&self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::filters::DiscardSink;
    use crate::application::ports::{EntryReader, FilepathStream};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReader {
        setups: AtomicUsize,
        finishes: AtomicUsize,
    }

    impl ReadStrategy for CountingReader {
        fn create_input_stream(
            &self,
            _container: &ArchiveContainer,
            path: &str,
        ) -> Result<EntryReader, ModuleError> {
            Err(ModuleError::message(format!("no entry {}", path)))
        }

        fn is_simultaneous_reading_supported(&self) -> bool {
            true
        }

        fn setup(&self, _container: &ArchiveContainer) -> Result<(), ModuleError> {
            self.setups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn finish(&self, _container: &ArchiveContainer) -> Result<(), ModuleError> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn get_filepath_stream(
            &self,
            _container: &ArchiveContainer,
        ) -> Result<FilepathStream, ModuleError> {
            Ok(FilepathStream::from_paths(Vec::new()))
        }
    }

    struct FailingContent;

    impl ContentImportStrategy for FailingContent {
        fn import_content(
            &mut self,
            _handler: &mut dyn DatabaseHandler,
            _container: &ArchiveContainer,
            _structure: &DatabaseStructure,
            _ignored_schemas: &HashSet<String>,
        ) -> Result<(), ModuleError> {
            Err(ModuleError::message("broken table"))
        }
    }

    #[test]
    fn test_containers_released_after_failure() {
        let reader = Arc::new(CountingReader::default());
        let mut import = ArchiveImportModule::new(
            Arc::clone(&reader) as Arc<dyn ReadStrategy>,
            ArchiveContainer::main("/tmp/in.siard"),
            Arc::new(DatabaseStructure::new("db")),
            Box::new(FailingContent),
        )
        .with_lob_container(ArchiveContainer::auxiliary("/tmp/lobs"));

        let err = import.migrate_to(&mut DiscardSink).unwrap_err();
        assert_eq!(err.to_string(), "broken table");
        assert_eq!(reader.setups.load(Ordering::SeqCst), 2);
        assert_eq!(reader.finishes.load(Ordering::SeqCst), 2);
    }
}
