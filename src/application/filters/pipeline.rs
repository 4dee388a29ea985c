use crate::application::ports::DatabaseHandler;
use crate::domain::errors::ModuleError;

type StageFactory =
    Box<dyn FnOnce(Box<dyn DatabaseHandler>) -> Result<Box<dyn DatabaseHandler>, ModuleError>>;

/// Builds a filter chain in front of a consumer.
///
/// Stages are listed producer side first. Each stage receives ownership of
/// the stage after it when the chain is built.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<StageFactory>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(Box<dyn DatabaseHandler>) -> Result<Box<dyn DatabaseHandler>, ModuleError>
            + 'static,
    {
        self.stages.push(Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wire every stage to its successor, ending in `sink`
    pub fn build(self, sink: Box<dyn DatabaseHandler>) -> Result<Box<dyn DatabaseHandler>, ModuleError> {
        self.stages
            .into_iter()
            .rev()
            .try_fold(sink, |next, factory| factory(next))
    }
}
