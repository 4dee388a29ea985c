use tracing::{error, warn};

use crate::domain::errors::ModuleError;

/// Collects diagnostics while one table file is parsed.
///
/// Warnings are only logged. Errors are logged and counted so parsing can
/// go on and report everything wrong with the file; `into_result` turns a
/// non-zero count into a failure once the file was drained, and otherwise
/// reports how many warnings the file produced.
#[derive(Debug)]
pub struct ParseErrorCollector {
    path: String,
    warnings: usize,
    errors: usize,
}

impl ParseErrorCollector {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            warnings: 0,
            errors: 0,
        }
    }

    pub fn warning(&mut self, position: u64, message: impl AsRef<str>) {
        self.warnings += 1;
        warn!(
            "Warning validating {} at byte {}: {}",
            self.path,
            position,
            message.as_ref()
        );
    }

    pub fn error(&mut self, position: u64, message: impl AsRef<str>) {
        self.errors += 1;
        error!(
            "Error validating {} at byte {}: {}",
            self.path,
            position,
            message.as_ref()
        );
    }

    /// Abort on an unrecoverable problem (malformed XML)
    pub fn fatal(&self, position: u64, cause: impl std::fmt::Display) -> ModuleError {
        error!("Fatal error parsing {} at byte {}: {}", self.path, position, cause);
        ModuleError::message(format!(
            "Fatal error while parsing {} at byte {}: {}",
            self.path, position, cause
        ))
    }

    /// Number of warnings on success, `Parse` failure when errors were recorded
    pub fn into_result(self) -> Result<usize, ModuleError> {
        if self.errors > 0 {
            return Err(ModuleError::Parse {
                path: self.path,
                errors: self.errors,
            });
        }
        Ok(self.warnings)
    }
}
