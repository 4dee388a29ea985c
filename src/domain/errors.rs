use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

/// Error raised by every stage of the archive codec.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("{message}")]
    Module {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Parsing or validation error occurred while reading XML table file {path} ({errors} errors)")]
    Parse { path: String, errors: usize },
}

impl ModuleError {
    pub fn message(message: impl Into<String>) -> Self {
        ModuleError::Module {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ModuleError::Module {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ModuleError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for ModuleError {
    fn from(e: std::io::Error) -> Self {
        ModuleError::with_cause(format!("I/O error: {}", e), e)
    }
}

impl From<zip::result::ZipError> for ModuleError {
    fn from(e: zip::result::ZipError) -> Self {
        ModuleError::with_cause(format!("Zip error: {}", e), e)
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::with_cause(format!("JSON error: {}", e), e)
    }
}

/// Attaches context (offending path, table id, row index) to lower-level failures.
pub trait ResultExt<T> {
    fn with_path(self, path: &str) -> Result<T, ModuleError>;
    fn with_message<F: FnOnce() -> String>(self, message: F) -> Result<T, ModuleError>;
}

impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn with_path(self, path: &str) -> Result<T, ModuleError> {
        self.map_err(|e| ModuleError::io(path, e))
    }

    fn with_message<F: FnOnce() -> String>(self, message: F) -> Result<T, ModuleError> {
        self.map_err(|e| ModuleError::with_cause(message(), e))
    }
}

impl<T> ResultExt<T> for Result<T, zip::result::ZipError> {
    fn with_path(self, path: &str) -> Result<T, ModuleError> {
        self.map_err(|e| ModuleError::with_cause(format!("Zip error at {}: {}", path, e), e))
    }

    fn with_message<F: FnOnce() -> String>(self, message: F) -> Result<T, ModuleError> {
        self.map_err(|e| ModuleError::with_cause(message(), e))
    }
}

impl<T> ResultExt<T> for Result<T, ModuleError> {
    fn with_path(self, path: &str) -> Result<T, ModuleError> {
        self.map_err(|e| match e {
            ModuleError::Module { message, source } => ModuleError::Module {
                message: format!("{} ({})", message, path),
                source,
            },
            other => other,
        })
    }

    fn with_message<F: FnOnce() -> String>(self, message: F) -> Result<T, ModuleError> {
        self.map_err(|e| ModuleError::with_cause(message(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_io_error_names_path() {
        let err = ModuleError::io(
            "content/schema1/table1/table1.xml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("content/schema1/table1/table1.xml"));
    }

    #[test]
    fn test_with_cause_keeps_source() {
        let err = ModuleError::with_cause(
            "Could not write lob",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(err.to_string(), "Could not write lob");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_result_ext_with_message() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = result
            .with_message(|| "Error handling open table t1".to_string())
            .unwrap_err();
        assert!(matches!(err, ModuleError::Module { .. }));
        assert_eq!(err.to_string(), "Error handling open table t1");
    }

    #[test]
    fn test_result_ext_with_path_on_module_error() {
        let result: Result<(), ModuleError> = Err(ModuleError::message("No folder name"));
        let err = result.with_path("content/x").unwrap_err();
        assert_eq!(err.to_string(), "No folder name (content/x)");
    }
}
