use std::fmt;
use std::path::Path;

use eeio_core::StructureError;

#[derive(Debug, Clone, PartialEq)]
pub enum IoError {
    /// File could not be opened, read or written.
    Read { path: String, message: String },
    /// Malformed CSV or a cell that is not a number.
    Parse { path: String, line: u64, message: String },
    /// Codes in the file differ from the expected taxonomy.
    Schema { path: String, message: String },
    Structure(StructureError),
}

impl IoError {
    pub(crate) fn read(path: &Path, e: impl fmt::Display) -> Self {
        Self::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, line: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn schema(path: &Path, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "{path}: {message}"),
            Self::Parse { path, line, message } => write!(f, "{path}:{line}: {message}"),
            Self::Schema { path, message } => write!(f, "{path}: schema mismatch: {message}"),
            Self::Structure(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Structure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StructureError> for IoError {
    fn from(e: StructureError) -> Self {
        Self::Structure(e)
    }
}
