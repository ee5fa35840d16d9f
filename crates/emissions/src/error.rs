use std::fmt;

use eeio_core::StructureError;
use eeio_reflect::ReflectError;

use crate::source::EmissionsSource;

#[derive(Debug, Clone, PartialEq)]
pub enum EmissionsError {
    /// Registry keys differ from the source catalogue.
    Registry {
        missing: Vec<String>,
        orphaned: Vec<String>,
        duplicated: Vec<String>,
    },
    /// A rule that cannot be evaluated (e.g. a shape borrowed from a borrowed shape).
    InvalidRule { source: EmissionsSource, reason: String },
    /// An allocator failed; the whole batch is aborted.
    Allocation { source: EmissionsSource, error: ReflectError },
    /// An allocator produced NaN or infinite values.
    MissingValues { source: EmissionsSource, sectors: Vec<String> },
    /// An input the rule needs was not supplied.
    MissingInput { source: EmissionsSource, input: String },
    /// An allocated total (per source or per gas) disagrees with an
    /// independent reference inventory.
    InventoryMismatch {
        what: String,
        expected: f64,
        actual: f64,
        tolerance: f64,
    },
    Structure(StructureError),
    Reflect(ReflectError),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error.
    ConfigValidation(String),
}

fn list(codes: &[String]) -> String {
    if codes.len() <= 10 {
        codes.join(", ")
    } else {
        format!("{}, ... ({} more)", codes[..10].join(", "), codes.len() - 10)
    }
}

impl fmt::Display for EmissionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry { missing, orphaned, duplicated } => {
                write!(f, "allocation registry does not match the source catalogue")?;
                if !missing.is_empty() {
                    write!(f, "; unimplemented: {}", list(missing))?;
                }
                if !orphaned.is_empty() {
                    write!(f, "; orphaned: {}", list(orphaned))?;
                }
                if !duplicated.is_empty() {
                    write!(f, "; duplicated: {}", list(duplicated))?;
                }
                Ok(())
            }
            Self::InvalidRule { source, reason } => write!(f, "rule for '{source}': {reason}"),
            Self::Allocation { source, error } => write!(f, "allocating '{source}' failed: {error}"),
            Self::MissingValues { source, sectors } => {
                write!(f, "allocation of '{source}' has missing values at {}", list(sectors))
            }
            Self::MissingInput { source, input } => {
                write!(f, "allocating '{source}' requires {input}, which was not supplied")
            }
            Self::InventoryMismatch { what, expected, actual, tolerance } => write!(
                f,
                "'{what}' allocates {actual}, reference inventory reports {expected} (tolerance {:.1}%)",
                tolerance * 100.0
            ),
            Self::Structure(e) => write!(f, "{e}"),
            Self::Reflect(e) => write!(f, "{e}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for EmissionsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Allocation { error, .. } => Some(error),
            Self::Structure(e) => Some(e),
            Self::Reflect(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StructureError> for EmissionsError {
    fn from(e: StructureError) -> Self {
        Self::Structure(e)
    }
}

impl From<ReflectError> for EmissionsError {
    fn from(e: ReflectError) -> Self {
        Self::Reflect(e)
    }
}
