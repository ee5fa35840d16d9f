use std::fmt;

use eeio_core::StructureError;

#[derive(Debug, Clone, PartialEq)]
pub enum ReflectError {
    /// Malformed taxonomy, correspondence or table shape.
    Structure(StructureError),
    /// Base codes not covered by the correspondence and not declared droppable.
    Coverage { axis: &'static str, codes: Vec<String> },
    /// A checkpoint total drifted beyond tolerance.
    Tolerance {
        check: String,
        expected: f64,
        actual: f64,
        codes: Vec<String>,
    },
    /// NaN or infinite values where a complete table is required.
    MissingValues { what: String, cells: Vec<String> },
    /// Weights must be non-negative.
    NegativeWeights { what: String, cells: Vec<String> },
    /// Ratios for a split must lie in [0, 1].
    RatioOutOfRange { codes: Vec<String> },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error.
    ConfigValidation(String),
}

fn cells_list(cells: &[String]) -> String {
    if cells.len() <= 8 {
        cells.join(", ")
    } else {
        format!("{}, ... ({} more)", cells[..8].join(", "), cells.len() - 8)
    }
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure(e) => write!(f, "{e}"),
            Self::Coverage { axis, codes } => write!(
                f,
                "{} base {axis} code(s) not covered by the correspondence and not expected to be dropped: {}",
                codes.len(),
                cells_list(codes)
            ),
            Self::Tolerance { check, expected, actual, codes } => {
                write!(f, "{check}: expected {expected}, got {actual}")?;
                if !codes.is_empty() {
                    write!(f, " (codes: {})", cells_list(codes))?;
                }
                Ok(())
            }
            Self::MissingValues { what, cells } => {
                write!(f, "{what} has missing values at {}", cells_list(cells))
            }
            Self::NegativeWeights { what, cells } => {
                write!(f, "{what} has negative weights at {}", cells_list(cells))
            }
            Self::RatioOutOfRange { codes } => {
                write!(f, "ratios must be between 0 and 1: {}", cells_list(codes))
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReflectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Structure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StructureError> for ReflectError {
    fn from(e: StructureError) -> Self {
        Self::Structure(e)
    }
}
