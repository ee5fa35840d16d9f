use std::fmt;

/// Malformed taxonomy, mapping, correspondence, or table shape.
///
/// Always fatal. Every variant names the codes that failed so the offending
/// taxonomy entry can be located without re-running the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureError {
    /// A taxonomy lists the same code twice.
    DuplicateCode { taxonomy: String, code: String },
    /// A taxonomy contains an empty code.
    EmptyCode { taxonomy: String },
    /// A mapping references codes that are not in the declared taxonomy.
    UnknownCode { taxonomy: String, codes: Vec<String> },
    /// Range codes hit by no domain code.
    Incomplete { range: String, codes: Vec<String> },
    /// Range codes hit by more than one domain code.
    NotInjective { range: String, codes: Vec<String> },
    /// Domain codes that map to no range code.
    NotSurjective { domain: String, codes: Vec<String> },
    /// A mapping key maps to an empty list where that is not allowed.
    EmptyMapping { codes: Vec<String> },
    /// Table values do not match the declared axes.
    ShapeMismatch {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Two axes that must be the same taxonomy (same codes, same order) are not.
    IndexMismatch {
        what: String,
        expected: String,
        actual: String,
    },
    /// A weighted mapping's keys differ from its domain taxonomy.
    DomainMismatch {
        domain: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },
    /// A weight set that should sum to 1 does not.
    WeightsNotNormalized { code: String, total: f64 },
    /// A taxonomy name outside the known set.
    UnknownTaxonomy { name: String },
    /// No published table exists at this granularity and year.
    UnknownVintage { granularity: String, year: u16 },
}

fn codes_list(codes: &[String]) -> String {
    const SHOWN: usize = 12;
    if codes.len() <= SHOWN {
        codes.join(", ")
    } else {
        format!("{}, ... ({} more)", codes[..SHOWN].join(", "), codes.len() - SHOWN)
    }
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCode { taxonomy, code } => {
                write!(f, "taxonomy '{taxonomy}': duplicate code '{code}'")
            }
            Self::EmptyCode { taxonomy } => write!(f, "taxonomy '{taxonomy}': empty code"),
            Self::UnknownCode { taxonomy, codes } => {
                write!(f, "codes not in taxonomy '{taxonomy}': {}", codes_list(codes))
            }
            Self::Incomplete { range, codes } => write!(
                f,
                "expected complete: {} code(s) of '{range}' have no incoming mapping: {}",
                codes.len(),
                codes_list(codes)
            ),
            Self::NotInjective { range, codes } => write!(
                f,
                "expected injective: {} code(s) of '{range}' receive more than one mapping: {}",
                codes.len(),
                codes_list(codes)
            ),
            Self::NotSurjective { domain, codes } => write!(
                f,
                "expected surjective: {} code(s) of '{domain}' map to nothing: {}",
                codes.len(),
                codes_list(codes)
            ),
            Self::EmptyMapping { codes } => {
                write!(f, "empty mapping for: {}", codes_list(codes))
            }
            Self::ShapeMismatch { what, expected, actual } => write!(
                f,
                "{what}: expected shape {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::IndexMismatch { what, expected, actual } => {
                write!(f, "{what}: expected taxonomy '{expected}', got '{actual}'")
            }
            Self::DomainMismatch { domain, missing, extra } => {
                write!(f, "weighted mapping keys differ from '{domain}'")?;
                if !missing.is_empty() {
                    write!(f, "; missing: {}", codes_list(missing))?;
                }
                if !extra.is_empty() {
                    write!(f, "; extra: {}", codes_list(extra))?;
                }
                Ok(())
            }
            Self::WeightsNotNormalized { code, total } => {
                write!(f, "weights for '{code}' sum to {total}, expected 1")
            }
            Self::UnknownTaxonomy { name } => write!(f, "unknown taxonomy: \"{name}\""),
            Self::UnknownVintage { granularity, year } => {
                write!(f, "no {granularity} table for {year}")
            }
        }
    }
}

impl std::error::Error for StructureError {}
