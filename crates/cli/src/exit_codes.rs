//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | input            | Config and input file codes              |
//! | 10-19   | reflect          | Reflection and weight derivation codes   |
//! | 20-29   | registry         | Emissions registry and allocation codes  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the matching `*_exit_code` function below

use eeio_core::StructureError;
use eeio_emissions::EmissionsError;
use eeio_io::IoError;
use eeio_reflect::ReflectError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// An input file could not be read, or an output file written.
pub const EXIT_INPUT_READ: u8 = 4;

/// Malformed CSV, or a cell that is not a number.
pub const EXIT_INPUT_PARSE: u8 = 5;

/// File codes differ from the declared taxonomy.
pub const EXIT_INPUT_SCHEMA: u8 = 6;

// =============================================================================
// Reflect (10-19)
// =============================================================================

/// Malformed taxonomy or correspondence (incomplete, not injective, ...).
pub const EXIT_STRUCTURE: u8 = 10;

/// Base codes not covered by the correspondence and not declared dropped.
pub const EXIT_COVERAGE: u8 = 11;

/// A checkpoint total drifted beyond tolerance.
pub const EXIT_TOLERANCE: u8 = 12;

/// Missing (NaN) values in a table that must be complete.
pub const EXIT_MISSING_VALUES: u8 = 13;

/// Negative weights, or split ratios outside [0, 1].
pub const EXIT_BAD_WEIGHTS: u8 = 14;

// =============================================================================
// Registry (20-29)
// =============================================================================

/// Registry keys differ from the source catalogue, or a rule is invalid.
pub const EXIT_REGISTRY_INCOMPLETE: u8 = 20;

/// An allocator failed; the emissions matrix was not built.
pub const EXIT_ALLOCATION: u8 = 21;

/// An allocated total disagrees with the national inventory.
pub const EXIT_INVENTORY_MISMATCH: u8 = 22;

/// An allocation rule needs an input the config does not supply.
pub const EXIT_MISSING_INPUT: u8 = 23;

// =============================================================================
// Error Types
// =============================================================================

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read { .. } => EXIT_INPUT_READ,
        IoError::Parse { .. } => EXIT_INPUT_PARSE,
        IoError::Schema { .. } => EXIT_INPUT_SCHEMA,
        IoError::Structure(e) => structure_exit_code(e),
    }
}

pub fn structure_exit_code(_err: &StructureError) -> u8 {
    EXIT_STRUCTURE
}

pub fn reflect_exit_code(err: &ReflectError) -> u8 {
    match err {
        ReflectError::Structure(e) => structure_exit_code(e),
        ReflectError::Coverage { .. } => EXIT_COVERAGE,
        ReflectError::Tolerance { .. } => EXIT_TOLERANCE,
        ReflectError::MissingValues { .. } => EXIT_MISSING_VALUES,
        ReflectError::NegativeWeights { .. } | ReflectError::RatioOutOfRange { .. } => {
            EXIT_BAD_WEIGHTS
        }
        ReflectError::ConfigParse(_) | ReflectError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
    }
}

pub fn emissions_exit_code(err: &EmissionsError) -> u8 {
    match err {
        EmissionsError::Registry { .. } | EmissionsError::InvalidRule { .. } => {
            EXIT_REGISTRY_INCOMPLETE
        }
        EmissionsError::Allocation { .. } | EmissionsError::MissingValues { .. } => EXIT_ALLOCATION,
        EmissionsError::MissingInput { .. } => EXIT_MISSING_INPUT,
        EmissionsError::InventoryMismatch { .. } => EXIT_INVENTORY_MISMATCH,
        EmissionsError::Structure(e) => structure_exit_code(e),
        EmissionsError::Reflect(e) => reflect_exit_code(e),
        EmissionsError::ConfigParse(_) | EmissionsError::ConfigValidation(_) => {
            EXIT_CONFIG_INVALID
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeio_emissions::EmissionsSource;

    #[test]
    fn allocation_failures_keep_their_own_code() {
        let err = EmissionsError::Allocation {
            source: EmissionsSource::Ch4Landfills,
            error: ReflectError::Coverage { axis: "row", codes: vec!["x".into()] },
        };
        assert_eq!(emissions_exit_code(&err), EXIT_ALLOCATION);
        assert_eq!(
            emissions_exit_code(&EmissionsError::Reflect(ReflectError::ConfigParse("x".into()))),
            EXIT_CONFIG_INVALID
        );
    }
}
