//! `eeio-emissions` - the emissions allocation registry.
//!
//! A closed catalogue of emissions sources, one allocation rule per source,
//! and the parallel batch that turns national inventory totals into a
//! source × sector emissions matrix.

pub mod allocate;
pub mod config;
pub mod error;
pub mod gas;
pub mod matrix;
pub mod registry;
pub mod source;

pub use allocate::{AllocationInputs, AllocationRule, WeightKey};
pub use config::{RegistryConfig, RegistryInputs, RegistryOutput};
pub use error::EmissionsError;
pub use gas::{Gas, GhgGroup};
pub use matrix::{build_emissions_matrix, check_gas_totals, check_inventory, EmissionsMatrix};
pub use registry::Registry;
pub use source::{EmissionsSource, EmissionsSourceCategory};
