//! `eeio-core` - sector taxonomies, labeled tables and correspondence matrices.
//!
//! Everything here is immutable once built and free of IO.

pub mod correspondence;
pub mod error;
pub mod mapping;
pub mod table;
pub mod taxonomy;

pub use correspondence::{CorrespondenceMatrix, Invariants};
pub use error::StructureError;
pub use mapping::{
    get_weightings, mapping_from, reverse, traverse, validate_mapping, validate_weighted_mapping,
    Mapping, MappingCheck, WeightedMapping,
};
pub use table::{Fingerprint, SectorVector, Table};
pub use taxonomy::{Axis, MatrixKind, Taxonomy, TaxonomyId, Vintage};
