//! `eeio-reflect` - structural reflection between sector taxonomies.
//!
//! Pure engine crate: receives resident tables and correspondences, returns
//! reclassified tables plus the checks they passed. No CLI or IO dependencies.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod disaggregate;
pub mod error;
pub mod expand;
pub mod reflect;
pub mod weights;

pub use cache::DerivationCache;
pub use config::{Expansion, ReflectConfig, SiblingGroup, Tolerance};
pub use diagnostics::{compare_tables, compare_vectors, Comparison, DiagnosticsReport};
pub use disaggregate::{disaggregate_vector, split_vector_using_agg_ratio};
pub use error::ReflectError;
pub use expand::{expand_columns, expand_square_matrix, expand_vector, ParentMap};
pub use reflect::{
    block_distribution, reflect_matrix, reflect_symmetric, reflect_vector, ReflectOptions,
    Reflection, RoundTripReport, WeightSource,
};
pub use weights::{derive_matrix_weights, derive_row_weights, derive_vector_weights, Projection};
