//! `eeio-io` - CSV and JSON files for taxonomies, mappings and sector tables.
//!
//! Every reader validates codes against the taxonomy it is given; a file whose
//! codes differ is a schema error naming what is missing or unexpected.

pub mod csv;
pub mod error;
pub mod json;

pub use csv::{
    check_schema, read_file_as_utf8, read_mapping, read_table, read_table_as, read_taxonomy,
    read_vector, read_vector_as, write_mapping, write_table, write_table_as, write_taxonomy,
    write_vector,
};
pub use error::IoError;
pub use json::write_json;
