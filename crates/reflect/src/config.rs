use std::collections::BTreeSet;

use eeio_core::taxonomy::{
    AGGREGATED_SECTOR_2012_TO_2017, EXPANDED_SECTORS_2012_TO_2017, WASTE_PARENT,
    WASTE_SUBSECTORS,
};
use eeio_core::{Invariants, MatrixKind, TaxonomyId, Vintage};
use serde::{Deserialize, Serialize};

use crate::error::ReflectError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reflection job, usually read from `*.reflect.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReflectConfig {
    pub name: String,
    /// Which published table the base is. When given, known taxonomy names
    /// on the domain side must agree with it.
    #[serde(default)]
    pub source: Option<SourceTable>,
    pub inputs: InputsConfig,
    #[serde(default)]
    pub tolerance: Tolerance,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default)]
    pub expected_row_dropped: BTreeSet<String>,
    #[serde(default)]
    pub expected_col_dropped: BTreeSet<String>,
    #[serde(default)]
    pub expansion: Option<Expansion>,
    #[serde(default)]
    pub sibling_groups: Vec<SiblingGroup>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_true() -> bool {
    true
}

/// Matrix kind and vintage of the base table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SourceTable {
    pub kind: MatrixKind,
    pub vintage: Vintage,
}

impl std::fmt::Display for SourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.vintage, self.kind)
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// File inputs, relative to the config file.
///
/// Taxonomy fields take either a CSV path or a known taxonomy name such as
/// `bea_2017_value_added`. See [`InputsConfig::taxonomy_ref`].
#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    /// Directory holding `<name>.csv` for known taxonomies without a
    /// built-in code list.
    #[serde(default)]
    pub taxonomy_dir: Option<String>,
    /// Base table CSV, in the row/column domain taxonomies.
    pub base: String,
    /// Weight table CSV, in the target taxonomies. Exclusive with `derive`.
    #[serde(default)]
    pub weights: Option<String>,
    /// Fallback weight table CSV, consulted when a primary group sums to zero.
    #[serde(default)]
    pub fallback: Option<String>,
    /// Derive weights from an old-vintage table instead of reading them.
    #[serde(default)]
    pub derive: Option<DeriveConfig>,
    pub rows: AxisInputs,
    /// Column correspondence. Absent: columns pass through unchanged.
    #[serde(default)]
    pub cols: Option<AxisInputs>,
    /// Duplicate the reflected table onto a finer taxonomy afterwards.
    #[serde(default)]
    pub expand: Option<ExpandInputs>,
}

/// One axis of a reflection: taxonomy CSVs plus the mapping between them.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisInputs {
    pub domain: String,
    pub range: String,
    pub mapping: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub injective: bool,
    #[serde(default)]
    pub surjective: bool,
}

impl AxisInputs {
    pub fn invariants(&self) -> Invariants {
        Invariants {
            complete: self.complete,
            injective: self.injective,
            surjective: self.surjective,
        }
    }
}

/// Old-vintage source for weight derivation. The new vintage is the base table.
#[derive(Debug, Clone, Deserialize)]
pub struct DeriveConfig {
    pub old: String,
    pub old_rows: OldAxis,
    /// Absent: only rows are expanded (final-demand pattern).
    #[serde(default)]
    pub old_cols: Option<OldAxis>,
}

/// Old-vintage taxonomy and its mapping onto the target taxonomy.
#[derive(Debug, Clone, Deserialize)]
pub struct OldAxis {
    pub domain: String,
    pub mapping: String,
}

/// Expansion by duplication. Every code of `taxonomy` copies the entry of
/// the reflected code that `mapping` sends onto it.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpandInputs {
    pub taxonomy: String,
    pub mapping: String,
}

/// Where a taxonomy named in a config comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TaxonomyRef {
    /// A known taxonomy whose code list ships with the crate.
    Builtin(TaxonomyId),
    /// A CSV file, relative to the config file.
    File(String),
}

impl TaxonomyRef {
    /// Resolve a taxonomy field. Known names use the built-in code list,
    /// then `<taxonomy_dir>/<name>.csv`. Anything else is a path.
    pub fn resolve(name: &str, taxonomy_dir: Option<&str>) -> Result<Self, ReflectError> {
        let Ok(id) = name.parse::<TaxonomyId>() else {
            return Ok(Self::File(name.to_string()));
        };
        if id.builtin().is_some() {
            return Ok(Self::Builtin(id));
        }
        match taxonomy_dir {
            Some(dir) => Ok(Self::File(format!("{}/{}.csv", dir.trim_end_matches('/'), id.name()))),
            None => Err(ReflectError::ConfigValidation(format!(
                "taxonomy '{id}' has no built-in code list; set inputs.taxonomy_dir or name a CSV file"
            ))),
        }
    }
}

impl InputsConfig {
    pub fn taxonomy_ref(&self, name: &str) -> Result<TaxonomyRef, ReflectError> {
        TaxonomyRef::resolve(name, self.taxonomy_dir.as_deref())
    }

    /// Every taxonomy field with its config key.
    fn taxonomy_fields(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("inputs.rows.domain", self.rows.domain.as_str()),
            ("inputs.rows.range", self.rows.range.as_str()),
        ];
        if let Some(cols) = &self.cols {
            out.push(("inputs.cols.domain", cols.domain.as_str()));
            out.push(("inputs.cols.range", cols.range.as_str()));
        }
        if let Some(derive) = &self.derive {
            out.push(("inputs.derive.old_rows.domain", derive.old_rows.domain.as_str()));
            if let Some(old) = &derive.old_cols {
                out.push(("inputs.derive.old_cols.domain", old.domain.as_str()));
            }
        }
        if let Some(exp) = &self.expand {
            out.push(("inputs.expand.taxonomy", exp.taxonomy.as_str()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Numeric closeness: `|actual - expected| <= absolute + relative * |expected|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    #[serde(default = "default_absolute")]
    pub absolute: f64,
    #[serde(default = "default_relative")]
    pub relative: f64,
    /// Allowed drift of a normalized weight group from 1.
    #[serde(default = "default_normalization")]
    pub normalization: f64,
}

fn default_absolute() -> f64 {
    1e-3
}

fn default_relative() -> f64 {
    1e-4
}

fn default_normalization() -> f64 {
    1e-8
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: default_absolute(),
            relative: default_relative(),
            normalization: default_normalization(),
        }
    }
}

impl Tolerance {
    /// Absolute-only tolerance, for dollar-magnitude block checks.
    pub fn absolute(atol: f64) -> Self {
        Self {
            absolute: atol,
            relative: 0.0,
            ..Self::default()
        }
    }

    /// Relative-only tolerance.
    pub fn relative(rtol: f64) -> Self {
        Self {
            absolute: 0.0,
            relative: rtol,
            ..Self::default()
        }
    }

    pub fn is_close(&self, expected: f64, actual: f64) -> bool {
        (actual - expected).abs() <= self.absolute + self.relative * expected.abs()
    }
}

// ---------------------------------------------------------------------------
// Expansion + sibling groups
// ---------------------------------------------------------------------------

/// Target codes that the new vintage aggregates into one code but the old
/// vintage still reports separately.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Expansion {
    pub aggregated: String,
    pub expanded: Vec<String>,
}

impl Default for Expansion {
    fn default() -> Self {
        Self {
            aggregated: AGGREGATED_SECTOR_2012_TO_2017.to_string(),
            expanded: EXPANDED_SECTORS_2012_TO_2017.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Codes duplicated from one parent with no distinguishing data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiblingGroup {
    pub parent: String,
    pub codes: Vec<String>,
}

impl SiblingGroup {
    pub fn waste() -> Self {
        Self {
            parent: WASTE_PARENT.to_string(),
            codes: WASTE_SUBSECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReflectConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReflectError> {
        let config: ReflectConfig =
            toml::from_str(input).map_err(|e| ReflectError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReflectError> {
        if self.name.trim().is_empty() {
            return Err(ReflectError::ConfigValidation("name must not be empty".into()));
        }

        let t = &self.tolerance;
        for (label, v) in [
            ("absolute", t.absolute),
            ("relative", t.relative),
            ("normalization", t.normalization),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReflectError::ConfigValidation(format!(
                    "tolerance.{label} must be a non-negative number, got {v}"
                )));
            }
        }

        match (&self.inputs.weights, &self.inputs.derive) {
            (Some(_), Some(_)) => {
                return Err(ReflectError::ConfigValidation(
                    "inputs.weights and inputs.derive are mutually exclusive".into(),
                ))
            }
            (None, None) => {
                return Err(ReflectError::ConfigValidation(
                    "one of inputs.weights or inputs.derive is required".into(),
                ))
            }
            _ => {}
        }

        if let Some(derive) = &self.inputs.derive {
            if derive.old_cols.is_some() != self.inputs.cols.is_some() {
                return Err(ReflectError::ConfigValidation(
                    "inputs.derive.old_cols and inputs.cols must be given together".into(),
                ));
            }
        }

        if let Some(exp) = &self.expansion {
            if exp.expanded.is_empty() {
                return Err(ReflectError::ConfigValidation(
                    "expansion.expanded must list at least one code".into(),
                ));
            }
            let unique: BTreeSet<&String> = exp.expanded.iter().collect();
            if unique.len() != exp.expanded.len() {
                return Err(ReflectError::ConfigValidation(
                    "expansion.expanded lists a code twice".into(),
                ));
            }
        }
        if self.inputs.derive.is_some() && self.expansion.is_none() {
            return Err(ReflectError::ConfigValidation(
                "inputs.derive requires an [expansion] section".into(),
            ));
        }

        for (key, name) in self.inputs.taxonomy_fields() {
            self.inputs.taxonomy_ref(name).map_err(|e| match e {
                ReflectError::ConfigValidation(msg) => {
                    ReflectError::ConfigValidation(format!("{key}: {msg}"))
                }
                other => other,
            })?;
        }
        if let Some(source) = &self.source {
            self.check_source(source)?;
        }

        let mut seen = BTreeSet::new();
        for group in &self.sibling_groups {
            if group.codes.len() < 2 {
                return Err(ReflectError::ConfigValidation(format!(
                    "sibling group '{}' needs at least two codes",
                    group.parent
                )));
            }
            for code in &group.codes {
                if !seen.insert(code.as_str()) {
                    return Err(ReflectError::ConfigValidation(format!(
                        "code '{code}' appears in more than one sibling group"
                    )));
                }
            }
        }
        if !self.sibling_groups.is_empty() && self.inputs.expand.is_none() {
            return Err(ReflectError::ConfigValidation(
                "sibling_groups require an inputs.expand section".into(),
            ));
        }

        Ok(())
    }

    /// The base table's axes must be the ones its matrix kind and vintage
    /// publish. Only known taxonomy names can be checked; paths pass.
    fn check_source(&self, source: &SourceTable) -> Result<(), ReflectError> {
        let vintage = source
            .vintage
            .checked()
            .map_err(|e| ReflectError::ConfigValidation(format!("source.vintage: {e}")))?;
        let (row_axis, col_axis) = source.kind.axes();
        if col_axis.is_none() && self.inputs.cols.is_some() {
            return Err(ReflectError::ConfigValidation(format!(
                "source: {} tables are vectors, drop inputs.cols",
                source.kind
            )));
        }

        let mut sides = vec![("inputs.rows.domain", row_axis, &self.inputs.rows.domain)];
        if let (Some(axis), Some(cols)) = (col_axis, &self.inputs.cols) {
            sides.push(("inputs.cols.domain", axis, &cols.domain));
        }
        for (key, axis, name) in sides {
            let Ok(id) = name.parse::<TaxonomyId>() else {
                continue;
            };
            if id.axis() != axis {
                return Err(ReflectError::ConfigValidation(format!(
                    "{key} is {id}, a {} taxonomy, but {source} tables index that axis by {axis}",
                    id.axis()
                )));
            }
            if let Some(expected) = vintage.taxonomy(axis) {
                if expected != id {
                    return Err(ReflectError::ConfigValidation(format!(
                        "{key} is {id}, but {source} tables use {expected}"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
