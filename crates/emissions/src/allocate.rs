//! Allocation rules: how one source's national total is spread over sectors.
//!
//! Every rule reduces to a proportional disaggregation of a single inventory
//! total onto a set of sector codes, so a zero-weight key falls back to an
//! equal split exactly like any other disaggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use eeio_core::{CorrespondenceMatrix, Invariants, Mapping, SectorVector, Taxonomy};
use eeio_reflect::{disaggregate_vector, ReflectError, Tolerance};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::EmissionsError;
use crate::source::EmissionsSource;

/// The sector-indexed vector a rule splits by.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightKey {
    #[default]
    Equal,
    GrossOutput,
    /// Each sector's intermediate use of the named commodity.
    CommodityUse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AllocationRule {
    /// The whole total goes to the listed sectors, split among them by `key`.
    Sectors {
        sectors: Vec<String>,
        #[serde(default)]
        key: WeightKey,
    },
    /// The whole total goes to every sector in proportion to `key`.
    Proportional { key: WeightKey },
    /// Same sector shape as another source's allocation.
    ShapeOf { source: EmissionsSource },
}

impl AllocationRule {
    pub fn sectors<I, S>(codes: I, key: WeightKey) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sectors {
            sectors: codes.into_iter().map(Into::into).collect(),
            key,
        }
    }

    pub fn key(&self) -> Option<&WeightKey> {
        match self {
            Self::Sectors { key, .. } | Self::Proportional { key } => Some(key),
            Self::ShapeOf { .. } => None,
        }
    }
}

/// Resident tables the allocators read. Nothing here is mutated during a batch.
#[derive(Debug, Clone)]
pub struct AllocationInputs {
    pub sectors: Arc<Taxonomy>,
    /// National inventory total per source.
    pub inventory: BTreeMap<EmissionsSource, f64>,
    pub gross_output: Option<SectorVector>,
    /// Commodity code → use of that commodity by sector.
    pub commodity_use: BTreeMap<String, SectorVector>,
    pub tolerance: Tolerance,
}

impl AllocationInputs {
    pub fn new(sectors: Arc<Taxonomy>) -> Self {
        Self {
            sectors,
            inventory: BTreeMap::new(),
            gross_output: None,
            commodity_use: BTreeMap::new(),
            tolerance: Tolerance::default(),
        }
    }

    pub fn total(&self, source: EmissionsSource) -> Result<f64, EmissionsError> {
        self.inventory
            .get(&source)
            .copied()
            .ok_or_else(|| EmissionsError::MissingInput {
                source,
                input: "an inventory total".to_string(),
            })
    }

    pub(crate) fn key_vector(
        &self,
        source: EmissionsSource,
        key: &WeightKey,
    ) -> Result<SectorVector, EmissionsError> {
        let missing = |input: String| EmissionsError::MissingInput { source, input };
        let v = match key {
            WeightKey::Equal => {
                return Ok(SectorVector::new(
                    self.sectors.clone(),
                    Array1::ones(self.sectors.len()),
                )?)
            }
            WeightKey::GrossOutput => self
                .gross_output
                .as_ref()
                .ok_or_else(|| missing("gross output by sector".to_string()))?,
            WeightKey::CommodityUse(code) => self
                .commodity_use
                .get(code)
                .ok_or_else(|| missing(format!("use of commodity {code} by sector")))?,
        };
        self.sectors.ensure_same(v.index(), "allocation key")?;
        Ok(v.clone())
    }
}

/// Spread `total` over `targets` in proportion to `key`.
///
/// Unknown target sectors are a structural error. An empty target list
/// with a nonzero total is a coverage error rather than a silent zero.
pub(crate) fn spread_total(
    source: EmissionsSource,
    total: f64,
    targets: &[String],
    key: &SectorVector,
    inputs: &AllocationInputs,
) -> Result<SectorVector, EmissionsError> {
    let wrap = |error: ReflectError| EmissionsError::Allocation { source, error };

    let inventory = Taxonomy::new("inventory", [source.code()])
        .map_err(|e| wrap(e.into()))?
        .shared();
    let mut mapping = Mapping::new();
    mapping.insert(source.code().to_string(), targets.to_vec());
    let corresp = CorrespondenceMatrix::build(
        &mapping,
        inventory.clone(),
        inputs.sectors.clone(),
        Invariants::default(),
    )
    .map_err(|e| wrap(e.into()))?;

    let base = SectorVector::from_pairs(inventory, [(source.code(), total)]).map_err(|e| wrap(e.into()))?;
    disaggregate_vector(&corresp, &base, key, None, inputs.tolerance).map_err(wrap)
}
