//! The emissions matrix: every source's allocation, one row per source.

use std::collections::BTreeMap;
use std::sync::Arc;

use eeio_core::{CorrespondenceMatrix, Invariants, Mapping, SectorVector, Table, Taxonomy};
use eeio_reflect::{Comparison, Tolerance};
use ndarray::Array2;
use rayon::prelude::*;

use crate::allocate::AllocationInputs;
use crate::error::EmissionsError;
use crate::gas::{Gas, GhgGroup};
use crate::registry::Registry;
use crate::source::EmissionsSource;

/// Source × sector allocations.
#[derive(Debug, Clone)]
pub struct EmissionsMatrix {
    table: Table,
}

fn source_taxonomy() -> Result<Arc<Taxonomy>, EmissionsError> {
    let entries = EmissionsSource::ALL.iter().map(|s| (s.code(), s.description()));
    Ok(Taxonomy::with_labels("emissions_source", entries)?.shared())
}

impl EmissionsMatrix {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn row(&self, source: EmissionsSource) -> Option<SectorVector> {
        self.table.row(source.code())
    }

    pub fn total(&self, source: EmissionsSource) -> Option<f64> {
        self.row(source).map(|r| r.total())
    }

    /// Gas × sector totals.
    pub fn by_gas(&self) -> Result<Table, EmissionsError> {
        let gases = Taxonomy::new("gas", Gas::ALL.iter().map(|g| g.name()))?.shared();
        let mapping: Mapping = EmissionsSource::ALL
            .iter()
            .map(|s| (s.code().to_string(), vec![s.gas().name().to_string()]))
            .collect();
        let rows = CorrespondenceMatrix::build(
            &mapping,
            self.table.rows().clone(),
            gases,
            Invariants::default().surjective(),
        )?;
        let cols = CorrespondenceMatrix::identity(self.table.cols().clone());
        Ok(self.table.aggregate(&rows, &cols)?)
    }

    /// GHG-group × sector totals.
    pub fn by_ghg_group(&self) -> Result<Table, EmissionsError> {
        let by_gas = self.by_gas()?;
        let groups = Taxonomy::new("ghg_group", GhgGroup::ALL.iter().map(|g| g.name()))?.shared();
        let mapping: Mapping = Gas::ALL
            .iter()
            .map(|g| (g.name().to_string(), vec![g.group().name().to_string()]))
            .collect();
        let rows = CorrespondenceMatrix::build(
            &mapping,
            by_gas.rows().clone(),
            groups,
            Invariants::default().complete().surjective(),
        )?;
        let cols = CorrespondenceMatrix::identity(by_gas.cols().clone());
        Ok(by_gas.aggregate(&rows, &cols)?)
    }
}

/// Run every allocator and stack the results.
///
/// Allocators run in parallel. The first failure aborts the batch; a
/// partially built matrix is never returned.
pub fn build_emissions_matrix(
    registry: &Registry,
    inputs: &AllocationInputs,
) -> Result<EmissionsMatrix, EmissionsError> {
    registry.check()?;
    let rows: Vec<SectorVector> = EmissionsSource::ALL
        .par_iter()
        .map(|&source| registry.allocate(source, inputs))
        .collect::<Result<_, _>>()?;

    let sectors = inputs.sectors.clone();
    let mut values = Array2::zeros((rows.len(), sectors.len()));
    for (mut out, row) in values.rows_mut().into_iter().zip(&rows) {
        out.assign(row.values());
    }
    let table = Table::new(source_taxonomy()?, sectors, values)?;
    log::info!(
        "built emissions matrix: {} sources x {} sectors, total {:.3}",
        table.shape().0,
        table.shape().1,
        table.total()
    );
    Ok(EmissionsMatrix { table })
}

/// Compare allocated source totals against an independent reference
/// inventory, e.g. a later release of the national totals.
///
/// Relative drift above `tolerance` is a hard failure naming the source.
pub fn check_inventory(
    matrix: &EmissionsMatrix,
    reference: &BTreeMap<EmissionsSource, f64>,
    tolerance: f64,
) -> Result<Vec<Comparison>, EmissionsError> {
    let totals = reference
        .iter()
        .map(|(&source, &expected)| (source.code(), expected, matrix.total(source).unwrap_or(0.0)));
    reconcile(totals, tolerance)
}

/// Compare allocated gas totals against national totals by gas.
pub fn check_gas_totals(
    matrix: &EmissionsMatrix,
    reference: &BTreeMap<Gas, f64>,
    tolerance: f64,
) -> Result<Vec<Comparison>, EmissionsError> {
    let by_gas = matrix.by_gas()?.row_sums();
    let totals = reference
        .iter()
        .map(|(gas, &expected)| (gas.name(), expected, by_gas.get(gas.name()).unwrap_or(0.0)));
    reconcile(totals, tolerance)
}

fn reconcile<'a>(
    totals: impl Iterator<Item = (&'a str, f64, f64)>,
    tolerance: f64,
) -> Result<Vec<Comparison>, EmissionsError> {
    let mut out = Vec::new();
    for (what, expected, actual) in totals {
        let cmp = Comparison::scalar(what, Tolerance::relative(tolerance), expected, actual);
        if !cmp.passed {
            return Err(EmissionsError::InventoryMismatch {
                what: what.to_string(),
                expected,
                actual,
                tolerance,
            });
        }
        out.push(cmp);
    }
    Ok(out)
}
