//! Weight tables for reflection, derived from two vintages of the same table.
//!
//! The new vintage, projected into the target taxonomy, is the starting
//! point. Target codes that the new vintage reports as one aggregated code
//! (see [`Expansion`]) are then re-split in the proportions the old vintage
//! still reports, scaled so each replaced block keeps the new vintage's
//! aggregate value. Rows, columns and the core block are replaced
//! independently and each replacement is checked against its aggregate.

use eeio_core::{CorrespondenceMatrix, SectorVector, StructureError, Table, Taxonomy};
use ndarray::Array1;

use crate::config::{Expansion, Tolerance};
use crate::diagnostics::Comparison;
use crate::error::ReflectError;

/// Row and column correspondences carrying a table into the target taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    pub rows: &'a CorrespondenceMatrix,
    pub cols: &'a CorrespondenceMatrix,
}

/// A derived weight table and the checkpoints it passed.
#[derive(Debug, Clone)]
pub struct DerivedWeights {
    pub weights: Table,
    pub checks: Vec<Comparison>,
}

#[derive(Debug, Clone)]
pub struct DerivedVectorWeights {
    pub weights: SectorVector,
    pub checks: Vec<Comparison>,
}

/// Positions of the expanded codes in `target`, and a membership mask.
fn expanded_positions(
    target: &Taxonomy,
    expansion: &Expansion,
) -> Result<(Vec<usize>, Vec<bool>), StructureError> {
    let positions = target.positions(&expansion.expanded)?;
    let mut mask = vec![false; target.len()];
    for &p in &positions {
        mask[p] = true;
    }
    Ok((positions, mask))
}

fn aggregated_position(taxonomy: &Taxonomy, expansion: &Expansion) -> Result<usize, StructureError> {
    taxonomy
        .position(&expansion.aggregated)
        .ok_or_else(|| StructureError::UnknownCode {
            taxonomy: taxonomy.name().to_string(),
            codes: vec![expansion.aggregated.clone()],
        })
}

/// Old-vintage shares of `block`, or an even split when the block sums to zero.
fn shares(old: impl Iterator<Item = f64> + Clone, k: usize) -> Vec<f64> {
    let denom: f64 = old.clone().sum();
    if denom != 0.0 {
        old.map(|v| v / denom).collect()
    } else {
        vec![1.0 / k as f64; k]
    }
}

fn check_finite(t: &Table, what: &str) -> Result<(), ReflectError> {
    let missing = t.missing_cells();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReflectError::MissingValues {
            what: what.to_string(),
            cells: missing.into_iter().map(|(r, c)| format!("{r}/{c}")).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Matrix (Use / Make pattern)
// ---------------------------------------------------------------------------

/// Derive a weight table in the target taxonomy of `new_proj`.
///
/// `old` is projected with `old_proj`, whose ranges must be the same target
/// taxonomies. The aggregated code is looked up on both axes of `new`.
pub fn derive_matrix_weights(
    old: &Table,
    old_proj: Projection<'_>,
    new: &Table,
    new_proj: Projection<'_>,
    expansion: &Expansion,
    tolerance: Tolerance,
) -> Result<DerivedWeights, ReflectError> {
    check_finite(old, "old-vintage table")?;
    check_finite(new, "new-vintage table")?;
    new_proj.rows.range().ensure_same(old_proj.rows.range(), "old-vintage row projection")?;
    new_proj.cols.range().ensure_same(old_proj.cols.range(), "old-vintage column projection")?;

    let base = new.aggregate(new_proj.rows, new_proj.cols)?;
    let old_t = old.aggregate(old_proj.rows, old_proj.cols)?;
    let target_rows = base.rows().clone();
    let target_cols = base.cols().clone();

    let (exp_rows, row_mask) = expanded_positions(&target_rows, expansion)?;
    let (exp_cols, col_mask) = expanded_positions(&target_cols, expansion)?;
    let agg_r = aggregated_position(new.rows(), expansion)?;
    let agg_c = aggregated_position(new.cols(), expansion)?;

    // The aggregated code's row and column, carried onto the target axes.
    let agg_row: Array1<f64> = new_proj.cols.values().dot(&new.values().row(agg_r));
    let agg_col: Array1<f64> = new_proj.rows.values().dot(&new.values().column(agg_c));
    let agg_core = new.values()[[agg_r, agg_c]];

    let o = old_t.values();
    let mut w = base.values().clone();
    let k_rows = exp_rows.len();
    let k_cols = exp_cols.len();
    let atol = Tolerance::absolute(tolerance.absolute);

    // Rows of expanded codes, against unchanged columns.
    let mut row_pairs = Vec::new();
    for q in (0..target_cols.len()).filter(|&q| !col_mask[q]) {
        let split = shares(exp_rows.iter().map(|&e| o[[e, q]]), k_rows);
        for (&e, s) in exp_rows.iter().zip(&split) {
            w[[e, q]] = s * agg_row[q];
        }
        let total: f64 = exp_rows.iter().map(|&e| w[[e, q]]).sum();
        row_pairs.push((target_cols.code(q).to_string(), agg_row[q], total));
    }
    let rows_check = Comparison::of("expanded row allocation", atol, row_pairs).into_result()?;

    // Columns of expanded codes, against unchanged rows.
    let mut col_pairs = Vec::new();
    for p in (0..target_rows.len()).filter(|&p| !row_mask[p]) {
        let split = shares(exp_cols.iter().map(|&e| o[[p, e]]), k_cols);
        for (&e, s) in exp_cols.iter().zip(&split) {
            w[[p, e]] = s * agg_col[p];
        }
        let total: f64 = exp_cols.iter().map(|&e| w[[p, e]]).sum();
        col_pairs.push((target_rows.code(p).to_string(), agg_col[p], total));
    }
    let cols_check = Comparison::of("expanded column allocation", atol, col_pairs).into_result()?;

    // Core block: expanded × expanded.
    let core_cells: Vec<(usize, usize)> = exp_rows
        .iter()
        .flat_map(|&e| exp_cols.iter().map(move |&f| (e, f)))
        .collect();
    let split = shares(core_cells.iter().map(|&(e, f)| o[[e, f]]), core_cells.len());
    for (&(e, f), s) in core_cells.iter().zip(&split) {
        w[[e, f]] = s * agg_core;
    }
    let core_total: f64 = core_cells.iter().map(|&(e, f)| w[[e, f]]).sum();
    let core_check =
        Comparison::scalar("expanded core allocation", atol, agg_core, core_total).into_result()?;

    let weights = Table::new(target_rows.clone(), target_cols.clone(), w)?;
    check_finite(&weights, "derived weight table")?;

    let unchanged = |t: &Table| -> f64 {
        t.values()
            .indexed_iter()
            .filter(|((p, q), _)| !row_mask[*p] && !col_mask[*q])
            .map(|(_, v)| v)
            .sum()
    };
    let unchanged_check = Comparison::scalar(
        "unchanged cells total",
        atol,
        unchanged(&base),
        unchanged(&weights),
    )
    .into_result()?;

    log::debug!(
        "derived {}x{} weights, {} expanded codes from '{}'",
        target_rows.len(),
        target_cols.len(),
        k_rows,
        expansion.aggregated
    );
    Ok(DerivedWeights {
        weights,
        checks: vec![rows_check, cols_check, core_check, unchanged_check],
    })
}

// ---------------------------------------------------------------------------
// Rows only (Final-Demand pattern)
// ---------------------------------------------------------------------------

/// Like [`derive_matrix_weights`] but only rows are projected and expanded;
/// columns (final-demand categories) must already agree between vintages.
pub fn derive_row_weights(
    old: &Table,
    old_rows: &CorrespondenceMatrix,
    new: &Table,
    new_rows: &CorrespondenceMatrix,
    expansion: &Expansion,
    tolerance: Tolerance,
) -> Result<DerivedWeights, ReflectError> {
    check_finite(old, "old-vintage table")?;
    check_finite(new, "new-vintage table")?;
    new_rows.range().ensure_same(old_rows.range(), "old-vintage row projection")?;

    let cols = new.cols().clone();
    let old = old.reindex(old.rows().clone(), cols.clone());
    let pass = CorrespondenceMatrix::identity(cols.clone());
    let base = new.aggregate(new_rows, &pass)?;
    let old_t = old.aggregate(old_rows, &pass)?;
    let target_rows = base.rows().clone();

    let (exp_rows, row_mask) = expanded_positions(&target_rows, expansion)?;
    let agg_r = aggregated_position(new.rows(), expansion)?;
    let agg_row = new.values().row(agg_r).to_owned();

    let o = old_t.values();
    let mut w = base.values().clone();
    let k = exp_rows.len();
    let atol = Tolerance::absolute(tolerance.absolute);

    let mut pairs = Vec::new();
    for q in 0..cols.len() {
        let split = shares(exp_rows.iter().map(|&e| o[[e, q]]), k);
        for (&e, s) in exp_rows.iter().zip(&split) {
            w[[e, q]] = s * agg_row[q];
        }
        let total: f64 = exp_rows.iter().map(|&e| w[[e, q]]).sum();
        pairs.push((cols.code(q).to_string(), agg_row[q], total));
    }
    let rows_check = Comparison::of("expanded row allocation", atol, pairs).into_result()?;

    let weights = Table::new(target_rows, cols, w)?;
    check_finite(&weights, "derived weight table")?;

    let unchanged = |t: &Table| -> f64 {
        t.values()
            .indexed_iter()
            .filter(|((p, _), _)| !row_mask[*p])
            .map(|(_, v)| v)
            .sum()
    };
    let unchanged_check = Comparison::scalar(
        "unchanged cells total",
        atol,
        unchanged(&base),
        unchanged(&weights),
    )
    .into_result()?;

    Ok(DerivedWeights {
        weights,
        checks: vec![rows_check, unchanged_check],
    })
}

// ---------------------------------------------------------------------------
// Vector (Scrap pattern)
// ---------------------------------------------------------------------------

pub fn derive_vector_weights(
    old: &SectorVector,
    old_corresp: &CorrespondenceMatrix,
    new: &SectorVector,
    new_corresp: &CorrespondenceMatrix,
    expansion: &Expansion,
    tolerance: Tolerance,
) -> Result<DerivedVectorWeights, ReflectError> {
    for (v, what) in [(old, "old-vintage vector"), (new, "new-vintage vector")] {
        let missing = v.missing_codes();
        if !missing.is_empty() {
            return Err(ReflectError::MissingValues {
                what: what.to_string(),
                cells: missing,
            });
        }
    }
    new_corresp.range().ensure_same(old_corresp.range(), "old-vintage projection")?;

    let base = new_corresp.aggregate_vector(new)?;
    let old_t = old_corresp.aggregate_vector(old)?;
    let target = base.index().clone();
    let (exp, mask) = expanded_positions(&target, expansion)?;
    let agg = new.values()[aggregated_position(new.index(), expansion)?];
    let atol = Tolerance::absolute(tolerance.absolute);

    let mut w = base.values().clone();
    let split = shares(exp.iter().map(|&e| old_t.values()[e]), exp.len());
    for (&e, s) in exp.iter().zip(&split) {
        w[e] = s * agg;
    }
    let total: f64 = exp.iter().map(|&e| w[e]).sum();
    let exp_check = Comparison::scalar("expanded allocation", atol, agg, total).into_result()?;

    let weights = SectorVector::new(target, w)?;
    let unchanged = |v: &SectorVector| -> f64 {
        v.values()
            .iter()
            .enumerate()
            .filter(|(p, _)| !mask[*p])
            .map(|(_, x)| x)
            .sum()
    };
    let unchanged_check = Comparison::scalar(
        "unchanged codes total",
        atol,
        unchanged(&base),
        unchanged(&weights),
    )
    .into_result()?;

    Ok(DerivedVectorWeights {
        weights,
        checks: vec![exp_check, unchanged_check],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeio_core::{mapping_from, Invariants};
    use std::sync::Arc;

    fn tax(name: &str, codes: &[&str]) -> Arc<Taxonomy> {
        Taxonomy::new(name, codes.iter().copied()).unwrap().shared()
    }

    fn expansion() -> Expansion {
        Expansion {
            aggregated: "E".into(),
            expanded: vec!["E1".into(), "E2".into()],
        }
    }

    /// new vintage {X, E} -> target {X, E1, E2}; old vintage already in target codes.
    fn setup() -> (Arc<Taxonomy>, Arc<Taxonomy>, CorrespondenceMatrix, CorrespondenceMatrix) {
        let new_tax = tax("new", &["X", "E"]);
        let target = tax("target", &["X", "E1", "E2"]);
        let m = mapping_from([("X", vec!["X"]), ("E", vec!["E1", "E2"])]);
        let new_c = CorrespondenceMatrix::build(
            &m,
            new_tax.clone(),
            target.clone(),
            Invariants::default().complete().injective().surjective(),
        )
        .unwrap();
        let old_c = CorrespondenceMatrix::identity(target.clone());
        (new_tax, target, new_c, old_c)
    }

    #[test]
    fn matrix_weights_split_by_old_proportions() {
        let (new_tax, target, new_c, old_c) = setup();
        let new = Table::from_rows(new_tax.clone(), new_tax, &[vec![10.0, 8.0], vec![6.0, 4.0]]).unwrap();
        let old = Table::from_rows(
            target.clone(),
            target,
            &[
                vec![1.0, 1.0, 3.0],
                vec![2.0, 1.0, 1.0],
                vec![6.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        let proj_new = Projection { rows: &new_c, cols: &new_c };
        let proj_old = Projection { rows: &old_c, cols: &old_c };
        let out = derive_matrix_weights(&old, proj_old, &new, proj_new, &expansion(), Tolerance::default())
            .unwrap();
        let w = &out.weights;

        // Unchanged cell keeps the projected new value.
        assert_eq!(w.get("X", "X"), Some(10.0));
        // Expanded rows against column X: old 2:6 of new E/X = 6.
        assert_eq!(w.get("E1", "X"), Some(1.5));
        assert_eq!(w.get("E2", "X"), Some(4.5));
        // Expanded columns against row X: old 1:3 of new X/E = 8.
        assert_eq!(w.get("X", "E1"), Some(2.0));
        assert_eq!(w.get("X", "E2"), Some(6.0));
        // Core: old [[1,1],[0,0]] of new E/E = 4.
        assert_eq!(w.get("E1", "E1"), Some(2.0));
        assert_eq!(w.get("E1", "E2"), Some(2.0));
        assert_eq!(w.get("E2", "E1"), Some(0.0));
        assert_eq!(out.checks.len(), 4);
        assert!(out.checks.iter().all(|c| c.passed));
        assert!((w.total() - 28.0).abs() < 1e-12);
    }

    #[test]
    fn zero_old_block_splits_evenly() {
        let (new_tax, target, new_c, old_c) = setup();
        let new = Table::from_rows(new_tax.clone(), new_tax, &[vec![0.0, 0.0], vec![8.0, 4.0]]).unwrap();
        let old = Table::zeros(target.clone(), target);
        let out = derive_matrix_weights(
            &old,
            Projection { rows: &old_c, cols: &old_c },
            &new,
            Projection { rows: &new_c, cols: &new_c },
            &expansion(),
            Tolerance::default(),
        )
        .unwrap();
        assert_eq!(out.weights.get("E1", "X"), Some(4.0));
        assert_eq!(out.weights.get("E2", "X"), Some(4.0));
        for (r, c) in [("E1", "E1"), ("E1", "E2"), ("E2", "E1"), ("E2", "E2")] {
            assert_eq!(out.weights.get(r, c), Some(1.0));
        }
        assert!(!out.weights.has_missing_values());
    }

    #[test]
    fn row_weights_leave_columns_alone() {
        let (new_tax, target, new_c, old_c) = setup();
        let fd = tax("fd", &["F010", "F020"]);
        let new = Table::from_rows(new_tax, fd.clone(), &[vec![5.0, 1.0], vec![10.0, 0.0]]).unwrap();
        let old = Table::from_rows(
            target,
            fd,
            &[vec![1.0, 1.0], vec![1.0, 0.0], vec![3.0, 0.0]],
        )
        .unwrap();
        let out = derive_row_weights(&old, &old_c, &new, &new_c, &expansion(), Tolerance::default()).unwrap();
        assert_eq!(out.weights.get("E1", "F010"), Some(2.5));
        assert_eq!(out.weights.get("E2", "F010"), Some(7.5));
        assert_eq!(out.weights.get("E1", "F020"), Some(0.0));
        assert_eq!(out.weights.get("X", "F020"), Some(1.0));
    }

    #[test]
    fn vector_weights_and_unknown_aggregate() {
        let (new_tax, target, new_c, old_c) = setup();
        let new = SectorVector::from_pairs(new_tax.clone(), [("X", 1.0), ("E", 9.0)]).unwrap();
        let old = SectorVector::from_pairs(target, [("E1", 2.0), ("E2", 1.0)]).unwrap();
        let out = derive_vector_weights(&old, &old_c, &new, &new_c, &expansion(), Tolerance::default())
            .unwrap();
        assert_eq!(out.weights.get("E1"), Some(6.0));
        assert_eq!(out.weights.get("E2"), Some(3.0));
        assert_eq!(out.weights.get("X"), Some(1.0));

        let bad = Expansion { aggregated: "nope".into(), ..expansion() };
        let err = derive_vector_weights(&old, &old_c, &new, &new_c, &bad, Tolerance::default()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
