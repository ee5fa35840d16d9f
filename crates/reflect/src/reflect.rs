//! Structural reflection: re-express a table in another taxonomy, using a
//! target-space weight table to shape the distribution and the base table to
//! fix the totals.
//!
//! For every nonzero base cell `(i, j)` the target block is the outer product
//! of the row image of `i` and the column image of `j`. The weights inside
//! that block are normalized together and the base value is spread over the
//! block in those proportions. Because each block receives exactly the value
//! of its base cell, totals are conserved per connected group of codes, which
//! is what [`RoundTripReport`] checks after every run.

use std::collections::BTreeSet;

use eeio_core::{CorrespondenceMatrix, SectorVector, Table, Taxonomy};
use ndarray::Array2;
use serde::Serialize;

use crate::config::Tolerance;
use crate::diagnostics::Comparison;
use crate::error::ReflectError;

const VECTOR_COLUMN: &str = "value";

/// Per-call options. `Default` normalizes, drops nothing, and has no fallback.
#[derive(Debug, Clone)]
pub struct ReflectOptions<'a> {
    pub expected_row_dropped: BTreeSet<String>,
    pub expected_col_dropped: BTreeSet<String>,
    /// Consulted for a block whose primary weights sum to zero.
    pub fallback: Option<&'a Table>,
    /// When false, raw weight products are propagated (equal allocation
    /// with unit weights) and the totals check is skipped.
    pub normalize: bool,
    pub tolerance: Tolerance,
}

impl Default for ReflectOptions<'_> {
    fn default() -> Self {
        Self {
            expected_row_dropped: BTreeSet::new(),
            expected_col_dropped: BTreeSet::new(),
            fallback: None,
            normalize: true,
            tolerance: Tolerance::default(),
        }
    }
}

/// Marginal totals of a reflection, compared per connected code group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTripReport {
    /// Sum of base cells whose row and column are both covered.
    pub covered_total: f64,
    /// Sum of base cells on declared-dropped rows or columns.
    pub dropped_total: f64,
    pub reflected_total: f64,
    pub max_row_drift: f64,
    pub max_col_drift: f64,
    /// Base cells spread with the fallback weight table.
    pub fallback_cells: usize,
    /// Base cells spread evenly because no weight applied.
    pub equal_split_cells: usize,
}

#[derive(Debug, Clone)]
pub struct Reflection {
    pub table: Table,
    pub report: RoundTripReport,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Reflect `base` (rows × cols in the correspondences' domains) onto the
/// correspondences' ranges, shaped by `weights`.
pub fn reflect_matrix(
    row_corresp: &CorrespondenceMatrix,
    col_corresp: &CorrespondenceMatrix,
    base: &Table,
    weights: &Table,
    opts: &ReflectOptions<'_>,
) -> Result<Reflection, ReflectError> {
    row_corresp.domain().ensure_same(base.rows(), "base table rows")?;
    col_corresp.domain().ensure_same(base.cols(), "base table columns")?;
    row_corresp.range().ensure_same(weights.rows(), "weight table rows")?;
    col_corresp.range().ensure_same(weights.cols(), "weight table columns")?;
    if let Some(fb) = opts.fallback {
        row_corresp.range().ensure_same(fb.rows(), "fallback weight rows")?;
        col_corresp.range().ensure_same(fb.cols(), "fallback weight columns")?;
    }

    check_complete(base, "base table")?;
    check_weights(weights, "weight table")?;
    if let Some(fb) = opts.fallback {
        check_weights(fb, "fallback weight table")?;
    }

    let row_dropped = uncovered(row_corresp, &opts.expected_row_dropped, "row")?;
    let col_dropped = uncovered(col_corresp, &opts.expected_col_dropped, "column")?;

    let spread = spread(row_corresp, col_corresp, base, weights, opts);
    let table = Table::new(
        row_corresp.range().clone(),
        col_corresp.range().clone(),
        spread.values,
    )?;

    let b = base.values();
    let mut dropped_total = 0.0;
    for ((i, j), v) in b.indexed_iter() {
        if row_dropped[i] || col_dropped[j] {
            dropped_total += v;
        }
    }
    if dropped_total != 0.0 {
        log::info!("reflection dropped {dropped_total} on declared codes");
    }

    let mut report = RoundTripReport {
        covered_total: b.sum() - dropped_total,
        dropped_total,
        reflected_total: table.total(),
        max_row_drift: 0.0,
        max_col_drift: 0.0,
        fallback_cells: spread.fallback_cells,
        equal_split_cells: spread.equal_split_cells,
    };

    if opts.normalize {
        let rows = marginal_check(
            "reflected row totals",
            row_corresp,
            &masked_sums(b, &row_dropped, &col_dropped, true),
            &table.row_sums(),
            opts.tolerance,
        );
        let cols = marginal_check(
            "reflected column totals",
            col_corresp,
            &masked_sums(b, &row_dropped, &col_dropped, false),
            &table.col_sums(),
            opts.tolerance,
        );
        report.max_row_drift = rows.max_abs_diff;
        report.max_col_drift = cols.max_abs_diff;
        rows.into_result()?;
        cols.into_result()?;
        Comparison::scalar(
            "reflected total",
            opts.tolerance,
            report.covered_total,
            report.reflected_total,
        )
        .into_result()?;
    }

    log::debug!(
        "reflected {}x{} -> {}x{} (total {:.3}, {} fallback, {} equal split)",
        base.shape().0,
        base.shape().1,
        table.shape().0,
        table.shape().1,
        report.reflected_total,
        report.fallback_cells,
        report.equal_split_cells
    );
    Ok(Reflection { table, report })
}

/// Reflect with one correspondence applied to both axes.
pub fn reflect_symmetric(
    corresp: &CorrespondenceMatrix,
    base: &Table,
    weights: &Table,
    opts: &ReflectOptions<'_>,
) -> Result<Reflection, ReflectError> {
    reflect_matrix(corresp, corresp, base, weights, opts)
}

/// Reflect a vector: a one-column table with a pass-through column.
///
/// Vector fallback weights come in as `fallback`; a table fallback in `opts`
/// has the wrong shape and is rejected.
pub fn reflect_vector(
    corresp: &CorrespondenceMatrix,
    base: &SectorVector,
    weights: &SectorVector,
    fallback: Option<&SectorVector>,
    opts: &ReflectOptions<'_>,
) -> Result<(SectorVector, RoundTripReport), ReflectError> {
    if opts.fallback.is_some() {
        return Err(ReflectError::ConfigValidation(
            "reflect_vector takes fallback weights as a vector, not in options".to_string(),
        ));
    }
    let base_t = Table::from_column(base, VECTOR_COLUMN)?;
    let weights_t = Table::from_column(weights, VECTOR_COLUMN)?;
    let fallback_t = fallback.map(|f| Table::from_column(f, VECTOR_COLUMN)).transpose()?;
    let col = CorrespondenceMatrix::identity(base_t.cols().clone());
    let opts = ReflectOptions {
        fallback: fallback_t.as_ref(),
        expected_col_dropped: BTreeSet::new(),
        ..opts.clone()
    };
    let out = reflect_matrix(corresp, &col, &base_t, &weights_t, &opts)?;
    let values = out.table.values().column(0).to_owned();
    let vector = SectorVector::new(corresp.range().clone(), values)?;
    Ok((vector, out.report))
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

fn check_complete(t: &Table, what: &str) -> Result<(), ReflectError> {
    let missing = t.missing_cells();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ReflectError::MissingValues {
        what: what.to_string(),
        cells: missing.into_iter().map(|(r, c)| format!("{r}/{c}")).collect(),
    })
}

fn check_weights(t: &Table, what: &str) -> Result<(), ReflectError> {
    check_complete(t, what)?;
    let negative: Vec<String> = t
        .values()
        .indexed_iter()
        .filter(|(_, v)| **v < 0.0)
        .map(|((i, j), _)| format!("{}/{}", t.rows().code(i), t.cols().code(j)))
        .collect();
    if negative.is_empty() {
        Ok(())
    } else {
        Err(ReflectError::NegativeWeights {
            what: what.to_string(),
            cells: negative,
        })
    }
}

/// Flags per domain position: true when the code maps nowhere. Uncovered
/// codes that were not declared droppable fail.
fn uncovered(
    corresp: &CorrespondenceMatrix,
    expected: &BTreeSet<String>,
    axis: &'static str,
) -> Result<Vec<bool>, ReflectError> {
    let domain = corresp.domain();
    let mut flags = vec![false; domain.len()];
    let mut undeclared = Vec::new();
    for (j, flag) in flags.iter_mut().enumerate() {
        if corresp.image_of(j).is_empty() {
            *flag = true;
            let code = domain.code(j);
            if !expected.contains(code) {
                undeclared.push(code.to_string());
            }
        }
    }
    if !undeclared.is_empty() {
        return Err(ReflectError::Coverage {
            axis,
            codes: undeclared,
        });
    }
    Ok(flags)
}

/// Base row (or column) sums over the cells that are not dropped.
fn masked_sums(b: &Array2<f64>, row_dropped: &[bool], col_dropped: &[bool], by_row: bool) -> Vec<f64> {
    let mut out = vec![0.0; if by_row { b.nrows() } else { b.ncols() }];
    for ((i, j), v) in b.indexed_iter() {
        if row_dropped[i] || col_dropped[j] {
            continue;
        }
        out[if by_row { i } else { j }] += v;
    }
    out
}

/// Compare base marginals with reflected marginals per connected block.
fn marginal_check(
    name: &str,
    corresp: &CorrespondenceMatrix,
    base_marginals: &[f64],
    reflected: &SectorVector,
    tolerance: Tolerance,
) -> Comparison {
    let range = corresp.range();
    let pairs = corresp.blocks().into_iter().map(|(dom, rng)| {
        let expected: f64 = dom.iter().map(|&j| base_marginals[j]).sum();
        let actual: f64 = rng.iter().map(|&i| reflected.values()[i]).sum();
        let label = block_label(range, &rng);
        (label, expected, actual)
    });
    Comparison::of(name, tolerance, pairs)
}

fn block_label(range: &Taxonomy, positions: &[usize]) -> String {
    match positions {
        [only] => range.code(*only).to_string(),
        [first, .., last] => format!("{}..{}", range.code(*first), range.code(*last)),
        [] => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Core loop
// ---------------------------------------------------------------------------

struct Spread {
    values: Array2<f64>,
    fallback_cells: usize,
    equal_split_cells: usize,
}

/// Where a block's distribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightSource {
    Primary,
    Fallback,
    EqualSplit,
}

/// Normalized distribution over the block `rows × cols` (row-major), summing
/// to 1. A block whose primary weights sum to zero uses `fallback`, then an
/// even `1/k` split.
pub fn block_distribution(
    weights: &Array2<f64>,
    fallback: Option<&Array2<f64>>,
    rows: &[usize],
    cols: &[usize],
) -> (Vec<f64>, WeightSource) {
    let raw = |w: &Array2<f64>| -> Vec<f64> {
        rows.iter()
            .flat_map(|&p| cols.iter().map(move |&q| w[[p, q]]))
            .collect()
    };
    let normalized = |mut v: Vec<f64>| -> Option<Vec<f64>> {
        let total: f64 = v.iter().sum();
        if total > 0.0 {
            v.iter_mut().for_each(|x| *x /= total);
            Some(v)
        } else {
            None
        }
    };

    if let Some(v) = normalized(raw(weights)) {
        return (v, WeightSource::Primary);
    }
    if let Some(v) = fallback.and_then(|fb| normalized(raw(fb))) {
        return (v, WeightSource::Fallback);
    }
    let k = rows.len() * cols.len();
    (vec![1.0 / k as f64; k], WeightSource::EqualSplit)
}

fn spread(
    row_corresp: &CorrespondenceMatrix,
    col_corresp: &CorrespondenceMatrix,
    base: &Table,
    weights: &Table,
    opts: &ReflectOptions<'_>,
) -> Spread {
    let w = weights.values();
    let fb = opts.fallback.map(Table::values);
    let mut out = Spread {
        values: Array2::zeros(w.dim()),
        fallback_cells: 0,
        equal_split_cells: 0,
    };

    for ((i, j), &val) in base.values().indexed_iter() {
        if val == 0.0 {
            continue;
        }
        let rows = row_corresp.image_of(i);
        let cols = col_corresp.image_of(j);
        if rows.is_empty() || cols.is_empty() {
            continue;
        }

        if !opts.normalize {
            let raw: f64 = rows.iter().flat_map(|&p| cols.iter().map(move |&q| w[[p, q]])).sum();
            if raw > 0.0 {
                for &p in rows {
                    for &q in cols {
                        out.values[[p, q]] += val * w[[p, q]];
                    }
                }
                continue;
            }
        }

        let (shares, source) = block_distribution(w, fb, rows, cols);
        match source {
            WeightSource::Primary => {}
            WeightSource::Fallback => out.fallback_cells += 1,
            WeightSource::EqualSplit => {
                out.equal_split_cells += 1;
                if shares.len() > 1 {
                    log::warn!(
                        "zero weight for {val} at ({}, {}); splitting equally over {} cells",
                        base.rows().code(i),
                        base.cols().code(j),
                        shares.len()
                    );
                }
            }
        }
        let cells = rows.iter().flat_map(|&p| cols.iter().map(move |&q| (p, q)));
        for ((p, q), share) in cells.zip(shares) {
            out.values[[p, q]] += val * share;
        }
    }
    out
}
