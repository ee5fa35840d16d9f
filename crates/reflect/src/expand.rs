//! Expansion by duplication: every target code copies its parent's entry.
//!
//! Used where a sector is split into siblings that have no data of their
//! own. For square matrices, sibling groups get an intragroup correction so
//! the duplicated rows do not manufacture trade between siblings or inflate
//! the group's flows with the rest of the economy.

use std::collections::BTreeMap;
use std::sync::Arc;

use eeio_core::{SectorVector, StructureError, Table, Taxonomy};
use ndarray::{Array1, Array2};

use crate::config::SiblingGroup;

/// Target code → parent code, usually from `CorrespondenceMatrix::parent_map`.
pub type ParentMap = BTreeMap<String, String>;

/// (target position, source position) for every target code whose parent exists in `source`.
fn valid_pairs(target: &Taxonomy, parents: &ParentMap, source: &Taxonomy) -> Vec<(usize, usize)> {
    target
        .codes()
        .iter()
        .enumerate()
        .filter_map(|(t, code)| {
            let parent = parents.get(code)?;
            source.position(parent).map(|s| (t, s))
        })
        .collect()
}

/// Expand a square (sector × sector) matrix onto `target`.
///
/// Targets whose parent is missing from `m` are left at zero. For each
/// sibling group, cells between two different siblings are zeroed and
/// every sibling's cross-terms with non-siblings are divided by the number
/// of siblings present. Diagonal cells are kept.
pub fn expand_square_matrix(
    m: &Table,
    target: Arc<Taxonomy>,
    parents: &ParentMap,
    sibling_groups: &[SiblingGroup],
) -> Result<Table, StructureError> {
    m.rows().ensure_same(m.cols(), "square matrix columns")?;
    let pairs = valid_pairs(&target, parents, m.rows());
    let src = m.values();

    let mut out = Array2::zeros((target.len(), target.len()));
    for &(ti, si) in &pairs {
        for &(tj, sj) in &pairs {
            out[[ti, tj]] = src[[si, sj]];
        }
    }

    for group in sibling_groups {
        let siblings: Vec<usize> = group.codes.iter().filter_map(|c| target.position(c)).collect();
        let n = siblings.len();
        if n <= 1 {
            continue;
        }
        let mut is_sibling = vec![false; target.len()];
        for &s in &siblings {
            is_sibling[s] = true;
        }
        for &a in &siblings {
            for &b in &siblings {
                if a != b {
                    out[[a, b]] = 0.0;
                }
            }
        }
        let nf = n as f64;
        for &s in &siblings {
            for k in (0..target.len()).filter(|&k| !is_sibling[k]) {
                out[[k, s]] /= nf;
                out[[s, k]] /= nf;
            }
        }
        log::debug!("suppressed intragroup flows for '{}' ({n} siblings)", group.parent);
    }

    Table::new(target.clone(), target, out)
}

/// Expand a vector onto `target` by duplicating parent entries.
pub fn expand_vector(
    v: &SectorVector,
    target: Arc<Taxonomy>,
    parents: &ParentMap,
) -> Result<SectorVector, StructureError> {
    let mut out = Array1::zeros(target.len());
    for (t, s) in valid_pairs(&target, parents, v.index()) {
        out[t] = v.values()[s];
    }
    SectorVector::new(target, out)
}

/// Expand the column (sector) axis of a matrix such as gas × sector.
pub fn expand_columns(
    m: &Table,
    target_cols: Arc<Taxonomy>,
    parents: &ParentMap,
) -> Result<Table, StructureError> {
    let mut out = Array2::zeros((m.rows().len(), target_cols.len()));
    for (t, s) in valid_pairs(&target_cols, parents, m.cols()) {
        out.column_mut(t).assign(&m.values().column(s));
    }
    Table::new(m.rows().clone(), target_cols, out)
}
