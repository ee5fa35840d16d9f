//! Proportional disaggregation of coarse vectors onto fine codes.
//!
//! The correspondence runs coarse (domain) → fine (range) and must send each
//! fine code back to at most one coarse code.

use eeio_core::{CorrespondenceMatrix, SectorVector, StructureError};
use ndarray::Array1;

use crate::config::Tolerance;
use crate::diagnostics::Comparison;
use crate::error::ReflectError;

fn require_single_parent(corresp: &CorrespondenceMatrix) -> Result<(), StructureError> {
    let range = corresp.range();
    let shared: Vec<String> = (0..range.len())
        .filter(|&i| corresp.preimage_of(i).len() > 1)
        .map(|i| range.code(i).to_string())
        .collect();
    if shared.is_empty() {
        Ok(())
    } else {
        Err(StructureError::NotInjective {
            range: range.name().to_string(),
            codes: shared,
        })
    }
}

/// Split each coarse value of `base` over its fine codes in proportion to
/// `weights` restricted to that group.
///
/// A group whose weights sum to zero uses `alt_weights` when given, and is
/// split evenly otherwise. A nonzero coarse value with no fine codes is a
/// coverage error.
pub fn disaggregate_vector(
    corresp: &CorrespondenceMatrix,
    base: &SectorVector,
    weights: &SectorVector,
    alt_weights: Option<&SectorVector>,
    tolerance: Tolerance,
) -> Result<SectorVector, ReflectError> {
    require_single_parent(corresp)?;
    corresp.domain().ensure_same(base.index(), "disaggregation base")?;
    corresp.range().ensure_same(weights.index(), "disaggregation weights")?;
    if let Some(alt) = alt_weights {
        corresp.range().ensure_same(alt.index(), "disaggregation alternative weights")?;
    }
    for (v, what) in [(base, "disaggregation base"), (weights, "disaggregation weights")] {
        let missing = v.missing_codes();
        if !missing.is_empty() {
            return Err(ReflectError::MissingValues {
                what: what.to_string(),
                cells: missing,
            });
        }
    }

    let w = weights.values();
    let mut out = Array1::zeros(corresp.range().len());
    let mut lost = Vec::new();
    let mut even = 0usize;

    for (j, (code, value)) in base.iter().enumerate() {
        let group = corresp.image_of(j);
        if group.is_empty() {
            if value != 0.0 {
                lost.push(code.to_string());
            }
            continue;
        }

        let mut total: f64 = group.iter().map(|&i| w[i]).sum();
        let mut key = w;
        if total == 0.0 {
            if let Some(alt) = alt_weights {
                key = alt.values();
                total = group.iter().map(|&i| key[i]).sum();
            }
        }
        if total != 0.0 {
            for &i in group {
                out[i] += value * key[i] / total;
            }
        } else {
            even += 1;
            let n = group.len() as f64;
            for &i in group {
                out[i] += value / n;
            }
        }
    }

    if !lost.is_empty() {
        return Err(ReflectError::Coverage {
            axis: "coarse",
            codes: lost,
        });
    }
    if even > 0 {
        log::debug!("disaggregation split {even} zero-weight group(s) evenly");
    }

    let fine = SectorVector::new(corresp.range().clone(), out)?;
    Comparison::scalar(
        "disaggregated total",
        tolerance,
        base.total(),
        fine.total(),
    )
    .into_result()?;
    Ok(fine)
}

/// Split `base` (fine codes) into `(portion, remainder)` using ratios given
/// on the coarse codes, broadcast to every fine code of each coarse group.
///
/// Fine codes outside every group get a ratio of zero.
pub fn split_vector_using_agg_ratio(
    base: &SectorVector,
    ratios: &SectorVector,
    corresp: &CorrespondenceMatrix,
) -> Result<(SectorVector, SectorVector), ReflectError> {
    require_single_parent(corresp)?;
    corresp.domain().ensure_same(ratios.index(), "aggregated ratios")?;
    corresp.range().ensure_same(base.index(), "split base")?;

    let bad: Vec<String> = ratios
        .iter()
        .filter(|(_, r)| !(0.0..=1.0).contains(r))
        .map(|(c, _)| c.to_string())
        .collect();
    if !bad.is_empty() {
        return Err(ReflectError::RatioOutOfRange { codes: bad });
    }

    let fine_ratio = corresp.values().dot(ratios.values());
    let portion = base.values() * &fine_ratio;
    let remainder = base.values() * &fine_ratio.mapv(|r| 1.0 - r);
    Ok((
        SectorVector::new(base.index().clone(), portion)?,
        SectorVector::new(base.index().clone(), remainder)?,
    ))
}
