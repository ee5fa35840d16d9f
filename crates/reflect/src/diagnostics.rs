//! Named, structured comparison results for an external reporting layer.
//!
//! Nothing here formats or transmits reports; results serialize to JSON.

use eeio_core::{SectorVector, StructureError, Table};
use serde::Serialize;

use crate::config::Tolerance;
use crate::error::ReflectError;

/// Outcome of one named numeric check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub name: String,
    pub passed: bool,
    pub tolerance: Tolerance,
    pub max_abs_diff: f64,
    pub max_rel_diff: f64,
    /// Codes (or `row/col` cells) outside tolerance, in index order.
    pub offending: Vec<String>,
    /// Largest-drift entry as (expected, actual), for error messages.
    #[serde(skip)]
    worst: Option<(f64, f64)>,
}

impl Comparison {
    /// Compare labeled (expected, actual) pairs.
    pub fn of<I, S>(name: &str, tolerance: Tolerance, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let mut out = Self {
            name: name.to_string(),
            passed: true,
            tolerance,
            max_abs_diff: 0.0,
            max_rel_diff: 0.0,
            offending: Vec::new(),
            worst: None,
        };
        for (label, expected, actual) in pairs {
            let abs = (actual - expected).abs();
            let rel = if expected != 0.0 {
                abs / expected.abs()
            } else if abs == 0.0 {
                0.0
            } else {
                f64::INFINITY
            };
            // NaN compares false; treat it as the worst possible drift.
            let abs = if abs.is_nan() { f64::INFINITY } else { abs };
            let rel = if rel.is_nan() { f64::INFINITY } else { rel };
            if abs >= out.max_abs_diff {
                out.worst = Some((expected, actual));
            }
            out.max_abs_diff = out.max_abs_diff.max(abs);
            out.max_rel_diff = out.max_rel_diff.max(rel);
            if !tolerance.is_close(expected, actual) {
                out.passed = false;
                out.offending.push(label.into());
            }
        }
        out
    }

    pub fn scalar(name: &str, tolerance: Tolerance, expected: f64, actual: f64) -> Self {
        Self::of(name, tolerance, [("total", expected, actual)])
    }

    /// Turn a failed comparison into a `Tolerance` error.
    pub fn into_result(self) -> Result<Self, ReflectError> {
        if self.passed {
            return Ok(self);
        }
        let (expected, actual) = self.worst.unwrap_or((f64::NAN, f64::NAN));
        Err(ReflectError::Tolerance {
            check: self.name,
            expected,
            actual,
            codes: self.offending,
        })
    }
}

/// Element-wise comparison of two vectors over the same taxonomy.
pub fn compare_vectors(
    name: &str,
    expected: &SectorVector,
    actual: &SectorVector,
    tolerance: Tolerance,
) -> Result<Comparison, StructureError> {
    expected.index().ensure_same(actual.index(), name)?;
    Ok(Comparison::of(
        name,
        tolerance,
        expected
            .iter()
            .zip(actual.values().iter())
            .map(|((code, e), a)| (code, e, *a)),
    ))
}

/// Cell-wise comparison of two tables over the same axes.
pub fn compare_tables(
    name: &str,
    expected: &Table,
    actual: &Table,
    tolerance: Tolerance,
) -> Result<Comparison, StructureError> {
    expected.rows().ensure_same(actual.rows(), name)?;
    expected.cols().ensure_same(actual.cols(), name)?;
    let rows = expected.rows();
    let cols = expected.cols();
    Ok(Comparison::of(
        name,
        tolerance,
        expected
            .values()
            .indexed_iter()
            .zip(actual.values().iter())
            .map(|(((i, j), e), a)| (format!("{}/{}", rows.code(i), cols.code(j)), *e, *a)),
    ))
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsMeta {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub meta: DiagnosticsMeta,
    pub summary: DiagnosticsSummary,
    pub comparisons: Vec<Comparison>,
}

pub fn compute_summary(comparisons: &[Comparison]) -> DiagnosticsSummary {
    let passed = comparisons.iter().filter(|c| c.passed).count();
    DiagnosticsSummary {
        total: comparisons.len(),
        passed,
        failed: comparisons.len() - passed,
    }
}

impl DiagnosticsReport {
    pub fn new(name: &str, comparisons: Vec<Comparison>) -> Self {
        Self {
            meta: DiagnosticsMeta {
                name: name.to_string(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary: compute_summary(&comparisons),
            comparisons,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons.iter().filter(|c| !c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeio_core::Taxonomy;

    #[test]
    fn comparison_tracks_worst_and_offenders() {
        let c = Comparison::of(
            "totals",
            Tolerance::absolute(0.5),
            [("a", 10.0, 10.1), ("b", 20.0, 21.0), ("c", 0.0, 0.0)],
        );
        assert!(!c.passed);
        assert_eq!(c.offending, vec!["b"]);
        assert!((c.max_abs_diff - 1.0).abs() < 1e-12);
        assert!((c.max_rel_diff - 0.05).abs() < 1e-12);

        let err = c.into_result().unwrap_err();
        assert_eq!(
            err,
            ReflectError::Tolerance {
                check: "totals".into(),
                expected: 20.0,
                actual: 21.0,
                codes: vec!["b".into()],
            }
        );
    }

    #[test]
    fn nan_never_passes() {
        let c = Comparison::scalar("nan", Tolerance::default(), 1.0, f64::NAN);
        assert!(!c.passed);
        assert!(c.max_abs_diff.is_infinite());
    }

    #[test]
    fn compare_tables_names_cells() {
        let r = Taxonomy::new("r", ["x", "y"]).unwrap().shared();
        let c = Taxonomy::new("c", ["p"]).unwrap().shared();
        let e = Table::from_rows(r.clone(), c.clone(), &[vec![1.0], vec![2.0]]).unwrap();
        let a = Table::from_rows(r, c, &[vec![1.0], vec![3.0]]).unwrap();
        let cmp = compare_tables("t", &e, &a, Tolerance::default()).unwrap();
        assert_eq!(cmp.offending, vec!["y/p"]);
    }

    #[test]
    fn report_summary_counts() {
        let report = DiagnosticsReport::new(
            "run",
            vec![
                Comparison::scalar("ok", Tolerance::default(), 1.0, 1.0),
                Comparison::scalar("bad", Tolerance::default(), 1.0, 2.0),
            ],
        );
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.all_passed());
        assert_eq!(report.failures().next().unwrap().name, "bad");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"max_rel_diff\""));
    }
}
