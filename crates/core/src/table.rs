use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2, Axis as NdAxis};
use serde::Serialize;

use crate::error::StructureError;
use crate::taxonomy::Taxonomy;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Content identity of a table: axis codes plus value bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub(crate) fn of(axes: &[&Taxonomy], values: impl Iterator<Item = f64>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for axis in axes {
            for code in axis.codes() {
                hasher.update(code.as_bytes());
                hasher.update(&[0]);
            }
            hasher.update(&[0xff]);
        }
        for v in values {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// SectorVector
// ---------------------------------------------------------------------------

/// A numeric vector indexed by a taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorVector {
    index: Arc<Taxonomy>,
    values: Array1<f64>,
}

impl SectorVector {
    pub fn new(index: Arc<Taxonomy>, values: Array1<f64>) -> Result<Self, StructureError> {
        if values.len() != index.len() {
            return Err(StructureError::ShapeMismatch {
                what: format!("vector over '{}'", index.name()),
                expected: (index.len(), 1),
                actual: (values.len(), 1),
            });
        }
        Ok(Self { index, values })
    }

    pub fn zeros(index: Arc<Taxonomy>) -> Self {
        let values = Array1::zeros(index.len());
        Self { index, values }
    }

    /// Build from (code, value) pairs; unlisted codes are zero, unknown codes fail.
    pub fn from_pairs<'a, I>(index: Arc<Taxonomy>, pairs: I) -> Result<Self, StructureError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut out = Self::zeros(index);
        let mut unknown = Vec::new();
        for (code, v) in pairs {
            match out.index.position(code) {
                Some(i) => out.values[i] += v,
                None => unknown.push(code.to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(StructureError::UnknownCode {
                taxonomy: out.index.name().to_string(),
                codes: unknown,
            });
        }
        Ok(out)
    }

    pub fn index(&self) -> &Arc<Taxonomy> {
        &self.index
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array1<f64> {
        self.values
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.index.position(code).map(|i| self.values[i])
    }

    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.index.codes().iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Codes holding NaN or infinite values.
    pub fn missing_codes(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(c, _)| c.to_string())
            .collect()
    }

    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Re-express over another taxonomy by code: missing codes become zero,
    /// codes absent from `index` are dropped.
    pub fn reindex(&self, index: Arc<Taxonomy>) -> Self {
        let values = Array1::from_iter(index.codes().iter().map(|c| self.get(c).unwrap_or(0.0)));
        Self { index, values }
    }

    /// Same values under a relabeled (same-length) index.
    pub fn relabel(self, index: Arc<Taxonomy>) -> Result<Self, StructureError> {
        Self::new(index, self.values)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            index: self.index.clone(),
            values: &self.values * factor,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&[&self.index], self.values.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A rectangular numeric table indexed by sector codes on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Arc<Taxonomy>,
    cols: Arc<Taxonomy>,
    values: Array2<f64>,
}

impl Table {
    pub fn new(
        rows: Arc<Taxonomy>,
        cols: Arc<Taxonomy>,
        values: Array2<f64>,
    ) -> Result<Self, StructureError> {
        let expected = (rows.len(), cols.len());
        if values.dim() != expected {
            return Err(StructureError::ShapeMismatch {
                what: format!("table '{}' x '{}'", rows.name(), cols.name()),
                expected,
                actual: values.dim(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    pub fn zeros(rows: Arc<Taxonomy>, cols: Arc<Taxonomy>) -> Self {
        let values = Array2::zeros((rows.len(), cols.len()));
        Self { rows, cols, values }
    }

    /// Build from nested row vectors.
    pub fn from_rows(
        rows: Arc<Taxonomy>,
        cols: Arc<Taxonomy>,
        data: &[Vec<f64>],
    ) -> Result<Self, StructureError> {
        let n_cols = cols.len();
        if data.len() != rows.len() || data.iter().any(|r| r.len() != n_cols) {
            return Err(StructureError::ShapeMismatch {
                what: format!("table '{}' x '{}'", rows.name(), cols.name()),
                expected: (rows.len(), n_cols),
                actual: (data.len(), data.first().map_or(0, Vec::len)),
            });
        }
        let flat: Vec<f64> = data.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), n_cols), flat).map_err(|_| {
            StructureError::ShapeMismatch {
                what: "table rows".into(),
                expected: (rows.len(), n_cols),
                actual: (data.len(), n_cols),
            }
        })?;
        Ok(Self { rows, cols, values })
    }

    /// A one-column table holding `v`, with a single synthetic column code.
    pub fn from_column(v: &SectorVector, col: &str) -> Result<Self, StructureError> {
        let cols = Taxonomy::new("column", [col])?.shared();
        let values = v.values().clone().insert_axis(NdAxis(1));
        Self::new(v.index().clone(), cols, values)
    }

    pub fn rows(&self) -> &Arc<Taxonomy> {
        &self.rows
    }

    pub fn cols(&self) -> &Arc<Taxonomy> {
        &self.cols
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.rows.position(row)?;
        let j = self.cols.position(col)?;
        Some(self.values[[i, j]])
    }

    pub fn row(&self, code: &str) -> Option<SectorVector> {
        let i = self.rows.position(code)?;
        Some(SectorVector {
            index: self.cols.clone(),
            values: self.values.row(i).to_owned(),
        })
    }

    pub fn column(&self, code: &str) -> Option<SectorVector> {
        let j = self.cols.position(code)?;
        Some(SectorVector {
            index: self.rows.clone(),
            values: self.values.column(j).to_owned(),
        })
    }

    pub fn row_sums(&self) -> SectorVector {
        SectorVector {
            index: self.rows.clone(),
            values: self.values.sum_axis(NdAxis(1)),
        }
    }

    pub fn col_sums(&self) -> SectorVector {
        SectorVector {
            index: self.cols.clone(),
            values: self.values.sum_axis(NdAxis(0)),
        }
    }

    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    pub fn transpose(&self) -> Self {
        Self {
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            values: self.values.t().to_owned(),
        }
    }

    /// Sum of the block selected by row and column positions.
    pub fn block_sum(&self, rows: &[usize], cols: &[usize]) -> f64 {
        rows.iter()
            .flat_map(|&i| cols.iter().map(move |&j| (i, j)))
            .map(|(i, j)| self.values[[i, j]])
            .sum()
    }

    /// Cells holding NaN or infinite values, as (row code, column code).
    pub fn missing_cells(&self) -> Vec<(String, String)> {
        self.values
            .indexed_iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|((i, j), _)| (self.rows.code(i).to_string(), self.cols.code(j).to_string()))
            .collect()
    }

    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Re-express over other axes by code: missing codes become zero,
    /// codes absent from the new axes are dropped.
    pub fn reindex(&self, rows: Arc<Taxonomy>, cols: Arc<Taxonomy>) -> Self {
        let row_pos: Vec<Option<usize>> = rows.codes().iter().map(|c| self.rows.position(c)).collect();
        let col_pos: Vec<Option<usize>> = cols.codes().iter().map(|c| self.cols.position(c)).collect();
        let values = Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| {
            match (row_pos[i], col_pos[j]) {
                (Some(si), Some(sj)) => self.values[[si, sj]],
                _ => 0.0,
            }
        });
        Self { rows, cols, values }
    }

    /// Same values under relabeled (same-length) axes.
    pub fn relabel(self, rows: Arc<Taxonomy>, cols: Arc<Taxonomy>) -> Result<Self, StructureError> {
        Self::new(rows, cols, self.values)
    }

    /// Apply `f` to every cell.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows.clone(),
            cols: self.cols.clone(),
            values: self.values.mapv(f),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&[&self.rows, &self.cols], self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tax(name: &str, codes: &[&str]) -> Arc<Taxonomy> {
        Taxonomy::new(name, codes.iter().copied()).unwrap().shared()
    }

    #[test]
    fn shape_is_checked() {
        let r = tax("r", &["a", "b"]);
        let c = tax("c", &["x"]);
        assert!(Table::new(r.clone(), c.clone(), Array2::zeros((2, 2))).is_err());
        assert!(Table::from_rows(r, c, &[vec![1.0], vec![2.0, 3.0]]).is_err());
    }

    #[test]
    fn sums_and_lookup() {
        let r = tax("r", &["a", "b"]);
        let c = tax("c", &["x", "y"]);
        let t = Table::from_rows(r, c, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(t.get("b", "x"), Some(3.0));
        assert_eq!(t.row_sums().get("a"), Some(3.0));
        assert_eq!(t.col_sums().get("y"), Some(6.0));
        assert_eq!(t.total(), 10.0);
        assert_eq!(t.transpose().get("x", "b"), Some(3.0));
    }

    #[test]
    fn reindex_fills_zero_and_drops_extra() {
        let t = Table::from_rows(tax("r", &["a", "b"]), tax("c", &["x"]), &[vec![1.0], vec![2.0]]).unwrap();
        let out = t.reindex(tax("r2", &["b", "z"]), tax("c2", &["x", "w"]));
        assert_eq!(out.values(), &ndarray::arr2(&[[2.0, 0.0], [0.0, 0.0]]));
    }

    #[test]
    fn missing_values_are_located() {
        let t = Table::from_rows(
            tax("r", &["a", "b"]),
            tax("c", &["x"]),
            &[vec![1.0], vec![f64::NAN]],
        )
        .unwrap();
        assert_eq!(t.missing_cells(), vec![("b".to_string(), "x".to_string())]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let r = tax("r", &["a"]);
        let v1 = SectorVector::from_pairs(r.clone(), [("a", 1.0)]).unwrap();
        let v2 = SectorVector::from_pairs(r.clone(), [("a", 1.0)]).unwrap();
        let v3 = SectorVector::from_pairs(r, [("a", 2.0)]).unwrap();
        assert_eq!(v1.fingerprint(), v2.fingerprint());
        assert_ne!(v1.fingerprint(), v3.fingerprint());
    }

    #[test]
    fn from_pairs_rejects_unknown_codes() {
        let err = SectorVector::from_pairs(tax("r", &["a"]), [("q", 1.0)]).unwrap_err();
        assert!(err.to_string().contains('q'));
    }
}
