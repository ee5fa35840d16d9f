//! Correspondence matrices: a checked 0/1 relation between two taxonomies.
//!
//! The matrix is stored `[range × domain]`, so `C · v` carries a
//! domain-indexed vector onto the range. Construction is the only place the
//! completeness, injectivity and surjectivity invariants are checked; a
//! built matrix is never mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array1, Array2, Axis as NdAxis};

use crate::error::StructureError;
use crate::mapping::Mapping;
use crate::table::{Fingerprint, SectorVector, Table};
use crate::taxonomy::Taxonomy;

/// Invariants to enforce at construction. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invariants {
    /// Every range code is hit by at least one domain code.
    pub complete: bool,
    /// No range code is hit by more than one domain code.
    pub injective: bool,
    /// Every domain code maps to at least one range code.
    pub surjective: bool,
}

impl Invariants {
    pub fn all() -> Self {
        Self {
            complete: true,
            injective: true,
            surjective: true,
        }
    }

    pub fn complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn injective(mut self) -> Self {
        self.injective = true;
        self
    }

    pub fn surjective(mut self) -> Self {
        self.surjective = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CorrespondenceMatrix {
    domain: Arc<Taxonomy>,
    range: Arc<Taxonomy>,
    values: Array2<f64>,
    /// range position → domain positions mapping onto it
    preimages: Vec<Vec<usize>>,
    /// domain position → range positions it maps onto
    images: Vec<Vec<usize>>,
}

impl PartialEq for CorrespondenceMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.range == other.range && self.values == other.values
    }
}

impl CorrespondenceMatrix {
    /// Materialize `mapping` over the full declared domain and range.
    ///
    /// Codes absent from the mapping get empty rows/columns. Codes present in
    /// the mapping but not declared fail rather than being dropped.
    pub fn build(
        mapping: &Mapping,
        domain: Arc<Taxonomy>,
        range: Arc<Taxonomy>,
        invariants: Invariants,
    ) -> Result<Self, StructureError> {
        let unknown_keys: Vec<String> =
            mapping.keys().filter(|k| !domain.contains(k)).cloned().collect();
        if !unknown_keys.is_empty() {
            return Err(StructureError::UnknownCode {
                taxonomy: domain.name().to_string(),
                codes: unknown_keys,
            });
        }

        let mut values = Array2::zeros((range.len(), domain.len()));
        let mut unknown_targets = Vec::new();
        for (src, targets) in mapping {
            let Some(j) = domain.position(src) else { continue };
            for t in targets {
                match range.position(t) {
                    Some(i) => values[[i, j]] = 1.0,
                    None => {
                        if !unknown_targets.contains(t) {
                            unknown_targets.push(t.clone());
                        }
                    }
                }
            }
        }
        if !unknown_targets.is_empty() {
            return Err(StructureError::UnknownCode {
                taxonomy: range.name().to_string(),
                codes: unknown_targets,
            });
        }

        let built = Self::from_binary(domain, range, values);
        built.check(invariants)?;
        log::debug!(
            "built correspondence '{}' -> '{}' ({} x {})",
            built.domain.name(),
            built.range.name(),
            built.range.len(),
            built.domain.len()
        );
        Ok(built)
    }

    /// The identity correspondence of a taxonomy onto itself.
    pub fn identity(taxonomy: Arc<Taxonomy>) -> Self {
        let values = Array2::eye(taxonomy.len());
        Self::from_binary(taxonomy.clone(), taxonomy, values)
    }

    fn from_binary(domain: Arc<Taxonomy>, range: Arc<Taxonomy>, values: Array2<f64>) -> Self {
        let mut preimages = vec![Vec::new(); range.len()];
        let mut images = vec![Vec::new(); domain.len()];
        for ((i, j), v) in values.indexed_iter() {
            if *v != 0.0 {
                preimages[i].push(j);
                images[j].push(i);
            }
        }
        Self {
            domain,
            range,
            values,
            preimages,
            images,
        }
    }

    fn check(&self, invariants: Invariants) -> Result<(), StructureError> {
        if invariants.complete {
            let codes = self.range_codes_where(|n| n == 0);
            if !codes.is_empty() {
                return Err(StructureError::Incomplete {
                    range: self.range.name().to_string(),
                    codes,
                });
            }
        }
        if invariants.injective {
            let codes = self.range_codes_where(|n| n > 1);
            if !codes.is_empty() {
                return Err(StructureError::NotInjective {
                    range: self.range.name().to_string(),
                    codes,
                });
            }
        }
        if invariants.surjective {
            let codes: Vec<String> = self
                .images
                .iter()
                .enumerate()
                .filter(|(_, img)| img.is_empty())
                .map(|(j, _)| self.domain.code(j).to_string())
                .collect();
            if !codes.is_empty() {
                return Err(StructureError::NotSurjective {
                    domain: self.domain.name().to_string(),
                    codes,
                });
            }
        }
        Ok(())
    }

    fn range_codes_where(&self, pred: impl Fn(usize) -> bool) -> Vec<String> {
        self.preimages
            .iter()
            .enumerate()
            .filter(|(_, pre)| pred(pre.len()))
            .map(|(i, _)| self.range.code(i).to_string())
            .collect()
    }

    pub fn domain(&self) -> &Arc<Taxonomy> {
        &self.domain
    }

    pub fn range(&self) -> &Arc<Taxonomy> {
        &self.range
    }

    /// `[range × domain]` 0/1 values.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Domain positions mapping onto range position `i`.
    pub fn preimage_of(&self, i: usize) -> &[usize] {
        &self.preimages[i]
    }

    /// Range positions that domain position `j` maps onto.
    pub fn image_of(&self, j: usize) -> &[usize] {
        &self.images[j]
    }

    /// Domain codes mapping onto `range_code`, or `None` if it is not a range code.
    pub fn preimage(&self, range_code: &str) -> Option<Vec<&str>> {
        let i = self.range.position(range_code)?;
        Some(self.preimages[i].iter().map(|&j| self.domain.code(j)).collect())
    }

    /// Range codes that `domain_code` maps onto.
    pub fn image(&self, domain_code: &str) -> Option<Vec<&str>> {
        let j = self.domain.position(domain_code)?;
        Some(self.images[j].iter().map(|&i| self.range.code(i)).collect())
    }

    /// Domain codes that map to nothing.
    pub fn uncovered_domain(&self) -> Vec<&str> {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, img)| img.is_empty())
            .map(|(j, _)| self.domain.code(j))
            .collect()
    }

    /// Every domain code maps to at most one range code.
    pub fn is_many_to_one(&self) -> bool {
        self.images.iter().all(|img| img.len() <= 1)
    }

    /// Swap domain and range.
    pub fn reversed(&self) -> Self {
        Self::from_binary(self.range.clone(), self.domain.clone(), self.values.t().to_owned())
    }

    /// Column-normalized values: each domain code's unit is distributed, not
    /// duplicated, across its range codes. Empty columns stay zero.
    pub fn column_normalized(&self) -> Array2<f64> {
        let sums = self.values.sum_axis(NdAxis(0));
        let mut out = self.values.clone();
        for (mut col, s) in out.axis_iter_mut(NdAxis(1)).zip(sums.iter()) {
            if *s > 0.0 {
                col.mapv_inplace(|v| v / s);
            }
        }
        out
    }

    /// Range code → the first domain code (in domain order) mapping onto it.
    pub fn parent_map(&self) -> BTreeMap<String, String> {
        self.preimages
            .iter()
            .enumerate()
            .filter_map(|(i, pre)| {
                pre.first()
                    .map(|&j| (self.range.code(i).to_string(), self.domain.code(j).to_string()))
            })
            .collect()
    }

    /// Connected components of the bipartite relation, as
    /// (domain positions, range positions). Unmapped codes are omitted.
    ///
    /// Totals are conserved per component under any normalized
    /// redistribution, which makes these the unit of marginal checks.
    pub fn blocks(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        let n_dom = self.domain.len();
        let mut parent: Vec<usize> = (0..n_dom + self.range.len()).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for (j, img) in self.images.iter().enumerate() {
            for &i in img {
                let a = find(&mut parent, j);
                let b = find(&mut parent, n_dom + i);
                if a != b {
                    parent[a] = b;
                }
            }
        }

        let mut groups: BTreeMap<usize, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for j in 0..n_dom {
            if !self.images[j].is_empty() {
                let root = find(&mut parent, j);
                groups.entry(root).or_default().0.push(j);
            }
        }
        for i in 0..self.range.len() {
            if !self.preimages[i].is_empty() {
                let root = find(&mut parent, n_dom + i);
                groups.entry(root).or_default().1.push(i);
            }
        }
        groups.into_values().collect()
    }

    /// `C · v` for a domain-indexed vector.
    pub fn aggregate_vector(&self, v: &SectorVector) -> Result<SectorVector, StructureError> {
        self.domain.ensure_same(v.index(), "vector index")?;
        let values: Array1<f64> = self.values.dot(v.values());
        SectorVector::new(self.range.clone(), values)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&[&self.range, &self.domain], self.values.iter().copied())
    }
}

impl Table {
    /// `C_r · B · C_cᵀ`: re-express this table in the correspondences' ranges.
    pub fn aggregate(
        &self,
        row_corresp: &CorrespondenceMatrix,
        col_corresp: &CorrespondenceMatrix,
    ) -> Result<Table, StructureError> {
        row_corresp.domain().ensure_same(self.rows(), "table rows")?;
        col_corresp.domain().ensure_same(self.cols(), "table columns")?;
        let values = row_corresp
            .values()
            .dot(self.values())
            .dot(&col_corresp.values().t());
        Table::new(row_corresp.range().clone(), col_corresp.range().clone(), values)
    }
}
