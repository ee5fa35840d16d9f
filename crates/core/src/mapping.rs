//! Code-to-codes mappings, the authored form of a correspondence.
//!
//! Mappings are data: one code may map to zero, one, or several codes.
//! Long correspondence chains are composed with [`traverse`] and inverted
//! with [`reverse`] rather than written out by hand.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::StructureError;
use crate::taxonomy::Taxonomy;

/// Domain code → list of range codes. Ordered for deterministic iteration.
pub type Mapping = BTreeMap<String, Vec<String>>;

/// Domain code → (range code → weight), weights summing to 1 per key.
pub type WeightedMapping = BTreeMap<String, BTreeMap<String, f64>>;

/// Build a mapping from string slices. Convenient for constant tables.
pub fn mapping_from<'a, I, V>(entries: I) -> Mapping
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: IntoIterator<Item = &'a str>,
{
    entries
        .into_iter()
        .map(|(k, vs)| (k.to_string(), vs.into_iter().map(str::to_string).collect()))
        .collect()
}

fn dedup_sorted(codes: Vec<String>) -> Vec<String> {
    codes.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Compose `m0_1` with `m1_2` into `m0_2`.
///
/// Intermediate codes missing from `m1_2` contribute nothing. Duplicate
/// targets reached through different intermediates collapse to one.
pub fn traverse(m0_1: &Mapping, m1_2: &Mapping) -> Mapping {
    m0_1.iter()
        .map(|(t0, t1s)| {
            let t2s = t1s
                .iter()
                .flat_map(|t1| m1_2.get(t1).into_iter().flatten().cloned())
                .collect();
            (t0.clone(), dedup_sorted(t2s))
        })
        .collect()
}

/// Invert a mapping, collecting every source that reaches the same target.
///
/// When `new_domain` is given, every key of the reversed mapping must be in it.
pub fn reverse(m0_1: &Mapping, new_domain: Option<&Taxonomy>) -> Result<Mapping, StructureError> {
    let mut m1_0: Mapping = BTreeMap::new();
    for (t0, t1s) in m0_1 {
        for t1 in t1s {
            m1_0.entry(t1.clone()).or_default().push(t0.clone());
        }
    }
    let m1_0: Mapping = m1_0.into_iter().map(|(k, v)| (k, dedup_sorted(v))).collect();

    if let Some(domain) = new_domain {
        let unknown: Vec<String> = m1_0.keys().filter(|k| !domain.contains(k)).cloned().collect();
        if !unknown.is_empty() {
            return Err(StructureError::UnknownCode {
                taxonomy: domain.name().to_string(),
                codes: unknown,
            });
        }
    }
    Ok(m1_0)
}

/// Options for [`validate_mapping`].
#[derive(Debug, Clone, Copy)]
pub struct MappingCheck {
    /// Keys must equal the domain exactly (otherwise only extra keys fail).
    pub domain_equal: bool,
    /// Permit keys that map to nothing (intentionally dropped codes).
    pub allow_empty: bool,
}

impl Default for MappingCheck {
    fn default() -> Self {
        Self {
            domain_equal: true,
            allow_empty: false,
        }
    }
}

/// Check that a mapping's keys live in `domain` and its values in `codomain`.
pub fn validate_mapping(
    m: &Mapping,
    domain: &Taxonomy,
    codomain: &Taxonomy,
    check: MappingCheck,
) -> Result<(), StructureError> {
    let extra: Vec<String> = m.keys().filter(|k| !domain.contains(k)).cloned().collect();
    if !extra.is_empty() {
        return Err(StructureError::UnknownCode {
            taxonomy: domain.name().to_string(),
            codes: extra,
        });
    }
    if check.domain_equal {
        let missing: Vec<String> = domain
            .codes()
            .iter()
            .filter(|c| !m.contains_key(*c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(StructureError::NotSurjective {
                domain: domain.name().to_string(),
                codes: missing,
            });
        }
    }
    if !check.allow_empty {
        let empty: Vec<String> = m
            .iter()
            .filter(|(_, vs)| vs.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        if !empty.is_empty() {
            return Err(StructureError::EmptyMapping { codes: empty });
        }
    }
    let unknown: BTreeSet<String> = m
        .values()
        .flatten()
        .filter(|v| !codomain.contains(v))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(StructureError::UnknownCode {
            taxonomy: codomain.name().to_string(),
            codes: unknown.into_iter().collect(),
        });
    }
    Ok(())
}

/// Check a weighted mapping: keys equal the domain, targets within the
/// codomain, and each non-empty weight set sums to 1.
pub fn validate_weighted_mapping(
    m: &WeightedMapping,
    domain: &Taxonomy,
    codomain: &Taxonomy,
) -> Result<(), StructureError> {
    let keys: BTreeSet<&str> = m.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = domain.codes().iter().map(String::as_str).collect();
    if keys != expected {
        return Err(StructureError::DomainMismatch {
            domain: domain.name().to_string(),
            missing: expected.difference(&keys).map(|s| s.to_string()).collect(),
            extra: keys.difference(&expected).map(|s| s.to_string()).collect(),
        });
    }
    for (k, weights) in m {
        if weights.is_empty() {
            continue;
        }
        let total: f64 = weights.values().sum();
        if (total - 1.0).abs() > 1e-8 {
            return Err(StructureError::WeightsNotNormalized { code: k.clone(), total });
        }
        let unknown: Vec<String> = weights.keys().filter(|t| !codomain.contains(t)).cloned().collect();
        if !unknown.is_empty() {
            return Err(StructureError::UnknownCode {
                taxonomy: codomain.name().to_string(),
                codes: unknown,
            });
        }
    }
    Ok(())
}

/// Turn a one-to-many mapping into normalized weights.
///
/// At most `max_mapped` heaviest targets are kept per key, so that a broad
/// source code does not fan out across an unbounded number of sectors.
pub fn get_weightings(
    mapping: &Mapping,
    weights: &BTreeMap<String, f64>,
    max_mapped: Option<usize>,
) -> Result<WeightedMapping, StructureError> {
    let mut out = WeightedMapping::new();
    for (k, vs) in mapping {
        if vs.is_empty() {
            return Err(StructureError::EmptyMapping { codes: vec![k.clone()] });
        }
        let missing: Vec<String> = vs.iter().filter(|v| !weights.contains_key(*v)).cloned().collect();
        if !missing.is_empty() {
            return Err(StructureError::UnknownCode {
                taxonomy: "weights".into(),
                codes: missing,
            });
        }
        let mut kw: Vec<(String, f64)> = vs.iter().map(|v| (v.clone(), weights[v])).collect();
        if let Some(max) = max_mapped {
            if kw.len() > max {
                kw.sort_by(|a, b| b.1.total_cmp(&a.1));
                kw.truncate(max);
            }
        }
        let total: f64 = kw.iter().map(|(_, w)| w).sum();
        let n = kw.len() as f64;
        let normed = kw
            .into_iter()
            .map(|(v, w)| {
                let share = if total > 0.0 { w / total } else { 1.0 / n };
                (v, share)
            })
            .collect();
        out.insert(k.clone(), normed);
    }
    Ok(out)
}
