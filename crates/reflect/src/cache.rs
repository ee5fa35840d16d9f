//! Explicit memoization of derived tables, passed to whoever needs it.
//!
//! Keys are content fingerprints of the inputs, so two calls with equal
//! inputs share one result no matter where the inputs came from.

use std::sync::Arc;

use eeio_core::{CorrespondenceMatrix, Fingerprint, StructureError, Table};
use rustc_hash::FxHashMap;

use crate::error::ReflectError;
use crate::reflect::{reflect_matrix, ReflectOptions, Reflection};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReflectionKey {
    rows: Fingerprint,
    cols: Fingerprint,
    base: Fingerprint,
    weights: Fingerprint,
    fallback: Option<Fingerprint>,
    options: blake3::Hash,
}

fn options_digest(opts: &ReflectOptions<'_>) -> blake3::Hash {
    let mut h = blake3::Hasher::new();
    h.update(&[opts.normalize as u8]);
    for set in [&opts.expected_row_dropped, &opts.expected_col_dropped] {
        for code in set {
            h.update(code.as_bytes());
            h.update(&[0]);
        }
        h.update(&[0xff]);
    }
    let t = opts.tolerance;
    for v in [t.absolute, t.relative, t.normalization] {
        h.update(&v.to_bits().to_le_bytes());
    }
    h.finalize()
}

#[derive(Debug, Default)]
pub struct DerivationCache {
    correspondences: FxHashMap<String, Arc<CorrespondenceMatrix>>,
    reflections: FxHashMap<ReflectionKey, Arc<Reflection>>,
    hits: usize,
    misses: usize,
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The correspondence registered under `name`, building it on first use.
    pub fn correspondence<F>(
        &mut self,
        name: &str,
        build: F,
    ) -> Result<Arc<CorrespondenceMatrix>, StructureError>
    where
        F: FnOnce() -> Result<CorrespondenceMatrix, StructureError>,
    {
        if let Some(c) = self.correspondences.get(name) {
            self.hits += 1;
            return Ok(c.clone());
        }
        self.misses += 1;
        let built = Arc::new(build()?);
        self.correspondences.insert(name.to_string(), built.clone());
        Ok(built)
    }

    /// Memoized [`reflect_matrix`].
    pub fn reflect(
        &mut self,
        row_corresp: &CorrespondenceMatrix,
        col_corresp: &CorrespondenceMatrix,
        base: &Table,
        weights: &Table,
        opts: &ReflectOptions<'_>,
    ) -> Result<Arc<Reflection>, ReflectError> {
        let key = ReflectionKey {
            rows: row_corresp.fingerprint(),
            cols: col_corresp.fingerprint(),
            base: base.fingerprint(),
            weights: weights.fingerprint(),
            fallback: opts.fallback.map(|t| t.fingerprint()),
            options: options_digest(opts),
        };
        if let Some(hit) = self.reflections.get(&key) {
            self.hits += 1;
            log::debug!("reflection cache hit ({})", key.base);
            return Ok(hit.clone());
        }
        self.misses += 1;
        let out = Arc::new(reflect_matrix(row_corresp, col_corresp, base, weights, opts)?);
        self.reflections.insert(key, out.clone());
        Ok(out)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.correspondences.len() + self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.correspondences.clear();
        self.reflections.clear();
    }
}
