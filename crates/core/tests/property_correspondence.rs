// Property-based tests for correspondence construction.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::sync::Arc;

use eeio_core::{CorrespondenceMatrix, Invariants, Mapping, StructureError, Taxonomy};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Incidence as domain-major rows of booleans: `links[j][i]` = domain j maps to range i.
fn arb_links() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize..7, 1usize..7).prop_flat_map(|(n_dom, n_rng)| {
        prop::collection::vec(prop::collection::vec(prop::bool::weighted(0.35), n_rng), n_dom)
    })
}

fn setup(links: &[Vec<bool>]) -> (Mapping, Arc<Taxonomy>, Arc<Taxonomy>) {
    let n_rng = links[0].len();
    let domain = Taxonomy::new("dom", (0..links.len()).map(|j| format!("d{j}")))
        .unwrap()
        .shared();
    let range = Taxonomy::new("rng", (0..n_rng).map(|i| format!("r{i}")))
        .unwrap()
        .shared();
    let mapping = links
        .iter()
        .enumerate()
        .map(|(j, row)| {
            let targets = row
                .iter()
                .enumerate()
                .filter(|(_, hit)| **hit)
                .map(|(i, _)| format!("r{i}"))
                .collect();
            (format!("d{j}"), targets)
        })
        .collect();
    (mapping, domain, range)
}

fn incoming(links: &[Vec<bool>], i: usize) -> usize {
    links.iter().filter(|row| row[i]).count()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn complete_fails_iff_some_range_code_unhit(links in arb_links()) {
        let (m, d, r) = setup(&links);
        let unhit: Vec<String> = (0..links[0].len())
            .filter(|&i| incoming(&links, i) == 0)
            .map(|i| format!("r{i}"))
            .collect();
        let result = CorrespondenceMatrix::build(&m, d, r, Invariants::default().complete());
        if unhit.is_empty() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                StructureError::Incomplete { range: "rng".into(), codes: unhit }
            );
        }
    }

    #[test]
    fn injective_fails_iff_some_range_code_hit_twice(links in arb_links()) {
        let (m, d, r) = setup(&links);
        let shared: Vec<String> = (0..links[0].len())
            .filter(|&i| incoming(&links, i) > 1)
            .map(|i| format!("r{i}"))
            .collect();
        let result = CorrespondenceMatrix::build(&m, d, r, Invariants::default().injective());
        if shared.is_empty() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                StructureError::NotInjective { range: "rng".into(), codes: shared }
            );
        }
    }

    #[test]
    fn surjective_fails_iff_some_domain_code_maps_nowhere(links in arb_links()) {
        let (m, d, r) = setup(&links);
        let any_empty = links.iter().any(|row| !row.contains(&true));
        let result = CorrespondenceMatrix::build(&m, d, r, Invariants::default().surjective());
        prop_assert_eq!(result.is_err(), any_empty);
    }

    #[test]
    fn matrix_is_binary_and_matches_links(links in arb_links()) {
        let (m, d, r) = setup(&links);
        let c = CorrespondenceMatrix::build(&m, d, r, Invariants::default()).unwrap();
        for (j, row) in links.iter().enumerate() {
            for (i, hit) in row.iter().enumerate() {
                prop_assert_eq!(c.values()[[i, j]], if *hit { 1.0 } else { 0.0 });
            }
        }
        let cols = c.column_normalized();
        for j in 0..links.len() {
            let s: f64 = cols.column(j).sum();
            let expected = if links[j].contains(&true) { 1.0 } else { 0.0 };
            prop_assert!((s - expected).abs() < 1e-12);
        }
    }
}
