// End-to-end reflection scenarios and properties.
// CI: 128 cases. Soak: PROPTEST_CASES=10000 cargo test --release -p eeio-reflect

use std::collections::BTreeSet;
use std::sync::Arc;

use eeio_core::{mapping_from, CorrespondenceMatrix, Invariants, Mapping, Table, Taxonomy};
use eeio_reflect::{
    block_distribution, expand_square_matrix, reflect_matrix, reflect_symmetric, DerivationCache,
    ParentMap, ReflectError, ReflectOptions, SiblingGroup, WeightSource,
};
use ndarray::Array2;
use proptest::prelude::*;

fn tax(name: &str, codes: &[&str]) -> Arc<Taxonomy> {
    Taxonomy::new(name, codes.iter().copied()).unwrap().shared()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + b.abs())
}

fn abc_to_a_bc() -> CorrespondenceMatrix {
    let m = mapping_from([("A", vec!["A"]), ("B", vec!["BC"]), ("C", vec!["BC"])]);
    CorrespondenceMatrix::build(
        &m,
        tax("fine", &["A", "B", "C"]),
        tax("coarse", &["A", "BC"]),
        Invariants::default().complete().surjective(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Literal scenarios
// ---------------------------------------------------------------------------

#[test]
fn aggregate_then_split_back() {
    let down = abc_to_a_bc();
    let base = Table::from_rows(
        down.domain().clone(),
        down.domain().clone(),
        &[
            vec![100.0, 10.0, 0.0],
            vec![5.0, 200.0, 0.0],
            vec![0.0, 0.0, 300.0],
        ],
    )
    .unwrap();
    let coarse_weights = Table::from_rows(
        down.range().clone(),
        down.range().clone(),
        &[vec![1.0, 0.0], vec![0.0, 0.6]],
    )
    .unwrap();

    let coarse = reflect_symmetric(&down, &base, &coarse_weights, &ReflectOptions::default()).unwrap();
    assert_eq!(coarse.table.get("A", "A"), Some(100.0));
    assert_eq!(coarse.table.get("A", "BC"), Some(10.0));
    assert_eq!(coarse.table.get("BC", "A"), Some(5.0));
    assert_eq!(coarse.table.get("BC", "BC"), Some(500.0));
    assert_eq!(coarse.report.equal_split_cells, 2);
    assert!(close(coarse.report.reflected_total, 615.0));

    // Back onto the fine codes with a rank-one weight profile.
    let up = down.reversed();
    let profile = [1.0, 0.6, 0.4];
    let fine_weights = Table::new(
        up.range().clone(),
        up.range().clone(),
        Array2::from_shape_fn((3, 3), |(i, j)| profile[i] * profile[j]),
    )
    .unwrap();
    let fine = reflect_symmetric(&up, &coarse.table, &fine_weights, &ReflectOptions::default()).unwrap();

    let expected = [
        ("A", "A", 100.0),
        ("A", "B", 6.0),
        ("A", "C", 4.0),
        ("B", "A", 3.0),
        ("C", "A", 2.0),
        ("B", "B", 180.0),
        ("B", "C", 120.0),
        ("C", "B", 120.0),
        ("C", "C", 80.0),
    ];
    for (r, c, v) in expected {
        let got = fine.table.get(r, c).unwrap();
        assert!(close(got, v), "{r}/{c}: {got} vs {v}");
    }
    assert_eq!(fine.report.equal_split_cells, 0);
}

#[test]
fn zero_weight_block_falls_back_then_splits_evenly() {
    let m = mapping_from([("X", vec!["p", "q"])]);
    let c = CorrespondenceMatrix::build(&m, tax("one", &["X"]), tax("two", &["p", "q"]), Invariants::all())
        .unwrap();
    let base = Table::from_rows(c.domain().clone(), c.domain().clone(), &[vec![1.0]]).unwrap();
    let zeros = Table::zeros(c.range().clone(), c.range().clone());

    let even = reflect_symmetric(&c, &base, &zeros, &ReflectOptions::default()).unwrap();
    for r in ["p", "q"] {
        for col in ["p", "q"] {
            assert_eq!(even.table.get(r, col), Some(0.25));
        }
    }
    assert_eq!(even.report.equal_split_cells, 1);

    let fb = Table::from_rows(c.range().clone(), c.range().clone(), &[vec![3.0, 1.0], vec![0.0, 0.0]])
        .unwrap();
    let opts = ReflectOptions {
        fallback: Some(&fb),
        ..ReflectOptions::default()
    };
    let shaped = reflect_symmetric(&c, &base, &zeros, &opts).unwrap();
    assert_eq!(shaped.table.get("p", "p"), Some(0.75));
    assert_eq!(shaped.table.get("p", "q"), Some(0.25));
    assert_eq!(shaped.table.get("q", "q"), Some(0.0));
    assert_eq!(shaped.report.fallback_cells, 1);
}

#[test]
fn undeclared_uncovered_rows_fail_and_declared_ones_drop() {
    let m = mapping_from([("A", vec!["a"])]);
    let rows = CorrespondenceMatrix::build(&m, tax("src", &["A", "Z"]), tax("dst", &["a"]), Invariants::default())
        .unwrap();
    let cols = CorrespondenceMatrix::identity(tax("k", &["k"]));
    let base = Table::from_rows(rows.domain().clone(), cols.domain().clone(), &[vec![4.0], vec![6.0]])
        .unwrap();
    let weights = Table::from_rows(rows.range().clone(), cols.range().clone(), &[vec![1.0]]).unwrap();

    let err = reflect_matrix(&rows, &cols, &base, &weights, &ReflectOptions::default()).unwrap_err();
    assert_eq!(err, ReflectError::Coverage { axis: "row", codes: vec!["Z".into()] });

    let opts = ReflectOptions {
        expected_row_dropped: ["Z".to_string()].into_iter().collect(),
        ..ReflectOptions::default()
    };
    let out = reflect_matrix(&rows, &cols, &base, &weights, &opts).unwrap();
    assert_eq!(out.table.get("a", "k"), Some(4.0));
    assert_eq!(out.report.dropped_total, 6.0);
    assert_eq!(out.report.covered_total, 4.0);
}

#[test]
fn cache_reuses_reflections_of_identical_inputs() {
    let up = abc_to_a_bc().reversed();
    let base = Table::from_rows(
        up.domain().clone(),
        up.domain().clone(),
        &[vec![1.0, 2.0], vec![3.0, 4.0]],
    )
    .unwrap();
    let weights = Table::zeros(up.range().clone(), up.range().clone()).map(|_| 1.0);
    let opts = ReflectOptions::default();

    let mut cache = DerivationCache::new();
    let first = cache.reflect(&up, &up, &base, &weights, &opts).unwrap();
    let second = cache.reflect(&up, &up, &base, &weights, &opts).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));

    let doubled = base.map(|v| 2.0 * v);
    let third = cache.reflect(&up, &up, &doubled, &weights, &opts).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(cache.misses(), 2);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// (parent of each fine code, positive fine-level table values row-major).
/// The first `k` fine codes are pinned to distinct parents so every coarse
/// code has at least one child.
fn arb_aggregation() -> impl Strategy<Value = (usize, Vec<usize>, Vec<f64>)> {
    (1usize..5)
        .prop_flat_map(|k| (Just(k), k..9usize))
        .prop_flat_map(|(k, n)| {
            (
                Just(k),
                prop::collection::vec(0..k, n),
                prop::collection::vec(0.01f64..1000.0, n * n),
            )
        })
        .prop_map(|(k, mut parents, values)| {
            for (i, p) in parents.iter_mut().enumerate().take(k) {
                *p = i;
            }
            (k, parents, values)
        })
}

fn fine_to_coarse(k: usize, parents: &[usize]) -> CorrespondenceMatrix {
    let fine = Taxonomy::new("fine", (0..parents.len()).map(|i| format!("f{i}")))
        .unwrap()
        .shared();
    let coarse = Taxonomy::new("coarse", (0..k).map(|i| format!("c{i}"))).unwrap().shared();
    let mapping: Mapping = parents
        .iter()
        .enumerate()
        .map(|(i, p)| (format!("f{i}"), vec![format!("c{p}")]))
        .collect();
    CorrespondenceMatrix::build(&mapping, fine, coarse, Invariants::default().complete().surjective())
        .unwrap()
}

proptest! {
    #![proptest_config(config_128())]

    /// Splitting an aggregate with the table it came from recovers that table.
    #[test]
    fn reflecting_an_aggregate_with_its_source_recovers_the_source(
        (k, parents, values) in arb_aggregation()
    ) {
        let down = fine_to_coarse(k, &parents);
        let n = parents.len();
        let fine = Table::new(
            down.domain().clone(),
            down.domain().clone(),
            Array2::from_shape_vec((n, n), values).unwrap(),
        ).unwrap();
        let coarse = fine.aggregate(&down, &down).unwrap();

        let up = down.reversed();
        let back = reflect_symmetric(&up, &coarse, &fine, &ReflectOptions::default()).unwrap();
        for ((i, j), v) in fine.values().indexed_iter() {
            let got = back.table.values()[[i, j]];
            prop_assert!(close(got, *v), "cell {i},{j}: {got} vs {v}");
        }
    }

    /// Whatever the weights, the aggregate of a reflection is the base.
    #[test]
    fn reflection_conserves_every_coarse_cell(
        (k, parents, values) in arb_aggregation(),
        zero_mask in prop::collection::vec(prop::bool::weighted(0.3), 64),
    ) {
        let down = fine_to_coarse(k, &parents);
        let up = down.reversed();
        let n = parents.len();
        let mut w = Array2::from_shape_vec((n, n), values).unwrap();
        for (idx, cell) in w.iter_mut().enumerate() {
            if zero_mask[idx % zero_mask.len()] {
                *cell = 0.0;
            }
        }
        let weights = Table::new(up.range().clone(), up.range().clone(), w).unwrap();
        let base = Table::new(
            up.domain().clone(),
            up.domain().clone(),
            Array2::from_shape_fn((k, k), |(i, j)| (1 + i * k + j) as f64),
        ).unwrap();

        let out = reflect_symmetric(&up, &base, &weights, &ReflectOptions::default()).unwrap();
        let again = out.table.aggregate(&down, &down).unwrap();
        for ((i, j), v) in base.values().indexed_iter() {
            let got = again.values()[[i, j]];
            prop_assert!(close(got, *v), "cell {i},{j}: {got} vs {v}");
        }
        prop_assert!(out.table.values().iter().all(|v| *v >= 0.0));
    }
}

proptest! {
    #![proptest_config(config_128())]

    /// A block's distribution sums to one; an all-zero block is split evenly.
    #[test]
    fn block_distributions_are_normalized(
        raw in prop::collection::vec(prop_oneof![Just(0.0f64), 0.0f64..100.0], 16),
        rows in 1usize..5,
        cols in 1usize..5,
    ) {
        let w = Array2::from_shape_vec((4, 4), raw).unwrap();
        let r: Vec<usize> = (0..rows).collect();
        let c: Vec<usize> = (0..cols).collect();
        let (shares, source) = block_distribution(&w, None, &r, &c);

        prop_assert_eq!(shares.len(), rows * cols);
        let total: f64 = shares.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-8, "sum {total}");
        if source == WeightSource::EqualSplit {
            let k = (rows * cols) as f64;
            prop_assert!(shares.iter().all(|s| *s == 1.0 / k));
        }
    }

    /// Expanded siblings never trade with each other and keep the parent's
    /// own coefficient on their diagonal.
    #[test]
    fn sibling_expansion_suppresses_intragroup_flows(
        values in prop::collection::vec(0.0f64..10.0, 9),
        n in 2usize..6,
    ) {
        let source = tax("coarse", &["X", "P", "Y"]);
        let m = Table::new(
            source.clone(),
            source,
            Array2::from_shape_vec((3, 3), values).unwrap(),
        ).unwrap();

        let siblings: Vec<String> = (0..n).map(|i| format!("P{i}")).collect();
        let mut codes = vec!["X".to_string()];
        codes.extend(siblings.iter().cloned());
        codes.push("Y".to_string());
        let target = Taxonomy::new("fine", codes).unwrap().shared();

        let mut parents = ParentMap::new();
        parents.insert("X".to_string(), "X".to_string());
        parents.insert("Y".to_string(), "Y".to_string());
        for s in &siblings {
            parents.insert(s.clone(), "P".to_string());
        }
        let group = SiblingGroup { parent: "P".to_string(), codes: siblings.clone() };
        let out = expand_square_matrix(&m, target, &parents, &[group]).unwrap();

        let parent_self = m.get("P", "P").unwrap();
        for a in &siblings {
            for b in &siblings {
                let v = out.get(a, b).unwrap();
                if a == b {
                    prop_assert_eq!(v, parent_self);
                } else {
                    prop_assert_eq!(v, 0.0);
                }
            }
        }
        // Flows between the group and the rest are unchanged in aggregate.
        for other in ["X", "Y"] {
            let into: f64 = siblings.iter().map(|s| out.get(other, s).unwrap()).sum();
            prop_assert!(close(into, m.get(other, "P").unwrap()));
        }
    }
}

/// Many-to-many incidence, domain-major: `links[j][i]` = domain j maps to range i.
fn arb_links() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize..6, 1usize..6).prop_flat_map(|(n_dom, n_rng)| {
        prop::collection::vec(prop::collection::vec(prop::bool::weighted(0.4), n_rng), n_dom)
    })
}

fn linked(links: &[Vec<bool>]) -> CorrespondenceMatrix {
    let dom = Taxonomy::new("dom", (0..links.len()).map(|j| format!("d{j}")))
        .unwrap()
        .shared();
    let rng = Taxonomy::new("rng", (0..links[0].len()).map(|i| format!("r{i}")))
        .unwrap()
        .shared();
    let mapping: Mapping = links
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
    CorrespondenceMatrix::build(&mapping, dom, rng, Invariants::default()).unwrap()
}

proptest! {
    #![proptest_config(config_128())]

    /// Through a many-to-many correspondence, every connected block of codes
    /// keeps the base marginal it covers, on rows and on columns.
    #[test]
    fn many_to_many_reflection_conserves_block_marginals(
        links in arb_links(),
        base_values in prop::collection::vec(0.0f64..100.0, 25),
        weight_values in prop::collection::vec(prop_oneof![Just(0.0f64), 0.1f64..10.0], 25),
    ) {
        let c = linked(&links);
        let (n_dom, n_rng) = (c.domain().len(), c.range().len());
        let base = Table::new(
            c.domain().clone(),
            c.domain().clone(),
            Array2::from_shape_fn((n_dom, n_dom), |(i, j)| base_values[i * 5 + j]),
        ).unwrap();
        let weights = Table::new(
            c.range().clone(),
            c.range().clone(),
            Array2::from_shape_fn((n_rng, n_rng), |(i, j)| weight_values[i * 5 + j]),
        ).unwrap();

        let dropped: BTreeSet<String> = c.uncovered_domain().into_iter().map(String::from).collect();
        let opts = ReflectOptions {
            expected_row_dropped: dropped.clone(),
            expected_col_dropped: dropped.clone(),
            ..ReflectOptions::default()
        };
        let out = reflect_symmetric(&c, &base, &weights, &opts).unwrap();

        let kept: Vec<bool> = c.domain().codes().iter().map(|code| !dropped.contains(code)).collect();
        let b = base.values();
        let row_sums = out.table.row_sums();
        let col_sums = out.table.col_sums();
        for (dom, rng) in c.blocks() {
            let base_rows: f64 = dom.iter()
                .map(|&i| (0..n_dom).filter(|&j| kept[j]).map(|j| b[[i, j]]).sum::<f64>())
                .sum();
            let base_cols: f64 = dom.iter()
                .map(|&j| (0..n_dom).filter(|&i| kept[i]).map(|i| b[[i, j]]).sum::<f64>())
                .sum();
            let got_rows: f64 = rng.iter().map(|&p| row_sums.values()[p]).sum();
            let got_cols: f64 = rng.iter().map(|&q| col_sums.values()[q]).sum();
            prop_assert!((got_rows - base_rows).abs() < 1e-6, "rows {got_rows} vs {base_rows}");
            prop_assert!((got_cols - base_cols).abs() < 1e-6, "cols {got_cols} vs {base_cols}");
        }
        prop_assert!((out.report.reflected_total - out.report.covered_total).abs() < 1e-6);
    }
}
