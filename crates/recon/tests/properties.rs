// Property-based tests for the join/diff/stats pipeline.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeMap;

use proptest::prelude::*;
use rekon_recon::{
    Column, ColumnMapping, ColumnSelector, DuplicatePolicy, ReconStats, Reconciliation, RowMapping, Table, Value,
};

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

/// Mostly whole/half numbers so differences are exact, sometimes absent.
fn arb_value() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (-10_000i64..10_000).prop_map(|n| Some(n as f64 / 2.0)),
        1 => Just(None),
    ]
}

/// (system1 rows, system2 rows, row map) with unique keys per side.
fn arb_case() -> impl Strategy<Value = (Vec<Option<f64>>, Vec<Option<f64>>, BTreeMap<usize, usize>)> {
    (
        prop::collection::vec(arb_value(), 0..30),
        prop::collection::vec(arb_value(), 0..30),
    )
        .prop_flat_map(|(s1, s2)| {
            let n1 = s1.len();
            let n2 = s2.len().max(1);
            let links = prop::collection::btree_map(0..n1.max(1), 0..n2 + 3, 0..=n1 / 2);
            (Just(s1), Just(s2), links)
        })
}

fn build(s1: &[Option<f64>], s2: &[Option<f64>], links: &BTreeMap<usize, usize>) -> Reconciliation {
    let t1 = Table::new(vec![
        Column::new("id", (0..s1.len()).map(|i| Value::Text(format!("a{i}"))).collect()),
        Column::new("val", s1.iter().map(|v| Value::from(*v)).collect()),
    ])
    .unwrap();
    let t2 = Table::new(vec![
        Column::new("ref", (0..s2.len()).map(|i| Value::Text(format!("b{i}"))).collect()),
        Column::new("amount", s2.iter().map(|v| Value::from(*v)).collect()),
    ])
    .unwrap();
    // Links may point past the end of system2: those rows stay unmatched.
    let pairs = links.iter().map(|(a, b)| (format!("a{a}"), format!("b{b}")));

    Reconciliation::new(t1, t2)
        .with_column_mapping(ColumnMapping::from_pairs([("id", "ref"), ("val", "amount")]).unwrap())
        .with_row_mapping(RowMapping::from_pairs(pairs, DuplicatePolicy::Reject).unwrap())
}

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_system1_row_exactly_once_in_order((s1, s2, links) in arb_case()) {
        let mut rec = build(&s1, &s2, &links);
        let result = rec.reconcile(&ColumnSelector::default()).unwrap();
        prop_assert_eq!(result.len(), s1.len());
        for (i, row) in result.rows.iter().enumerate() {
            prop_assert_eq!(&row.system1_key, &Value::Text(format!("a{i}")));
            prop_assert_eq!(row.system1_value, s1[i]);
        }
    }

    #[test]
    fn diff_null_iff_an_operand_is_null((s1, s2, links) in arb_case()) {
        let mut rec = build(&s1, &s2, &links);
        let result = rec.reconcile(&ColumnSelector::default()).unwrap();
        for row in &result.rows {
            match (row.system1_value, row.system2_value) {
                (Some(a), Some(b)) => prop_assert_eq!(row.diff, Some(a - b)),
                _ => prop_assert_eq!(row.diff, None),
            }
        }
    }

    #[test]
    fn matched_rows_follow_the_row_map((s1, s2, links) in arb_case()) {
        let mut rec = build(&s1, &s2, &links);
        let result = rec.reconcile(&ColumnSelector::default()).unwrap();
        for (i, row) in result.rows.iter().enumerate() {
            match links.get(&i).filter(|&&j| j < s2.len()) {
                Some(&j) => {
                    prop_assert_eq!(&row.system2_key, &Value::Text(format!("b{j}")));
                    prop_assert_eq!(row.system2_value, s2[j]);
                }
                None => {
                    prop_assert!(row.system2_key.is_null());
                    prop_assert_eq!(row.system2_value, None);
                }
            }
        }
    }

    #[test]
    fn stats_bounds((s1, s2, links) in arb_case()) {
        let mut rec = build(&s1, &s2, &links);
        rec.reconcile(&ColumnSelector::default()).unwrap();
        let ReconStats { row_count, break_count, system1_miss_count, system2_miss_count } = rec.stats().unwrap();
        prop_assert_eq!(row_count, s1.len());
        prop_assert!(break_count <= row_count);
        prop_assert!(system1_miss_count + system2_miss_count <= 2 * row_count);
    }

    #[test]
    fn reconcile_is_idempotent((s1, s2, links) in arb_case()) {
        let mut rec = build(&s1, &s2, &links);
        let first = rec.reconcile(&ColumnSelector::default()).unwrap().clone();
        let second = rec.reconcile(&ColumnSelector::default()).unwrap().clone();
        prop_assert_eq!(first, second);
    }
}
