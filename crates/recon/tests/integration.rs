use rekon_recon::{
    ColumnMapping, ColumnSelector, Column, DuplicatePolicy, ReconError, ReconStats, Reconciliation,
    RowMapping, Table, Value,
};

fn table(key: &str, val: &str, rows: &[(&str, Option<f64>)]) -> Table {
    Table::new(vec![
        Column::new(key, rows.iter().map(|(k, _)| Value::from(*k)).collect()),
        Column::new(val, rows.iter().map(|(_, v)| Value::from(*v)).collect()),
    ])
    .unwrap()
}

fn session(s1: Table, s2: Table, cols: &[(&str, &str)], rows: &[(&str, &str)]) -> Reconciliation {
    Reconciliation::new(s1, s2)
        .with_column_mapping(ColumnMapping::from_pairs(cols.iter().copied()).unwrap())
        .with_row_mapping(RowMapping::from_pairs(rows.iter().copied(), DuplicatePolicy::Reject).unwrap())
}

// -------------------------------------------------------------------------
// Worked examples
// -------------------------------------------------------------------------

#[test]
fn single_matched_break() {
    let mut rec = session(
        table("id", "val", &[("A", Some(10.0))]),
        table("id", "val", &[("X", Some(7.0))]),
        &[("id", "id"), ("val", "val")],
        &[("A", "X")],
    );
    let result = rec.reconcile(&ColumnSelector::Ordinal(1)).unwrap();
    let row = &result.rows[0];
    assert_eq!(row.system1_key, Value::from("A"));
    assert_eq!(row.system2_key, Value::from("X"));
    assert_eq!((row.system1_value, row.system2_value, row.diff), (Some(10.0), Some(7.0), Some(3.0)));

    assert_eq!(
        rec.stats().unwrap(),
        ReconStats { row_count: 1, break_count: 1, system1_miss_count: 0, system2_miss_count: 0 }
    );
}

#[test]
fn no_counterpart() {
    let mut rec = session(
        table("id", "val", &[("A", Some(10.0))]),
        table("id", "val", &[]),
        &[("id", "id"), ("val", "val")],
        &[],
    );
    let result = rec.reconcile(&ColumnSelector::Ordinal(1)).unwrap();
    let row = &result.rows[0];
    assert!(row.system2_key.is_null());
    assert_eq!((row.system1_value, row.system2_value, row.diff), (Some(10.0), None, None));

    assert_eq!(
        rec.stats().unwrap(),
        ReconStats { row_count: 1, break_count: 0, system1_miss_count: 0, system2_miss_count: 1 }
    );
}

#[test]
fn equal_values_no_breaks() {
    let mut rec = session(
        table("id", "val", &[("A", Some(4.0)), ("B", Some(9.5))]),
        table("ref", "amount", &[("X", Some(4.0)), ("Y", Some(9.5))]),
        &[("id", "ref"), ("val", "amount")],
        &[("A", "X"), ("B", "Y")],
    );
    let result = rec.reconcile(&ColumnSelector::Name("val".into())).unwrap();
    assert!(result.rows.iter().all(|r| r.diff == Some(0.0)));
    assert_eq!(rec.stats().unwrap().break_count, 0);
}

#[test]
fn target_missing_from_mapping_is_configuration_error() {
    let mut rec = session(
        table("id", "val", &[("A", Some(1.0))]),
        table("id", "val", &[("X", Some(1.0))]),
        &[("id", "id"), ("val", "val")],
        &[("A", "X")],
    );
    let err = rec.reconcile(&ColumnSelector::Name("price".into())).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(rec.result().unwrap_err(), ReconError::NotReconciled);

    let err = rec.reconcile(&ColumnSelector::Ordinal(2)).unwrap_err();
    assert_eq!(err, ReconError::ColumnOutOfRange { index: 2, len: 2 });
}

#[test]
fn mapped_column_absent_from_table() {
    let mut rec = session(
        table("id", "val", &[("A", Some(1.0))]),
        table("id", "value", &[("X", Some(1.0))]),
        &[("id", "id"), ("val", "val")],
        &[("A", "X")],
    );
    let err = rec.reconcile(&ColumnSelector::Ordinal(1)).unwrap_err();
    assert!(matches!(err, ReconError::MissingColumn { ref column, .. } if column == "val"));
}

// -------------------------------------------------------------------------
// Duplicate row keys
// -------------------------------------------------------------------------

#[test]
fn duplicate_row_mapping_policies() {
    let pairs = [("A", "X"), ("A", "Y")];
    assert!(RowMapping::from_pairs(pairs, DuplicatePolicy::Reject).unwrap_err().is_configuration());

    for (policy, expected) in [(DuplicatePolicy::FirstWins, 3.0), (DuplicatePolicy::LastWins, 5.0)] {
        let mut rec = Reconciliation::new(
            table("id", "val", &[("A", Some(10.0))]),
            table("id", "val", &[("X", Some(7.0)), ("Y", Some(5.0))]),
        )
        .with_column_mapping(ColumnMapping::from_pairs([("id", "id"), ("val", "val")]).unwrap())
        .with_row_mapping(RowMapping::from_pairs(pairs, policy).unwrap());

        let result = rec.reconcile(&ColumnSelector::default()).unwrap();
        assert_eq!(result.rows[0].diff, Some(expected), "policy {policy:?}");
    }
}

// -------------------------------------------------------------------------
// Wider tables
// -------------------------------------------------------------------------

#[test]
fn differently_named_wide_tables() {
    let s1 = Table::new(vec![
        Column::new("trade_id", vec!["T1".into(), "T2".into(), "T3".into()]),
        Column::new("qty", vec![100.0.into(), 50.0.into(), Value::Null]),
        Column::new("price", vec![1.5.into(), 2.0.into(), 3.0.into()]),
        Column::new("desk", vec!["fx".into(), "fx".into(), "rates".into()]),
    ])
    .unwrap();
    let s2 = Table::new(vec![
        Column::new("px", vec![2.25.into(), 1.5.into()]),
        Column::new("quantity", vec![50.0.into(), 100.0.into()]),
        Column::new("ref", vec!["R2".into(), "R1".into()]),
    ])
    .unwrap();

    let mut rec = Reconciliation::new(s1, s2)
        .with_column_mapping(
            ColumnMapping::from_pairs([("trade_id", "ref"), ("qty", "quantity"), ("price", "px")]).unwrap(),
        )
        .with_row_mapping(
            RowMapping::from_pairs([("T1", "R1"), ("T2", "R2"), ("T3", "R3")], DuplicatePolicy::Reject).unwrap(),
        );

    let price = rec.reconcile(&ColumnSelector::Name("px".into())).unwrap().clone();
    assert_eq!(price.column, 2);
    assert_eq!(price.headers[2], "price");
    assert_eq!(price.headers[3], "px");
    assert_eq!(price.rows[0].diff, Some(0.0));
    assert_eq!(price.rows[1].diff, Some(-0.25));
    assert_eq!(price.rows[2].diff, None);

    let qty_stats = {
        rec.reconcile(&ColumnSelector::Ordinal(1)).unwrap();
        rec.stats().unwrap()
    };
    assert_eq!(
        qty_stats,
        ReconStats { row_count: 3, break_count: 0, system1_miss_count: 1, system2_miss_count: 1 }
    );
}

// -------------------------------------------------------------------------
// Numeric keys
// -------------------------------------------------------------------------

fn parsed_table(key: &str, val: &str, rows: &[(&str, &str)]) -> Table {
    Table::new(vec![
        Column::new(key, rows.iter().map(|(k, _)| Value::parse(k)).collect()),
        Column::new(val, rows.iter().map(|(_, v)| Value::parse(v)).collect()),
    ])
    .unwrap()
}

#[test]
fn long_numeric_keys_stay_distinct() {
    let mut rec = session(
        parsed_table("id", "val", &[("12345678901234567", "10"), ("12345678901234568", "20")]),
        parsed_table("id", "val", &[("X", "10")]),
        &[("id", "id"), ("val", "val")],
        &[("12345678901234567", "X")],
    );
    let result = rec.reconcile(&ColumnSelector::Ordinal(1)).unwrap();

    assert_eq!(result.rows[0].system1_key.key_text().as_deref(), Some("12345678901234567"));
    assert_eq!(result.rows[0].system2_key, Value::from("X"));
    assert_eq!(result.rows[0].diff, Some(0.0));

    assert_eq!(result.rows[1].system1_key.key_text().as_deref(), Some("12345678901234568"));
    assert!(result.rows[1].system2_key.is_null());
    assert_eq!(result.rows[1].diff, None);

    assert_eq!(
        rec.stats().unwrap(),
        ReconStats { row_count: 2, break_count: 0, system1_miss_count: 0, system2_miss_count: 1 }
    );
}

#[test]
fn padded_keys_do_not_match_unpadded() {
    let mut rec = session(
        parsed_table("id", "val", &[("007", "1.50"), ("7", "2")]),
        parsed_table("id", "val", &[("X", "1.5"), ("Y", "2.00")]),
        &[("id", "id"), ("val", "val")],
        &[("007", "X"), ("7", "Y")],
    );
    let result = rec.reconcile(&ColumnSelector::Ordinal(1)).unwrap();
    assert_eq!(result.rows[0].system2_key, Value::from("X"));
    assert_eq!(result.rows[1].system2_key, Value::from("Y"));
    // Text like "1.50" is still read as a number when compared
    assert_eq!(result.rows[0].diff, Some(0.0));
    assert_eq!(result.rows[1].diff, Some(0.0));
}
