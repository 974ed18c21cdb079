//! End-to-end dataset lifecycle against the in-memory backend.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use servingstore::{row, FieldValue, MemoryStore, Row, ServeError, ServingStore};

fn store() -> ServingStore {
    ServingStore::from_store(Arc::new(MemoryStore::new()), 2)
}

fn a_rows(values: &[i64]) -> Vec<Row> {
    values
        .iter()
        .map(|&a| row([("a", FieldValue::Int(a))]))
        .collect()
}

#[test]
fn iris_rotation_scenario() {
    let store = store();
    let writer = store.writer();
    let reader = store.reader();

    writer.write_version("iris", "v1", a_rows(&[1, 2, 3])).unwrap();
    let v1 = reader.fetch_records("iris", "v1").unwrap();
    assert_eq!(v1.len(), 3);
    let indices: BTreeSet<u64> = v1.iter().map(|r| r.index).collect();
    assert_eq!(indices, BTreeSet::from([0, 1, 2]));
    for record in &v1 {
        assert_eq!(record.fields["a"], FieldValue::Int(record.index as i64 + 1));
    }

    writer.promote("iris", "v1").unwrap();
    assert_eq!(reader.resolve_current_version("iris").unwrap(), "v1");

    writer.write_version("iris", "v2", a_rows(&[10, 20])).unwrap();
    writer.promote("iris", "v2").unwrap();
    writer.delete_version("iris", "v1").unwrap();

    assert!(reader.fetch_records("iris", "v1").unwrap().is_empty());
    assert_eq!(reader.fetch_records("iris", "v2").unwrap().len(), 2);

    let info = store.inventory().get_dataset_info().unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info["iris"].total_records, 2);
    assert_eq!(info["iris"].first_observed_version, "v2");
}

#[test]
fn rotate_matches_manual_promote_and_delete() {
    let store = store();
    let writer = store.writer();
    writer.write_version("iris", "v1", a_rows(&[1, 2, 3])).unwrap();
    writer.rotate("iris", "v1").unwrap();
    writer.write_version("iris", "v2", a_rows(&[4, 5])).unwrap();

    assert_eq!(writer.rotate("iris", "v2").unwrap().as_deref(), Some("v1"));
    let (version, records) = store.reader().fetch_current("iris").unwrap();
    assert_eq!(version, "v2");
    assert_eq!(records.len(), 2);
    assert!(store.reader().fetch_records("iris", "v1").unwrap().is_empty());
}

#[test]
fn duplicate_write_fails_without_corrupting_first() {
    let store = store();
    let writer = store.writer();
    writer.write_version("iris", "v1", a_rows(&[1, 2, 3])).unwrap();

    let err = writer
        .write_version("iris", "v1", a_rows(&[7, 8, 9, 10]))
        .unwrap_err();
    assert!(matches!(err, ServeError::VersionAlreadyExists { .. }));
    assert_eq!(
        err.to_string(),
        "data already exists for dataset 'iris' with version 'v1'"
    );

    let records = store.reader().fetch_sorted("iris", "v1").unwrap();
    let values: Vec<_> = records.iter().map(|r| r.fields["a"].clone()).collect();
    assert_eq!(
        values,
        vec![FieldValue::Int(1), FieldValue::Int(2), FieldValue::Int(3)]
    );
}

#[test]
fn datasets_are_isolated() {
    let store = store();
    let writer = store.writer();
    writer.write_version("iris", "v1", a_rows(&[1])).unwrap();
    writer.write_version("iris_extra", "v1", a_rows(&[2, 3])).unwrap();
    writer.promote("iris", "v1").unwrap();

    writer.delete_version("iris_extra", "v1").unwrap();
    assert_eq!(store.reader().fetch_records("iris", "v1").unwrap().len(), 1);
    assert!(store.reader().fetch_records("iris_extra", "v1").unwrap().is_empty());
    assert!(matches!(
        store.reader().resolve_current_version("iris_extra"),
        Err(ServeError::NoCurrentVersion { .. })
    ));
}

#[test]
fn flush_removes_everything() {
    let store = store();
    store.writer().write_version("iris", "v1", a_rows(&[1, 2])).unwrap();
    store.writer().promote("iris", "v1").unwrap();
    assert_eq!(store.inventory().get_db_size().unwrap(), 3);

    store.inventory().delete_all().unwrap();
    assert_eq!(store.inventory().get_db_size().unwrap(), 0);
    assert!(store.reader().resolve_current_version("iris").is_err());
}

#[test]
fn readers_see_whole_versions_while_pointer_flips() {
    let store = store();
    let writer = store.writer();
    writer.write_version("iris", "v1", a_rows(&[1; 5])).unwrap();
    writer.write_version("iris", "v2", a_rows(&[2; 8])).unwrap();
    writer.promote("iris", "v1").unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader = store.reader();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0;
                while !done.load(Ordering::Relaxed) || reads == 0 {
                    let (version, records) = reader.fetch_current("iris").unwrap();
                    let expected = if version == "v1" { (5, 1) } else { (8, 2) };
                    assert_eq!(records.len(), expected.0);
                    assert!(records
                        .iter()
                        .all(|r| r.fields["a"] == FieldValue::Int(expected.1)));
                    reads += 1;
                }
            })
        })
        .collect();

    for i in 0..200 {
        writer
            .promote("iris", if i % 2 == 0 { "v2" } else { "v1" })
            .unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for handle in readers {
        handle.join().unwrap();
    }
}

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Int),
        (-1e12f64..1e12f64).prop_map(FieldValue::Float),
        "\\PC{0,12}".prop_map(FieldValue::String),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_rows_come_back_exactly(
        rows in prop::collection::vec(
            prop::collection::btree_map("[a-z_]{1,6}", field_value(), 0..5),
            0..12,
        ),
    ) {
        let store = store();
        let written = store.writer().write_version("ds", "v1", rows.clone()).unwrap();
        prop_assert_eq!(written, rows.len());

        let records = store.reader().fetch_sorted("ds", "v1").unwrap();
        prop_assert_eq!(records.len(), rows.len());
        for (i, (record, expected)) in records.iter().zip(&rows).enumerate() {
            prop_assert_eq!(record.index, i as u64);
            prop_assert_eq!(&record.fields, expected);
        }
    }

    #[test]
    fn never_written_versions_are_empty(
        dataset in "[a-z]{1,8}",
        version in "[a-z0-9]{1,8}",
    ) {
        prop_assume!(!(dataset == "other" && version == "v1"));
        let store = store();
        store.writer().write_version("other", "v1", a_rows(&[1])).unwrap();
        prop_assert!(store.reader().fetch_records(&dataset, &version).unwrap().is_empty());
    }
}
