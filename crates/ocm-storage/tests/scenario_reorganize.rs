//! Reorganizing a bucket of flat chain keys into the partitioned layout.

use std::sync::Arc;

use ocm_storage::{DataReorganizer, FsObjectStore, MemoryObjectStore, ObjectStore, FLAT_CHAIN_PREFIX};

const BUCKET: &str = "chains";

fn seeded(keys: &[&str]) -> Arc<MemoryObjectStore> {
    let store = Arc::new(MemoryObjectStore::new());
    for k in keys {
        store.put(BUCKET, k, k.as_bytes()).unwrap();
    }
    store
}

#[test]
fn flat_keys_move_across_pages_and_contents_follow() {
    let store = seeded(&[
        "datasets/CHAIN_AAPL_20240115093005123456.json",
        "datasets/CHAIN_AAPL_20240116100000000000.json",
        "datasets/CHAIN_MSFT_20240115093010000000.json",
        "datasets/quotes.json",
    ]);

    let report = DataReorganizer::new(store.clone())
        .with_page_size(2)
        .reorganize(BUCKET, FLAT_CHAIN_PREFIX)
        .unwrap();

    assert_eq!(report.moved, 3);
    assert_eq!(report.unchanged, 0);
    assert!(report.failed.is_empty());

    assert_eq!(
        store.keys(BUCKET),
        vec![
            "datasets/CHAIN/20240115/AAPL_093005123456.json",
            "datasets/CHAIN/20240115/MSFT_093010000000.json",
            "datasets/CHAIN/20240116/AAPL_100000000000.json",
            "datasets/quotes.json",
        ]
    );
    assert_eq!(
        store
            .get(BUCKET, "datasets/CHAIN/20240115/AAPL_093005123456.json")
            .unwrap(),
        b"datasets/CHAIN_AAPL_20240115093005123456.json".to_vec()
    );
}

#[test]
fn second_run_is_a_no_op() {
    let store = seeded(&["datasets/CHAIN_AAPL_20240115093005123456.json"]);
    let reorg = DataReorganizer::new(store.clone());

    reorg.reorganize(BUCKET, FLAT_CHAIN_PREFIX).unwrap();
    let copies = store.copy_count();
    let deletes = store.delete_count();

    let report = reorg.reorganize(BUCKET, FLAT_CHAIN_PREFIX).unwrap();
    assert_eq!(report.moved, 0);
    assert_eq!(store.copy_count(), copies);
    assert_eq!(store.delete_count(), deletes);
}

#[test]
fn long_stamp_underscore_symbol_moves_only_once() {
    let store = seeded(&["datasets/CHAIN_BRK_B_2024011509300512345678.json"]);
    let reorg = DataReorganizer::new(store.clone());

    let first = reorg.reorganize(BUCKET, "datasets/").unwrap();
    assert_eq!(first.moved, 1);
    assert_eq!(
        store.keys(BUCKET),
        vec!["datasets/CHAIN/20240115/BRK_B_09300512345678.json"]
    );

    let second = reorg.reorganize(BUCKET, "datasets/").unwrap();
    assert_eq!(second.moved, 0);
    assert_eq!(second.unchanged, 1);
    assert_eq!(store.copy_count(), 1);
    assert_eq!(
        store.keys(BUCKET),
        vec!["datasets/CHAIN/20240115/BRK_B_09300512345678.json"]
    );
}

#[test]
fn already_partitioned_keys_are_left_in_place() {
    let store = seeded(&[
        "datasets/CHAIN/20240115/AAPL_093005123456.json",
        "datasets/CHAIN_MSFT_20240115093010000000.json",
    ]);

    let report = DataReorganizer::new(store.clone())
        .reorganize(BUCKET, "datasets/")
        .unwrap();

    assert_eq!(report.moved, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(store.copy_count(), 1);
    assert_eq!(store.delete_count(), 1);
}

#[test]
fn malformed_keys_are_reported_and_do_not_stop_the_run() {
    let store = seeded(&[
        "datasets/CHAIN_AAPL_notastamp.json",
        "datasets/CHAIN_MSFT_20240115093010000000.json",
    ]);

    let report = DataReorganizer::new(store.clone())
        .reorganize(BUCKET, FLAT_CHAIN_PREFIX)
        .unwrap();

    assert_eq!(report.moved, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "datasets/CHAIN_AAPL_notastamp.json");
    assert!(store
        .keys(BUCKET)
        .contains(&"datasets/CHAIN_AAPL_notastamp.json".to_string()));
}

#[test]
fn empty_bucket_reports_nothing() {
    let store = Arc::new(MemoryObjectStore::new());
    let report = DataReorganizer::new(store)
        .reorganize(BUCKET, FLAT_CHAIN_PREFIX)
        .unwrap();
    assert_eq!(report, Default::default());
}

#[test]
fn file_backed_store_reorganizes_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsObjectStore::new(dir.path()));
    let src = dir.path().join("doc.json");
    std::fs::write(&src, "{}").unwrap();
    store
        .upload(BUCKET, "datasets/CHAIN_SPY_20240301150000000001.json", &src)
        .unwrap();

    let report = DataReorganizer::new(store.clone())
        .reorganize(BUCKET, FLAT_CHAIN_PREFIX)
        .unwrap();

    assert_eq!(report.moved, 1);
    assert!(dir
        .path()
        .join(BUCKET)
        .join("datasets/CHAIN/20240301/SPY_150000000001.json")
        .is_file());
    assert!(!dir
        .path()
        .join(BUCKET)
        .join("datasets/CHAIN_SPY_20240301150000000001.json")
        .exists());
}
