mod common;

use std::sync::{
    Arc,
    Mutex,
};

use common::{
    TestStore,
    SEED_BED,
};
use roistore::prelude::*;

#[test]
fn background_load_refuses_second_request() -> anyhow::Result<()> {
    let store = TestStore::new();
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("a", Some(&source), None)?;
    registry.add_dataset("b", None, None)?;

    let shared: SharedRegistry = Arc::new(Mutex::new(registry));
    let worker = LoadWorker::spawn(shared.clone());

    {
        // Holding the registry keeps the first load pending.
        let _guard = shared.lock().unwrap();
        assert!(worker.request("a"));
        assert!(worker.is_busy());
        assert!(!worker.request("b"));
    }

    let report = worker.wait().unwrap();
    assert_eq!(report.dataset, "a");
    assert_eq!(report.result?, 3);
    assert!(!worker.is_busy());
    assert_eq!(shared.lock().unwrap().active_dataset_name(), Some("a"));
    assert_eq!(store.viewer.state().displayed.as_ref().map(Vec::len), Some(3));

    assert!(worker.request("missing"));
    let report = worker.wait().unwrap();
    assert!(matches!(report.result, Err(StoreError::NotFound(_))));
    assert!(worker.try_report().is_none());
    Ok(())
}

#[test]
fn worker_shuts_down_with_registry_alive() -> anyhow::Result<()> {
    let store = TestStore::new();
    let shared: SharedRegistry = Arc::new(Mutex::new(store.open()?));
    {
        let worker = LoadWorker::spawn(shared.clone());
        assert!(worker.request("nothing"));
    }
    assert_eq!(Arc::strong_count(&shared), 1);
    Ok(())
}
