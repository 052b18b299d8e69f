mod support;

use std::time::Duration;

use sunex_reconcile::PlausibilityLimits;
use sunex_runner::{RunError, Runner};

use support::{CollectingRecorder, FixedSampler, MemCheckpointStore};

#[tokio::test]
async fn scenario_recorder_failure_preserves_checkpoint() {
    let store = MemCheckpointStore::with_counter("X", 1000.0);
    let recorder = CollectingRecorder::unavailable();

    let runner = Runner::new(
        Box::new(FixedSampler::reading("X", 1005.0)),
        Box::new(store.clone()),
        Box::new(recorder.clone()),
        PlausibilityLimits::new(10_000.0, Duration::from_secs(3600)),
    );

    let err = runner.run().await.unwrap_err();
    assert_eq!(err.code(), "STORE_UNAVAILABLE");
    assert!(matches!(err, RunError::Recorder(_)));

    // The checkpoint stays at its pre-run value so the next run retries the
    // reconciliation against the same baseline.
    assert_eq!(store.current().unwrap().value_for("X"), Some(1000.0));
}
