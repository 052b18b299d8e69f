mod support;

use std::time::Duration;

use sunex_reconcile::PlausibilityLimits;
use sunex_runner::{RunError, Runner};

use support::{CollectingRecorder, FixedSampler, MemCheckpointStore};

fn limits() -> PlausibilityLimits {
    PlausibilityLimits::new(10_000.0, Duration::from_secs(3600))
}

#[tokio::test]
async fn scenario_regressed_counter_fails_run_and_touches_nothing() {
    let store = MemCheckpointStore::with_counter("X", 1000.0);
    let recorder = CollectingRecorder::new();

    let runner = Runner::new(
        Box::new(FixedSampler::reading("X", 999.0)),
        Box::new(store.clone()),
        Box::new(recorder.clone()),
        limits(),
    );

    let err = runner.run().await.unwrap_err();
    assert_eq!(err.code(), "COUNTER_REGRESSED");
    assert!(matches!(err, RunError::Rejected(_)));

    // Nothing persisted, baseline unchanged.
    assert!(recorder.appended().is_empty());
    assert_eq!(store.current().unwrap().value_for("X"), Some(1000.0));
}

#[tokio::test]
async fn scenario_implausible_jump_fails_run_and_touches_nothing() {
    let store = MemCheckpointStore::with_counter("X", 1000.0);
    let recorder = CollectingRecorder::new();

    let runner = Runner::new(
        Box::new(FixedSampler::reading("X", 12_000.0)),
        Box::new(store.clone()),
        Box::new(recorder.clone()),
        limits(),
    );

    let err = runner.run().await.unwrap_err();
    assert_eq!(err.code(), "IMPLAUSIBLE_JUMP");

    assert!(recorder.appended().is_empty());
    assert_eq!(store.current().unwrap().value_for("X"), Some(1000.0));
}
