use orgbridge::config::{BulkApiVersion, RunSettings};
use orgbridge::engine::{select_engine, EngineKind, JobHandle, JobState, ResultRow};
use orgbridge::model::Row;

fn settings() -> RunSettings {
    RunSettings::default()
}

#[test]
fn small_volumes_route_through_the_direct_engine() {
    assert_eq!(select_engine(&settings(), 50), EngineKind::Rest);
}

#[test]
fn threshold_is_strictly_greater_than() {
    assert_eq!(select_engine(&settings(), 200), EngineKind::Rest);
    assert_eq!(select_engine(&settings(), 201), EngineKind::BulkV2);
}

#[test]
fn large_volumes_route_through_the_configured_bulk_variant() {
    assert_eq!(select_engine(&settings(), 500), EngineKind::BulkV2);

    let mut v1 = settings();
    v1.bulk_api_version = BulkApiVersion::V1;
    assert_eq!(select_engine(&v1, 500), EngineKind::BulkV1);
}

#[test]
fn always_use_rest_overrides_volume_selection() {
    let mut forced = settings();
    forced.always_use_rest = true;
    assert_eq!(select_engine(&forced, 500), EngineKind::Rest);
    assert_eq!(select_engine(&forced, 50_000), EngineKind::Rest);
}

#[test]
fn job_chunking_respects_the_batch_size() {
    let records: Vec<Row> = (0..10).map(|_| Row::new()).collect();
    let batches = JobHandle::chunk(records, 3);
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);

    assert!(JobHandle::chunk(Vec::new(), 3).is_empty());
}

#[test]
fn terminal_states_are_terminal() {
    for state in [JobState::JobComplete, JobState::Aborted, JobState::Failed] {
        assert!(state.is_terminal());
    }
    for state in [
        JobState::Undefined,
        JobState::Open,
        JobState::UploadStart,
        JobState::UploadComplete,
        JobState::InProgress,
        JobState::Closed,
    ] {
        assert!(!state.is_terminal());
    }
}

#[test]
fn result_rows_carry_either_identifier_or_error() {
    let ok = ResultRow::success("T1");
    assert!(ok.is_success());
    assert_eq!(ok.id.as_deref(), Some("T1"));

    let failed = ResultRow::failure("required field missing");
    assert!(!failed.is_success());
    assert!(failed.id.is_none());
}
