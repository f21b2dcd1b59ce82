use std::path::Path;

use sanctuary_core::{
    EndReason, LedgerError, Profile, ProfileStore, SessionLedger, SessionRecorder, TimerEvent,
};
use tempfile::TempDir;

fn temp_ledger(dir: &Path) -> SessionLedger {
    let ledger = SessionLedger::builder()
        .path(dir.join("sessions.sqlite"))
        .create_if_missing(true)
        .build()
        .expect("create ledger");
    ledger.initialize().expect("initialize ledger");
    ledger
}

#[test]
fn session_lifecycle() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());

    let session_id = ledger
        .create_session("u1", Some("calming nature videos"))
        .unwrap();

    ledger.update_duration(&session_id, 30).unwrap();
    ledger.update_duration(&session_id, 60).unwrap();

    let session = ledger.fetch_session(&session_id).unwrap().unwrap();
    assert!(session.active());
    assert_eq!(session.duration_seconds, 60);
    assert_eq!(session.search_query.as_deref(), Some("calming nature videos"));

    ledger.end_session(&session_id, true).unwrap();
    let session = ledger.fetch_session(&session_id).unwrap().unwrap();
    assert!(!session.active());
    assert!(session.was_auto_stopped);
    assert!(session.ended_at.is_some());
}

#[test]
fn last_write_wins_for_duration() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());
    let session_id = ledger.create_session("u1", None).unwrap();

    ledger.update_duration(&session_id, 90).unwrap();
    // An out-of-order, lower write is still authoritative.
    ledger.update_duration(&session_id, 60).unwrap();

    let session = ledger.fetch_session(&session_id).unwrap().unwrap();
    assert_eq!(session.duration_seconds, 60);
}

#[test]
fn ended_sessions_reject_further_updates() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());
    let session_id = ledger.create_session("u1", None).unwrap();

    ledger.update_duration(&session_id, 10).unwrap();
    ledger.end_session(&session_id, false).unwrap();

    match ledger.update_duration(&session_id, 99) {
        Err(LedgerError::SessionClosed(id)) => assert_eq!(id, session_id),
        other => panic!("expected SessionClosed, got {other:?}"),
    }
    // Ending again is a no-op, not an error.
    ledger.end_session(&session_id, true).unwrap();
    let session = ledger.fetch_session(&session_id).unwrap().unwrap();
    assert_eq!(session.duration_seconds, 10);
    assert!(!session.was_auto_stopped);
}

#[test]
fn unknown_session_is_not_found() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());
    match ledger.update_duration("missing", 10) {
        Err(LedgerError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn accumulate_daily_usage_creates_and_increments() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());

    ledger.accumulate_daily_usage("u1", 120).unwrap();
    ledger.accumulate_daily_usage("u1", 45).unwrap();

    let profile = ledger.load_profile("u1").unwrap().unwrap();
    assert_eq!(profile.total_watch_time_today, 165);
    assert_eq!(profile.current_day, 1);

    // Negative deltas never shrink the aggregate.
    ledger.accumulate_daily_usage("u1", -30).unwrap();
    let profile = ledger.load_profile("u1").unwrap().unwrap();
    assert_eq!(profile.total_watch_time_today, 165);
}

#[test]
fn profile_remaining_uses_shared_schedule() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());

    ledger
        .upsert_profile(&Profile {
            user_id: "u1".into(),
            current_day: 3,
            total_watch_time_today: 600,
        })
        .unwrap();

    let profile = ledger.load_profile("u1").unwrap().unwrap();
    // Day 3 allows 20 minutes; 10 minutes used.
    assert_eq!(profile.remaining_seconds(), 600);
    assert_eq!(profile.remaining_minutes(), 10);

    assert!(ledger.load_profile("unknown").unwrap().is_none());
}

#[test]
fn recorder_persists_and_accumulates_on_end() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());

    let recorder = SessionRecorder::begin(ledger.clone(), "u1", Some("ocean sounds")).unwrap();

    recorder
        .handle_event(&TimerEvent::PersistDue { elapsed: 30 })
        .unwrap();
    let session = ledger.fetch_session(recorder.session_id()).unwrap().unwrap();
    assert_eq!(session.duration_seconds, 30);

    recorder
        .handle_event(&TimerEvent::Ended {
            reason: EndReason::AutoStopped,
            elapsed: 42,
        })
        .unwrap();

    let session = ledger.fetch_session(recorder.session_id()).unwrap().unwrap();
    assert_eq!(session.duration_seconds, 42);
    assert!(session.was_auto_stopped);
    assert!(!session.active());

    // Usage is durably recorded before the next attempt is evaluated.
    let profile = ledger.load_profile("u1").unwrap().unwrap();
    assert_eq!(profile.total_watch_time_today, 42);
}

#[tokio::test]
async fn recorder_drives_event_stream_to_completion() {
    let dir = TempDir::new().unwrap();
    let ledger = temp_ledger(dir.path());

    let recorder = SessionRecorder::begin(ledger.clone(), "u2", None).unwrap();
    let (tx, rx) = tokio::sync::mpsc::channel(8);

    tx.send(TimerEvent::TimeUpdate { elapsed: 1 }).await.unwrap();
    tx.send(TimerEvent::PersistDue { elapsed: 30 }).await.unwrap();
    tx.send(TimerEvent::Ended {
        reason: EndReason::UserClosed,
        elapsed: 35,
    })
    .await
    .unwrap();

    recorder.drive(rx).await.unwrap();

    let session = ledger.fetch_session(recorder.session_id()).unwrap().unwrap();
    assert_eq!(session.duration_seconds, 35);
    assert!(!session.was_auto_stopped);
    let profile = ledger.load_profile("u2").unwrap().unwrap();
    assert_eq!(profile.total_watch_time_today, 35);
}
