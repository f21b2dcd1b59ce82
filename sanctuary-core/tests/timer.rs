use sanctuary_core::{
    spawn_session, EndReason, SessionTimer, TimerEvent, TimerPhase, PERSIST_INTERVAL_SECONDS,
};

fn assert_accounting(timer: &SessionTimer) {
    assert_eq!(
        timer.elapsed() + timer.remaining(),
        timer.initial_remaining(),
        "elapsed + remaining must equal the initial budget"
    );
}

#[test]
fn accounting_invariant_holds_across_ticks() {
    let (mut timer, events) = SessionTimer::start(120);
    assert!(events.is_empty());
    assert_eq!(timer.phase(), TimerPhase::Running);

    for _ in 0..90 {
        timer.tick();
        assert_accounting(&timer);
    }
    assert_eq!(timer.elapsed(), 90);
    assert_eq!(timer.remaining(), 30);
}

#[test]
fn auto_stop_is_exact() {
    let (mut timer, _) = SessionTimer::start(3);

    timer.tick();
    timer.tick();
    assert_eq!(timer.phase(), TimerPhase::Running);

    let events = timer.tick();
    assert_eq!(timer.phase(), TimerPhase::Ended(EndReason::AutoStopped));
    assert!(events.contains(&TimerEvent::Ended {
        reason: EndReason::AutoStopped,
        elapsed: 3,
    }));

    // A dead timer ignores further ticks.
    let after = timer.tick();
    assert!(after.is_empty());
    assert_eq!(timer.elapsed(), 3);
    assert_eq!(timer.remaining(), 0);
}

#[test]
fn low_time_warning_fires_exactly_once() {
    let (mut timer, _) = SessionTimer::start(62);
    let mut warnings = 0;
    while timer.phase() == TimerPhase::Running {
        for event in timer.tick() {
            if matches!(event, TimerEvent::LowTimeWarning { .. }) {
                warnings += 1;
                assert_eq!(timer.remaining(), 60);
            }
        }
    }
    assert_eq!(warnings, 1);
}

#[test]
fn warning_requires_crossing_the_threshold() {
    // Starting at or below the threshold never crosses 61 -> 60, so no
    // warning fires, matching the one-shot crossing semantics.
    let (mut timer, _) = SessionTimer::start(45);
    while timer.phase() == TimerPhase::Running {
        for event in timer.tick() {
            assert!(!matches!(event, TimerEvent::LowTimeWarning { .. }));
        }
    }
}

#[test]
fn pause_is_idempotent_and_freezes_state() {
    let (mut timer, _) = SessionTimer::start(100);
    timer.tick();
    timer.tick();

    timer.pause();
    timer.pause();
    assert_eq!(timer.phase(), TimerPhase::Paused);

    let elapsed = timer.elapsed();
    let remaining = timer.remaining();
    assert!(timer.tick().is_empty());
    assert_eq!(timer.elapsed(), elapsed);
    assert_eq!(timer.remaining(), remaining);

    timer.resume();
    assert_eq!(timer.phase(), TimerPhase::Running);
    timer.tick();
    assert_eq!(timer.elapsed(), elapsed + 1);
    assert_eq!(timer.remaining(), remaining - 1);
    assert_accounting(&timer);
}

#[test]
fn close_ends_with_user_reason_regardless_of_remaining() {
    let (mut timer, _) = SessionTimer::start(500);
    timer.tick();
    let events = timer.close();
    assert_eq!(timer.phase(), TimerPhase::Ended(EndReason::UserClosed));
    assert_eq!(
        events,
        vec![TimerEvent::Ended {
            reason: EndReason::UserClosed,
            elapsed: 1,
        }]
    );
    assert!(timer.close().is_empty());
}

#[test]
fn non_positive_budget_ends_immediately() {
    let (timer, events) = SessionTimer::start(0);
    assert_eq!(timer.phase(), TimerPhase::Ended(EndReason::AutoStopped));
    assert_eq!(
        events,
        vec![TimerEvent::Ended {
            reason: EndReason::AutoStopped,
            elapsed: 0,
        }]
    );

    let (timer, events) = SessionTimer::start(-5);
    assert_eq!(timer.phase(), TimerPhase::Ended(EndReason::AutoStopped));
    assert_eq!(events.len(), 1);
}

#[test]
fn persist_cadence_every_thirty_seconds() {
    let (mut timer, _) = SessionTimer::start(95);
    let mut persists = Vec::new();
    while timer.phase() == TimerPhase::Running {
        for event in timer.tick() {
            if let TimerEvent::PersistDue { elapsed } = event {
                persists.push(elapsed);
            }
        }
    }
    assert_eq!(persists, vec![30, 60, 90]);
    // 95 is not aligned to the cadence; the terminal event carries the
    // final elapsed value instead.
    assert_eq!(timer.elapsed(), 95);
    assert_eq!(95 % PERSIST_INTERVAL_SECONDS, 5);
}

// The paused clock auto-advances whenever every task is waiting on time,
// so these tests drive the one-second interval without real sleeps.

#[tokio::test(start_paused = true)]
async fn runner_ticks_and_auto_stops() {
    let (_handle, mut events, task) = spawn_session(3);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }

    assert!(seen.contains(&TimerEvent::TimeUpdate { elapsed: 1 }));
    assert!(seen.contains(&TimerEvent::TimeUpdate { elapsed: 3 }));
    assert_eq!(
        seen.last(),
        Some(&TimerEvent::Ended {
            reason: EndReason::AutoStopped,
            elapsed: 3,
        })
    );
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn runner_close_cancels_ticking() {
    let (handle, mut events, task) = spawn_session(600);

    assert_eq!(events.recv().await, Some(TimerEvent::TimeUpdate { elapsed: 1 }));
    assert_eq!(events.recv().await, Some(TimerEvent::TimeUpdate { elapsed: 2 }));
    assert!(handle.close().await);

    let mut terminal = None;
    while let Some(event) = events.recv().await {
        if let TimerEvent::Ended { reason, elapsed } = event {
            terminal = Some((reason, elapsed));
        }
    }
    assert_eq!(terminal, Some((EndReason::UserClosed, 2)));
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn runner_pause_suppresses_ticks() {
    let (handle, mut events, task) = spawn_session(600);

    assert_eq!(events.recv().await, Some(TimerEvent::TimeUpdate { elapsed: 1 }));
    assert_eq!(events.recv().await, Some(TimerEvent::TimeUpdate { elapsed: 2 }));

    // Pause then resume; no second is lost or double-counted in between.
    assert!(handle.pause().await);
    assert!(handle.resume().await);

    assert_eq!(events.recv().await, Some(TimerEvent::TimeUpdate { elapsed: 3 }));
    assert!(handle.close().await);
    task.await.unwrap();
}
