//! Tokio driver for [`SessionTimer`].
//!
//! One task per viewing session. The UI holds a [`SessionHandle`] for
//! pause/resume/close and consumes [`TimerEvent`]s from the returned
//! receiver. Ticks ride a one-second interval with skip-on-delay behavior:
//! a throttled host undercounts elapsed time, which is accepted as
//! best-effort rather than treated as an error.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::machine::{SessionTimer, TimerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Pause,
    Resume,
    Close,
}

/// Control handle for a spawned session. Dropping every handle closes the
/// session, which is the only cancellation path for a running timer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<TimerCommand>,
}

impl SessionHandle {
    pub async fn pause(&self) -> bool {
        self.commands.send(TimerCommand::Pause).await.is_ok()
    }

    pub async fn resume(&self) -> bool {
        self.commands.send(TimerCommand::Resume).await.is_ok()
    }

    pub async fn close(&self) -> bool {
        self.commands.send(TimerCommand::Close).await.is_ok()
    }
}

/// Spawns the countdown task for one session.
pub fn spawn_session(
    initial_remaining: i64,
) -> (SessionHandle, mpsc::Receiver<TimerEvent>, JoinHandle<()>) {
    let (event_tx, event_rx) = mpsc::channel(32);
    let (command_tx, mut command_rx) = mpsc::channel(8);
    let handle = SessionHandle {
        commands: command_tx,
    };

    let task = tokio::spawn(async move {
        let (mut timer, startup_events) = SessionTimer::start(initial_remaining);
        for event in startup_events {
            let _ = event_tx.send(event).await;
        }
        if !timer.is_active() {
            return;
        }

        let mut ticker = time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick completes immediately; swallow it so the
        // countdown starts a full second after spawn.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for event in timer.tick() {
                        let terminal = matches!(event, TimerEvent::Ended { .. });
                        if event_tx.send(event).await.is_err() {
                            debug!("timer event receiver dropped; stopping session task");
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                }
                command = command_rx.recv() => match command {
                    Some(TimerCommand::Pause) => timer.pause(),
                    Some(TimerCommand::Resume) => timer.resume(),
                    Some(TimerCommand::Close) | None => {
                        for event in timer.close() {
                            let _ = event_tx.send(event).await;
                        }
                        return;
                    }
                },
            }
        }
    });

    (handle, event_rx, task)
}
