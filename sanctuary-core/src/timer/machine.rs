//! Countdown state machine for one viewing session.
//!
//! The machine is pure: every transition returns the events it produced and
//! the caller decides how to deliver them. The async driver in
//! [`super::runner`] feeds it wall-clock ticks.

/// Remaining-seconds threshold at which the one-shot low-time warning fires.
pub const LOW_TIME_WARNING_SECONDS: u32 = 60;
/// Elapsed-seconds cadence for durability writes while running. The terminal
/// event always carries the final elapsed value, so session end persists
/// regardless of alignment with this cadence.
pub const PERSIST_INTERVAL_SECONDS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    UserClosed,
    AutoStopped,
}

impl EndReason {
    pub fn was_auto_stopped(&self) -> bool {
        matches!(self, EndReason::AutoStopped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Ended(EndReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Fired once per counted second.
    TimeUpdate { elapsed: u32 },
    /// One-shot warning as remaining crosses to exactly sixty seconds.
    LowTimeWarning { remaining: u32 },
    /// The host should persist `elapsed` to the session ledger now.
    PersistDue { elapsed: u32 },
    /// Terminal. Carries the final elapsed count for the last ledger write.
    Ended { reason: EndReason, elapsed: u32 },
}

#[derive(Debug, Clone)]
pub struct SessionTimer {
    phase: TimerPhase,
    initial_remaining: u32,
    elapsed: u32,
    remaining: u32,
    warned: bool,
}

impl SessionTimer {
    /// Starts a session with the given budget. A non-positive budget ends
    /// the session immediately with `AutoStopped` without ever running;
    /// upstream gating normally prevents this, but the machine stays
    /// defensive.
    pub fn start(initial_remaining: i64) -> (Self, Vec<TimerEvent>) {
        if initial_remaining <= 0 {
            let timer = Self {
                phase: TimerPhase::Ended(EndReason::AutoStopped),
                initial_remaining: 0,
                elapsed: 0,
                remaining: 0,
                warned: false,
            };
            let events = vec![TimerEvent::Ended {
                reason: EndReason::AutoStopped,
                elapsed: 0,
            }];
            return (timer, events);
        }

        let initial = initial_remaining as u32;
        let timer = Self {
            phase: TimerPhase::Running,
            initial_remaining: initial,
            elapsed: 0,
            remaining: initial,
            warned: false,
        };
        (timer, Vec::new())
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn initial_remaining(&self) -> u32 {
        self.initial_remaining
    }

    /// True while the session still accepts ticks or a resume.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Paused)
    }

    /// Advances the countdown by one second. No-op unless `Running`.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if self.phase != TimerPhase::Running {
            return Vec::new();
        }

        self.elapsed += 1;
        self.remaining = self.remaining.saturating_sub(1);

        let mut events = vec![TimerEvent::TimeUpdate {
            elapsed: self.elapsed,
        }];

        if self.remaining == LOW_TIME_WARNING_SECONDS && !self.warned {
            self.warned = true;
            events.push(TimerEvent::LowTimeWarning {
                remaining: self.remaining,
            });
        }

        if self.remaining == 0 {
            self.phase = TimerPhase::Ended(EndReason::AutoStopped);
            events.push(TimerEvent::Ended {
                reason: EndReason::AutoStopped,
                elapsed: self.elapsed,
            });
        } else if self.elapsed % PERSIST_INTERVAL_SECONDS == 0 {
            events.push(TimerEvent::PersistDue {
                elapsed: self.elapsed,
            });
        }

        events
    }

    /// Idempotent; only a `Running` timer can pause.
    pub fn pause(&mut self) {
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::Paused;
        }
    }

    /// Idempotent; only a `Paused` timer can resume.
    pub fn resume(&mut self) {
        if self.phase == TimerPhase::Paused {
            self.phase = TimerPhase::Running;
        }
    }

    /// User-initiated close from any non-terminal phase. Ticking stops and
    /// the terminal event carries the elapsed total for the final write.
    pub fn close(&mut self) -> Vec<TimerEvent> {
        if matches!(self.phase, TimerPhase::Ended(_)) {
            return Vec::new();
        }
        self.phase = TimerPhase::Ended(EndReason::UserClosed);
        vec![TimerEvent::Ended {
            reason: EndReason::UserClosed,
            elapsed: self.elapsed,
        }]
    }
}
