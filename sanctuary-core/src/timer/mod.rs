mod machine;
mod runner;

pub use machine::{
    EndReason, SessionTimer, TimerEvent, TimerPhase, LOW_TIME_WARNING_SECONDS,
    PERSIST_INTERVAL_SECONDS,
};
pub use runner::{spawn_session, SessionHandle, TimerCommand};
