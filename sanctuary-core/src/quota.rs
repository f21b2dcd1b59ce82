//! Day-based viewing allowance schedule.
//!
//! Single source of truth for the program-day quota. Both the client-side
//! gating and the server-authoritative re-check in the fallback service go
//! through this table; the two must never diverge.

/// Allowed minutes per program day, days 1 through 7. Day 7 is zero.
pub const DAILY_LIMIT_MINUTES: [i64; 7] = [60, 40, 20, 10, 5, 2, 0];

/// Allowance in minutes for `day`, clamped to the schedule bounds.
pub fn allowed_minutes(day: i64) -> i64 {
    let index = day.clamp(1, DAILY_LIMIT_MINUTES.len() as i64) - 1;
    DAILY_LIMIT_MINUTES[index as usize]
}

/// Seconds of viewing left today, floored at zero.
pub fn remaining_seconds(day: i64, used_seconds_today: i64) -> i64 {
    (allowed_minutes(day) * 60 - used_seconds_today).max(0)
}

/// Whole minutes of viewing left today.
pub fn remaining_minutes(day: i64, used_seconds_today: i64) -> i64 {
    remaining_seconds(day, used_seconds_today) / 60
}
