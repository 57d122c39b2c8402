//! Timed-action ledger helpers.
//!
//! Any in-flight build, upgrade, or territory attack is a
//! [`TimedAction`]: an absolute start instant, a duration, and a global
//! insertion sequence. An entity holds at most one active action; catch-up
//! resolves due actions in ascending `(started_at, sequence)` order so a
//! long-overdue build always completes before anything that assumed it
//! finished.

use contracts::TimedAction;

/// Due when the full duration has elapsed: `now >= started_at + duration`.
pub fn is_due(action: &TimedAction, now: u64) -> bool {
    now >= action.ends_at()
}

/// Linear completion fraction, clamped to `[0, 1]`.
pub fn progress(action: &TimedAction, now: u64) -> f64 {
    if action.duration_secs == 0 {
        return 1.0;
    }
    if now <= action.started_at {
        return 0.0;
    }
    let elapsed = (now - action.started_at) as f64;
    (elapsed / action.duration_secs as f64).min(1.0)
}

/// Deterministic resolution order for catch-up.
pub fn order_key(action: &TimedAction) -> (u64, u64) {
    (action.started_at, action.sequence)
}
