use chrono::{DateTime, TimeDelta, Utc};

use crate::account::Account;

pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 3;
pub const DEFAULT_LOCKOUT_WINDOW_SECS: i64 = 1800;
pub const MAX_LOCKOUT_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Locked { until: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    /// The lockout has run out; the counter was reset and must be persisted.
    AdmitAfterExpiry,
    Refuse { retry_after_secs: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Counted { attempts_left: u32 },
    Locked { until: DateTime<Utc> },
}

// The lock is derived from `failed_login_attempts` and `last_login_time`,
// never stored, and only re-evaluated on the next login to that account.
#[derive(Debug, Clone, Copy)]
pub struct SessionGuard {
    max_failed_attempts: u32,
    lockout_window: TimeDelta,
}

impl Default for SessionGuard {
    fn default() -> Self {
        SessionGuard {
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_window: TimeDelta::seconds(DEFAULT_LOCKOUT_WINDOW_SECS),
        }
    }
}

impl SessionGuard {
    /// `None` for a zero threshold or a window outside
    /// `0..=MAX_LOCKOUT_WINDOW_SECS`.
    pub fn new(max_failed_attempts: u32, lockout_window_secs: i64) -> Option<Self> {
        let window_in_range = (0..=MAX_LOCKOUT_WINDOW_SECS).contains(&lockout_window_secs);
        if max_failed_attempts == 0 || !window_in_range {
            return None;
        }
        Some(SessionGuard {
            max_failed_attempts,
            lockout_window: TimeDelta::try_seconds(lockout_window_secs)?,
        })
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn state(&self, account: &Account, now: DateTime<Utc>) -> SessionState {
        if account.failed_login_attempts < self.max_failed_attempts {
            return SessionState::Active;
        }
        let until = lock_end(account.last_login_time, self.lockout_window);
        if now - account.last_login_time > self.lockout_window {
            SessionState::Active
        } else {
            SessionState::Locked { until }
        }
    }

    /// An expired lock resets the counter on `account` as a side effect.
    pub fn admit(&self, account: &mut Account, now: DateTime<Utc>) -> Admission {
        match self.state(account, now) {
            SessionState::Locked { until } => Admission::Refuse {
                retry_after_secs: (until - now).num_seconds().max(0) + 1,
            },
            SessionState::Active if account.failed_login_attempts >= self.max_failed_attempts => {
                account.failed_login_attempts = 0;
                Admission::AdmitAfterExpiry
            }
            SessionState::Active => Admission::Admit,
        }
    }

    pub fn record_success(&self, account: &mut Account, now: DateTime<Utc>) {
        account.failed_login_attempts = 0;
        account.last_login_time = now;
    }

    /// The attempt that reaches the threshold stamps `last_login_time`.
    pub fn record_failure(&self, account: &mut Account, now: DateTime<Utc>) -> FailureOutcome {
        account.failed_login_attempts = account.failed_login_attempts.saturating_add(1);
        if account.failed_login_attempts >= self.max_failed_attempts {
            account.last_login_time = now;
            FailureOutcome::Locked {
                until: lock_end(now, self.lockout_window),
            }
        } else {
            FailureOutcome::Counted {
                attempts_left: self.max_failed_attempts - account.failed_login_attempts,
            }
        }
    }
}

// Saturates at the latest representable instant.
fn lock_end(from: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    from.checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
