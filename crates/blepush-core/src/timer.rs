//! Timer bookkeeping for the session
//!
//! The session records which single-shot timers it has armed; the runtime's
//! timer service owns the actual clock. At most one timer per purpose is
//! armed at any time and disarming is idempotent.

use std::fmt;
use std::time::Duration;

/// What a timer guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    Scan,
    Connect,
}

impl TimerPurpose {
    pub const ALL: [TimerPurpose; 2] = [TimerPurpose::Scan, TimerPurpose::Connect];

    fn slot(self) -> usize {
        match self {
            TimerPurpose::Scan => 0,
            TimerPurpose::Connect => 1,
        }
    }
}

impl fmt::Display for TimerPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerPurpose::Scan => write!(f, "scan"),
            TimerPurpose::Connect => write!(f, "connect"),
        }
    }
}

/// Armed timers, keyed by purpose
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerSet {
    armed: [Option<Duration>; 2],
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `purpose`; returns false if it was already armed (left untouched)
    pub fn arm(&mut self, purpose: TimerPurpose, duration: Duration) -> bool {
        let slot = &mut self.armed[purpose.slot()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(duration);
        true
    }

    /// Disarm `purpose`; returns whether it was armed
    pub fn disarm(&mut self, purpose: TimerPurpose) -> bool {
        self.armed[purpose.slot()].take().is_some()
    }

    pub fn is_armed(&self, purpose: TimerPurpose) -> bool {
        self.armed[purpose.slot()].is_some()
    }

    /// Duration `purpose` was armed with
    pub fn duration(&self, purpose: TimerPurpose) -> Option<Duration> {
        self.armed[purpose.slot()]
    }

    pub fn armed(&self) -> impl Iterator<Item = TimerPurpose> + '_ {
        TimerPurpose::ALL
            .into_iter()
            .filter(|purpose| self.is_armed(*purpose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_timer_per_purpose() {
        let mut timers = TimerSet::new();
        assert!(timers.arm(TimerPurpose::Scan, Duration::from_secs(30)));
        assert!(!timers.arm(TimerPurpose::Scan, Duration::from_secs(5)));
        assert_eq!(
            timers.duration(TimerPurpose::Scan),
            Some(Duration::from_secs(30))
        );
        assert!(!timers.is_armed(TimerPurpose::Connect));
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let mut timers = TimerSet::new();
        timers.arm(TimerPurpose::Connect, Duration::from_secs(25));
        assert!(timers.disarm(TimerPurpose::Connect));
        assert!(!timers.disarm(TimerPurpose::Connect));
        assert_eq!(timers.armed().count(), 0);
    }
}
