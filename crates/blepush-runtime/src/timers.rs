//! Timer service
//!
//! Single-shot timeouts keyed by purpose, on tokio's clock. Arming a purpose
//! replaces its deadline, so at most one timer per purpose is ever live.

use std::collections::HashMap;
use std::time::Duration;

use blepush_core::TimerPurpose;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Default)]
pub struct TimerService {
    deadlines: HashMap<TimerPurpose, Instant>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, purpose: TimerPurpose, duration: Duration) {
        let deadline = Instant::now() + duration;
        if self.deadlines.insert(purpose, deadline).is_some() {
            tracing::warn!("Re-armed {} timer", purpose);
        }
        tracing::debug!("Armed {} timer for {:?}", purpose, duration);
    }

    /// Returns whether the timer was still pending
    pub fn disarm(&mut self, purpose: TimerPurpose) -> bool {
        self.deadlines.remove(&purpose).is_some()
    }

    pub fn is_armed(&self, purpose: TimerPurpose) -> bool {
        self.deadlines.contains_key(&purpose)
    }

    pub fn next_deadline(&self) -> Option<(TimerPurpose, Instant)> {
        self.deadlines
            .iter()
            .min_by_key(|(_, deadline)| **deadline)
            .map(|(purpose, deadline)| (*purpose, *deadline))
    }

    /// Wait for the earliest armed timer and consume it
    ///
    /// Pends forever while nothing is armed. Dropping the future before it
    /// completes leaves the timer armed.
    pub async fn expired(&mut self) -> TimerPurpose {
        let Some((purpose, deadline)) = self.next_deadline() else {
            return std::future::pending().await;
        };
        sleep_until(deadline).await;
        self.deadlines.remove(&purpose);
        tracing::debug!("{} timer expired", purpose);
        purpose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_earliest_timer_fires_first() {
        let mut timers = TimerService::new();
        timers.arm(TimerPurpose::Scan, Duration::from_secs(30));
        timers.arm(TimerPurpose::Connect, Duration::from_secs(25));

        let start = Instant::now();
        assert_eq!(timers.expired().await, TimerPurpose::Connect);
        assert_eq!(start.elapsed(), Duration::from_secs(25));
        assert!(!timers.is_armed(TimerPurpose::Connect));
        assert!(timers.is_armed(TimerPurpose::Scan));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        let mut timers = TimerService::new();
        timers.arm(TimerPurpose::Scan, Duration::from_secs(30));
        timers.arm(TimerPurpose::Scan, Duration::from_secs(5));

        let start = Instant::now();
        assert_eq!(timers.expired().await, TimerPurpose::Scan);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(timers.next_deadline().is_none());
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let mut timers = TimerService::new();
        assert!(!timers.disarm(TimerPurpose::Scan));
        timers.arm(TimerPurpose::Scan, Duration::from_secs(1));
        assert!(timers.disarm(TimerPurpose::Scan));
        assert!(!timers.disarm(TimerPurpose::Scan));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_armed_pends() {
        let mut timers = TimerService::new();
        let result = tokio::time::timeout(Duration::from_secs(60), timers.expired()).await;
        assert!(result.is_err());
    }
}
