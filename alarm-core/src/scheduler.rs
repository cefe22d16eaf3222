// Poll scheduling: one deadline, advanced by the poll interval after a
// negative result or by the cooldown after a positive one.

use crate::config::TimingConfig;
use crate::time;

#[derive(Debug, Clone)]
pub struct Scheduler {
    next_poll_at: u32,
    last_status_log_at: Option<u32>,
    poll_interval_ms: u32,
    cooldown_ms: u32,
    status_log_interval_ms: u32,
}

impl Scheduler {
    /// First poll is due immediately at `now`.
    pub fn new(now: u32, timing: &TimingConfig) -> Self {
        Self {
            next_poll_at: now,
            last_status_log_at: None,
            poll_interval_ms: timing.poll_interval_ms,
            cooldown_ms: timing.cooldown_ms,
            status_log_interval_ms: timing.status_log_interval_ms,
        }
    }

    pub fn next_poll_at(&self) -> u32 {
        self.next_poll_at
    }

    pub fn is_due(&self, now: u32) -> bool {
        time::deadline_reached(now, self.next_poll_at)
    }

    pub fn remaining_ms(&self, now: u32) -> u32 {
        time::remaining_ms(now, self.next_poll_at)
    }

    /// Negative result: next poll one interval after `now`.
    pub fn schedule_next(&mut self, now: u32) -> u32 {
        self.next_poll_at = time::after(now, self.poll_interval_ms);
        self.next_poll_at
    }

    /// Positive result: no poll until the cooldown has passed. Re-applying
    /// extends the window from the new `now`.
    pub fn suppress(&mut self, now: u32) -> u32 {
        self.next_poll_at = time::after(now, self.cooldown_ms);
        self.next_poll_at
    }

    /// Rate limit for the "next check in" diagnostic. Returns true (and
    /// records `now`) at most once per status-log interval.
    pub fn take_status_slot(&mut self, now: u32) -> bool {
        let due = match self.last_status_log_at {
            None => true,
            Some(last) => time::elapsed_ms(now, last) >= self.status_log_interval_ms,
        };
        if due {
            self.last_status_log_at = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scheduler(now: u32) -> Scheduler {
        Scheduler::new(now, &TimingConfig::default())
    }

    #[test]
    fn test_first_poll_immediate() {
        let s = scheduler(1_234);
        assert!(s.is_due(1_234));
        assert_eq!(s.remaining_ms(1_234), 0);
    }

    #[test]
    fn test_negative_result_advances_interval() {
        let mut s = scheduler(0);
        assert_eq!(s.schedule_next(100), 5_100);
        assert!(!s.is_due(5_099));
        assert!(s.is_due(5_100));
    }

    #[test]
    fn test_suppression_window() {
        let mut s = scheduler(0);
        s.suppress(10_000);
        assert!(!s.is_due(10_000 + 299_999));
        assert!(s.is_due(10_000 + 300_000));
        assert_eq!(s.remaining_ms(70_000), 240_000);
    }

    #[test]
    fn test_status_slot_rate_limited() {
        let mut s = scheduler(0);
        assert!(s.take_status_slot(100));
        assert!(!s.take_status_slot(5_000));
        assert!(!s.take_status_slot(15_099));
        assert!(s.take_status_slot(15_100));
        assert!(!s.take_status_slot(15_200));
    }

    proptest! {
        #[test]
        fn prop_negative_polls_advance_by_interval(now in any::<u32>(), gaps in prop::collection::vec(0u32..60_000, 1..20)) {
            let mut s = scheduler(now);
            let mut t = now;
            for gap in gaps {
                t = time::after(t, gap);
                let next = s.schedule_next(t);
                prop_assert_eq!(time::elapsed_ms(next, t), 5_000);
                prop_assert_eq!(s.remaining_ms(t), 5_000);
            }
        }
    }
}
