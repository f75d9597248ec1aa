//! Minimum-interval throttling for outbound reports

use std::time::Duration;

use crate::MonotonicInstant;

/// Allows at most one send per `min_interval`.
///
/// A caller reserves the slot with [`ReportThrottle::try_acquire`] before
/// sending. If the send fails, [`ReportThrottle::rollback`] restores the
/// previous reservation so the next trigger may try again.
#[derive(Debug)]
pub struct ReportThrottle {
    min_interval: Duration,
    last_sent: Option<MonotonicInstant>,
    /// Reservation replaced by the most recent `try_acquire`
    previous: Option<MonotonicInstant>,
}

impl ReportThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
            previous: None,
        }
    }

    /// Reserve the send slot at `now`.
    ///
    /// Returns `true` if the caller may send, `false` if throttled.
    pub fn try_acquire(&mut self, now: MonotonicInstant) -> bool {
        if let Some(last) = self.last_sent {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }

        self.previous = self.last_sent;
        self.last_sent = Some(now);
        true
    }

    /// Release the reservation made at `reserved` after a failed send.
    ///
    /// Does nothing if a later reservation has replaced it.
    pub fn rollback(&mut self, reserved: MonotonicInstant) {
        if self.last_sent == Some(reserved) {
            self.last_sent = self.previous.take();
        }
    }

    /// Time until the next send is allowed
    pub fn remaining(&self, now: MonotonicInstant) -> Duration {
        match self.last_sent {
            Some(last) => match last.checked_add(self.min_interval) {
                Some(next) => next.saturating_duration_until(now),
                None => Duration::MAX,
            },
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MonotonicInstant {
        MonotonicInstant::from(tokio::time::Instant::now())
    }

    #[test]
    fn first_send_is_allowed() {
        let mut throttle = ReportThrottle::new(Duration::from_secs(60));
        assert!(throttle.try_acquire(base()));
    }

    #[test]
    fn sends_within_interval_are_throttled() {
        let t0 = base();
        let mut throttle = ReportThrottle::new(Duration::from_secs(60));

        assert!(throttle.try_acquire(t0));
        assert!(!throttle.try_acquire(t0 + Duration::from_secs(30)));
        assert!(!throttle.try_acquire(t0 + Duration::from_secs(59)));
        assert!(throttle.try_acquire(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn rollback_releases_reservation() {
        let t0 = base();
        let mut throttle = ReportThrottle::new(Duration::from_secs(60));

        assert!(throttle.try_acquire(t0));
        throttle.rollback(t0);
        assert!(throttle.try_acquire(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn rollback_restores_earlier_send() {
        let t0 = base();
        let mut throttle = ReportThrottle::new(Duration::from_secs(60));

        assert!(throttle.try_acquire(t0));
        assert!(throttle.try_acquire(t0 + Duration::from_secs(60)));
        throttle.rollback(t0 + Duration::from_secs(60));

        // The successful send at t0 still counts
        assert!(throttle.try_acquire(t0 + Duration::from_secs(61)));
        assert!(!throttle.try_acquire(t0 + Duration::from_secs(62)));
    }

    #[test]
    fn stale_rollback_is_ignored() {
        let t0 = base();
        let mut throttle = ReportThrottle::new(Duration::from_secs(60));

        assert!(throttle.try_acquire(t0));
        assert!(throttle.try_acquire(t0 + Duration::from_secs(70)));
        throttle.rollback(t0);

        assert!(!throttle.try_acquire(t0 + Duration::from_secs(80)));
    }

    #[test]
    fn remaining_counts_down() {
        let t0 = base();
        let mut throttle = ReportThrottle::new(Duration::from_secs(60));

        assert_eq!(throttle.remaining(t0), Duration::ZERO);
        throttle.try_acquire(t0);
        assert_eq!(
            throttle.remaining(t0 + Duration::from_secs(45)),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        let t0 = base();
        let mut throttle = ReportThrottle::new(Duration::MAX);

        assert!(throttle.try_acquire(t0));
        assert!(!throttle.try_acquire(t0 + Duration::from_secs(3600)));
        assert_eq!(throttle.remaining(t0), Duration::MAX);
    }
}
