//! Coalescing of creation events into rescans.
//!
//! A burst of creations (a download unpacking, a batch copy) should lead
//! to one directory scan, not one per file.

use std::time::{Duration, Instant};

/// Collapses a burst of creation events into a single trigger.
///
/// Ready once no event has arrived for the quiet period, or once the
/// first pending event is older than ten quiet periods so a steady stream
/// cannot postpone the scan forever.
#[derive(Debug)]
pub struct Debouncer {
    /// When the oldest pending event arrived.
    first: Option<Instant>,
    /// When the newest pending event arrived.
    last: Option<Instant>,
    /// Events folded into the pending trigger.
    pending: usize,
    /// Quiet period before the trigger fires.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given quiet period in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            first: None,
            last: None,
            pending: 0,
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a creation event.
    pub fn record(&mut self) {
        let now = Instant::now();
        self.first.get_or_insert(now);
        self.last = Some(now);
        self.pending += 1;
    }

    /// When the pending trigger becomes ready, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        let (first, last) = (self.first?, self.last?);
        Some((last + self.duration).min(first + self.duration * 10))
    }

    /// Take the pending trigger if its deadline has passed.
    ///
    /// Returns the number of events it coalesced.
    pub fn take_ready(&mut self) -> Option<usize> {
        let deadline = self.deadline()?;
        if Instant::now() < deadline {
            return None;
        }

        self.first = None;
        self.last = None;
        Some(std::mem::take(&mut self.pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_debouncer_basic() {
        let mut debouncer = Debouncer::new(50);
        assert!(debouncer.deadline().is_none());
        assert!(debouncer.take_ready().is_none());

        debouncer.record();

        // Immediately after, nothing should be ready
        assert!(debouncer.take_ready().is_none());
        assert!(debouncer.pending > 0);

        sleep(Duration::from_millis(60));

        assert_eq!(debouncer.take_ready(), Some(1));
        assert_eq!(debouncer.pending, 0);
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn test_debouncer_coalesces_burst() {
        let mut debouncer = Debouncer::new(50);

        for _ in 0..5 {
            debouncer.record();
        }
        assert_eq!(debouncer.pending, 5);

        sleep(Duration::from_millis(60));

        assert_eq!(debouncer.take_ready(), Some(5));
        assert_eq!(debouncer.pending, 0);
    }

    #[test]
    fn test_debouncer_resets_on_new_event() {
        let mut debouncer = Debouncer::new(50);

        debouncer.record();
        sleep(Duration::from_millis(30));

        // Record again - pushes the deadline out
        debouncer.record();
        sleep(Duration::from_millis(30));

        // 60ms since the first event, 30ms since the last
        assert!(debouncer.take_ready().is_none());

        sleep(Duration::from_millis(30));
        assert_eq!(debouncer.take_ready(), Some(2));
    }

    #[test]
    fn test_debouncer_steady_stream_still_fires() {
        let mut debouncer = Debouncer::new(10);

        let start = Instant::now();
        let mut fired = None;
        while start.elapsed() < Duration::from_millis(500) {
            debouncer.record();
            if let Some(count) = debouncer.take_ready() {
                fired = Some(count);
                break;
            }
            sleep(Duration::from_millis(5));
        }

        // Capped at ten quiet periods (100ms) after the first event
        assert!(fired.is_some());
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let mut debouncer = Debouncer::new(0);
        debouncer.record();
        assert_eq!(debouncer.take_ready(), Some(1));
    }
}
