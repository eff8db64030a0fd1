use std::time::{Duration, Instant};

/// Trailing-edge coalescer: every poke pushes the deadline out by the
/// full window, so a burst of notifications yields exactly one firing
/// once the burst goes quiet.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// Arms the debouncer to fire immediately, skipping the window.
    pub fn force(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per armed window, when `now` has reached it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_fires_once_at_trailing_edge() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.poke(t0);
        d.poke(t0 + Duration::from_millis(50));
        d.poke(t0 + Duration::from_millis(90));

        // Window restarts from the last poke, not the first.
        assert!(!d.fire(t0 + Duration::from_millis(120)));
        assert!(d.fire(t0 + Duration::from_millis(190)));
        // Disarmed after firing.
        assert!(!d.fire(t0 + Duration::from_millis(500)));
        assert!(!d.is_armed());
    }

    #[test]
    fn test_force_fires_immediately() {
        let mut d = Debouncer::new(Duration::from_secs(60));
        let t0 = Instant::now();
        d.force(t0);
        assert!(d.fire(t0));
    }

    #[test]
    fn test_unarmed_never_fires() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        assert!(!d.fire(Instant::now() + Duration::from_secs(5)));
    }
}
