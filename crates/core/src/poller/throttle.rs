//! Time-window log throttle.

use tokio::time::{Duration, Instant};

/// Allows one event per window.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    last: Option<Instant>,
}

impl LogThrottle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns true (and starts a new window) if the current window has elapsed.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_once_per_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(5));
        assert!(throttle.ready());
        assert!(!throttle.ready());

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!throttle.ready());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(throttle.ready());
        assert!(!throttle.ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_over_many_calls() {
        let mut throttle = LogThrottle::new(Duration::from_secs(5));
        let mut emitted = 0;
        // 100 calls, one every 200ms = 20 seconds
        for _ in 0..100 {
            if throttle.ready() {
                emitted += 1;
            }
            tokio::time::advance(Duration::from_millis(200)).await;
        }
        assert_eq!(emitted, 4);
    }
}
