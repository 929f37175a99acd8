use std::thread;
use std::time::Duration;

use log::debug;
use rand::Rng;

/// Pacing applied before every API request.
pub trait RateLimit: Send + Sync {
    fn pause(&self);
}

/// Sleeps `base` plus a random extra of up to `jitter`.
#[derive(Debug, Clone, Copy)]
pub struct Delay {
    base: Duration,
    jitter: Duration,
}

impl Delay {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Delay { base, jitter }
    }

    pub fn none() -> Self {
        Delay::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_wait(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        let mut rng = rand::thread_rng();
        let extra_ms = rng.gen_range(0..=self.jitter.as_millis() as u64);
        self.base + Duration::from_millis(extra_ms)
    }
}

impl RateLimit for Delay {
    fn pause(&self) {
        let wait = self.next_wait();
        if wait.is_zero() {
            return;
        }
        debug!("Waiting {} ms before next request", wait.as_millis());
        thread::sleep(wait);
    }
}
