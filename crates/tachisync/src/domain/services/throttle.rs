use std::time::Duration;

use tokio::time::{self, Instant};

pub const THROTTLE_MAX: Duration = Duration::from_millis(5500);
pub const THROTTLE_INC: Duration = Duration::from_millis(20);
/// Delay at which a sync starts to be noticeably slow
pub const THROTTLE_WARN: Duration = Duration::from_secs(1);

/// Spaces out consecutive requests to the gallery site, with a delay that grows on every call.
#[derive(Debug, Clone)]
pub struct ThrottleManager {
    max: Duration,
    inc: Duration,
    last_throttle: Option<Instant>,
    throttle_time: Duration,
    warned: bool,
}

impl Default for ThrottleManager {
    fn default() -> Self {
        Self::new(THROTTLE_MAX, THROTTLE_INC)
    }
}

impl ThrottleManager {
    pub fn new(max: Duration, inc: Duration) -> Self {
        Self {
            max,
            inc,
            last_throttle: None,
            throttle_time: Duration::ZERO,
            warned: false,
        }
    }

    pub fn throttle_time(&self) -> Duration {
        self.throttle_time
    }

    pub async fn throttle(&mut self) {
        if let Some(last) = self.last_throttle {
            let elapsed = last.elapsed();
            if elapsed < self.throttle_time {
                time::sleep(self.throttle_time - elapsed).await;
            }
        }

        if self.throttle_time < self.max {
            self.throttle_time = (self.throttle_time + self.inc).min(self.max);
        }

        if !self.warned && self.throttle_time >= THROTTLE_WARN {
            warn!(
                "throttling requests to the gallery site, delay is now {:?}",
                self.throttle_time
            );
            self.warned = true;
        }

        self.last_throttle = Some(Instant::now());
    }

    /// Warning state survives a reset, it is only logged once per manager.
    pub fn reset(&mut self) {
        self.last_throttle = None;
        self.throttle_time = Duration::ZERO;
    }
}
