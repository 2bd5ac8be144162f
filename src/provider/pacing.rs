//! Minimum-interval pacing for rate-limited endpoints

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum delay between consecutive calls to one endpoint
///
/// The first call goes out immediately; every later call waits until
/// `min_interval` has passed since the previous one started.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Waits until the endpoint may be called again, then records the call
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                tracing::trace!("Pacing: waiting {:?} before next call", delay);
                tokio::time::sleep(delay).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
