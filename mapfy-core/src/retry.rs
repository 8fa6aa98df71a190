//! Retry with exponential backoff for overlay attachment.
//!
//! The drawing engine's readiness lags the map's readiness signal by an
//! unpredictable amount, so attach attempts are retried with exponential
//! backoff. Exhausting the attempts surfaces a persistent "editor not
//! ready" state instead of looping forever.

use tokio::time::{sleep, Duration};

use crate::draw::DrawTools;
use crate::error::{MapError, MapResult};
use crate::lifecycle::MapLifecycle;

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial delay between attempts in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 500,
            max_delay_ms: 3_000,
            multiplier: 1.5,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        base.min(self.max_delay_ms as f64) as u64
    }
}

/// Attach the draw overlay, retrying with backoff until it succeeds or the
/// attempts are exhausted.
///
/// # Errors
///
/// Returns [`MapError::Attachment`] after the final failed attempt; the
/// editor remains in viewing-only mode until a later retry succeeds.
pub async fn attach_with_backoff(
    draw: &mut DrawTools,
    map: &MapLifecycle,
    config: &RetryConfig,
) -> MapResult<()> {
    for attempt in 0..config.max_attempts {
        if draw.attach(map) {
            if attempt > 0 {
                tracing::info!(attempt = attempt + 1, "draw overlay attached after retries");
            }
            return Ok(());
        }

        if attempt + 1 < config.max_attempts {
            let delay = config.delay_for_attempt(attempt);
            tracing::debug!(
                attempt = attempt + 1,
                max = config.max_attempts,
                delay_ms = delay,
                "attach failed, backing off"
            );
            sleep(Duration::from_millis(delay)).await;
        }
    }

    Err(MapError::Attachment(format!(
        "draw overlay did not attach after {} attempts",
        config.max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::PoisonError;

    use crate::draw::tests::FakeOverlay;
    use crate::draw::DrawTools;
    use crate::lifecycle::tests::loaded_controller;

    #[test]
    fn test_delay_growth_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), 500);
        assert_eq!(config.delay_for_attempt(1), 750);
        assert_eq!(config.delay_for_attempt(2), 1125);
        // Far along, the cap applies.
        assert_eq!(config.delay_for_attempt(10), 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_retries_until_success() {
        let map = loaded_controller().await;
        let (overlay, state) = FakeOverlay::with_state();
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_installs_remaining = 3;
        let mut draw = DrawTools::new(Box::new(overlay));

        attach_with_backoff(&mut draw, &map, &RetryConfig::default())
            .await
            .expect("attach eventually succeeds");
        assert!(draw.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_surface_attachment_error() {
        let map = loaded_controller().await;
        let (overlay, state) = FakeOverlay::with_state();
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_install = true;
        let mut draw = DrawTools::new(Box::new(overlay));

        let config = RetryConfig::new(4, 10, 100, 2.0);
        let err = attach_with_backoff(&mut draw, &map, &config)
            .await
            .expect_err("attempts exhausted");
        assert!(matches!(err, MapError::Attachment(_)));
        assert!(!draw.is_attached());
    }
}
