//! Two-phase readiness polling for freshly created emulators.
//!
//! Phase 1 waits for the container runtime to report the container as
//! running. Phase 2 probes the emulator's control API until it answers 200.
//! Any failure releases the container so no stale registry entry survives.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use toynet_core::clock::Clock;
use toynet_core::config::ReadinessConfig;
use toynet_core::container::ContainerDriver;
use toynet_core::emulator::EmulatorClient;
use toynet_core::error::Result;

use super::registry::SessionSlot;

/// Poll intervals and bounds for [`ReadinessWaiter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub boot_interval: Duration,
    pub boot_attempts: u32,
    pub probe_interval: Duration,
    /// `None` probes until the instance answers or the waiter is cancelled
    pub probe_timeout: Option<Duration>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            boot_interval: config.boot_poll_interval(),
            boot_attempts: config.boot_max_attempts,
            probe_interval: config.probe_interval(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

pub struct ReadinessWaiter {
    driver: Arc<dyn ContainerDriver>,
    client: Arc<dyn EmulatorClient>,
    clock: Arc<dyn Clock>,
    policy: ReadinessPolicy,
    cancel: CancellationToken,
}

impl ReadinessWaiter {
    pub fn new(
        driver: Arc<dyn ContainerDriver>,
        client: Arc<dyn EmulatorClient>,
        clock: Arc<dyn Clock>,
        policy: ReadinessPolicy,
    ) -> Self {
        Self {
            driver,
            client,
            clock,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token, e.g. with a child of a shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Blocks until the slot's container is reachable.
    ///
    /// Returns `Ok(false)` after releasing the container when it never came
    /// up, and `Ok(true)` when the control API answered 200. An empty slot
    /// is reported as not ready.
    ///
    /// # Errors
    ///
    /// Only the release itself can fail (`TerminateFailed`).
    pub async fn wait_until_ready(&self, slot: &mut SessionSlot) -> Result<bool> {
        let session_id = slot.session_id();

        if !self.wait_until_running(slot).await {
            tracing::warn!(
                session_id = %session_id,
                attempts = self.policy.boot_attempts,
                "Emulator container never reached running state"
            );
            slot.release().await?;
            return Ok(false);
        }

        if !self.wait_until_reachable(slot).await {
            tracing::warn!(session_id = %session_id, "Emulator control API never became reachable");
            slot.release().await?;
            return Ok(false);
        }

        tracing::debug!(session_id = %session_id, "Emulator ready");
        Ok(true)
    }

    async fn wait_until_running(&self, slot: &mut SessionSlot) -> bool {
        let mut attempts = 0u32;
        loop {
            let Some(handle) = slot.handle_mut() else {
                return false;
            };

            match self.driver.inspect(handle).await {
                Ok(status) => {
                    if status.ip_address.is_some() {
                        handle.ip_address = status.ip_address;
                    }
                    if status.running {
                        return true;
                    }
                }
                Err(e) => {
                    tracing::debug!(container = %handle.name, error = %e, "Inspect failed");
                }
            }

            if attempts >= self.policy.boot_attempts || self.cancel.is_cancelled() {
                return false;
            }
            attempts += 1;
            if !self.pause(self.policy.boot_interval).await {
                return false;
            }
        }
    }

    async fn wait_until_reachable(&self, slot: &SessionSlot) -> bool {
        let started = self.clock.now();
        loop {
            let Some(handle) = slot.handle() else {
                return false;
            };

            match self.client.probe(handle).await {
                Ok(200) => return true,
                Ok(status) => {
                    tracing::debug!(container = %handle.name, status, "Control API not ready");
                }
                Err(e) => {
                    tracing::debug!(container = %handle.name, error = %e, "Control API unreachable");
                }
            }

            if let Some(timeout) = self.policy.probe_timeout {
                if self.clock.now().duration_since(started) >= timeout {
                    return false;
                }
            }
            if !self.pause(self.policy.probe_interval).await {
                return false;
            }
        }
    }

    /// Sleeps for `interval`; returns false if cancelled meanwhile.
    async fn pause(&self, interval: Duration) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = self.clock.sleep(interval) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}
