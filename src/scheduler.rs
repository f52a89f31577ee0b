//! Blink scheduler for the indicator LED.
//!
//! Toggles the LED at a fixed cadence, sharing the device with the web
//! server's request handlers.

use crate::device::DeviceHandle;
use std::time::Duration;
use tokio::sync::broadcast;

/// Periodic LED blinker
pub struct Scheduler {
    device: DeviceHandle,
    interval: Duration,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(device: DeviceHandle, interval: Duration) -> Self {
        Self { device, interval }
    }

    /// Run the blink loop
    ///
    /// Each iteration toggles once and then sleeps, so the loop always yields
    /// to the connection tasks. Listens for shutdown signal to stop.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Blink scheduler started ({:?})", self.interval);

        loop {
            let on = self.device.toggle_led();
            tracing::trace!("Blink: LED {}", if on { "on" } else { "off" });

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Blink scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Toggle `count` times with the configured spacing and stop, leaving the
    /// LED off
    pub async fn blink_times(&self, count: u32) {
        for _ in 0..count {
            self.device.toggle_led();
            tokio::time::sleep(self.interval).await;
        }
        self.device.set_led(false);
    }
}
