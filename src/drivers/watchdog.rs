//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the board if the foreground control loop stalls.  A stalled
//! loop with the gate high would leave the switch on for the whole stall,
//! so the timeout is kept short.
//!
//! The control loop calls `feed()` on every pass; the driver only touches
//! the TWDT once per `FEED_STRIDE` passes.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Passes between real TWDT resets.
pub const FEED_STRIDE: u32 = 1_024;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    passes: u32,
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT configuration from the single main task at boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK as i32 {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK as i32;
                if subscribed {
                    info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self {
                    subscribed,
                    passes: 0,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): no-op ({}ms)", timeout_ms);
            Self { passes: 0 }
        }
    }

    /// Count one loop pass; reset the TWDT every `FEED_STRIDE` passes.
    /// Returns `true` on the passes that actually fed it.
    pub fn feed(&mut self) -> bool {
        self.passes = self.passes.wrapping_add(1);
        if self.passes % FEED_STRIDE != 0 {
            return false;
        }
        self.feed_now();
        true
    }

    /// Reset the TWDT immediately, for slow loops that delay between passes.
    pub fn feed_now(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: the current task subscribed in new().
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
