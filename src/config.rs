//! Charger configuration parameters
//!
//! All tunable constants consumed by the charge controller.
//! Defaults match the reference board (12 V lead-acid battery, 18 V panel).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Duty cycle is expressed in whole percent, so one switching period is
/// split into this many scheduler ticks.
pub const PHASE_STEPS: u8 = 100;

/// Core charger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerConfig {
    // --- Duty cycle ---
    /// Lowest duty cycle the tracker may command (percent).
    pub d_min: u8,
    /// Highest duty cycle the tracker may command (percent).
    pub d_max: u8,

    // --- MPPT ---
    /// Completed integration windows folded per P&O decision. Must be >= 1.
    pub num_integrations: u8,

    // --- Battery ---
    /// Battery voltage at which charging is considered complete (volts).
    pub v_charge_target: f32,

    // --- Timing ---
    /// One full switching period (microseconds). The phase scheduler ticks
    /// at `switching_period_us / 100`.
    pub switching_period_us: u32,
    /// Delay before the host resets after a terminal shutdown (seconds).
    pub sleep_time_secs: u32,

    // --- Self test ---
    /// When set, stop after this many MPPT decisions and report instead of
    /// charging indefinitely.
    pub self_test_decisions: Option<u16>,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            // Duty cycle
            d_min: 10,
            d_max: 90,

            // MPPT
            num_integrations: 8,

            // Battery
            v_charge_target: 14.4,

            // Timing
            switching_period_us: 10_000, // 100 Hz switching, 100 µs tick
            sleep_time_secs: 60,

            // Self test
            self_test_decisions: None,
        }
    }
}

impl ChargerConfig {
    /// Period of the phase scheduler callback in microseconds.
    pub fn tick_period_us(&self) -> u32 {
        self.switching_period_us / u32::from(PHASE_STEPS)
    }

    /// Clamp a duty cycle into `[d_min, d_max]`.
    pub fn clamp_duty(&self, duty: i32) -> u8 {
        duty.clamp(i32::from(self.d_min), i32::from(self.d_max)) as u8
    }

    /// True if `v_solar` can still sustain `v_battery` at `d_max`.
    pub fn solar_sustains(&self, v_solar: f32, v_battery: f32) -> bool {
        v_solar * f32::from(self.d_max) / 100.0 >= v_battery
    }

    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_integrations == 0 {
            return Err(ConfigError::ValidationFailed(
                "num_integrations must be at least 1",
            ));
        }
        if self.d_max > PHASE_STEPS {
            return Err(ConfigError::ValidationFailed("d_max above 100%"));
        }
        if self.d_min >= self.d_max {
            return Err(ConfigError::ValidationFailed("d_min must be below d_max"));
        }
        if !self.v_charge_target.is_finite() || self.v_charge_target <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "v_charge_target must be a positive voltage",
            ));
        }
        if self.switching_period_us < u32::from(PHASE_STEPS) {
            return Err(ConfigError::ValidationFailed(
                "switching_period_us must be at least 100",
            ));
        }
        if self.self_test_decisions == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "self_test_decisions must be at least 1 when set",
            ));
        }
        Ok(())
    }
}
