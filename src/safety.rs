//! Safety supervisor.
//!
//! Runs on **every sense-phase pass, before the tracker** and decides
//! whether the charge cycle must end.  Two hard cutoffs:
//!
//! 1. Battery full: `v_battery >= v_charge_target`.
//! 2. Panel too weak: even `d_max` cannot lift the panel voltage to the
//!    battery voltage (`v_solar * d_max / 100 < v_battery`).
//!
//! ## Shutdown lifecycle
//!
//! 1. A cutoff trips; the supervisor latches the reason and logs it.
//! 2. The state machine disables the gate and enters `Done`.
//! 3. The latch holds for the rest of the cycle: nothing retries it and
//!    the tracker cannot override it.
//! 4. `Done` re-samples and asks [`SafetySupervisor::can_resume`]; a fresh
//!    cycle (`InitCharge`) clears the latch.

use core::fmt;

use crate::config::ChargerConfig;
use log::{error, info};

/// Why a charge cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Battery reached the charge target.
    BatteryFull,
    /// Panel voltage cannot sustain the battery at the maximum duty cycle.
    InsufficientSolar,
    /// Self-test ran its configured number of decisions.
    SelfTestComplete,
    /// The phase timer is not running, so the converter cannot switch.
    SchedulerFault,
}

impl ShutdownReason {
    /// Whether a re-sample in `Done` may start a new cycle.  A scheduler
    /// fault only clears through the host reset.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, Self::SchedulerFault)
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatteryFull => write!(f, "battery full"),
            Self::InsufficientSolar => write!(f, "insufficient solar"),
            Self::SelfTestComplete => write!(f, "self test complete"),
            Self::SchedulerFault => write!(f, "phase timer not running"),
        }
    }
}

/// Pure cutoff evaluation, battery first.
pub fn check(v_battery: f32, v_solar: f32, config: &ChargerConfig) -> Option<ShutdownReason> {
    if v_battery >= config.v_charge_target {
        Some(ShutdownReason::BatteryFull)
    } else if !config.solar_sustains(v_solar, v_battery) {
        Some(ShutdownReason::InsufficientSolar)
    } else {
        None
    }
}

/// Safety supervisor.
#[derive(Debug, Clone, Default)]
pub struct SafetySupervisor {
    /// Latched shutdown reason for the current cycle.
    latched: Option<ShutdownReason>,
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self { latched: None }
    }

    /// Evaluate both cutoffs and latch the first one that trips.
    /// Returns the latched reason, if any.
    pub fn evaluate(
        &mut self,
        v_battery: f32,
        v_solar: f32,
        config: &ChargerConfig,
    ) -> Option<ShutdownReason> {
        if self.latched.is_none() {
            if let Some(reason) = check(v_battery, v_solar, config) {
                error!(
                    "SAFETY SHUTDOWN: {reason} (v_battery={:.2}V v_solar={:.2}V)",
                    v_battery, v_solar
                );
                self.latched = Some(reason);
            }
        }
        self.latched
    }

    /// Latch a shutdown that did not come from a voltage cutoff.
    pub fn latch(&mut self, reason: ShutdownReason) {
        if self.latched.is_none() {
            info!("SHUTDOWN: {reason}");
            self.latched = Some(reason);
        }
    }

    /// True if the latched reason allows a restart, the battery has dropped
    /// back below target and the panel can again sustain it.
    pub fn can_resume(&self, v_battery: f32, v_solar: f32, config: &ChargerConfig) -> bool {
        self.latched.is_none_or(ShutdownReason::is_recoverable)
            && v_battery < config.v_charge_target
            && config.solar_sustains(v_solar, v_battery)
    }

    pub fn latched(&self) -> Option<ShutdownReason> {
        self.latched
    }

    /// Forget the latch at the start of a new charge cycle.
    pub fn clear(&mut self) {
        self.latched = None;
    }
}
