//! Perturb-and-observe maximum power point tracker
//!
//! Hill-climbing on the power proxy: nudge the duty cycle one percent,
//! watch whether power rose or fell, and keep or reverse the direction.
//! One bit of direction memory stops the tracker from hunting back and
//! forth around the peak on every decision.

use crate::config::ChargerConfig;

/// What the tracker did on one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perturbation {
    /// Power rose: stepped again in the remembered direction.
    Continue,
    /// Power fell: stepped the other way and flipped the direction.
    Reverse,
    /// Power unchanged: duty and direction left alone.
    Hold,
}

/// Outcome of one P&O step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub duty_cycle: u8,
    pub perturbation: Perturbation,
    pub duty_increasing: bool,
    pub p_current: f32,
}

/// Power proxy: battery voltage times the averaged current proxy.  The
/// inductance and sense scaling are folded into calibration upstream.
pub fn power_proxy(v_battery: f32, integral_average: i64) -> f32 {
    v_battery * integral_average as f32
}

/// Starting duty for a fresh charge cycle: the ideal buck ratio
/// `100 · v_battery / v_solar`, truncated and clamped to the duty bounds.
/// A dead panel (`v_solar <= 0`) seeds `d_max`.
pub fn seed_duty(v_battery: f32, v_solar: f32, config: &ChargerConfig) -> u8 {
    if v_solar <= 0.0 {
        return config.d_max;
    }
    // `as` saturates and maps NaN to 0.
    config.clamp_duty((100.0 * v_battery / v_solar) as i32)
}

/// Tracker state carried between decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbObserve {
    pub p_current: f32,
    pub p_previous: f32,
    /// Whether the last perturbation raised the duty cycle.
    pub duty_increasing: bool,
}

impl Default for PerturbObserve {
    fn default() -> Self {
        Self::new()
    }
}

impl PerturbObserve {
    /// Power climbs from zero at start-up, so the first step assumes the
    /// last move was upward.
    pub fn new() -> Self {
        Self {
            p_current: 0.0,
            p_previous: 0.0,
            duty_increasing: true,
        }
    }

    /// Run one decision for `p_current` starting from `duty`.
    pub fn decide(&mut self, duty: u8, p_current: f32, config: &ChargerConfig) -> Decision {
        self.p_current = p_current;
        let step = |up: bool| {
            let next = if up {
                i32::from(duty) + 1
            } else {
                i32::from(duty) - 1
            };
            config.clamp_duty(next)
        };

        let (duty_cycle, perturbation) = if self.p_current > self.p_previous {
            (step(self.duty_increasing), Perturbation::Continue)
        } else if self.p_current < self.p_previous {
            self.duty_increasing = !self.duty_increasing;
            (step(self.duty_increasing), Perturbation::Reverse)
        } else {
            (duty, Perturbation::Hold)
        };

        self.p_previous = self.p_current;

        Decision {
            duty_cycle,
            perturbation,
            duty_increasing: self.duty_increasing,
            p_current: self.p_current,
        }
    }
}
