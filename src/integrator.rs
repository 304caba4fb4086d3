//! Voltage-time integrator.
//!
//! Inductor current is never measured directly.  Across one charge window
//! `V_L = L·dI/dt`, so `∫V_L dt` is proportional to the current ramp, and
//! summing trapezoids between successive `(t, V_L)` samples gives a current
//! proxy that needs no shunt.
//!
//! A window opens on the first foreground pass of the charge phase and
//! closes on the first pass of the following sense phase.  Closing folds
//! the window's sum into a running average that halves on every fold.

/// Trapezoid area between two samples `dt_us` microseconds apart.
///
/// Only the two endpoints are ordered; the voltages keep their sign, so a
/// window spent below zero contributes a negative area.
pub fn trapezoid_area(v_previous: f32, v_current: f32, dt_us: u64) -> f64 {
    let (low, high) = if v_current >= v_previous {
        (v_previous, v_current)
    } else {
        (v_current, v_previous)
    };
    (f64::from(low) + f64::from(high - low) / 2.0) * dt_us as f64
}

/// Integration bookkeeping for one charge cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrationWindow {
    /// Running sum for the open window (volt·µs, truncated toward zero).
    pub integral: i64,
    /// Exponentially halved average of closed windows.
    pub integral_average: i64,
    /// Closed windows since the last MPPT decision.
    pub integration_count: u8,
    pub t_current: u64,
    pub t_previous: u64,
    pub vl_current: f32,
    pub vl_previous: f32,
    /// True while inside one continuous charge phase.
    pub in_integration_window: bool,
}

impl IntegrationWindow {
    /// Fresh window seeded with the first inductor sample.
    pub fn new(now_us: u64, vl: f32) -> Self {
        Self {
            t_current: now_us,
            t_previous: now_us,
            vl_current: vl,
            vl_previous: vl,
            ..Self::default()
        }
    }

    /// Mark the window open.  Returns `true` only on the pass that opened
    /// it, which is the one pass allowed to drive the gate high.
    pub fn open(&mut self) -> bool {
        let opened = !self.in_integration_window;
        self.in_integration_window = true;
        opened
    }

    /// Add the trapezoid from the previous sample to `(now_us, vl)`.
    pub fn accumulate(&mut self, now_us: u64, vl: f32) {
        self.t_current = now_us;
        self.vl_current = vl;

        let dt = self.t_current.saturating_sub(self.t_previous);
        let area = trapezoid_area(self.vl_previous, self.vl_current, dt);
        self.integral = (self.integral as f64 + area) as i64;

        self.t_previous = self.t_current;
        self.vl_previous = self.vl_current;
    }

    /// Close the open window: fold it into the average, count it, and zero
    /// the running sum.  Returns `false` (and changes nothing) if no window
    /// was open.
    pub fn close(&mut self) -> bool {
        if !self.in_integration_window {
            return false;
        }
        self.integral_average = self.integral_average.saturating_add(self.integral) >> 1;
        self.integration_count = self.integration_count.saturating_add(1);
        self.in_integration_window = false;
        self.integral = 0;
        true
    }

    /// True once `threshold` windows have closed since the last decision.
    pub fn decision_due(&self, threshold: u8) -> bool {
        self.integration_count == threshold
    }

    /// Start counting towards the next decision.
    pub fn reset_count(&mut self) {
        self.integration_count = 0;
    }
}
