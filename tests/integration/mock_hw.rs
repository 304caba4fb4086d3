//! Mock hardware adapter for integration tests.
//!
//! Scripted rail voltages, a clock that only moves when the test fires a
//! scheduler tick, and a record of every gate/timer/host call so tests can
//! assert on the full command history without touching real peripherals.

use solar_mppt::app::events::AppEvent;
use solar_mppt::app::ports::{
    AnalogPort, ClockPort, EventSink, GatePort, HostPort, TimerPort,
};
use solar_mppt::scheduler::PhaseState;

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HwCall {
    Gate(bool),
    TimerStart { period_us: u32 },
    TimerStop,
    Sleep { seconds: u32 },
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub v_battery: f32,
    pub v_solar: f32,
    pub v_inductor: f32,
    /// Simulated time (µs); advanced by `fire`.
    pub now_us: u64,
    /// When set, `start_periodic` behaves like a failed esp_timer start.
    pub fail_timer: bool,
    pub calls: Vec<HwCall>,
    shared: Option<&'static PhaseState>,
    period_us: u32,
}

#[allow(dead_code)]
impl MockHardware {
    /// 12 V battery on an 18 V panel, small positive inductor voltage.
    pub fn new() -> Self {
        Self {
            v_battery: 12.0,
            v_solar: 18.0,
            v_inductor: 0.5,
            now_us: 0,
            fail_timer: false,
            calls: Vec::new(),
            shared: None,
            period_us: 0,
        }
    }

    /// Deliver one scheduler tick if the periodic timer is running.
    pub fn fire(&mut self) {
        if let Some(shared) = self.shared {
            self.now_us += u64::from(self.period_us);
            shared.tick();
        }
    }

    pub fn timer_running(&self) -> bool {
        self.shared.is_some()
    }

    pub fn gate_calls(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Gate(on) => Some(*on),
                _ => None,
            })
            .collect()
    }

    pub fn gate_on(&self) -> bool {
        self.gate_calls().last().copied().unwrap_or(false)
    }

    pub fn sleep_requests(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Sleep { seconds } => Some(*seconds),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: HwCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogPort for MockHardware {
    fn read_battery_voltage(&mut self) -> f32 {
        self.v_battery
    }

    fn read_solar_voltage(&mut self) -> f32 {
        self.v_solar
    }

    fn read_inductor_voltage(&mut self) -> f32 {
        self.v_inductor
    }
}

impl GatePort for MockHardware {
    fn set_gate(&mut self, on: bool) {
        self.calls.push(HwCall::Gate(on));
    }
}

impl ClockPort for MockHardware {
    fn now_micros(&mut self) -> u64 {
        self.now_us
    }
}

impl TimerPort for MockHardware {
    fn start_periodic(&mut self, shared: &'static PhaseState, period_us: u32) {
        self.calls.push(HwCall::TimerStart { period_us });
        if self.fail_timer {
            shared.disarm();
            self.set_gate(false);
            return;
        }
        self.shared = Some(shared);
        self.period_us = period_us;
    }

    fn stop_periodic(&mut self) {
        self.calls.push(HwCall::TimerStop);
        self.shared = None;
    }
}

impl HostPort for MockHardware {
    fn request_sleep_and_reset(&mut self, seconds: u32) {
        self.calls.push(HwCall::Sleep { seconds });
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Decision(_)))
            .count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

/// A fresh shared block per test; tests run on parallel threads.
pub fn leak_phase() -> &'static PhaseState {
    Box::leak(Box::new(PhaseState::new()))
}
