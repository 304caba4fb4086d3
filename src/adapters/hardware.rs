//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the calibrated sensors, the gate driver and the clock, and exposes
//! them through every hardware port the charge controller needs.  This is
//! the only module in the system that touches the power stage.  On
//! non-espidf targets the underlying drivers are simulation stubs.

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::app::ports::{AnalogPort, ClockPort, GatePort, HostPort, TimerPort};
use crate::drivers::gate::GateDriver;
use crate::drivers::hw_timer;
use crate::scheduler::PhaseState;
use crate::sensors::{CalibratedSensors, RawAdc};

use super::time::Esp32TimeAdapter;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<A, P> {
    sensors: CalibratedSensors<A>,
    gate: GateDriver<P>,
    clock: Esp32TimeAdapter,
    /// Sleep length of the last host hand-off (sim builds only return).
    sleep_requested: Option<u32>,
}

impl<A: RawAdc, P: OutputPin> HardwareAdapter<A, P> {
    pub fn new(sensors: CalibratedSensors<A>, gate: GateDriver<P>, clock: Esp32TimeAdapter) -> Self {
        Self {
            sensors,
            gate,
            clock,
            sleep_requested: None,
        }
    }

    pub fn sensors_mut(&mut self) -> &mut CalibratedSensors<A> {
        &mut self.sensors
    }

    pub fn sleep_requested(&self) -> Option<u32> {
        self.sleep_requested
    }
}

// ── AnalogPort ────────────────────────────────────────────────

impl<A: RawAdc, P: OutputPin> AnalogPort for HardwareAdapter<A, P> {
    fn read_battery_voltage(&mut self) -> f32 {
        self.sensors.read_battery_voltage()
    }

    fn read_solar_voltage(&mut self) -> f32 {
        self.sensors.read_solar_voltage()
    }

    fn read_inductor_voltage(&mut self) -> f32 {
        self.sensors.read_inductor_voltage()
    }
}

// ── GatePort ──────────────────────────────────────────────────

impl<A: RawAdc, P: OutputPin> GatePort for HardwareAdapter<A, P> {
    fn set_gate(&mut self, on: bool) {
        self.gate.set_gate(on);
    }
}

// ── ClockPort ─────────────────────────────────────────────────

impl<A: RawAdc, P: OutputPin> ClockPort for HardwareAdapter<A, P> {
    fn now_micros(&mut self) -> u64 {
        self.clock.now_micros()
    }
}

// ── TimerPort ─────────────────────────────────────────────────

impl<A: RawAdc, P: OutputPin> TimerPort for HardwareAdapter<A, P> {
    fn start_periodic(&mut self, shared: &'static PhaseState, period_us: u32) {
        if let Err(e) = hw_timer::start_phase_timer(shared, period_us) {
            // Without ticks the phase never leaves Charge; never leave the
            // switch armed in that case.
            error!("hardware: {e}, converter stays off");
            shared.disarm();
            self.gate.set_gate(false);
        }
    }

    fn stop_periodic(&mut self) {
        hw_timer::stop_phase_timer();
    }
}

// ── HostPort ──────────────────────────────────────────────────

impl<A: RawAdc, P: OutputPin> HostPort for HardwareAdapter<A, P> {
    fn request_sleep_and_reset(&mut self, seconds: u32) {
        hw_timer::stop_phase_timer();
        self.gate.set_gate(false);
        self.sleep_requested = Some(seconds);
        info!("hardware: deep sleep for {}s, reset on wake", seconds);
        deep_sleep(seconds);
    }
}

/// Deep sleep wakes through a full reset, which is the reset we want.
#[cfg(target_os = "espidf")]
fn deep_sleep(seconds: u32) {
    // SAFETY: esp_deep_sleep powers down and never returns.
    unsafe { esp_idf_svc::sys::esp_deep_sleep(u64::from(seconds) * 1_000_000) }
}

#[cfg(not(target_os = "espidf"))]
fn deep_sleep(_seconds: u32) {}
