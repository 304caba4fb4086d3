//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ChargerService (domain)
//! ```
//!
//! Driven adapters (ADC, gate, clock, timer, host, event sinks, console)
//! implement these traits.  The [`ChargerService`](super::service::ChargerService)
//! consumes them via generics, so the control core never touches hardware
//! directly and runs unchanged against scripted mocks on the host.

use crate::scheduler::PhaseState;

// ───────────────────────────────────────────────────────────────
// Analog port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Calibrated voltage readings.  Implementations apply the calibration
/// coefficients and reject implausible raw readings before returning.
pub trait AnalogPort {
    fn read_battery_voltage(&mut self) -> f32;
    fn read_solar_voltage(&mut self) -> f32;
    fn read_inductor_voltage(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Gate port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Converter power switch.
pub trait GatePort {
    /// Drive the switch on (`true`) or off (`false`).
    fn set_gate(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond clock used for trapezoid widths.
pub trait ClockPort {
    fn now_micros(&mut self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Timer port
// ───────────────────────────────────────────────────────────────

/// Fixed-period hardware timer driving the phase scheduler.
///
/// Every expiry must call [`PhaseState::tick`] on `shared` and nothing
/// else.  Starting an already running timer restarts it.
pub trait TimerPort {
    fn start_periodic(&mut self, shared: &'static PhaseState, period_us: u32);
    fn stop_periodic(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Host port
// ───────────────────────────────────────────────────────────────

/// Terminal hand-off to the board: sleep, then hard reset.
pub trait HostPort {
    /// Called once from the shutdown handler; the core does nothing
    /// afterwards.
    fn request_sleep_and_reset(&mut self, seconds: u32);
}

/// Everything the charge controller needs from the board.
pub trait ChargerHardware: AnalogPort + GatePort + ClockPort + TimerPort + HostPort {}

impl<T> ChargerHardware for T where T: AnalogPort + GatePort + ClockPort + TimerPort + HostPort {}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Console port (calibration)
// ───────────────────────────────────────────────────────────────

/// Line-oriented text console used by the calibration session.
pub trait ConsolePort {
    /// Next pending input byte, if any.  Never blocks.
    fn read_byte(&mut self) -> Option<u8>;

    /// Echo one byte back to the user.
    fn write_byte(&mut self, byte: u8);

    /// Write one line of output.
    fn write_line(&mut self, line: &str);
}
