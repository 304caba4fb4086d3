//! Outbound application events.
//!
//! The [`ChargerService`](super::service::ChargerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, print the
//! self-test CSV, count them in a test.

use crate::control::mppt::Perturbation;
use crate::fsm::StateId;
use crate::safety::ShutdownReason;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A new charge cycle armed the converter at this duty cycle.
    ChargeStarted { duty_cycle: u8 },

    /// One MPPT decision was taken.
    Decision(DecisionRecord),

    /// The charge cycle ended.
    Shutdown(ShutdownReason),

    /// The shutdown handler found conditions good enough to charge again.
    Resumed,

    /// The host was asked to sleep and reset.
    SleepRequested { seconds: u32 },

    /// Self-test finished; the controller is halted.
    SelfTestComplete { decisions: u32 },
}

/// One MPPT decision, in the column order of the self-test CSV line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionRecord {
    pub v_battery: f32,
    pub v_solar: f32,
    pub integral_average: i64,
    pub p_current: f32,
    /// Duty cycle after the decision.
    pub duty_cycle: u8,
    pub perturbation: Perturbation,
    pub time_us: u64,
}

/// A point-in-time view of the controller for local logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub state: StateId,
    pub duty_cycle: u8,
    pub duty_increasing: bool,
    pub v_battery: f32,
    pub v_solar: f32,
    pub integral_average: i64,
    pub p_current: f32,
    pub decisions: u32,
    pub gate_enabled: bool,
}
