//! Application service: the hexagonal core.
//!
//! [`ChargerService`] owns the FSM and the controller context.  It exposes
//! a hardware-agnostic API: every I/O flows through the port traits handed
//! in at call sites, so the whole charge loop runs against mock adapters.
//!
//! ```text
//!  AnalogPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  ClockPort  ──▶ │      ChargerService       │
//!  GatePort   ◀── │  FSM · Integrator · MPPT  │
//!  TimerPort  ◀── │  Safety · Shutdown        │
//!  HostPort   ◀── └──────────────────────────┘
//!                        ▲
//!                        │ phase (atomic)
//!                  PhaseState::tick  (timer callback)
//! ```

use log::info;

use crate::config::ChargerConfig;
use crate::error::Result;
use crate::fsm::context::ChargeContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::scheduler::{Phase, PhaseState};

use super::events::{AppEvent, Telemetry};
use super::ports::{ChargerHardware, EventSink};

// ───────────────────────────────────────────────────────────────
// ChargerService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct ChargerService<H> {
    fsm: Fsm<H>,
    ctx: ChargeContext,
}

impl<H: ChargerHardware> ChargerService<H> {
    /// Construct the service.  Rejects an invalid configuration.
    ///
    /// `shared` is the block the timer callback ticks; it must outlive
    /// every timer the service arms, hence `'static`.
    ///
    /// Does **not** start the FSM: call [`start`](Self::start) next.
    pub fn new(config: ChargerConfig, shared: &'static PhaseState) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fsm: Fsm::new(build_state_table(), StateId::InitCharge),
            ctx: ChargeContext::new(config, shared),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, hw: &mut H, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx, hw);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("ChargerService started in {:?}", self.fsm.current_state());
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// Run one foreground pass: follow the scheduler's phase → run the
    /// current state's handler → emit queued events.
    ///
    /// Call as often as the host allows; the integrator's accuracy
    /// depends on how densely charge-phase passes sample `V_L`.
    pub fn poll(&mut self, hw: &mut H, sink: &mut impl EventSink) {
        if self.ctx.halted {
            return;
        }

        // 1. The callback owns the Integrate/TrackPower split
        self.follow_phase(hw);
        let prev_state = self.fsm.current_state();

        // 2. State handler
        self.fsm.tick(&mut self.ctx, hw);

        // 3. Lifecycle transitions are announced; phase flips are not
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        for event in self.ctx.take_events() {
            sink.emit(&event);
        }
    }

    fn follow_phase(&mut self, hw: &mut H) {
        if !self.fsm.current_state().is_switching() || !self.ctx.shared.gate_enabled() {
            return;
        }
        let target = match self.ctx.shared.phase() {
            Phase::Charge => StateId::Integrate,
            Phase::Sense => StateId::TrackPower,
            Phase::Idle => return,
        };
        self.fsm.force_transition(target, &mut self.ctx, hw);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            state: self.fsm.current_state(),
            duty_cycle: self.ctx.duty_cycle,
            duty_increasing: self.ctx.tracker.duty_increasing,
            v_battery: self.ctx.v_battery,
            v_solar: self.ctx.v_solar,
            integral_average: self.ctx.window.integral_average,
            p_current: self.ctx.tracker.p_current,
            decisions: self.ctx.decisions,
            gate_enabled: self.ctx.shared.gate_enabled(),
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// True once the controller has handed off to the host (sleep/reset)
    /// or halted after a self-test.  Further polls do nothing.
    pub fn is_halted(&self) -> bool {
        self.ctx.halted
    }

    pub fn config(&self) -> &ChargerConfig {
        &self.ctx.config
    }
}
