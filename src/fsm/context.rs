//! Controller record threaded through every FSM handler.
//!
//! `ChargeContext` is the foreground half of the controller state: samples,
//! the integration window, tracker memory, the safety latch and pending
//! outbound events.  The callback half lives in the atomic
//! [`PhaseState`], which the context only borrows.  Think of it as the
//! "blackboard" in a blackboard architecture.

use heapless::Vec;
use log::warn;

use crate::app::events::AppEvent;
use crate::config::ChargerConfig;
use crate::control::mppt::PerturbObserve;
use crate::integrator::IntegrationWindow;
use crate::safety::SafetySupervisor;
use crate::scheduler::PhaseState;

/// Events a single pass can queue before the service drains them.
pub const OUTBOX_CAPACITY: usize = 4;

pub struct ChargeContext {
    // -- Shared with the scheduler callback --
    pub shared: &'static PhaseState,

    // -- Configuration --
    pub config: ChargerConfig,

    // -- Samples (foreground only) --
    pub v_battery: f32,
    pub v_solar: f32,

    // -- Control state --
    /// Foreground copy of the duty cycle; the callback reads the one
    /// published in `shared`.
    pub duty_cycle: u8,
    pub window: IntegrationWindow,
    pub tracker: PerturbObserve,
    pub safety: SafetySupervisor,
    /// MPPT decisions since the service started.
    pub decisions: u32,

    /// Set once the controller has handed off to the host or halted.
    pub halted: bool,

    outbox: Vec<AppEvent, OUTBOX_CAPACITY>,
}

impl ChargeContext {
    pub fn new(config: ChargerConfig, shared: &'static PhaseState) -> Self {
        Self {
            shared,
            duty_cycle: config.d_min,
            config,
            v_battery: 0.0,
            v_solar: 0.0,
            window: IntegrationWindow::default(),
            tracker: PerturbObserve::new(),
            safety: SafetySupervisor::new(),
            decisions: 0,
            halted: false,
            outbox: Vec::new(),
        }
    }

    /// Reset the per-cycle state.  Called on every entry to `InitCharge`.
    pub fn begin_cycle(&mut self, now_us: u64, vl: f32) {
        self.window = IntegrationWindow::new(now_us, vl);
        self.tracker = PerturbObserve::new();
        self.safety.clear();
    }

    /// Queue an event for the service to emit after this pass.
    pub fn notify(&mut self, event: AppEvent) {
        if let Err(dropped) = self.outbox.push(event) {
            warn!("event outbox full, dropping {dropped:?}");
        }
    }

    /// Take every queued event, oldest first.
    pub fn take_events(&mut self) -> Vec<AppEvent, OUTBOX_CAPACITY> {
        core::mem::take(&mut self.outbox)
    }

    /// True once the configured self-test decision count is reached.
    pub fn self_test_finished(&self) -> bool {
        self.config
            .self_test_decisions
            .is_some_and(|limit| self.decisions >= u32::from(limit))
    }
}
