//! Integration tests for the ChargerService → FSM → ports pipeline.
//!
//! A scripted `MockHardware` stands in for the board: each `step` delivers
//! one scheduler tick (when the timer is running) followed by one
//! foreground pass, the same interleaving the firmware sees with a fast
//! polling loop.

use solar_mppt::app::events::{AppEvent, DecisionRecord};
use solar_mppt::app::service::ChargerService;
use solar_mppt::config::ChargerConfig;
use solar_mppt::control::mppt::Perturbation;
use solar_mppt::fsm::StateId;
use solar_mppt::safety::ShutdownReason;
use solar_mppt::scheduler::PhaseState;

use crate::mock_hw::{HwCall, MockHardware, RecordingSink, leak_phase};

struct Rig {
    app: ChargerService<MockHardware>,
    hw: MockHardware,
    sink: RecordingSink,
    shared: &'static PhaseState,
}

impl Rig {
    fn new(config: ChargerConfig) -> Self {
        let shared = leak_phase();
        let mut app = ChargerService::new(config, shared).expect("valid config");
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        app.start(&mut hw, &mut sink);
        Self {
            app,
            hw,
            sink,
            shared,
        }
    }

    fn step(&mut self) {
        self.hw.fire();
        self.app.poll(&mut self.hw, &mut self.sink);
    }

    fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Step until `state` is reached; panics after `limit` steps.
    fn run_until_state(&mut self, state: StateId, limit: usize) {
        for _ in 0..limit {
            self.step();
            if self.app.state() == state {
                return;
            }
        }
        panic!("never reached {:?}, stuck in {:?}", state, self.app.state());
    }
}

// ── Start-up ─────────────────────────────────────────────────

#[test]
fn first_pass_seeds_duty_and_starts_the_timer() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.step();

    assert_eq!(rig.app.state(), StateId::Integrate);
    assert_eq!(
        rig.sink.events,
        vec![
            AppEvent::Started(StateId::InitCharge),
            AppEvent::StateChanged {
                from: StateId::InitCharge,
                to: StateId::Integrate,
            },
            // 100 · 12 / 18 = 66.7, truncated
            AppEvent::ChargeStarted { duty_cycle: 66 },
        ]
    );
    assert_eq!(rig.hw.count(HwCall::TimerStart { period_us: 100 }), 1);
    assert!(rig.shared.gate_enabled());
    assert_eq!(rig.shared.duty_cycle(), 66);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ChargerConfig {
        num_integrations: 0,
        ..ChargerConfig::default()
    };
    assert!(ChargerService::<MockHardware>::new(config, leak_phase()).is_err());
}

// ── Switching cadence ────────────────────────────────────────

#[test]
fn gate_rises_and_falls_once_per_window() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.step();
    rig.run(1_000);

    // Ten switching periods: one window each, gate toggled exactly twice
    let expected: Vec<bool> = [true, false].repeat(10);
    assert_eq!(rig.hw.gate_calls(), expected);
    assert_eq!(rig.sink.decisions(), 1, "eight windows per decision");
}

#[test]
fn phase_flips_are_not_reported_as_state_changes() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.step();
    rig.run(500);

    let changes = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::StateChanged { .. }))
        .count();
    assert_eq!(changes, 1, "only InitCharge -> Integrate");
}

#[test]
fn decisions_follow_num_integrations() {
    let config = ChargerConfig {
        num_integrations: 2,
        ..ChargerConfig::default()
    };
    let mut rig = Rig::new(config);
    rig.step();
    rig.run(1_000);

    assert_eq!(rig.sink.decisions(), 5);

    let last = rig
        .sink
        .events
        .iter()
        .rev()
        .find_map(|e| match e {
            AppEvent::Decision(r) => Some(*r),
            _ => None,
        })
        .expect("at least one decision");
    assert_eq!(rig.shared.duty_cycle(), last.duty_cycle);
    assert_eq!(rig.app.telemetry().duty_cycle, last.duty_cycle);
    assert_eq!(rig.app.telemetry().decisions, 5);
}

#[test]
fn negative_inductor_voltage_reverses_first_decision() {
    let config = ChargerConfig {
        num_integrations: 1,
        ..ChargerConfig::default()
    };
    let mut rig = Rig::new(config);
    rig.hw.v_inductor = -0.5;
    rig.step();
    rig.run(67);

    // 66 charge passes of -0.5 V over 100 µs; fold halves the sum
    assert!(rig.sink.contains(&AppEvent::Decision(DecisionRecord {
        v_battery: 12.0,
        v_solar: 18.0,
        integral_average: -1_650,
        p_current: -19_800.0,
        duty_cycle: 65,
        perturbation: Perturbation::Reverse,
        time_us: 6_700,
    })));
    assert!(!rig.app.telemetry().duty_increasing);
}

#[test]
fn positive_power_continues_upward() {
    let config = ChargerConfig {
        num_integrations: 1,
        ..ChargerConfig::default()
    };
    let mut rig = Rig::new(config);
    rig.step();
    rig.run(67);

    assert_eq!(rig.sink.decisions(), 1);
    assert_eq!(rig.shared.duty_cycle(), 67);
    assert!(rig.app.telemetry().duty_increasing);
}

// ── Safety cutoffs ───────────────────────────────────────────

#[test]
fn battery_full_cuts_power_and_requests_sleep() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.step();
    rig.run(30);
    assert!(rig.hw.gate_on());

    rig.hw.v_battery = 14.5;
    rig.run_until_state(StateId::Done, 200);

    assert!(!rig.hw.gate_on());
    assert!(!rig.shared.gate_enabled());
    assert!(!rig.hw.timer_running());
    assert_eq!(rig.hw.count(HwCall::TimerStop), 1);
    assert!(
        rig.sink
            .contains(&AppEvent::Shutdown(ShutdownReason::BatteryFull))
    );
    assert!(rig.sink.contains(&AppEvent::StateChanged {
        from: StateId::TrackPower,
        to: StateId::Done,
    }));

    // Still full on re-sample: hand off to the host
    rig.step();
    assert_eq!(rig.hw.sleep_requests(), vec![60]);
    assert!(rig.sink.contains(&AppEvent::SleepRequested { seconds: 60 }));
    assert!(rig.app.is_halted());
}

#[test]
fn insufficient_solar_ends_cycle_below_target() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.hw.v_solar = 12.0;
    rig.step();
    // Seed 100 % clamps to D_MAX
    assert!(rig.sink.contains(&AppEvent::ChargeStarted { duty_cycle: 90 }));

    rig.run_until_state(StateId::Done, 200);
    assert!(
        rig.sink
            .contains(&AppEvent::Shutdown(ShutdownReason::InsufficientSolar))
    );
    assert_eq!(rig.sink.decisions(), 0);

    rig.step();
    assert_eq!(rig.hw.sleep_requests(), vec![60]);
}

#[test]
fn cutoff_preempts_a_decision_due_on_the_same_pass() {
    let config = ChargerConfig {
        num_integrations: 1,
        ..ChargerConfig::default()
    };
    let mut rig = Rig::new(config);
    rig.step();
    rig.run(66);
    assert_eq!(rig.app.state(), StateId::Integrate);

    // First sense pass would close the window and decide
    rig.hw.v_battery = rig.app.config().v_charge_target;
    rig.step();

    assert_eq!(rig.app.state(), StateId::Done);
    assert_eq!(rig.sink.decisions(), 0);
    assert_eq!(rig.shared.duty_cycle(), 66);
    assert_eq!(rig.app.telemetry().duty_cycle, 66);
    assert_eq!(rig.app.telemetry().decisions, 0);
    assert!(
        rig.sink
            .contains(&AppEvent::Shutdown(ShutdownReason::BatteryFull))
    );
}

#[test]
fn recovery_starts_a_new_cycle_instead_of_sleeping() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.step();
    rig.hw.v_battery = 14.5;
    rig.run_until_state(StateId::Done, 200);

    rig.hw.v_battery = 13.0;
    rig.step();
    assert_eq!(rig.app.state(), StateId::InitCharge);
    assert!(rig.sink.contains(&AppEvent::Resumed));
    assert!(rig.hw.sleep_requests().is_empty());

    rig.step();
    assert_eq!(rig.app.state(), StateId::Integrate);
    assert_eq!(rig.hw.count(HwCall::TimerStart { period_us: 100 }), 2);
    // 100 · 13 / 18 = 72.2
    assert!(rig.sink.contains(&AppEvent::ChargeStarted { duty_cycle: 72 }));
}

#[test]
fn halted_service_ignores_further_polls() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.step();
    rig.hw.v_battery = 14.5;
    rig.run_until_state(StateId::Done, 200);
    rig.step();
    assert!(rig.app.is_halted());

    let calls = rig.hw.calls.len();
    let events = rig.sink.events.len();
    rig.run(50);
    assert_eq!(rig.hw.calls.len(), calls);
    assert_eq!(rig.sink.events.len(), events);
}

// ── Self test ────────────────────────────────────────────────

#[test]
fn self_test_halts_after_configured_decisions() {
    let config = ChargerConfig {
        num_integrations: 1,
        self_test_decisions: Some(3),
        ..ChargerConfig::default()
    };
    let mut rig = Rig::new(config);
    for _ in 0..1_000 {
        rig.step();
        if rig.app.is_halted() {
            break;
        }
    }

    assert!(rig.app.is_halted());
    assert_eq!(rig.app.state(), StateId::Done);
    assert_eq!(rig.sink.decisions(), 3);
    assert!(
        rig.sink
            .contains(&AppEvent::Shutdown(ShutdownReason::SelfTestComplete))
    );
    assert!(rig.sink.contains(&AppEvent::SelfTestComplete { decisions: 3 }));
    assert!(rig.hw.sleep_requests().is_empty(), "self test never sleeps");
    assert!(!rig.hw.gate_on());
    assert!(!rig.hw.timer_running());
}

// ── Degraded hardware ────────────────────────────────────────

#[test]
fn timer_failure_never_drives_the_gate_high() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.hw.fail_timer = true;

    rig.run(3);
    assert!(!rig.hw.gate_calls().contains(&true));
    assert!(rig.sink.contains(&AppEvent::StateChanged {
        from: StateId::Integrate,
        to: StateId::Done,
    }));
    assert!(
        rig.sink
            .contains(&AppEvent::Shutdown(ShutdownReason::SchedulerFault))
    );

    // Healthy rails, but only a reset can bring the timer back
    assert!(!rig.sink.contains(&AppEvent::Resumed));
    assert_eq!(rig.hw.sleep_requests(), vec![60]);
    assert!(rig.app.is_halted());
    assert_eq!(rig.app.state(), StateId::Done);
}

#[test]
fn repeated_timer_failure_does_not_spin() {
    let mut rig = Rig::new(ChargerConfig::default());
    rig.hw.fail_timer = true;

    rig.run(300);
    assert_eq!(rig.hw.count(HwCall::TimerStart { period_us: 100 }), 1);
    assert_eq!(rig.hw.sleep_requests(), vec![60]);
}
