//! Concrete state handler functions and table builder.
//!
//! Each state is a row of plain `fn` pointers with no dynamic dispatch.
//! Handlers are generic over the board so the same
//! table drives the ESP32 and the host mocks.
//!
//! ```text
//!  INIT_CHARGE ──[armed]──▶ INTEGRATE ◀──[phase = charge]──┐
//!       ▲                      │                           │
//!       │               [phase = sense]                    │
//!       │                      ▼                           │
//!       │                 TRACK_POWER ─────────────────────┘
//!       │                      │
//!   [resume]        [battery full / weak solar / self-test]
//!       │                      ▼
//!       └──────────────────── DONE ──[otherwise]──▶ sleep + reset
//! ```
//!
//! The INTEGRATE ↔ TRACK_POWER edges belong to the phase scheduler; the
//! service follows the published phase before each pass, so neither
//! handler returns those transitions itself.  INTEGRATE ends the cycle on
//! its own only when it finds the scheduler disarmed (timer start failed);
//! that fault goes straight to sleep + reset.

use log::{info, warn};

use super::context::ChargeContext;
use super::{StateDescriptor, StateId};
use crate::app::events::{AppEvent, DecisionRecord};
use crate::app::ports::ChargerHardware;
use crate::control::mppt::{power_proxy, seed_duty};
use crate::safety::ShutdownReason;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table<H: ChargerHardware>() -> [StateDescriptor<H>; StateId::COUNT] {
    [
        // Index 0: InitCharge
        StateDescriptor {
            name: "InitCharge",
            on_enter: None,
            on_exit: None,
            on_update: init_charge_update::<H>,
        },
        // Index 1: Integrate
        StateDescriptor {
            name: "Integrate",
            on_enter: None,
            on_exit: None,
            on_update: integrate_update::<H>,
        },
        // Index 2: TrackPower
        StateDescriptor {
            name: "TrackPower",
            on_enter: None,
            on_exit: None,
            on_update: track_power_update::<H>,
        },
        // Index 3: Done
        StateDescriptor {
            name: "Done",
            on_enter: Some(done_enter::<H>),
            on_exit: None,
            on_update: done_update::<H>,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INIT_CHARGE: fresh cycle, arm the converter
// ═══════════════════════════════════════════════════════════════════════════

fn init_charge_update<H: ChargerHardware>(
    ctx: &mut ChargeContext,
    hw: &mut H,
) -> Option<StateId> {
    ctx.v_battery = hw.read_battery_voltage();
    ctx.v_solar = hw.read_solar_voltage();
    let vl = hw.read_inductor_voltage();
    ctx.begin_cycle(hw.now_micros(), vl);

    ctx.duty_cycle = seed_duty(ctx.v_battery, ctx.v_solar, &ctx.config);
    ctx.shared.arm(ctx.duty_cycle);
    hw.start_periodic(ctx.shared, ctx.config.tick_period_us());

    info!(
        "INIT: v_battery={:.2}V v_solar={:.2}V, switching at {}%",
        ctx.v_battery, ctx.v_solar, ctx.duty_cycle
    );
    ctx.notify(AppEvent::ChargeStarted {
        duty_cycle: ctx.duty_cycle,
    });
    Some(StateId::Integrate)
}

// ═══════════════════════════════════════════════════════════════════════════
//  INTEGRATE: charge phase, gate high, sum ∫V_L dt
// ═══════════════════════════════════════════════════════════════════════════

fn integrate_update<H: ChargerHardware>(
    ctx: &mut ChargeContext,
    hw: &mut H,
) -> Option<StateId> {
    if !ctx.shared.gate_enabled() {
        warn!("INTEGRATE: scheduler not running, ending the cycle");
        ctx.safety.latch(ShutdownReason::SchedulerFault);
        cut_power(ctx, hw);
        ctx.notify(AppEvent::Shutdown(ShutdownReason::SchedulerFault));
        return Some(StateId::Done);
    }
    if ctx.window.open() {
        hw.set_gate(true);
    }
    let now = hw.now_micros();
    let vl = hw.read_inductor_voltage();
    ctx.window.accumulate(now, vl);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  TRACK_POWER: sense phase: safety first, then fold and decide
// ═══════════════════════════════════════════════════════════════════════════

fn track_power_update<H: ChargerHardware>(
    ctx: &mut ChargeContext,
    hw: &mut H,
) -> Option<StateId> {
    ctx.v_battery = hw.read_battery_voltage();
    ctx.v_solar = hw.read_solar_voltage();

    if let Some(reason) = ctx.safety.evaluate(ctx.v_battery, ctx.v_solar, &ctx.config) {
        cut_power(ctx, hw);
        ctx.notify(AppEvent::Shutdown(reason));
        return Some(StateId::Done);
    }

    if ctx.window.close() {
        hw.set_gate(false);
    }

    if !ctx.window.decision_due(ctx.config.num_integrations) {
        return None;
    }

    let p_current = power_proxy(ctx.v_battery, ctx.window.integral_average);
    let decision = ctx.tracker.decide(ctx.duty_cycle, p_current, &ctx.config);
    ctx.duty_cycle = decision.duty_cycle;
    ctx.shared.set_duty(decision.duty_cycle);
    ctx.window.reset_count();
    ctx.decisions = ctx.decisions.saturating_add(1);

    ctx.notify(AppEvent::Decision(DecisionRecord {
        v_battery: ctx.v_battery,
        v_solar: ctx.v_solar,
        integral_average: ctx.window.integral_average,
        p_current,
        duty_cycle: decision.duty_cycle,
        perturbation: decision.perturbation,
        time_us: hw.now_micros(),
    }));

    if ctx.self_test_finished() {
        ctx.safety.latch(ShutdownReason::SelfTestComplete);
        cut_power(ctx, hw);
        ctx.notify(AppEvent::Shutdown(ShutdownReason::SelfTestComplete));
        return Some(StateId::Done);
    }

    None
}

/// Stop switching and drop the gate.  The callback sees the disable flag
/// before the pin goes low.
fn cut_power<H: ChargerHardware>(ctx: &mut ChargeContext, hw: &mut H) {
    ctx.shared.disarm();
    hw.set_gate(false);
}

// ═══════════════════════════════════════════════════════════════════════════
//  DONE: shutdown handler
// ═══════════════════════════════════════════════════════════════════════════

fn done_enter<H: ChargerHardware>(ctx: &mut ChargeContext, hw: &mut H) {
    cut_power(ctx, hw);
    hw.stop_periodic();
    ctx.window.in_integration_window = false;
    match ctx.safety.latched() {
        Some(reason) => info!("DONE: converter off ({reason})"),
        None => info!("DONE: converter off"),
    }
}

fn done_update<H: ChargerHardware>(ctx: &mut ChargeContext, hw: &mut H) -> Option<StateId> {
    if ctx.halted {
        return None;
    }

    if ctx.safety.latched() == Some(ShutdownReason::SelfTestComplete) {
        info!("DONE: self test finished after {} decisions", ctx.decisions);
        ctx.notify(AppEvent::SelfTestComplete {
            decisions: ctx.decisions,
        });
        ctx.halted = true;
        return None;
    }

    ctx.v_battery = hw.read_battery_voltage();
    ctx.v_solar = hw.read_solar_voltage();

    if ctx.safety.can_resume(ctx.v_battery, ctx.v_solar, &ctx.config) {
        info!(
            "DONE: v_battery={:.2}V v_solar={:.2}V, starting a new cycle",
            ctx.v_battery, ctx.v_solar
        );
        ctx.notify(AppEvent::Resumed);
        return Some(StateId::InitCharge);
    }

    let seconds = ctx.config.sleep_time_secs;
    info!("DONE: sleeping {seconds}s, then reset");
    ctx.notify(AppEvent::SleepRequested { seconds });
    ctx.halted = true;
    hw.request_sleep_and_reset(seconds);
    None
}
