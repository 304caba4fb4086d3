//! Phase scheduler: the fixed-period switching callback.
//!
//! The hardware timer fires 100 times per switching period.  Each tick
//! advances a cyclic counter and, by comparing it against the duty cycle,
//! selects which half of the period the converter is in:
//!
//! ```text
//!  counter:  1 ........ duty | duty+1 ........ 99 | 100→0
//!  phase:    ◀── Charge ───▶ | ◀──── Sense ────▶  | (held)
//!  gate:     high (integrate)|  low (track power)  |
//! ```
//!
//! The callback body ([`PhaseState::tick`]) only does counter arithmetic
//! and a phase store.  Everything numeric happens in the foreground loop.
//!
//! ## Cross-context ownership
//!
//! | Field          | Written by                         | Read by            |
//! |----------------|------------------------------------|--------------------|
//! | `counter`      | callback (foreground only disarmed)| both               |
//! | `phase`        | callback (foreground only disarmed)| foreground         |
//! | `duty_cycle`   | foreground                         | callback           |
//! | `gate_enabled` | foreground                         | callback           |
//!
//! Every field is a single-byte atomic, so no access can tear and the
//! callback never waits on a lock.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::PHASE_STEPS;

/// Which half of the switching period the converter is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Scheduler not armed yet.
    Idle = 0,
    /// Switch on; the foreground integrates inductor voltage.
    Charge = 1,
    /// Switch off; the foreground runs safety checks and MPPT.
    Sense = 2,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Charge,
            2 => Self::Sense,
            _ => Self::Idle,
        }
    }
}

/// Consistent copy of the shared block, for telemetry and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSnapshot {
    pub counter: u8,
    pub duty_cycle: u8,
    pub phase: Phase,
    pub gate_enabled: bool,
}

/// The atomic block shared between the timer callback and the
/// foreground control loop.  `const`-constructible so it can live in a
/// `static` that the callback reaches without arguments.
pub struct PhaseState {
    counter: AtomicU8,
    duty_cycle: AtomicU8,
    phase: AtomicU8,
    gate_enabled: AtomicBool,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseState {
    pub const fn new() -> Self {
        Self {
            counter: AtomicU8::new(0),
            duty_cycle: AtomicU8::new(0),
            phase: AtomicU8::new(Phase::Idle as u8),
            gate_enabled: AtomicBool::new(false),
        }
    }

    /// Scheduler callback body.  Bounded, allocation-free, lock-free.
    ///
    /// Does nothing while the gate is disabled.  The tick that carries the
    /// counter to 100 wraps it to 0 and leaves the phase untouched, so a
    /// counter of 0 stands for the last (sense) tick of the period.
    pub fn tick(&self) {
        if !self.gate_enabled.load(Ordering::Acquire) {
            return;
        }

        let duty = self.duty_cycle.load(Ordering::Relaxed);
        let count = self.counter.load(Ordering::Relaxed).wrapping_add(1);

        if count <= duty {
            self.phase.store(Phase::Charge as u8, Ordering::Release);
        } else if count < PHASE_STEPS {
            self.phase.store(Phase::Sense as u8, Ordering::Release);
        }

        let count = if count >= PHASE_STEPS { 0 } else { count };
        self.counter.store(count, Ordering::Relaxed);
    }

    /// Reset the period and start switching at `duty`.
    ///
    /// Counter and phase are written before the enable flag is published,
    /// so the callback never sees a half-initialised period.
    pub fn arm(&self, duty: u8) {
        self.gate_enabled.store(false, Ordering::Release);
        self.counter.store(0, Ordering::Relaxed);
        self.duty_cycle.store(duty, Ordering::Relaxed);
        self.phase.store(Phase::Charge as u8, Ordering::Relaxed);
        self.gate_enabled.store(true, Ordering::Release);
    }

    /// Stop switching.  The callback becomes a no-op until re-armed.
    pub fn disarm(&self) {
        self.gate_enabled.store(false, Ordering::Release);
    }

    /// Publish a new duty cycle to the callback.
    pub fn set_duty(&self, duty: u8) {
        self.duty_cycle.store(duty, Ordering::Release);
    }

    pub fn duty_cycle(&self) -> u8 {
        self.duty_cycle.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn counter(&self) -> u8 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn gate_enabled(&self) -> bool {
        self.gate_enabled.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            counter: self.counter(),
            duty_cycle: self.duty_cycle(),
            phase: self.phase(),
            gate_enabled: self.gate_enabled(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_gate_ignores_ticks() {
        let state = PhaseState::new();
        for _ in 0..250 {
            state.tick();
        }
        assert_eq!(state.counter(), 0);
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn arm_starts_in_charge() {
        let state = PhaseState::new();
        state.arm(40);
        let snap = state.snapshot();
        assert_eq!(snap.counter, 0);
        assert_eq!(snap.duty_cycle, 40);
        assert_eq!(snap.phase, Phase::Charge);
        assert!(snap.gate_enabled);
    }

    #[test]
    fn charge_ticks_match_duty() {
        let state = PhaseState::new();
        state.arm(30);

        let mut charge = 0;
        let mut sense = 0;
        for _ in 0..PHASE_STEPS {
            state.tick();
            match state.phase() {
                Phase::Charge => charge += 1,
                Phase::Sense => sense += 1,
                Phase::Idle => panic!("armed scheduler reported Idle"),
            }
        }
        assert_eq!(charge, 30);
        assert_eq!(sense, 70);
        assert_eq!(state.counter(), 0, "period must end wrapped");
    }

    #[test]
    fn wrap_tick_holds_sense_phase() {
        let state = PhaseState::new();
        state.arm(50);
        for _ in 0..99 {
            state.tick();
        }
        assert_eq!(state.counter(), 99);
        assert_eq!(state.phase(), Phase::Sense);

        state.tick();
        assert_eq!(state.counter(), 0);
        assert_eq!(state.phase(), Phase::Sense);

        state.tick();
        assert_eq!(state.counter(), 1);
        assert_eq!(state.phase(), Phase::Charge);
    }

    #[test]
    fn duty_change_takes_effect_mid_period() {
        let state = PhaseState::new();
        state.arm(20);
        for _ in 0..25 {
            state.tick();
        }
        assert_eq!(state.phase(), Phase::Sense);

        // Widen the window past the current counter: next tick is charge again.
        state.set_duty(60);
        state.tick();
        assert_eq!(state.counter(), 26);
        assert_eq!(state.phase(), Phase::Charge);
    }

    #[test]
    fn disarm_freezes_counter() {
        let state = PhaseState::new();
        state.arm(50);
        for _ in 0..10 {
            state.tick();
        }
        state.disarm();
        for _ in 0..10 {
            state.tick();
        }
        assert_eq!(state.counter(), 10);
        assert!(!state.gate_enabled());
    }

    #[test]
    fn rearm_resets_period() {
        let state = PhaseState::new();
        state.arm(50);
        for _ in 0..70 {
            state.tick();
        }
        state.disarm();
        state.arm(45);
        assert_eq!(state.counter(), 0);
        assert_eq!(state.phase(), Phase::Charge);
        assert_eq!(state.duty_cycle(), 45);
    }

    #[test]
    fn concurrent_tick_and_foreground_updates() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let state = Arc::new(PhaseState::new());
        let stop = Arc::new(AtomicBool::new(false));

        let ticker = {
            let state = Arc::clone(&state);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut max = 0;
                while !stop.load(Ordering::Relaxed) {
                    state.tick();
                    max = max.max(state.counter());
                }
                max
            })
        };

        for round in 0..2_000u32 {
            let duty = (round % 98) as u8 + 1;
            state.arm(duty);
            for step in 0..20u8 {
                state.set_duty(duty.saturating_add(step) % PHASE_STEPS);
                assert!(state.counter() < PHASE_STEPS);
            }
            state.disarm();
            assert!(state.counter() < PHASE_STEPS);
        }

        // A tick that saw the gate enabled before the last disarm may still
        // land; give it time to drain, then nothing may move.
        thread::sleep(Duration::from_millis(20));
        let frozen = state.snapshot();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(state.snapshot(), frozen);
        assert!(!frozen.gate_enabled);

        stop.store(true, Ordering::Relaxed);
        let max = ticker.join().expect("ticker thread");
        assert!(max < PHASE_STEPS);
        assert_eq!(state.snapshot(), frozen);
    }
}
