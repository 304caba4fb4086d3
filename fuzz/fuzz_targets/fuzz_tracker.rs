//! Fuzz target: perturb-and-observe tracker
//!
//! Drives `PerturbObserve::decide` with arbitrary duty bounds and power
//! sequences and verifies:
//! - Every decision stays inside `[d_min, d_max]`
//! - Duty never moves more than one percent per decision
//!
//! cargo fuzz run fuzz_tracker

#![no_main]

use libfuzzer_sys::fuzz_target;
use solar_mppt::config::ChargerConfig;
use solar_mppt::control::mppt::{PerturbObserve, seed_duty};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let d_min = data[0] % 100;
    let d_max = data[1] % 101;
    let config = ChargerConfig {
        d_min,
        d_max,
        ..ChargerConfig::default()
    };
    if config.validate().is_err() {
        return;
    }

    let mut duty = seed_duty(f32::from(data[2]), f32::from(data[3]), &config);
    let mut tracker = PerturbObserve::new();
    for chunk in data[4..].chunks_exact(4) {
        let p = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let decision = tracker.decide(duty, p, &config);
        assert!(decision.duty_cycle >= d_min && decision.duty_cycle <= d_max);
        assert!(decision.duty_cycle.abs_diff(duty) <= 1);
        duty = decision.duty_cycle;
    }
});
