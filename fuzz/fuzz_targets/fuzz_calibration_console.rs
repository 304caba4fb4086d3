//! Fuzz target: calibration console session
//!
//! Feeds arbitrary operator input to `CalibrationSession` and verifies:
//! - No panics on any byte sequence (overlong lines, garbage numbers)
//! - A finished session always carries a report with finite gains
//!
//! cargo fuzz run fuzz_calibration_console

#![no_main]

use libfuzzer_sys::fuzz_target;
use solar_mppt::app::ports::{AnalogPort, ConsolePort};
use solar_mppt::calibration::{Calibration, CalibrationSession};

struct Rails;

impl AnalogPort for Rails {
    fn read_battery_voltage(&mut self) -> f32 {
        12.1
    }
    fn read_solar_voltage(&mut self) -> f32 {
        17.9
    }
    fn read_inductor_voltage(&mut self) -> f32 {
        0.0
    }
}

struct Input<'a> {
    bytes: core::slice::Iter<'a, u8>,
}

impl ConsolePort for Input<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        self.bytes.next().copied()
    }
    fn write_byte(&mut self, _byte: u8) {}
    fn write_line(&mut self, _line: &str) {}
}

fuzz_target!(|data: &[u8]| {
    let mut console = Input { bytes: data.iter() };
    let mut session = CalibrationSession::new(Calibration::default());
    session.begin(&mut console);

    // Each byte is consumed by at most one poll; leave room for the
    // byte-free Measure and Calc steps.
    for _ in 0..data.len() * 2 + 8 {
        session.poll(&mut Rails, &mut console);
        if session.is_done() {
            let report = session.report().expect("report once done");
            assert!(report.vbat_coef.is_finite() && report.vsol_coef.is_finite());
            break;
        }
    }
});
