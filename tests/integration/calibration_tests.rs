//! Calibration session driven against the real sensor pipeline.
//!
//! A fixed raw ADC feeds `CalibratedSensors`; the operator "types" DMM
//! readings 10 % above what the board measures, and the corrected gains
//! must make the board agree with the meter afterwards.

use std::collections::VecDeque;

use solar_mppt::app::ports::{AnalogPort, ConsolePort};
use solar_mppt::calibration::{CalState, Calibration, CalibrationSession};
use solar_mppt::sensors::{AnalogChannel, CalibratedSensors, RawAdc};

struct FixedAdc;

impl RawAdc for FixedAdc {
    fn read_raw(&mut self, channel: AnalogChannel) -> Option<u16> {
        Some(match channel {
            AnalogChannel::Battery => 2_000,
            AnalogChannel::Solar => 3_000,
            AnalogChannel::Inductor => 2_048,
        })
    }
}

#[derive(Default)]
struct ScriptedConsole {
    input: VecDeque<u8>,
    lines: Vec<String>,
}

impl ScriptedConsole {
    fn type_line(&mut self, text: &str) {
        self.input.extend(text.bytes());
        self.input.push_back(b'\n');
    }
}

impl ConsolePort for ScriptedConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_byte(&mut self, _byte: u8) {}

    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}

fn run(
    session: &mut CalibrationSession,
    sensors: &mut CalibratedSensors<FixedAdc>,
    console: &mut ScriptedConsole,
) {
    for _ in 0..1_000 {
        if session.is_done() {
            return;
        }
        session.poll(sensors, console);
    }
}

#[test]
fn corrected_gains_make_board_agree_with_meter() {
    let cal = Calibration::default();
    let mut sensors = CalibratedSensors::new(FixedAdc, cal);
    let battery_meter = cal.battery_volts(2_000) * 1.1;
    let solar_meter = cal.solar_volts(3_000) * 1.1;

    let mut console = ScriptedConsole::default();
    console.type_line("Y");
    console.type_line(&format!("{battery_meter:.4}"));
    console.type_line(&format!("{solar_meter:.4}"));

    let mut session = CalibrationSession::new(cal);
    session.begin(&mut console);
    run(&mut session, &mut sensors, &mut console);

    assert_eq!(session.state(), CalState::Done);
    let report = *session.report().expect("report after Done");
    assert!((report.battery_error_pct - 100.0 * 0.1 / 1.1).abs() < 0.01);

    sensors.set_calibration(report.apply(&cal));
    assert!((sensors.read_battery_voltage() - battery_meter).abs() < 1e-3);
    assert!((sensors.read_solar_voltage() - solar_meter).abs() < 1e-3);
    // Inductor coefficients are not touched by the session
    assert_eq!(sensors.read_inductor_voltage(), cal.inductor_volts(2_048));
}

#[test]
fn bad_reading_is_reprompted_not_fatal() {
    let cal = Calibration::default();
    let mut sensors = CalibratedSensors::new(FixedAdc, cal);

    let mut console = ScriptedConsole::default();
    console.type_line("Y");
    console.type_line("twelve");
    console.type_line("12.0");
    console.type_line("18.0");

    let mut session = CalibrationSession::new(cal);
    session.begin(&mut console);
    run(&mut session, &mut sensors, &mut console);

    assert!(session.is_done());
    assert!(console.lines.iter().any(|l| l.starts_with("Input rejected")));
    let report = session.report().expect("report after Done");
    assert_eq!(report.user_battery, 12.0);
    assert_eq!(report.user_solar, 18.0);
}
