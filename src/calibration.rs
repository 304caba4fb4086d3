//! ADC calibration: coefficients and the interactive console session.
//!
//! Every analog rail reaches the ADC through a divider (and, for the
//! inductor, a level shift), so a raw count becomes volts through a gain
//! and, for `V_L`, an offset:
//!
//! ```text
//!   V_bat = raw · vbat_coef
//!   V_sol = raw · vsol_coef
//!   V_L   = (raw · adc_coef + vl_offset) · vl_coef
//! ```
//!
//! Divider tolerances make the nominal gains a few percent off.  The
//! [`CalibrationSession`] compares averaged readings against a multimeter
//! value the user types in and prints corrected battery and solar gains.
//!
//! ```text
//!  INIT_CAL ──['Y' | '\n']──▶ MEASURE ──▶ USER_BATTERY ──[line]──▶ USER_SOLAR
//!                                                                     │
//!                                  DONE ◀──────── CALC ◀──[line]──────┘
//! ```

use core::fmt::Write as _;

use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{AnalogPort, ConsolePort};
use crate::error::CalibrationError;

/// Console input buffer size.
pub const LINE_CAPACITY: usize = 100;

/// ADC full scale on the ESP32 (12-bit).
const ADC_MAX: f32 = 4095.0;
/// ADC reference at 11 dB attenuation.
const ADC_VREF: f32 = 3.3;

const RULE: &str = "-----------------------------------";

// ---------------------------------------------------------------------------
// Coefficients
// ---------------------------------------------------------------------------

/// Raw-count to volts conversion for the three sensed rails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Volts per ADC count at the pin.
    pub adc_coef: f32,
    /// Battery rail gain (volts per count, divider included).
    pub vbat_coef: f32,
    /// Solar rail gain (volts per count, divider included).
    pub vsol_coef: f32,
    /// Inductor sense gain applied after the offset.
    pub vl_coef: f32,
    /// Level-shift removed from the inductor sense pin (volts).
    pub vl_offset: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        let adc_coef = ADC_VREF / ADC_MAX;
        Self {
            adc_coef,
            // 100k / 20k dividers
            vbat_coef: adc_coef * 6.0,
            vsol_coef: adc_coef * 6.0,
            // Differential sense, mid-rail biased, 1/11 attenuation
            vl_coef: 11.0,
            vl_offset: -ADC_VREF / 2.0,
        }
    }
}

impl Calibration {
    pub fn battery_volts(&self, raw: u16) -> f32 {
        f32::from(raw) * self.vbat_coef
    }

    pub fn solar_volts(&self, raw: u16) -> f32 {
        f32::from(raw) * self.vsol_coef
    }

    pub fn inductor_volts(&self, raw: u16) -> f32 {
        (f32::from(raw) * self.adc_coef + self.vl_offset) * self.vl_coef
    }
}

// ---------------------------------------------------------------------------
// Pure correction math
// ---------------------------------------------------------------------------

/// Measurement error in percent of the reference reading.
pub fn error_percent(reference: f32, measured: f32) -> Result<f32, CalibrationError> {
    if reference <= 0.0 {
        return Err(CalibrationError::NonPositiveReference);
    }
    Ok(100.0 * (reference - measured).abs() / reference)
}

/// Gain that would have made `measured` read `reference`.
pub fn corrected_gain(gain: f32, reference: f32, measured: f32) -> Result<f32, CalibrationError> {
    if reference <= 0.0 || measured <= 0.0 {
        return Err(CalibrationError::NonPositiveReference);
    }
    Ok(reference / measured * gain)
}

/// Parse one typed multimeter reading.  Surrounding whitespace (including
/// a trailing `\r`) is ignored.
pub fn parse_reading(line: &str) -> Result<f32, CalibrationError> {
    let value: f32 = line
        .trim()
        .parse()
        .map_err(|_| CalibrationError::InvalidNumber)?;
    if !value.is_finite() {
        return Err(CalibrationError::InvalidNumber);
    }
    if value <= 0.0 {
        return Err(CalibrationError::NonPositiveReference);
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalState {
    InitCal,
    Measure,
    UserBattery,
    UserSolar,
    Calc,
    Done,
}

/// Result of one calibration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReport {
    pub avg_battery: f32,
    pub avg_solar: f32,
    pub user_battery: f32,
    pub user_solar: f32,
    pub battery_error_pct: f32,
    pub solar_error_pct: f32,
    /// Suggested replacement for `Calibration::vbat_coef`.
    pub vbat_coef: f32,
    /// Suggested replacement for `Calibration::vsol_coef`.
    pub vsol_coef: f32,
}

impl CalibrationReport {
    /// `current` with the corrected battery and solar gains applied.
    pub fn apply(&self, current: &Calibration) -> Calibration {
        Calibration {
            vbat_coef: self.vbat_coef,
            vsol_coef: self.vsol_coef,
            ..*current
        }
    }
}

/// Line-oriented calibration walk-through.
///
/// Poll it from the foreground loop; each poll handles at most one input
/// byte and folds one fresh sample into the running average of the rail
/// being asked for.
pub struct CalibrationSession {
    state: CalState,
    calibration: Calibration,
    line: String<LINE_CAPACITY>,
    avg_battery: f32,
    avg_solar: f32,
    user_battery: f32,
    user_solar: f32,
    report: Option<CalibrationReport>,
}

impl CalibrationSession {
    /// `calibration` must be the set the analog port is currently using.
    pub fn new(calibration: Calibration) -> Self {
        Self {
            state: CalState::InitCal,
            calibration,
            line: String::new(),
            avg_battery: 0.0,
            avg_solar: 0.0,
            user_battery: 0.0,
            user_solar: 0.0,
            report: None,
        }
    }

    /// Print the banner.  Call once before the first poll.
    pub fn begin(&mut self, console: &mut impl ConsolePort) {
        console.write_line(RULE);
        console.write_line("Solar Charger Calibration and Self Test Report");
        console.write_line("Type Y and Press Enter to Begin");
        console.write_line(RULE);
        info!("calibration session started");
    }

    pub fn state(&self) -> CalState {
        self.state
    }

    pub fn report(&self) -> Option<&CalibrationReport> {
        self.report.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.state == CalState::Done
    }

    /// Advance the session by one step.
    pub fn poll(&mut self, analog: &mut impl AnalogPort, console: &mut impl ConsolePort) {
        match self.state {
            CalState::InitCal => {
                if let Some(byte) = console.read_byte() {
                    console.write_byte(byte);
                    if byte == b'\n' || byte == b'Y' {
                        self.state = CalState::Measure;
                    }
                }
            }
            CalState::Measure => {
                let v_battery = analog.read_battery_voltage();
                let v_solar = analog.read_solar_voltage();
                console.write_line("Measuring Battery and Solar Voltages");
                console.write_line(RULE);
                write_value(console, "Battery Voltage", v_battery, "V");
                write_value(console, "Solar Voltage", v_solar, "V");
                console.write_line(RULE);
                self.avg_battery = v_battery;
                self.line.clear();
                prompt(console, "Battery");
                self.state = CalState::UserBattery;
            }
            CalState::UserBattery => {
                self.avg_battery = (self.avg_battery + analog.read_battery_voltage()) / 2.0;
                if let Some(value) = self.read_value(console, "Battery") {
                    self.user_battery = value;
                    self.avg_solar = analog.read_solar_voltage();
                    console.write_line(RULE);
                    prompt(console, "Solar");
                    self.state = CalState::UserSolar;
                }
            }
            CalState::UserSolar => {
                self.avg_solar = (self.avg_solar + analog.read_solar_voltage()) / 2.0;
                if let Some(value) = self.read_value(console, "Solar") {
                    self.user_solar = value;
                    self.state = CalState::Calc;
                }
            }
            CalState::Calc => self.calculate(console),
            CalState::Done => {}
        }
    }

    /// Collect one echoed byte; on end of line, parse it.  A rejected line
    /// is reported and the same prompt is shown again.
    fn read_value(&mut self, console: &mut impl ConsolePort, rail: &str) -> Option<f32> {
        let byte = console.read_byte()?;
        console.write_byte(byte);

        if byte != b'\n' {
            if self.line.push(char::from(byte)).is_err() {
                self.line.clear();
                self.reject(console, rail, CalibrationError::LineTooLong);
            }
            return None;
        }

        let parsed = parse_reading(&self.line);
        self.line.clear();
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                self.reject(console, rail, e);
                None
            }
        }
    }

    fn reject(&self, console: &mut impl ConsolePort, rail: &str, e: CalibrationError) {
        warn!("calibration input rejected: {e}");
        let mut msg = String::<64>::new();
        let _ = write!(msg, "Input rejected: {e}");
        console.write_line(&msg);
        prompt(console, rail);
    }

    fn calculate(&mut self, console: &mut impl ConsolePort) {
        let report = error_percent(self.user_battery, self.avg_battery).and_then(|bat_err| {
            let sol_err = error_percent(self.user_solar, self.avg_solar)?;
            Ok(CalibrationReport {
                avg_battery: self.avg_battery,
                avg_solar: self.avg_solar,
                user_battery: self.user_battery,
                user_solar: self.user_solar,
                battery_error_pct: bat_err,
                solar_error_pct: sol_err,
                vbat_coef: corrected_gain(
                    self.calibration.vbat_coef,
                    self.user_battery,
                    self.avg_battery,
                )?,
                vsol_coef: corrected_gain(
                    self.calibration.vsol_coef,
                    self.user_solar,
                    self.avg_solar,
                )?,
            })
        });

        let report = match report {
            Ok(r) => r,
            Err(e) => {
                // An ADC stuck at zero: measure again from scratch.
                warn!("calibration failed: {e}");
                let mut msg = String::<64>::new();
                let _ = write!(msg, "Calibration failed: {e}");
                console.write_line(&msg);
                self.state = CalState::Measure;
                return;
            }
        };

        console.write_line(RULE);
        write_value(
            console,
            "Battery Voltage Measurement Error",
            report.battery_error_pct,
            "percent",
        );
        write_value(
            console,
            "Solar Voltage Measurement Error",
            report.solar_error_pct,
            "percent",
        );
        write_coef(console, "vbat_coef", report.vbat_coef);
        write_coef(console, "vsol_coef", report.vsol_coef);
        console.write_line(RULE);
        console.write_line("Update the calibration with the values above and run again");
        console.write_line("until both measurement errors fall below 1%");
        console.write_line(RULE);
        console.write_line("Calibration Complete");
        console.write_line(RULE);

        info!(
            "calibration complete: battery error {:.2}%, solar error {:.2}%",
            report.battery_error_pct, report.solar_error_pct
        );
        self.report = Some(report);
        self.state = CalState::Done;
    }
}

fn prompt(console: &mut impl ConsolePort, rail: &str) {
    let mut msg = String::<96>::new();
    let _ = write!(
        msg,
        "Take a DMM, Measure the {rail} Voltage, Type it here and press Enter:"
    );
    console.write_line(&msg);
}

fn write_value(console: &mut impl ConsolePort, label: &str, value: f32, unit: &str) {
    let mut msg = String::<80>::new();
    let _ = write!(msg, "{label} = {value:.4} {unit}");
    console.write_line(&msg);
}

fn write_coef(console: &mut impl ConsolePort, name: &str, value: f32) {
    let mut msg = String::<64>::new();
    let _ = write!(msg, "{name} = {value:e}");
    console.write_line(&msg);
}
