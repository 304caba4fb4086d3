//! Analog sense front-end: raw ADC counts to calibrated volts.
//!
//! [`CalibratedSensors`] implements the [`AnalogPort`] the control core
//! reads.  It is the one place where raw readings are validated: a failed
//! conversion or an out-of-range count never reaches the core; the rail's
//! previous good value is returned instead.

use log::warn;

use crate::app::ports::AnalogPort;
use crate::calibration::Calibration;
use crate::drivers::hw_init;
use crate::pins;

/// Largest count a 12-bit conversion can return.
pub const ADC_FULL_SCALE: u16 = 4095;

/// The three sensed rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    Battery = 0,
    Solar = 1,
    Inductor = 2,
}

/// Source of raw conversions.
pub trait RawAdc {
    /// One raw conversion, or `None` if the converter reported an error.
    fn read_raw(&mut self, channel: AnalogChannel) -> Option<u16>;
}

/// ADC1 oneshot unit configured by [`hw_init::init_peripherals`].
pub struct Adc1;

impl RawAdc for Adc1 {
    fn read_raw(&mut self, channel: AnalogChannel) -> Option<u16> {
        let ch = match channel {
            AnalogChannel::Battery => pins::VBAT_ADC_CHANNEL,
            AnalogChannel::Solar => pins::VSOL_ADC_CHANNEL,
            AnalogChannel::Inductor => pins::VL_ADC_CHANNEL,
        };
        hw_init::adc1_read(ch)
    }
}

/// Calibrated analog port over any raw source.
pub struct CalibratedSensors<A> {
    adc: A,
    calibration: Calibration,
    /// Last good reading per rail, indexed by `AnalogChannel`.
    last_good: [f32; 3],
    /// Rejected conversions since construction.
    rejected: u32,
}

impl<A: RawAdc> CalibratedSensors<A> {
    pub fn new(adc: A, calibration: Calibration) -> Self {
        Self {
            adc,
            calibration,
            last_good: [0.0; 3],
            rejected: 0,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Swap in corrected coefficients (e.g. after a calibration run).
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn rejected_count(&self) -> u32 {
        self.rejected
    }

    fn read(&mut self, channel: AnalogChannel) -> f32 {
        let slot = channel as usize;
        match self.adc.read_raw(channel) {
            Some(raw) if raw <= ADC_FULL_SCALE => {
                let volts = match channel {
                    AnalogChannel::Battery => self.calibration.battery_volts(raw),
                    AnalogChannel::Solar => self.calibration.solar_volts(raw),
                    AnalogChannel::Inductor => self.calibration.inductor_volts(raw),
                };
                self.last_good[slot] = volts;
                volts
            }
            other => {
                self.rejected = self.rejected.wrapping_add(1);
                // Rate-limited: the inductor rail is sampled thousands of
                // times a second.
                if self.rejected.is_power_of_two() {
                    warn!(
                        "sensors: {:?} read rejected ({:?}), holding {:.3}V ({} total)",
                        channel, other, self.last_good[slot], self.rejected
                    );
                }
                self.last_good[slot]
            }
        }
    }
}

impl<A: RawAdc> AnalogPort for CalibratedSensors<A> {
    fn read_battery_voltage(&mut self) -> f32 {
        self.read(AnalogChannel::Battery)
    }

    fn read_solar_voltage(&mut self) -> f32 {
        self.read(AnalogChannel::Solar)
    }

    fn read_inductor_voltage(&mut self) -> f32 {
        self.read(AnalogChannel::Inductor)
    }
}
