//! Buck switch gate driver.
//!
//! Wraps any `embedded-hal` output pin.  The control core treats the gate
//! as infallible, so a failed pin write is logged here and the last good
//! level is kept in [`GateDriver::is_on`].

use core::convert::Infallible;

use embedded_hal::digital::{Error as _, ErrorType, OutputPin};
use log::warn;

use crate::app::ports::GatePort;

use super::hw_init;

pub struct GateDriver<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> GateDriver<P> {
    /// Takes a pin already configured as output and driven low.
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    /// Level of the last successful write.
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> GatePort for GateDriver<P> {
    fn set_gate(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(e) => warn!("gate: write {} failed ({:?})", on, e.kind()),
        }
    }
}

/// Raw GPIO output configured by [`hw_init::init_peripherals`].
pub struct GpioPin {
    gpio: i32,
}

impl GpioPin {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, true);
        Ok(())
    }
}
