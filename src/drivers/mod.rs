//! Power-stage drivers, hardware initialisation, and peripheral helpers.

pub mod gate;
pub mod hw_init;
pub mod hw_timer;
pub mod watchdog;
