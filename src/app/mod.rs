//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the charger: the charge
//! state machine orchestration, its outbound events and the port traits
//! every adapter implements.  All interaction with hardware happens
//! through the traits in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
