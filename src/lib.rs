//! Solar MPPT charger firmware library.
//!
//! Exposes the pure-logic modules for integration testing and bench
//! tooling. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod calibration;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod integrator;
pub mod pins;
pub mod safety;
pub mod scheduler;

// Board-facing modules; the ESP-IDF implementations are guarded by cfg
// attributes inside and fall back to simulation stubs on the host.
pub mod adapters;
pub mod drivers;
pub mod sensors;
