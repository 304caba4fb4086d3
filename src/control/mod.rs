//! Duty-cycle control: maximum power point tracking.

pub mod mppt;
