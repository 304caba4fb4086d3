//! GPIO / peripheral pin assignments for the charger board (ESP32-S3).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Power stage
// ---------------------------------------------------------------------------

/// Gate driver input of the buck switch (active HIGH = switch on).
pub const GATE_GPIO: i32 = 38;

// ---------------------------------------------------------------------------
// Analog sense (ADC1; channel n is GPIO n+1 on the S3)
// ---------------------------------------------------------------------------

/// Battery rail divider tap.  ADC1 channel 3 (GPIO 4).
pub const VBAT_ADC_CHANNEL: u32 = 3;
/// Solar rail divider tap.  ADC1 channel 4 (GPIO 5).
pub const VSOL_ADC_CHANNEL: u32 = 4;
/// Inductor differential sense, mid-rail biased.  ADC1 channel 5 (GPIO 6).
pub const VL_ADC_CHANNEL: u32 = 5;
