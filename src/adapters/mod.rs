//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                        | Connects to            |
//! |------------|-----------------------------------|------------------------|
//! | `hardware` | AnalogPort, GatePort, ClockPort,  | ESP32 ADC1, GPIO,      |
//! |            | TimerPort, HostPort               | esp_timer, deep sleep  |
//! | `console`  | ConsolePort                       | UART stdio             |
//! | `log_sink` | EventSink                         | Serial log output      |
//! | `time`     | ClockPort                         | ESP32 system timer     |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod time;
