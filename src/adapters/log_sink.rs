//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).
//!
//! In CSV mode every MPPT decision is printed as one line in the order
//! `v_battery, v_solar, integral_average, p_current, duty_cycle, time_us`,
//! the format of the bench self-test report.

use log::{debug, info, warn};

use crate::app::events::{AppEvent, DecisionRecord, Telemetry};
use crate::app::ports::EventSink;

/// Header line for the CSV decision report.
pub const CSV_HEADER: &str = "v_battery, v_solar, integral_avg, p_cur, duty_cycle, time";

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    csv: bool,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self { csv: false }
    }

    /// Sink that prints each decision as a CSV line at `info`.
    pub fn csv() -> Self {
        Self { csv: true }
    }
}

/// One CSV report line for `record`.
pub fn csv_line(record: &DecisionRecord) -> String {
    format!(
        "{:.4}, {:.4}, {}, {:.1}, {}, {}",
        record.v_battery,
        record.v_solar,
        record.integral_average,
        record.p_current,
        record.duty_cycle,
        record.time_us
    )
}

/// Log a telemetry snapshot (called from the main loop's status timer).
pub fn log_telemetry(t: &Telemetry) {
    info!(
        "TELEM | state={:?} | duty={}% ({}) | Vbat={:.2}V Vsol={:.2}V | \
         avg={} p={:.1} | decisions={} | gate={}",
        t.state,
        t.duty_cycle,
        if t.duty_increasing { "up" } else { "down" },
        t.v_battery,
        t.v_solar,
        t.integral_average,
        t.p_current,
        t.decisions,
        if t.gate_enabled { "on" } else { "off" },
    );
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
                if self.csv {
                    info!("{CSV_HEADER}");
                }
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::ChargeStarted { duty_cycle } => {
                info!("CHARGE | armed at {}%", duty_cycle);
            }
            AppEvent::Decision(record) => {
                if self.csv {
                    info!("{}", csv_line(record));
                } else {
                    debug!(
                        "MPPT | {:?} -> {}% | p={:.1} avg={}",
                        record.perturbation,
                        record.duty_cycle,
                        record.p_current,
                        record.integral_average
                    );
                }
            }
            AppEvent::Shutdown(reason) => {
                warn!("SHUTDOWN | {}", reason);
            }
            AppEvent::Resumed => {
                info!("RESUME | conditions recovered");
            }
            AppEvent::SleepRequested { seconds } => {
                info!("SLEEP | {}s then reset", seconds);
            }
            AppEvent::SelfTestComplete { decisions } => {
                info!("SELFTEST | complete after {} decisions", decisions);
            }
        }
    }
}
