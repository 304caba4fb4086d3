//! Solar MPPT Charger Firmware, main entry point.
//!
//! Hexagonal architecture: a host-testable charge core driven by a tight
//! foreground polling loop and an esp_timer phase callback.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter            LogEventSink     StdioConsole      │
//! │  (Analog+Gate+Clock+        (EventSink)      (ConsolePort,     │
//! │   Timer+Host)                                 calibration)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ChargerService (pure logic)                 │    │
//! │  │  FSM · Integrator · P&O MPPT · Safety                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PhaseState::tick (esp_timer callback, 1/100 of a period)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info};

use solar_mppt::adapters::hardware::HardwareAdapter;
use solar_mppt::adapters::log_sink::{LogEventSink, log_telemetry};
use solar_mppt::adapters::time::Esp32TimeAdapter;
use solar_mppt::app::service::ChargerService;
use solar_mppt::calibration::Calibration;
use solar_mppt::config::ChargerConfig;
use solar_mppt::drivers::gate::{GateDriver, GpioPin};
use solar_mppt::drivers::watchdog::Watchdog;
use solar_mppt::drivers::hw_init;
use solar_mppt::pins;
use solar_mppt::scheduler::PhaseState;
use solar_mppt::sensors::{Adc1, CalibratedSensors};

/// Shared block between the phase callback and the control loop.
static PHASE: PhaseState = PhaseState::new();

/// Telemetry line interval.
const TELEMETRY_INTERVAL_US: u64 = 1_000_000;

/// Loop delay once the controller has halted (self-test finished).
const HALTED_DELAY_MS: u32 = 1_000;

/// Decisions reported by the self-test that follows a calibration run.
const SELF_TEST_DECISIONS: Option<u16> = if cfg!(feature = "calibrate") {
    Some(100)
} else {
    None
};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Solar MPPT v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // The gate pin may be floating; never start switching.
        error!("HAL init failed: {}, halting", e);
        return Err(solar_mppt::error::Error::from(e).into());
    }
    let mut watchdog = Watchdog::new(2_000);

    let mut hw = HardwareAdapter::new(
        CalibratedSensors::new(Adc1, Calibration::default()),
        GateDriver::new(GpioPin::new(pins::GATE_GPIO)),
        Esp32TimeAdapter::new(),
    );

    // ── 3. Optional calibration + self-test ───────────────────
    #[cfg(feature = "calibrate")]
    run_calibration(&mut hw, &mut watchdog);

    let config = ChargerConfig {
        self_test_decisions: SELF_TEST_DECISIONS,
        ..ChargerConfig::default()
    };

    // ── 4. Charge controller ──────────────────────────────────
    let mut sink = if config.self_test_decisions.is_some() {
        LogEventSink::csv()
    } else {
        LogEventSink::new()
    };
    let mut app = ChargerService::new(config, &PHASE)?;
    app.start(&mut hw, &mut sink);

    let clock = Esp32TimeAdapter::new();
    let mut last_telemetry = clock.uptime_us();

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        app.poll(&mut hw, &mut sink);
        watchdog.feed();

        let now = clock.uptime_us();
        if now.saturating_sub(last_telemetry) >= TELEMETRY_INTERVAL_US {
            log_telemetry(&app.telemetry());
            last_telemetry = now;
        }

        if app.is_halted() {
            // Deep sleep never returns; only a finished self-test gets here.
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(HALTED_DELAY_MS);
            watchdog.feed_now();
        }
    }
}

/// Walk the operator through the console calibration and install the
/// corrected gains.
#[cfg(feature = "calibrate")]
fn run_calibration(
    hw: &mut HardwareAdapter<Adc1, GpioPin>,
    watchdog: &mut Watchdog,
) {
    use solar_mppt::adapters::console::StdioConsole;
    use solar_mppt::calibration::CalibrationSession;

    let mut console = StdioConsole::new();
    let mut session = CalibrationSession::new(*hw.sensors_mut().calibration());
    session.begin(&mut console);

    while !session.is_done() {
        session.poll(hw, &mut console);
        watchdog.feed_now();
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(10);
    }

    if let Some(report) = session.report() {
        let updated = report.apply(hw.sensors_mut().calibration());
        info!(
            "Calibration: vbat_coef={:.6} vsol_coef={:.6}",
            updated.vbat_coef, updated.vsol_coef
        );
        hw.sensors_mut().set_calibration(updated);
    }
}
