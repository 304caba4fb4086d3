//! Serial console adapter for the calibration session.
//!
//! Reads the process stdin one byte at a time.  On ESP-IDF the default UART
//! console is non-blocking, so an empty FIFO surfaces as `WouldBlock` and is
//! reported as "no byte".

use std::io::{ErrorKind, Read, Write};

use crate::app::ports::ConsolePort;

/// Console over the process stdio streams.
#[derive(Debug, Default)]
pub struct StdioConsole;

impl StdioConsole {
    pub fn new() -> Self {
        Self
    }
}

impl ConsolePort for StdioConsole {
    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0_u8; 1];
        match std::io::stdin().read(&mut buf) {
            Ok(1) => Some(buf[0]),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                log::warn!("console: read failed ({e})");
                None
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut out = std::io::stdout();
        let _ = out.write_all(&[byte]);
        let _ = out.flush();
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}
