//! Sample command implementations
//!
//! Every command is written against the API traits in `promira-core` and
//! prints to a caller supplied writer, so the same code runs on the vendor
//! libraries and on the emulator.
//!
//! ## Management commands
//!
//! `detect` and `info` only use the platform management API.
//!
//! ## Application commands
//!
//! The rest open a [`Session`](crate::session::Session) on the promact_is
//! application and drive one of its subsystems (I2C, SPI or GPIO).

mod detect;
mod gpio;
mod i2c_eeprom;
mod i2c_file;
mod i2c_slave;
mod info;
mod lights;
mod spi_eeprom;
mod spi_file;
mod spi_slave;

pub use detect::run_detect;
pub use gpio::run_gpio;
pub use i2c_eeprom::run_i2c_eeprom;
pub use i2c_file::run_i2c_file;
pub use i2c_slave::run_i2c_slave;
pub use info::run_info;
pub use lights::run_lights;
pub use spi_eeprom::run_spi_eeprom;
pub use spi_file::run_spi_file;
pub use spi_slave::run_spi_slave;

use crate::config::Config;
use crate::session::{collect_all, Session, SessionError};
use indicatif::{ProgressBar, ProgressStyle};
use promira_core::{PlatformApi, Promact, QueueHandle};
use std::io::{self, Read, Write};

/// Response the slave samples return to the master
pub(crate) const SLAVE_RESPONSE: [u8; 26] = *b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Poll timeout once the first slave transaction has arrived
pub(crate) const SLAVE_POLL_MS: i32 = 500;

/// Slave select line used by the SPI commands unless configured
pub(crate) const DEFAULT_SS_MASK: u8 = 0x1;

/// Backend and settings shared by all commands
pub struct Context<'a> {
    pub platform: &'a dyn PlatformApi,
    pub app: &'a dyn Promact,
    pub config: &'a Config,
}

impl<'a> Context<'a> {
    /// Open a session on the platform at `addr`
    pub fn open(&self, addr: &str) -> Result<Session<'a>, SessionError> {
        Session::open(self.platform, self.app, addr)
    }

    /// Slave select mask for the SPI commands
    pub(crate) fn ss_mask(&self) -> u8 {
        self.config.spi.ss_mask.unwrap_or(DEFAULT_SS_MASK)
    }
}

/// Switch the SPI master outputs through a one-command queue
pub(crate) fn spi_master_oe(
    session: &Session<'_>,
    out: &mut dyn Write,
    queue: QueueHandle,
    enable: bool,
) -> io::Result<()> {
    let app = session.app();
    let result = app
        .queue_clear(queue)
        .and_then(|_| app.queue_spi_oe(queue, enable))
        .and_then(|_| app.queue_submit(queue, session.channel(), 0))
        .and_then(|collect| collect_all(app, collect, &mut []));
    collected(app, out, result).map(|_| ())
}

/// Byte count of a drained queue, printing the status text on failure
pub(crate) fn collected(
    app: &dyn Promact,
    out: &mut dyn Write,
    result: promira_core::Result<usize>,
) -> io::Result<usize> {
    match result {
        Ok(count) => Ok(count),
        Err(e) => {
            let text = app
                .status_string(e.code())
                .unwrap_or_else(|| e.to_string());
            writeln!(out, "{}", text)?;
            Ok(0)
        }
    }
}

/// Fill `buf` from `reader` as far as possible; short only at end of input
pub(crate) fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Progress bar for page-by-page writes
pub(crate) fn write_progress(total: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
