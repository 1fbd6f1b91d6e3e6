//! I2C EEPROM command (AT24C02)

use super::{write_progress, Context};
use crate::cli::EepromOp;
use crate::hexdump;
use crate::session::Session;
use promira_core::{AppConfig, I2cFlags, Pullup, TargetPower};
use std::io::Write;

/// The AT24C02 has 8 byte pages
const PAGE_SIZE: usize = 8;

/// Bus lock timeout unless configured
const BUS_TIMEOUT_MS: u16 = 150;

/// Run the i2c-eeprom command
#[allow(clippy::too_many_arguments)]
pub fn run_i2c_eeprom(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
    bitrate_khz: u16,
    op: EepromOp,
    slave: u16,
    offset: u8,
    length: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();

    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    app.i2c_pullup(channel, Pullup::BOTH)?;
    app.phy_target_power(channel, TargetPower::BOTH)?;

    let bitrate = app.i2c_bitrate(channel, bitrate_khz)?;
    writeln!(out, "Bitrate set to {} kHz", bitrate)?;

    let timeout = ctx.config.i2c.bus_timeout_ms.unwrap_or(BUS_TIMEOUT_MS);
    let timeout = app.i2c_bus_timeout(channel, timeout)?;
    writeln!(out, "Bus lock timeout set to {} ms", timeout)?;

    match op {
        EepromOp::Write => {
            write_memory(&session, out, slave, offset, length, false)?;
            writeln!(out, "Wrote to EEPROM")?;
        }
        EepromOp::Zero => {
            write_memory(&session, out, slave, offset, length, true)?;
            writeln!(out, "Zeroed EEPROM")?;
        }
        EepromOp::Read => read_memory(&session, out, slave, offset, length)?,
    }
    Ok(())
}

/// Write `length` bytes from `addr`, one page per transaction
///
/// Each transaction is the start address followed by data. Data is the
/// running byte count, or zero when `zero` is set.
fn write_memory(
    session: &Session<'_>,
    out: &mut dyn Write,
    slave: u16,
    mut addr: u8,
    length: u16,
    zero: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = session.app();
    let length = usize::from(length);
    let pb = write_progress(length as u64)?;

    let mut packet = Vec::with_capacity(1 + PAGE_SIZE);
    let mut n = 0usize;
    while n < length {
        packet.clear();
        packet.push(addr);
        loop {
            packet.push(if zero { 0 } else { n as u8 });
            addr = addr.wrapping_add(1);
            n += 1;
            if n >= length || usize::from(addr) % PAGE_SIZE == 0 {
                break;
            }
        }

        let written = match app.i2c_write(session.channel(), slave, I2cFlags::empty(), &packet) {
            Ok(written) => written,
            Err(e) => {
                pb.abandon();
                writeln!(out, "error: {}", e.code())?;
                return Ok(());
            }
        };
        if written == 0 {
            pb.abandon();
            writeln!(out, "error: no bytes written")?;
            writeln!(out, "  are you sure you have the right slave address?")?;
            return Ok(());
        }
        pb.set_position(n as u64);
        app.sleep_ms(10)?;
    }
    pb.finish_and_clear();
    Ok(())
}

/// Set the address pointer without a stop condition, then read
fn read_memory(
    session: &Session<'_>,
    out: &mut dyn Write,
    slave: u16,
    addr: u8,
    length: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = session.app();
    let channel = session.channel();
    let mut data = vec![0u8; usize::from(length)];

    if let Err(e) = app.i2c_write(channel, slave, I2cFlags::NO_STOP, &[addr]) {
        log::debug!("Address write failed: {}", e);
    }

    let count = match app.i2c_read(channel, slave, I2cFlags::empty(), &mut data) {
        Ok(count) => count,
        Err(e) => {
            writeln!(out, "error: {}", e.code())?;
            return Ok(());
        }
    };
    if count == 0 {
        writeln!(out, "error: no bytes read")?;
        writeln!(out, "  are you sure you have the right slave address?")?;
        return Ok(());
    }
    if count != data.len() {
        writeln!(out, "error: read {} bytes (expected {})", count, length)?;
    }

    hexdump::dump(out, "\nData read from device:", usize::from(addr), &data[..count])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::i2c::Direction;
    use promira_dummy::Dummy;

    fn eeprom(dummy: &Dummy, op: EepromOp, slave: u16, offset: u8, length: u16) -> String {
        run(dummy, &Config::default(), |ctx, out| {
            run_i2c_eeprom(ctx, out, ADDR, 400, op, slave, offset, length)
        })
    }

    #[test]
    fn test_write_splits_on_page_boundaries() {
        let dummy = Dummy::new_default();
        let text = eeprom(&dummy, EepromOp::Write, 0x50, 4, 20);
        assert!(text.starts_with("Bitrate set to 400 kHz\nBus lock timeout set to 150 ms\n"));
        assert!(text.ends_with("Wrote to EEPROM\n"));

        let writes: Vec<_> = dummy
            .i2c_log()
            .into_iter()
            .filter(|t| t.direction == Direction::Write && t.addr == 0x50)
            .collect();
        let data_lens: Vec<_> = writes.iter().map(|t| t.data.len() - 1).collect();
        assert_eq!(data_lens, vec![4, 8, 8]);
        assert_eq!(
            writes.iter().map(|t| t.data[0]).collect::<Vec<_>>(),
            vec![4, 8, 16]
        );
        assert_eq!(dummy.slept_ms(), 30);

        let memory = dummy.i2c_eeprom();
        assert_eq!(&memory[4..24], &(0..20).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn test_read_back_running_count() {
        let dummy = Dummy::new_default();
        eeprom(&dummy, EepromOp::Write, 0x50, 4, 20);
        let text = eeprom(&dummy, EepromOp::Read, 0x50, 4, 20);
        assert!(text.contains(
            "\nData read from device:\n\
             0004:  00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f  \n\
             0014:  10 11 12 13 \n"
        ));

        let last = dummy.i2c_log();
        let read_ptr = &last[last.len() - 2];
        assert_eq!(read_ptr.flags, I2cFlags::NO_STOP);
        assert_eq!(read_ptr.data, vec![4]);
    }

    #[test]
    fn test_zero_clears() {
        let dummy = Dummy::new_default();
        eeprom(&dummy, EepromOp::Write, 0x50, 0, 16);
        let text = eeprom(&dummy, EepromOp::Zero, 0x50, 0, 16);
        assert!(text.ends_with("Zeroed EEPROM\n"));
        assert!(dummy.i2c_eeprom()[..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_wrong_slave_address() {
        let dummy = Dummy::new_default();
        let text = eeprom(&dummy, EepromOp::Write, 0x51, 0, 8);
        assert!(text.contains(
            "error: no bytes written\n  are you sure you have the right slave address?\n"
        ));
        let text = eeprom(&dummy, EepromOp::Read, 0x51, 0, 8);
        assert!(text.contains("error: no bytes read\n"));
        assert!(!text.contains("Data read from device"));
    }

    #[test]
    fn test_address_wraps_at_end_of_memory() {
        let dummy = Dummy::new_default();
        eeprom(&dummy, EepromOp::Write, 0x50, 0xfc, 8);
        let memory = dummy.i2c_eeprom();
        assert_eq!(&memory[0xfc..], &[0, 1, 2, 3]);
        assert_eq!(&memory[..4], &[4, 5, 6, 7]);
    }

    #[test]
    fn test_configured_bus_timeout() {
        let dummy = Dummy::new_default();
        let config = Config::from_toml_str("[i2c]\nbus_timeout_ms = 200").unwrap();
        let text = run(&dummy, &config, |ctx, out| {
            run_i2c_eeprom(ctx, out, ADDR, 100, EepromOp::Read, 0x50, 0, 1)
        });
        assert!(text.contains("Bus lock timeout set to 200 ms\n"));
    }
}
