//! SPI EEPROM command (AT25080A)

use super::{collected, spi_master_oe, write_progress, Context};
use crate::cli::EepromOp;
use crate::hexdump;
use crate::session::{collect_all, Session};
use promira_core::{
    AppConfig, BitOrder, ModuleId, QueueHandle, SpiIoMode, SpiMode, TargetPower,
};
use std::io::Write;

/// The AT25080A has 32 byte pages
const PAGE_SIZE: usize = 32;

const CMD_WREN: u8 = 0x06;
const CMD_WRITE: u8 = 0x02;
const CMD_READ: u8 = 0x03;

/// Command byte plus two address bytes
const HEADER_LEN: usize = 3;

/// Write cycle time
const WRITE_DELAY_NS: u32 = 10_000_000;

/// Run the spi-eeprom command
#[allow(clippy::too_many_arguments)]
pub fn run_spi_eeprom(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
    bitrate_khz: u32,
    op: EepromOp,
    mode: SpiMode,
    offset: u16,
    length: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();
    let ss_mask = ctx.ss_mask();

    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    app.phy_target_power(channel, TargetPower::BOTH)?;
    app.spi_configure(channel, mode, BitOrder::Msb, 0)?;
    app.spi_enable_ss(channel, ss_mask)?;

    let bitrate = app.spi_bitrate(channel, bitrate_khz)?;
    writeln!(out, "Bitrate set to {} kHz", bitrate)?;

    let queue = app.queue_create(session.conn(), ModuleId::SpiActive)?;
    spi_master_oe(&session, out, queue, true)?;

    let eeprom = Eeprom {
        session: &session,
        queue,
        ss_mask,
    };
    let result = eeprom.perform(out, op, offset, length);

    spi_master_oe(&session, out, queue, false)?;
    app.queue_destroy(queue)?;
    result
}

struct Eeprom<'s, 'a> {
    session: &'s Session<'a>,
    queue: QueueHandle,
    ss_mask: u8,
}

impl Eeprom<'_, '_> {
    fn perform(
        &self,
        out: &mut dyn Write,
        op: EepromOp,
        offset: u16,
        length: u16,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match op {
            EepromOp::Write => {
                self.write(out, offset, length, false)?;
                writeln!(out, "Wrote to EEPROM")?;
            }
            EepromOp::Zero => {
                self.write(out, offset, length, true)?;
                writeln!(out, "Zeroed EEPROM")?;
            }
            EepromOp::Read => self.read(out, offset, length)?,
        }
        Ok(())
    }

    /// Write `length` bytes from `addr`, one page per queue
    fn write(
        &self,
        out: &mut dyn Write,
        addr: u16,
        length: u16,
        zero: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.session.app();
        let queue = self.queue;
        let length = usize::from(length);
        let pb = write_progress(length as u64)?;

        let mut page = Vec::with_capacity(PAGE_SIZE);
        let mut n = 0usize;
        while n < length {
            app.queue_clear(queue)?;

            app.queue_spi_ss(queue, self.ss_mask)?;
            app.queue_spi_write(queue, SpiIoMode::Standard, 8, 1, &[CMD_WREN])?;
            app.queue_spi_ss(queue, 0)?;

            let [hi, lo] = addr.wrapping_add(n as u16).to_be_bytes();
            let header = [CMD_WRITE, hi, lo];

            page.clear();
            loop {
                page.push(if zero { 0 } else { n as u8 });
                n += 1;
                if n >= length || (usize::from(addr) + n) % PAGE_SIZE == 0 {
                    break;
                }
            }

            app.queue_spi_ss(queue, self.ss_mask)?;
            app.queue_spi_write(queue, SpiIoMode::Standard, 8, HEADER_LEN as u32, &header)?;
            app.queue_spi_write(queue, SpiIoMode::Standard, 8, page.len() as u32, &page)?;
            app.queue_spi_ss(queue, 0)?;
            app.queue_spi_delay_ns(queue, WRITE_DELAY_NS)?;

            let result = app
                .queue_submit(queue, self.session.channel(), 0)
                .and_then(|collect| collect_all(app, collect, &mut []));
            collected(app, out, result)?;
            pb.set_position(n as u64);
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// Clock out READ and the address, then `length` zero bytes
    fn read(
        &self,
        out: &mut dyn Write,
        addr: u16,
        length: u16,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.session.app();
        let queue = self.queue;
        let mut data_in = vec![0u8; usize::from(length) + HEADER_LEN];
        let [hi, lo] = addr.to_be_bytes();

        app.queue_clear(queue)?;
        app.queue_spi_ss(queue, self.ss_mask)?;
        app.queue_spi_write(queue, SpiIoMode::Standard, 8, HEADER_LEN as u32, &[CMD_READ, hi, lo])?;
        app.queue_spi_write_word(queue, SpiIoMode::Standard, 8, u32::from(length), 0)?;
        app.queue_spi_ss(queue, 0)?;

        let result = app
            .queue_submit(queue, self.session.channel(), 0)
            .and_then(|collect| collect_all(app, collect, &mut data_in));
        match result {
            Ok(count) if count != data_in.len() => writeln!(
                out,
                "error: read {} bytes (expected {})",
                count as i64 - HEADER_LEN as i64,
                length
            )?,
            Ok(_) => {}
            Err(e) => writeln!(out, "error: {}", e.code())?,
        }

        hexdump::dump(
            out,
            "\nData read from device:",
            usize::from(addr),
            &data_in[HEADER_LEN..],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::Dummy;

    fn eeprom(dummy: &Dummy, op: EepromOp, offset: u16, length: u16) -> String {
        run(dummy, &Config::default(), |ctx, out| {
            run_spi_eeprom(ctx, out, ADDR, 1000, op, SpiMode::Mode0, offset, length)
        })
    }

    #[test]
    fn test_write_read_round_trip() {
        let dummy = Dummy::new_default();
        let text = eeprom(&dummy, EepromOp::Write, 0x1c, 40);
        assert_eq!(text, "Bitrate set to 1000 kHz\nWrote to EEPROM\n");

        let memory = dummy.spi_eeprom();
        assert_eq!(&memory[0x1c..0x1c + 40], &(0..40).collect::<Vec<u8>>()[..]);
        assert_eq!(memory[0x1c + 40], 0xff);

        let text = eeprom(&dummy, EepromOp::Read, 0x1c, 6);
        assert_eq!(
            text,
            "Bitrate set to 1000 kHz\n\
             \nData read from device:\n\
             001c:  00 01 02 03 04 05 \n"
        );
    }

    #[test]
    fn test_zero() {
        let dummy = Dummy::new_default();
        eeprom(&dummy, EepromOp::Write, 0, 64);
        let text = eeprom(&dummy, EepromOp::Zero, 0, 64);
        assert!(text.ends_with("Zeroed EEPROM\n"));
        assert!(dummy.spi_eeprom()[..64].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bitrate_is_reported_as_applied() {
        let dummy = Dummy::new_default();
        let text = run(&dummy, &Config::default(), |ctx, out| {
            run_spi_eeprom(ctx, out, ADDR, 125_000, EepromOp::Read, SpiMode::Mode3, 0, 1)
        });
        assert!(text.starts_with("Bitrate set to 80000 kHz\n"));
    }

    #[test]
    fn test_unselected_slave_reads_high() {
        let dummy = Dummy::new_default();
        eeprom(&dummy, EepromOp::Write, 0, 4);
        let config = Config::from_toml_str("[spi]\nss_mask = 0x2").unwrap();
        let text = run(&dummy, &config, |ctx, out| {
            run_spi_eeprom(ctx, out, ADDR, 1000, EepromOp::Read, SpiMode::Mode0, 0, 4)
        });
        assert!(text.ends_with("0000:  ff ff ff ff \n"));
    }
}
