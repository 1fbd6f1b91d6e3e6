//! Send a file over SPI and dump what comes back

use super::{collected, read_chunk, spi_master_oe, Context};
use crate::hexdump;
use crate::session::{collect_all, Session};
use promira_core::{AppConfig, BitOrder, ModuleId, QueueHandle, SpiIoMode, SpiMode, TargetPower};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const BUFFER_SIZE: usize = 2048;
const SPI_BITRATE_KHZ: u32 = 20000;

/// Run the spi-file command
pub fn run_spi_file(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
    io: SpiIoMode,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();
    let ss_mask = ctx.ss_mask();

    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    app.phy_target_power(channel, TargetPower::BOTH)?;
    app.spi_configure(channel, SpiMode::Mode0, BitOrder::Msb, 0)?;
    app.spi_enable_ss(channel, ss_mask)?;

    let bitrate = ctx.config.spi.bitrate_khz.unwrap_or(SPI_BITRATE_KHZ);
    let bitrate = app.spi_bitrate(channel, bitrate)?;
    writeln!(out, "Bitrate set to {} kHz", bitrate)?;

    let queue = app.queue_create(session.conn(), ModuleId::SpiActive)?;
    spi_master_oe(&session, out, queue, true)?;

    let result = blast_bytes(&session, out, queue, ss_mask, io, path);

    spi_master_oe(&session, out, queue, false)?;
    app.queue_destroy(queue)?;
    result
}

/// Shift the file out in chunks, dumping the MISO data of each
fn blast_bytes(
    session: &Session<'_>,
    out: &mut dyn Write,
    queue: QueueHandle,
    ss_mask: u8,
    io: SpiIoMode,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = session.app();
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::debug!("{}: {}", path.display(), e);
            writeln!(out, "Unable to open file '{}'", path.display())?;
            return Ok(());
        }
    };

    let mut data_out = vec![0u8; BUFFER_SIZE];
    let mut data_in = vec![0u8; BUFFER_SIZE];
    let mut trans_num = 0;
    loop {
        let num_write = read_chunk(&mut file, &mut data_out)?;
        if num_write == 0 {
            break;
        }

        app.queue_clear(queue)?;
        app.queue_spi_ss(queue, ss_mask)?;
        app.queue_spi_write(queue, io, 8, num_write as u32, &data_out[..num_write])?;
        app.queue_spi_ss(queue, 0)?;

        let result = app
            .queue_submit(queue, session.channel(), 0)
            .and_then(|collect| collect_all(app, collect, &mut data_in));
        let count = collected(app, out, result)?;
        if count != num_write {
            writeln!(out, "error: only a partial number of bytes written")?;
            writeln!(out, "  ({}) instead of full ({})", count, num_write)?;
        }

        writeln!(out, "*** Transaction #{:02}", trans_num)?;
        hexdump::dump(out, "Data read from device:", 0, &data_in[..count])?;
        writeln!(out)?;
        trans_num += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::Dummy;
    use std::fs;

    #[test]
    fn test_status_register_read() {
        // WREN, then RDSR with one dummy byte
        let path = std::env::temp_dir().join("promira-spi-file-rdsr.bin");
        let dummy = Dummy::new_default();

        fs::write(&path, [0x06]).unwrap();
        run(&dummy, &Config::default(), |ctx, out| {
            run_spi_file(ctx, out, ADDR, SpiIoMode::Standard, &path)
        });

        fs::write(&path, [0x05, 0x00]).unwrap();
        let text = run(&dummy, &Config::default(), |ctx, out| {
            run_spi_file(ctx, out, ADDR, SpiIoMode::Standard, &path)
        });
        fs::remove_file(&path).unwrap();

        assert_eq!(
            text,
            "Bitrate set to 20000 kHz\n\
             *** Transaction #00\n\
             Data read from device:\n\
             0000:  ff 02 \n\n"
        );
    }

    #[test]
    fn test_large_file_is_split() {
        let path = std::env::temp_dir().join("promira-spi-file-large.bin");
        fs::write(&path, vec![0u8; BUFFER_SIZE + 16]).unwrap();
        let dummy = Dummy::new_default();
        let config = Config::from_toml_str("[spi]\nbitrate_khz = 40000").unwrap();
        let text = run(&dummy, &config, |ctx, out| {
            run_spi_file(ctx, out, ADDR, SpiIoMode::Quad, &path)
        });
        fs::remove_file(&path).unwrap();

        assert!(text.starts_with("Bitrate set to 40000 kHz\n"));
        assert!(text.contains("*** Transaction #01\n"));
        assert!(!text.contains("*** Transaction #02"));
        assert!(!text.contains("partial"));
    }
}
