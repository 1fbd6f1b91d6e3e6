//! Send a file to an I2C slave

use super::{read_chunk, Context};
use crate::hexdump;
use crate::session::Session;
use promira_core::{AppConfig, I2cFlags, Pullup, TargetPower};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const BUFFER_SIZE: usize = 2048;
const I2C_BITRATE_KHZ: u16 = 400;

/// Run the i2c-file command
pub fn run_i2c_file(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
    slave: u16,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();

    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    app.i2c_pullup(channel, Pullup::BOTH)?;
    app.phy_target_power(channel, TargetPower::BOTH)?;

    let bitrate = ctx.config.i2c.bitrate_khz.unwrap_or(I2C_BITRATE_KHZ);
    let bitrate = app.i2c_bitrate(channel, bitrate)?;
    writeln!(out, "Bitrate set to {} kHz", bitrate)?;

    blast_bytes(&session, out, slave, path)
}

/// Write the file in chunks, stopping at the first failed transaction
fn blast_bytes(
    session: &Session<'_>,
    out: &mut dyn Write,
    slave: u16,
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

    let mut data = vec![0u8; BUFFER_SIZE];
    let mut trans_num = 0;
    loop {
        let num_write = read_chunk(&mut file, &mut data)?;
        if num_write == 0 {
            break;
        }
        let chunk = &data[..num_write];

        let count = match app.i2c_write(session.channel(), slave, I2cFlags::empty(), chunk) {
            Ok(count) => count,
            Err(e) => {
                writeln!(out, "error: {}", e.code())?;
                break;
            }
        };
        if count == 0 {
            writeln!(out, "error: no bytes written")?;
            writeln!(out, "  are you sure you have the right slave address?")?;
            break;
        }
        if count != num_write {
            writeln!(out, "error: only a partial number of bytes written")?;
            writeln!(out, "  ({}) instead of full ({})", count, num_write)?;
            break;
        }

        writeln!(out, "*** Transaction #{:02}", trans_num)?;
        hexdump::dump(out, "Data written to device:", 0, &chunk[..count])?;
        writeln!(out)?;
        trans_num += 1;

        // Give the slave time to process the data
        app.sleep_ms(10)?;
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
    use std::path::PathBuf;

    fn temp_file(name: &str, data: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_chunks_are_dumped() {
        // Address byte 0x10 followed by data, larger than one chunk
        let mut data = vec![0x10];
        data.extend((0..BUFFER_SIZE as u32).map(|i| i as u8));
        let path = temp_file("promira-i2c-file-chunks.bin", &data);

        let dummy = Dummy::new_default();
        let text = run(&dummy, &Config::default(), |ctx, out| {
            run_i2c_file(ctx, out, ADDR, 0x50, &path)
        });
        fs::remove_file(&path).unwrap();

        assert!(text.starts_with("Bitrate set to 400 kHz\n*** Transaction #00\nData written to device:\n0000:  10 00 01 02"));
        assert!(text.contains("\n*** Transaction #01\nData written to device:\n0000:  ff \n\n"));
        assert!(text.ends_with("\n\n"));
        assert_eq!(dummy.slept_ms(), 20);

        let sizes: Vec<_> = dummy.i2c_log().iter().map(|t| t.data.len()).collect();
        assert_eq!(sizes, vec![BUFFER_SIZE, 1]);
    }

    #[test]
    fn test_missing_slave_stops() {
        let path = temp_file("promira-i2c-file-nack.bin", &[1, 2, 3]);
        let dummy = Dummy::new_default();
        let text = run(&dummy, &Config::default(), |ctx, out| {
            run_i2c_file(ctx, out, ADDR, 0x22, &path)
        });
        fs::remove_file(&path).unwrap();

        assert_eq!(
            text,
            "Bitrate set to 400 kHz\n\
             error: no bytes written\n  are you sure you have the right slave address?\n"
        );
        assert_eq!(dummy.slept_ms(), 0);
    }

    #[test]
    fn test_missing_file() {
        let dummy = Dummy::new_default();
        let path = std::env::temp_dir().join("promira-no-such-file.bin");
        let text = run(&dummy, &Config::default(), |ctx, out| {
            run_i2c_file(ctx, out, ADDR, 0x50, &path)
        });
        assert!(text.ends_with(&format!("Unable to open file '{}'\n", path.display())));
    }
}
