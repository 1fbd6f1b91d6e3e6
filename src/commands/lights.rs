//! Light sequence on an I2C I/O expander

use super::Context;
use crate::session::Session;
use promira_core::{AppConfig, I2cFlags, Pullup, TargetPower};
use std::io::Write;

/// Address of the I/O expander on the demo board
const EXPANDER_ADDR: u16 = 0x38;

const REG_OUTPUT: u8 = 0x01;
const REG_CONFIG: u8 = 0x03;

const I2C_BITRATE_KHZ: u16 = 100;
const STEP_MS: u32 = 70;
const HOLD_MS: u32 = 100;

/// Run the lights command
pub fn run_lights(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
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

    match flash_lights(&session) {
        Ok(true) => {}
        Ok(false) => writeln!(out, "error: slave device 0x{:02x} not found", EXPANDER_ADDR)?,
        Err(e) => writeln!(out, "error: {}", e.code())?,
    }
    Ok(())
}

/// Returns `false` when the expander does not acknowledge
fn flash_lights(session: &Session<'_>) -> promira_core::Result<bool> {
    let app = session.app();
    let write_reg = |reg: u8, value: u8| {
        app.i2c_write(session.channel(), EXPANDER_ADDR, I2cFlags::empty(), &[reg, value])
    };

    // All lines outputs
    if write_reg(REG_CONFIG, 0x00)? == 0 {
        return Ok(false);
    }

    // Outputs are active low: shift zeros in to turn the lights on
    let mut lights = 0xffu8;
    loop {
        lights <<= 1;
        write_reg(REG_OUTPUT, lights)?;
        app.sleep_ms(STEP_MS)?;
        if lights == 0 {
            break;
        }
    }
    app.sleep_ms(HOLD_MS)?;

    loop {
        lights = (lights << 1) | 0x01;
        write_reg(REG_OUTPUT, lights)?;
        app.sleep_ms(STEP_MS)?;
        if lights == 0xff {
            break;
        }
    }
    app.sleep_ms(HOLD_MS)?;

    // Back to inputs
    write_reg(REG_CONFIG, 0xff)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::{Dummy, DummyConfig};

    #[test]
    fn test_sequence() {
        let dummy = Dummy::new_default();
        let text = run(&dummy, &Config::default(), |ctx, out| run_lights(ctx, out, ADDR));
        assert_eq!(text, "Bitrate set to 100 kHz\n");

        let writes = dummy.expander_writes();
        assert_eq!(writes.first(), Some(&(REG_CONFIG, 0x00)));
        assert_eq!(writes.last(), Some(&(REG_CONFIG, 0xff)));

        let outputs: Vec<u8> = writes[1..writes.len() - 1].iter().map(|&(_, v)| v).collect();
        assert_eq!(
            outputs,
            vec![
                0xfe, 0xfc, 0xf8, 0xf0, 0xe0, 0xc0, 0x80, 0x00, // on
                0x01, 0x03, 0x07, 0x0f, 0x1f, 0x3f, 0x7f, 0xff, // off
            ]
        );
        assert_eq!(dummy.slept_ms(), 16 * 70 + 2 * 100);
    }

    #[test]
    fn test_missing_expander() {
        let dummy = Dummy::new(DummyConfig {
            expander_addr: 0x20,
            ..DummyConfig::default()
        });
        let text = run(&dummy, &Config::default(), |ctx, out| run_lights(ctx, out, ADDR));
        assert_eq!(text, "Bitrate set to 100 kHz\nerror: slave device 0x38 not found\n");
        assert_eq!(dummy.slept_ms(), 0);
    }
}
