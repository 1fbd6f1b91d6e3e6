//! GPIO walkthrough

use super::Context;
use promira_core::{AppConfig, Pullup};
use std::io::Write;
use std::time::Instant;

const GPIO0: u32 = 0x1;
const GPIO1: u32 = 0x2;
const GPIO2: u32 = 0x4;
const GPIO3: u32 = 0x8;

const CHANGE_TIMEOUT_MS: i32 = 2000;

/// Run the gpio command
pub fn run_gpio(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();

    // Hand every pin to the GPIO subsystem
    app.configure(channel, AppConfig::GPIO)?;
    app.i2c_pullup(channel, Pullup::NONE)?;

    // Drive everything low to drain the lines
    app.gpio_set(channel, 0x0)?;
    app.gpio_direction(channel, 0xffff)?;

    app.gpio_direction(channel, GPIO0 | GPIO3)?;
    app.gpio_set(channel, GPIO0)?;
    writeln!(out, "Setting GPIO0 to logic high")?;

    // Outputs read back as 0
    let val = app.gpio_get(channel)?;
    if val & GPIO1 != 0 {
        writeln!(out, "Read the GPIO1 line as logic high")?;
    } else {
        writeln!(out, "Read the GPIO1 line as logic low")?;
    }

    let val = app.gpio_get(channel)?;
    if val & GPIO2 != 0 {
        writeln!(out, "Read the GPIO2 line as logic high (passive pullup)")?;
    } else {
        writeln!(out, "Read the GPIO2 line as logic low (is pin driven low?)")?;
    }

    let start = Instant::now();
    for _ in 0..1000 {
        app.gpio_get(channel)?;
    }
    log::info!("1000 GPIO reads took {:?}", start.elapsed());

    app.gpio_direction(channel, 0x00)?;
    let old = app.gpio_get(channel)?;
    writeln!(out, "Calling ps_gpio_change for 2 seconds...")?;
    let new = app.gpio_change(channel, CHANGE_TIMEOUT_MS)?;
    if new != old {
        writeln!(out, "  GPIO inputs changed.")?;
    } else {
        writeln!(out, "  GPIO inputs did not change.")?;
    }

    app.i2c_pullup(channel, Pullup::BOTH)?;
    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::Dummy;

    #[test]
    fn test_idle_lines() {
        let dummy = Dummy::new_default();
        let text = run(&dummy, &Config::default(), |ctx, out| run_gpio(ctx, out, ADDR));
        assert_eq!(
            text,
            "Setting GPIO0 to logic high\n\
             Read the GPIO1 line as logic low\n\
             Read the GPIO2 line as logic high (passive pullup)\n\
             Calling ps_gpio_change for 2 seconds...\n  \
             GPIO inputs did not change.\n"
        );
        // The wait ran into its timeout; outputs keep their last value
        assert_eq!(dummy.slept_ms(), 2000);
        assert_eq!(dummy.gpio_outputs(), (0x00, GPIO0));
    }

    #[test]
    fn test_driven_lines_and_change() {
        let dummy = Dummy::new_default();
        dummy.set_gpio_levels(GPIO1);
        dummy.push_gpio_change(GPIO1 | GPIO2);
        let text = run(&dummy, &Config::default(), |ctx, out| run_gpio(ctx, out, ADDR));
        assert!(text.contains("Read the GPIO1 line as logic high\n"));
        assert!(text.contains("Read the GPIO2 line as logic low (is pin driven low?)\n"));
        assert!(text.ends_with("  GPIO inputs changed.\n"));
        assert_eq!(dummy.slept_ms(), 0);
    }
}
