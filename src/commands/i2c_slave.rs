//! Act as an I2C slave and dump the traffic

use super::{Context, SLAVE_POLL_MS, SLAVE_RESPONSE};
use crate::hexdump;
use crate::session::Session;
use promira_core::{AppConfig, I2cSlaveEvent, Pullup, TargetPower};
use std::io::Write;

const BUFFER_SIZE: usize = 65535;

/// Run the i2c-slave command
pub fn run_i2c_slave(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
    slave: u16,
    timeout_ms: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();

    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    app.i2c_pullup(channel, Pullup::BOTH)?;
    app.phy_target_power(channel, TargetPower::BOTH)?;

    // Only used when the master reads from us
    app.i2c_slave_set_resp(channel, &SLAVE_RESPONSE)?;
    app.i2c_slave_enable(channel, slave, 0, 0)?;

    let result = dump(&session, out, timeout_ms);

    app.i2c_slave_disable(channel)?;
    result
}

/// Report slave transactions until the master goes quiet
fn dump(
    session: &Session<'_>,
    out: &mut dyn Write,
    timeout_ms: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = session.app();
    let channel = session.channel();
    let mut data_in = vec![0u8; BUFFER_SIZE];

    writeln!(out, "Watching slave I2C data...")?;

    let mut event = app.i2c_slave_poll(channel, timeout_ms)?;
    if event == I2cSlaveEvent::NoData {
        writeln!(out, "No data available.")?;
        return Ok(());
    }
    writeln!(out)?;

    let mut trans_num = 0;
    loop {
        match event {
            I2cSlaveEvent::Read => {
                let num_bytes = match app.i2c_slave_read(channel, &mut data_in) {
                    Ok((_, num_bytes)) => num_bytes,
                    Err(e) => {
                        writeln!(out, "error: {}", e.code())?;
                        return Ok(());
                    }
                };
                writeln!(out, "*** Transaction #{:02}", trans_num)?;
                hexdump::dump(out, "Data read from master:", 0, &data_in[..num_bytes])?;
                writeln!(out)?;
            }
            I2cSlaveEvent::Write => {
                let num_bytes = match app.i2c_slave_write_stats(channel) {
                    Ok((_, num_bytes)) => num_bytes,
                    Err(e) => {
                        writeln!(out, "error: {}", e.code())?;
                        return Ok(());
                    }
                };
                writeln!(out, "*** Transaction #{:02}", trans_num)?;
                writeln!(out, "Number of bytes written to master: {:04}", num_bytes)?;
                writeln!(out)?;
            }
            _ => {
                writeln!(out, "error: non-I2C asynchronous message is pending")?;
                return Ok(());
            }
        }
        trans_num += 1;

        event = app.i2c_slave_poll(channel, SLAVE_POLL_MS)?;
        if event == I2cSlaveEvent::NoData {
            writeln!(out, "No more data available from I2C master.")?;
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::{Dummy, I2cMasterAction};

    fn slave(dummy: &Dummy) -> String {
        run(dummy, &Config::default(), |ctx, out| {
            run_i2c_slave(ctx, out, ADDR, 0x40, -1)
        })
    }

    #[test]
    fn test_no_traffic() {
        let dummy = Dummy::new_default();
        assert_eq!(slave(&dummy), "Watching slave I2C data...\nNo data available.\n");
    }

    #[test]
    fn test_master_write_then_read() {
        let dummy = Dummy::new_default();
        dummy.push_i2c_master(I2cMasterAction::Write(vec![0xde, 0xad, 0xbe, 0xef]));
        dummy.push_i2c_master(I2cMasterAction::Read(30));

        assert_eq!(
            slave(&dummy),
            "Watching slave I2C data...\n\
             \n\
             *** Transaction #00\n\
             Data read from master:\n\
             0000:  de ad be ef \n\
             \n\
             *** Transaction #01\n\
             Number of bytes written to master: 0030\n\
             \n\
             No more data available from I2C master.\n"
        );

        let sent = dummy.i2c_slave_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0][..26], &SLAVE_RESPONSE);
        assert_eq!(&sent[0][26..], b"ABCD");
    }

    #[test]
    fn test_lost_data_stops() {
        let dummy = Dummy::new_default();
        dummy.push_i2c_master(I2cMasterAction::DataLost);
        dummy.push_i2c_master(I2cMasterAction::Write(vec![1]));
        let text = slave(&dummy);
        assert!(text.ends_with("\nerror: non-I2C asynchronous message is pending\n"));
        assert!(!text.contains("Transaction"));
    }
}
