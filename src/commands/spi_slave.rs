//! Act as an SPI slave and dump the traffic

use super::{Context, SLAVE_POLL_MS, SLAVE_RESPONSE};
use crate::hexdump;
use crate::session::Session;
use promira_core::{
    AppConfig, BitOrder, SlaveMode, SpiIoMode, SpiMode, SpiSlaveEvent, SpiSlaveFlags, TargetPower,
};
use std::io::Write;

/// Transfers longer than this are split into several reads
const BUFFER_SIZE: usize = 65535;

/// Run the spi-slave command
pub fn run_spi_slave(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
    io: SpiIoMode,
    timeout_ms: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open(addr)?;
    let app = session.app();
    let channel = session.channel();

    app.configure(channel, AppConfig::SPI | AppConfig::I2C)?;
    app.phy_target_power(channel, TargetPower::BOTH)?;
    app.spi_configure(channel, SpiMode::Mode0, BitOrder::Msb, 0)?;
    app.spi_enable_ss(channel, ctx.ss_mask())?;

    app.spi_std_slave_set_resp(channel, &SLAVE_RESPONSE)?;
    app.spi_slave_enable(channel, SlaveMode::Standard)?;
    app.spi_std_slave_configure(channel, io, SpiSlaveFlags::empty())?;
    app.spi_slave_host_read_size(channel, BUFFER_SIZE as u32)?;

    let result = dump(&session, out, timeout_ms);

    app.spi_slave_disable(channel)?;
    result
}

/// Report received transfers until the master goes quiet
fn dump(
    session: &Session<'_>,
    out: &mut dyn Write,
    timeout_ms: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = session.app();
    let channel = session.channel();
    let mut data_in = vec![0u8; BUFFER_SIZE];

    writeln!(out, "Watching slave SPI data...")?;

    let mut event = app.spi_slave_poll(channel, timeout_ms)?;
    if event == SpiSlaveEvent::NoData {
        writeln!(out, "No data available.")?;
        return Ok(());
    }
    writeln!(out)?;

    let mut trans_num = 0;
    loop {
        match event {
            SpiSlaveEvent::Data => {
                let num_read = match app.spi_slave_read(channel, &mut data_in) {
                    Ok((info, num_read)) => {
                        log::debug!(
                            "Slave read: {} bits in, {} bits out, last {}",
                            info.in_data_bits,
                            info.out_data_bits,
                            info.is_last
                        );
                        num_read
                    }
                    Err(e) => {
                        writeln!(out, "error: {}", e.code())?;
                        return Ok(());
                    }
                };
                if num_read == 0 {
                    writeln!(out, "No more data available from SPI master.")?;
                    return Ok(());
                }
                writeln!(out, "*** Transaction #{:02}", trans_num)?;
                hexdump::dump(out, "Data read from device:", 0, &data_in[..num_read])?;
                writeln!(out)?;
                trans_num += 1;
            }
            SpiSlaveEvent::DataLost => {
                let lost = match app.spi_slave_data_lost_stats(channel) {
                    Ok(lost) => lost,
                    Err(e) => {
                        writeln!(out, "error: {}", e.code())?;
                        return Ok(());
                    }
                };
                writeln!(out, "*** Transaction #{:02}", trans_num)?;
                writeln!(out, "Number of packet Lost: {:04}", lost)?;
                writeln!(out)?;
            }
            other => log::debug!("Ignoring slave event {:?}", other),
        }

        event = app.spi_slave_poll(channel, SLAVE_POLL_MS)?;
        if event == SpiSlaveEvent::NoData {
            writeln!(out, "No more data available from SPI master.")?;
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::{Dummy, SpiMasterAction};

    fn slave(dummy: &Dummy, io: SpiIoMode) -> String {
        run(dummy, &Config::default(), |ctx, out| {
            run_spi_slave(ctx, out, ADDR, io, 1000)
        })
    }

    #[test]
    fn test_no_traffic() {
        let dummy = Dummy::new_default();
        assert_eq!(
            slave(&dummy, SpiIoMode::Standard),
            "Watching slave SPI data...\nNo data available.\n"
        );
    }

    #[test]
    fn test_transfers_and_lost_packets() {
        let dummy = Dummy::new_default();
        dummy.push_spi_master(SpiMasterAction::Transfer(vec![0x9f, 0x00, 0x00]));
        dummy.push_spi_master(SpiMasterAction::DataLost(3));
        dummy.push_spi_master(SpiMasterAction::Transfer(vec![0x05]));

        assert_eq!(
            slave(&dummy, SpiIoMode::Dual),
            "Watching slave SPI data...\n\
             \n\
             *** Transaction #00\n\
             Data read from device:\n\
             0000:  9f 00 00 \n\
             \n\
             *** Transaction #01\n\
             Number of packet Lost: 0003\n\
             \n\
             *** Transaction #01\n\
             Data read from device:\n\
             0000:  05 \n\
             \n\
             No more data available from SPI master.\n"
        );
    }

    #[test]
    fn test_long_transfer_is_split() {
        let dummy = Dummy::new_default();
        dummy.push_spi_master(SpiMasterAction::Transfer(vec![0xaa; BUFFER_SIZE + 1]));
        let text = slave(&dummy, SpiIoMode::Standard);
        assert!(text.contains("*** Transaction #01\nData read from device:\n0000:  aa \n\n"));
        assert!(text.ends_with("No more data available from SPI master.\n"));
    }
}
