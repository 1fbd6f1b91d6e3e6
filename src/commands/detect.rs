//! List Promira platforms on the network

use super::Context;
use promira_core::DeviceInfo;
use std::io::Write;

/// Devices reported at most
const MAX_DEVICES: usize = 16;

/// Run the detect command
pub fn run_detect(ctx: &Context<'_>, out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let devices = ctx.platform.find_devices_ext()?;
    writeln!(out, "{} device(s) found:", devices.len())?;

    for dev in devices.iter().take(MAX_DEVICES) {
        writeln!(out, "{}", device_line(dev))?;
        if dev.in_use {
            continue;
        }

        // Free devices can be asked for their applications
        let addr = dev.address.to_string();
        match ctx.platform.open(&addr) {
            Ok(pm) => {
                match ctx.platform.apps(pm) {
                    Ok(apps) => writeln!(out, "    - apps = {}", apps)?,
                    Err(e) => log::debug!("Listing apps on {}: {}", addr, e),
                }
                if let Err(e) = ctx.platform.close(pm) {
                    log::debug!("Closing {}: {}", addr, e);
                }
            }
            Err(e) => log::debug!("Opening {}: {}", addr, e),
        }
    }
    Ok(())
}

/// `    ip = A.B.C.D (avail)  (NNNN-NNNNNN)`
fn device_line(dev: &DeviceInfo) -> String {
    let status = if dev.in_use { "(in-use)" } else { "(avail) " };
    format!("    ip = {} {} ({})", dev.address, status, dev.serial())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::run;
    use crate::config::Config;
    use promira_core::{ipv4_to_raw, DEVICE_NOT_FREE, PROMACT_IS_APP};
    use promira_dummy::{Dummy, DummyConfig, DummyDevice};
    use std::net::Ipv4Addr;

    #[test]
    fn test_device_line_from_raw() {
        let raw = ipv4_to_raw(Ipv4Addr::new(10, 1, 2, 3));
        let dev = DeviceInfo::from_raw(raw, 1_234_000_042, 0);
        assert_eq!(device_line(&dev), "    ip = 10.1.2.3 (avail)  (1234-000042)");

        let dev = DeviceInfo::from_raw(raw, 42, DEVICE_NOT_FREE);
        assert_eq!(device_line(&dev), "    ip = 10.1.2.3 (in-use) (0000-000042)");
    }

    #[test]
    fn test_lists_apps_of_free_devices() {
        let dummy = Dummy::new(DummyConfig {
            devices: vec![
                DummyDevice::default(),
                DummyDevice {
                    address: Ipv4Addr::new(192, 168, 11, 241),
                    unique_id: 2_005_000_124,
                    in_use: true,
                    ..DummyDevice::default()
                },
            ],
            ..DummyConfig::default()
        });
        let text = run(&dummy, &Config::default(), |ctx, out| run_detect(ctx, out));
        assert_eq!(
            text,
            format!(
                "2 device(s) found:\n\
                 \x20   ip = 192.168.11.240 (avail)  (2005-000123)\n\
                 \x20   - apps = {}\n\
                 \x20   ip = 192.168.11.241 (in-use) (2005-000124)\n",
                PROMACT_IS_APP
            )
        );
    }

    #[test]
    fn test_no_devices() {
        let dummy = Dummy::new(DummyConfig {
            devices: vec![],
            ..DummyConfig::default()
        });
        let text = run(&dummy, &Config::default(), |ctx, out| run_detect(ctx, out));
        assert_eq!(text, "0 device(s) found:\n");
    }
}
