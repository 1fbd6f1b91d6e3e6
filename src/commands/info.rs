//! Versions, licences and network settings of a platform

use super::Context;
use promira_core::{serial_string, NetCommand, PlatformApi, PlatformHandle};
use std::io::Write;

/// Run the info command
pub fn run_info(
    ctx: &Context<'_>,
    out: &mut dyn Write,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let platform = ctx.platform;
    let pm = match platform.open(addr) {
        Ok(pm) => pm,
        Err(e) => {
            return Err(format!(
                "Unable to open Promira platform on {}\nError code = {}",
                addr,
                e.code()
            )
            .into())
        }
    };

    let result = print_info(platform, pm, out, addr);
    if let Err(e) = platform.close(pm) {
        log::debug!("Closing {}: {}", addr, e);
    }
    result
}

fn print_info(
    platform: &dyn PlatformApi,
    pm: PlatformHandle,
    out: &mut dyn Write,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = platform.version(pm)?;
    let (year, month, day, build) = version.build_date();

    writeln!(out, "Promira platform {}", addr)?;
    writeln!(out, "  Serial number:  {}", serial_string(platform.unique_id(pm)?))?;
    writeln!(out, "  Software:       {}", version.software)?;
    writeln!(out, "  Firmware:       {}", version.firmware)?;
    writeln!(out, "  Hardware:       {}", version.hardware)?;
    writeln!(
        out,
        "  Build:          20{:02}-{:02}-{:02} #{}",
        year, month, day, build
    )?;
    writeln!(
        out,
        "  Requires:       software >= {}, firmware >= {}, API >= {}",
        version.sw_req_by_fw, version.fw_req_by_sw, version.api_req_by_sw
    )?;

    writeln!(out, "Network:")?;
    for (label, ip, netmask, mac) in [
        (
            "Ethernet",
            NetCommand::EthIp,
            NetCommand::EthNetmask,
            NetCommand::EthMac,
        ),
        (
            "USB",
            NetCommand::UsbIp,
            NetCommand::UsbNetmask,
            NetCommand::UsbMac,
        ),
    ] {
        let query = |cmd| match platform.query_net(pm, cmd) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Querying {:?}: {}", cmd, e);
                "-".to_string()
            }
        };
        writeln!(
            out,
            "  {:<15} {}/{} ({})",
            format!("{}:", label),
            query(ip),
            query(netmask),
            query(mac)
        )?;
    }

    let installed = platform.apps(pm)?;
    let licensed = platform.licensed_apps(pm)?;
    writeln!(out, "Installed apps:   {}", installed)?;
    writeln!(out, "Licensed apps:    {}", licensed)?;

    for app in installed.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        writeln!(out, "Application {}", app)?;
        match platform.app_version(pm, app) {
            Ok(v) => writeln!(out, "  Firmware:       {}", v.firmware)?,
            Err(e) => log::debug!("Version of {}: {}", app, e),
        }
        let features = match platform.features(pm, app) {
            Ok(features) => features,
            Err(e) => {
                writeln!(out, "  Not licensed ({})", e)?;
                continue;
            }
        };
        for feature in features.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let value = platform.feature_value(pm, app, feature)?;
            let description = platform.feature_description(pm, app, feature)?;
            writeln!(out, "  {} = {} ({})", feature, value, description)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{run, ADDR};
    use crate::config::Config;
    use promira_dummy::{Dummy, DummyConfig, DummyDevice};

    #[test]
    fn test_default_platform() {
        let dummy = Dummy::new_default();
        let text = run(&dummy, &Config::default(), |ctx, out| run_info(ctx, out, ADDR));
        let expected = "\
Promira platform 192.168.11.240
  Serial number:  2005-000123
  Software:       1.60
  Firmware:       1.60
  Hardware:       1.00
  Build:          2022-10-31 #3
  Requires:       software >= 1.40, firmware >= 1.40, API >= 1.40
Network:
  Ethernet:       192.168.11.240/255.255.255.0 (00:0e:ba:00:00:01)
  USB:            10.1.0.1/255.255.255.0 (00:0e:ba:00:00:02)
Installed apps:   com.totalphase.promact_is
Licensed apps:    com.totalphase.promact_is
Application com.totalphase.promact_is
  Firmware:       1.60
  SPI_MAX_BITRATE = 80000 (Maximum SPI master bitrate in kHz)
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_unlicensed_app() {
        let dummy = Dummy::new(DummyConfig {
            devices: vec![DummyDevice {
                licensed_apps: vec![],
                ..DummyDevice::default()
            }],
            ..DummyConfig::default()
        });
        let text = run(&dummy, &Config::default(), |ctx, out| run_info(ctx, out, ADDR));
        assert!(text.contains("Licensed apps:    \n"));
        assert!(text.contains("  Not licensed ("));
    }

    #[test]
    fn test_unknown_address() {
        let dummy = Dummy::new_default();
        let (platform, app) = (dummy.platform(), dummy.app());
        let config = Config::default();
        let ctx = Context {
            platform: &platform,
            app: &app,
            config: &config,
        };
        let err = run_info(&ctx, &mut Vec::new(), "10.9.9.9").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Unable to open Promira platform on 10.9.9.9\n"));
    }
}
