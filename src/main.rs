//! promira - Promira host adapter sample tools
//!
//! Each subcommand is one of the classic Promira sample programs (device
//! discovery, GPIO, I2C and SPI EEPROMs, file transfers, slave mode dumps)
//! written against the API traits of `promira-core`.
//!
//! # Backends
//!
//! - **native**: the vendor `promira` and `promact_is` shared libraries,
//!   located and bound on first use
//! - **dummy**: an in-memory platform at 192.168.11.240 with an I2C EEPROM,
//!   an I/O expander and an SPI EEPROM attached
//!
//! The same command code runs on both.

mod cli;
mod commands;
mod config;
mod hexdump;
mod session;

use clap::Parser;
use cli::{Backend, Cli, Commands};
use commands::Context;
use config::Config;
use std::io::{self, Write};
use std::path::Path;
#[cfg(feature = "native")]
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage errors exit with 1; help and version with 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let library_dir = cli.library_dir.clone().or_else(|| config.library_dir.clone());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match cli.backend {
        Backend::Native => run_native(cli.command, &config, library_dir.as_deref(), &mut out),
        Backend::Dummy => run_dummy(cli.command, &config, &mut out),
    };
    out.flush()?;

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "native")]
fn run_native(
    command: Commands,
    config: &Config,
    library_dir: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = library_dir {
        let dir = absolute_dir(dir)?;
        log::debug!("Loading vendor libraries from {}", dir.display());
        promira_ffi::set_library_dir(&dir);
    }

    let platform = promira_ffi::NativePlatform::new();
    let app = promira_ffi::NativeApp::new();
    let ctx = Context {
        platform: &platform,
        app: &app,
        config,
    };
    let result = run_command(&ctx, command, out);

    if let Some(version) = promira_ffi::platform_library_version() {
        log::debug!("promira library v{}", version.software);
    }
    if let Some(version) = promira_ffi::app_library_version() {
        log::debug!("promact_is library v{}", version.software);
    }
    result
}

#[cfg(not(feature = "native"))]
fn run_native(
    _command: Commands,
    _config: &Config,
    _library_dir: Option<&Path>,
    _out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("Native backend not compiled in (enable the `native` feature)".into())
}

#[cfg(feature = "dummy")]
fn run_dummy(
    command: Commands,
    config: &Config,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let dummy = promira_dummy::Dummy::new_default();
    let platform = dummy.platform();
    let app = dummy.app();
    let ctx = Context {
        platform: &platform,
        app: &app,
        config,
    };
    run_command(&ctx, command, out)
}

#[cfg(not(feature = "dummy"))]
fn run_dummy(
    _command: Commands,
    _config: &Config,
    _out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("Dummy backend not compiled in (enable the `dummy` feature)".into())
}

/// The library locator wants an absolute directory
#[cfg(feature = "native")]
fn absolute_dir(dir: &Path) -> io::Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

fn run_command(
    ctx: &Context<'_>,
    command: Commands,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Detect => commands::run_detect(ctx, out),
        Commands::Info { address } => {
            let address = ctx.config.address(address)?;
            commands::run_info(ctx, out, &address)
        }
        Commands::Gpio { address } => {
            let address = ctx.config.address(address)?;
            commands::run_gpio(ctx, out, &address)
        }
        Commands::Lights { address } => {
            let address = ctx.config.address(address)?;
            commands::run_lights(ctx, out, &address)
        }
        Commands::I2cEeprom {
            address,
            bitrate,
            command,
            slave,
            offset,
            length,
        } => commands::run_i2c_eeprom(ctx, out, &address, bitrate, command, slave, offset, length),
        Commands::SpiEeprom {
            address,
            bitrate,
            command,
            mode,
            offset,
            length,
        } => commands::run_spi_eeprom(ctx, out, &address, bitrate, command, mode, offset, length),
        Commands::I2cFile {
            address,
            slave,
            file,
        } => commands::run_i2c_file(ctx, out, &address, slave, &file),
        Commands::SpiFile { address, io, file } => {
            commands::run_spi_file(ctx, out, &address, io, &file)
        }
        Commands::I2cSlave {
            address,
            slave,
            timeout_ms,
        } => commands::run_i2c_slave(ctx, out, &address, slave, timeout_ms),
        Commands::SpiSlave {
            address,
            io,
            timeout_ms,
        } => commands::run_spi_slave(ctx, out, &address, io, timeout_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promira_dummy::Dummy;

    fn run_args(dummy: &Dummy, config: &Config, args: &[&str]) -> String {
        let cli = Cli::try_parse_from(args).unwrap();
        let (platform, app) = (dummy.platform(), dummy.app());
        let ctx = Context {
            platform: &platform,
            app: &app,
            config,
        };
        let mut out = Vec::new();
        run_command(&ctx, cli.command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_address_from_config() {
        let dummy = Dummy::new_default();
        let config = Config::from_toml_str("address = \"192.168.11.240\"").unwrap();
        let text = run_args(&dummy, &config, &["promira", "lights"]);
        assert_eq!(text, "Bitrate set to 100 kHz\n");
    }

    #[test]
    fn test_missing_address() {
        let dummy = Dummy::new_default();
        let cli = Cli::try_parse_from(["promira", "gpio"]).unwrap();
        let (platform, app) = (dummy.platform(), dummy.app());
        let config = Config::default();
        let ctx = Context {
            platform: &platform,
            app: &app,
            config: &config,
        };
        assert!(run_command(&ctx, cli.command, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_eeprom_round_trip_through_cli() {
        let dummy = Dummy::new_default();
        let config = Config::default();
        run_args(
            &dummy,
            &config,
            &["promira", "i2c-eeprom", "192.168.11.240", "100", "write", "0x50", "0", "8"],
        );
        let text = run_args(
            &dummy,
            &config,
            &["promira", "i2c-eeprom", "192.168.11.240", "100", "read", "0x50", "0", "8"],
        );
        assert!(text.ends_with("0000:  00 01 02 03 04 05 06 07  \n"));
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_absolute_library_dir() {
        assert_eq!(
            absolute_dir(Path::new("/opt/lib")).unwrap(),
            PathBuf::from("/opt/lib")
        );
        assert!(absolute_dir(Path::new("lib")).unwrap().is_absolute());
    }
}
