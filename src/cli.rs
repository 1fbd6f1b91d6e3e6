//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a hex or decimal value that must fit in a u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value {} out of range (0-255)", value))
}

/// Parse a hex or decimal value that must fit in a u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let value = parse_hex_u32(s)?;
    u16::try_from(value).map_err(|_| format!("Value {} out of range (0-65535)", value))
}

/// Parse an SPI clock mode (0-3)
fn parse_spi_mode(s: &str) -> Result<promira_core::SpiMode, String> {
    let value = parse_hex_u8(s)?;
    promira_core::SpiMode::try_from(value)
}

/// Parse an SPI I/O mode (0 standard, 2 dual, 4 quad)
fn parse_io_mode(s: &str) -> Result<promira_core::SpiIoMode, String> {
    let value = parse_hex_u8(s)?;
    promira_core::SpiIoMode::try_from(value)
}

#[derive(Parser)]
#[command(name = "promira")]
#[command(author, version, about = "Promira host adapter sample tools", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML format)
    /// Defaults to ./promira.toml, ~/.config/promira/promira.toml, /etc/promira/promira.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the vendor libraries (promira, promact_is)
    #[arg(long, global = true)]
    pub library_dir: Option<PathBuf>,

    /// Backend used to reach the platform
    #[arg(long, value_enum, default_value_t = Backend::Native, global = true)]
    pub backend: Backend,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where API calls go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Vendor shared libraries, loaded on first use
    Native,
    /// In-memory emulated platform at 192.168.11.240
    Dummy,
}

/// EEPROM operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EepromOp {
    /// Dump LENGTH bytes starting at OFFSET
    Read,
    /// Write a counting pattern
    Write,
    /// Write zeroes
    Zero,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List Promira platforms on the network
    Detect,

    /// Show versions, licences and network settings of a platform
    Info {
        /// Network address of the platform (default: `address` from the config file)
        address: Option<String>,
    },

    /// Exercise the GPIO lines
    Gpio {
        /// Network address of the platform (default: `address` from the config file)
        address: Option<String>,
    },

    /// Run a light sequence on an I2C I/O expander at 0x38
    Lights {
        /// Network address of the platform (default: `address` from the config file)
        address: Option<String>,
    },

    /// Read or write an AT24C02 I2C EEPROM
    I2cEeprom {
        /// Network address of the platform
        address: String,

        /// I2C bitrate in kHz
        #[arg(value_parser = parse_hex_u16)]
        bitrate: u16,

        /// Operation
        #[arg(value_enum)]
        command: EepromOp,

        /// EEPROM slave address (hex or decimal, e.g. 0x50)
        #[arg(value_parser = parse_hex_u16)]
        slave: u16,

        /// First byte to access
        #[arg(value_parser = parse_hex_u8)]
        offset: u8,

        /// Number of bytes
        #[arg(value_parser = parse_hex_u16)]
        length: u16,
    },

    /// Read or write an AT25080A SPI EEPROM
    SpiEeprom {
        /// Network address of the platform
        address: String,

        /// SPI bitrate in kHz
        #[arg(value_parser = parse_hex_u32)]
        bitrate: u32,

        /// Operation
        #[arg(value_enum)]
        command: EepromOp,

        /// SPI clock mode (0-3)
        #[arg(value_parser = parse_spi_mode)]
        mode: promira_core::SpiMode,

        /// First byte to access
        #[arg(value_parser = parse_hex_u16)]
        offset: u16,

        /// Number of bytes
        #[arg(value_parser = parse_hex_u16)]
        length: u16,
    },

    /// Send a file to an I2C slave
    I2cFile {
        /// Network address of the platform
        address: String,

        /// Target slave address
        #[arg(value_parser = parse_hex_u16)]
        slave: u16,

        /// Data to send to the downstream I2C device
        file: PathBuf,
    },

    /// Send a file over SPI and dump what comes back
    SpiFile {
        /// Network address of the platform
        address: String,

        /// I/O mode: 0 - standard, 2 - dual, 4 - quad
        #[arg(value_parser = parse_io_mode)]
        io: promira_core::SpiIoMode,

        /// Data to send to the downstream SPI device
        file: PathBuf,
    },

    /// Act as an I2C slave and dump the traffic
    I2cSlave {
        /// Network address of the platform
        address: String,

        /// Slave address for this device
        #[arg(value_parser = parse_hex_u16)]
        slave: u16,

        /// Time to block until the first packet is received (-1: forever)
        #[arg(allow_hyphen_values = true)]
        timeout_ms: i32,
    },

    /// Act as an SPI slave and dump the traffic
    SpiSlave {
        /// Network address of the platform
        address: String,

        /// I/O mode: 0 - standard, 2 - dual, 4 - quad
        #[arg(value_parser = parse_io_mode)]
        io: promira_core::SpiIoMode,

        /// Time to block until the first packet is received (-1: forever)
        #[arg(allow_hyphen_values = true)]
        timeout_ms: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_hex_arguments() {
        let cli = Cli::try_parse_from([
            "promira", "i2c-eeprom", "10.0.0.2", "400", "read", "0x50", "0x10", "32",
        ])
        .unwrap();
        match cli.command {
            Commands::I2cEeprom {
                bitrate,
                command,
                slave,
                offset,
                length,
                ..
            } => {
                assert_eq!(bitrate, 400);
                assert_eq!(command, EepromOp::Read);
                assert_eq!(slave, 0x50);
                assert_eq!(offset, 0x10);
                assert_eq!(length, 32);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_negative_timeout_and_backend() {
        let cli = Cli::try_parse_from([
            "promira", "--backend", "dummy", "i2c-slave", "10.0.0.2", "0x40", "-1",
        ])
        .unwrap();
        assert_eq!(cli.backend, Backend::Dummy);
        assert!(matches!(
            cli.command,
            Commands::I2cSlave { timeout_ms: -1, .. }
        ));
    }

    #[test]
    fn test_rejects_bad_modes() {
        assert!(Cli::try_parse_from(["promira", "spi-file", "10.0.0.2", "3", "f.bin"]).is_err());
        assert!(Cli::try_parse_from([
            "promira", "spi-eeprom", "10.0.0.2", "1000", "read", "4", "0", "16"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "promira", "i2c-eeprom", "10.0.0.2", "100", "erase", "0x50", "0", "16"
        ])
        .is_err());
    }
}
