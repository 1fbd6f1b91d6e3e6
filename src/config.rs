//! Configuration file
//!
//! Optional TOML file with defaults for the sample commands:
//!
//! ```toml
//! library_dir = "/opt/totalphase/lib"
//! address = "192.168.11.240"
//!
//! [i2c]
//! bitrate_khz = 400
//! bus_timeout_ms = 150
//!
//! [spi]
//! bitrate_khz = 20000
//! ss_mask = 0x1
//! ```
//!
//! Numbers may be given as integers or as `"0x.."` strings.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file in every search directory
const FILE_NAME: &str = "promira.toml";

/// Errors from loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the vendor libraries
    pub library_dir: Option<PathBuf>,
    /// Platform address used when a command takes no address
    pub address: Option<String>,
    /// I2C defaults
    pub i2c: I2cConfig,
    /// SPI defaults
    pub spi: SpiConfig,
}

/// `[i2c]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct I2cConfig {
    #[serde(deserialize_with = "deserialize_number")]
    pub bitrate_khz: Option<u16>,
    #[serde(deserialize_with = "deserialize_number")]
    pub bus_timeout_ms: Option<u16>,
}

/// `[spi]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpiConfig {
    #[serde(deserialize_with = "deserialize_number")]
    pub bitrate_khz: Option<u32>,
    #[serde(deserialize_with = "deserialize_number")]
    pub ss_mask: Option<u8>,
}

/// Deserialize a number that can be hex (0x...) or decimal
fn deserialize_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: TryFrom<u64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u64),
        Str(String),
    }

    let value = match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => n,
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom)?,
    };
    T::try_from(value)
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("value {} out of range", value)))
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

impl Config {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the configuration
    ///
    /// An explicit path must exist. Otherwise the first file found in
    /// [`search_paths`] is used; no file at all gives the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in search_paths() {
            if path.is_file() {
                log::debug!("Using config {}", path.display());
                return Self::from_file(&path);
            }
        }
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Address from the command line, or the configured default
    pub fn address(&self, arg: Option<String>) -> Result<String, String> {
        arg.or_else(|| self.address.clone()).ok_or_else(|| {
            "No platform address given and no `address` in the config file".to_string()
        })
    }
}

/// Candidate configuration files, most specific first
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(FILE_NAME)];
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
    if let Some(dir) = config_home {
        paths.push(dir.join("promira").join(FILE_NAME));
    }
    paths.push(Path::new("/etc/promira").join(FILE_NAME));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(
            r#"
            library_dir = "/opt/totalphase"
            address = "10.0.0.2"

            [i2c]
            bitrate_khz = 400
            bus_timeout_ms = "0x96"

            [spi]
            bitrate_khz = 20000
            ss_mask = "0x1"
            "#,
        )
        .unwrap();
        assert_eq!(config.library_dir, Some(PathBuf::from("/opt/totalphase")));
        assert_eq!(config.i2c.bitrate_khz, Some(400));
        assert_eq!(config.i2c.bus_timeout_ms, Some(150));
        assert_eq!(config.spi.ss_mask, Some(1));
        assert_eq!(config.address(None).unwrap(), "10.0.0.2");
        assert_eq!(config.address(Some("10.0.0.3".into())).unwrap(), "10.0.0.3");
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.library_dir.is_none());
        assert!(config.spi.bitrate_khz.is_none());
        assert!(config.address(None).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_toml_str("[spi]\nss_mask = 256").is_err());
        assert!(Config::from_toml_str("[i2c]\nbitrate_khz = \"fast\"").is_err());
        assert!(Config::from_toml_str("unknown = 1").is_err());
    }

    #[test]
    fn test_explicit_file() {
        let path = std::env::temp_dir().join("promira-config-test.toml");
        fs::write(&path, "address = \"192.168.11.240\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.address.as_deref(), Some("192.168.11.240"));
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_search_order() {
        let paths = search_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from("promira.toml")));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/promira/promira.toml"))
        );
    }
}
