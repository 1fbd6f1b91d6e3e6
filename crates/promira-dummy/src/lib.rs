//! promira-dummy - In-memory Promira platform emulator for testing
//!
//! This crate emulates one or more Promira platforms running the promact_is
//! application, so the sample commands can be exercised without hardware or
//! vendor libraries. The emulated adapter has these targets wired up:
//!
//! - an AT24C02-style I2C EEPROM and a PCA9554-style I/O expander
//! - an AT25080A-style SPI EEPROM on slave select 0
//! - 16 GPIO lines with a passive pull-up on GPIO2
//!
//! Slave mode traffic and GPIO input changes are scripted from tests.
//! Nothing here really sleeps; requested sleeps are only counted.
//!
//! ```ignore
//! use promira_dummy::Dummy;
//!
//! let dummy = Dummy::new_default();
//! let session = Session::open(&dummy.platform(), &dummy.app(), "192.168.11.240")?;
//! ```

#![warn(rust_2018_idioms)]

mod app;
mod gpio;
pub mod i2c;
mod platform;
mod queue;
mod slave;
pub mod spi;

pub use app::DummyApp;
pub use platform::DummyPlatform;
pub use slave::{I2cMasterAction, SpiMasterAction};

use gpio::Gpio;
use i2c::{At24c02, I2cBus, I2cTransfer, Pca9554};
use promira_core::{
    AppConfig, AppVersion, BitOrder, LoadFlags, NetCommand, PlatformStatus, PromiraVersion,
    Pullup, SpiMode, TargetPower, Version, PROMACT_IS_APP,
};
use queue::{Collect, Queue};
use slave::{I2cSlave, SpiSlave};
use spi::{At25080a, SpiBus};
use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One emulated Promira platform
#[derive(Debug, Clone)]
pub struct DummyDevice {
    /// Network address
    pub address: Ipv4Addr,
    /// Unique ID (serial number as an integer)
    pub unique_id: u32,
    /// Held by another host; shows up in discovery but cannot be opened
    pub in_use: bool,
    /// Installed applications
    pub apps: Vec<String>,
    /// Licensed applications
    pub licensed_apps: Vec<String>,
    /// Version matrix reported by the platform
    pub version: PromiraVersion,
    /// Firmware version of each installed application
    pub app_firmware: Version,
    /// Licensed features: `(app, feature, value, description)`
    pub features: Vec<(String, String, String, String)>,
    /// Licence text
    pub license: String,
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::new(192, 168, 11, 240),
            unique_id: 2_005_000_123,
            in_use: false,
            apps: vec![PROMACT_IS_APP.to_string()],
            licensed_apps: vec![PROMACT_IS_APP.to_string()],
            version: PromiraVersion {
                software: Version::new(1, 60),
                firmware: Version::new(1, 60),
                hardware: Version::new(1, 0),
                sw_req_by_fw: Version::new(1, 40),
                fw_req_by_sw: Version::new(1, 40),
                api_req_by_sw: Version::new(1, 40),
                build: 0x16_0a_1f_03,
            },
            app_firmware: Version::new(1, 60),
            features: vec![(
                PROMACT_IS_APP.to_string(),
                "SPI_MAX_BITRATE".to_string(),
                "80000".to_string(),
                "Maximum SPI master bitrate in kHz".to_string(),
            )],
            license: "dummy licence: promact_is".to_string(),
        }
    }
}

/// Configuration for the emulator
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Platforms visible on the emulated network
    pub devices: Vec<DummyDevice>,
    /// Version matrix reported by the promact_is application
    pub app_version: AppVersion,
    /// Address of the I2C EEPROM
    pub eeprom_addr: u16,
    /// Address of the I2C I/O expander
    pub expander_addr: u16,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            devices: vec![DummyDevice::default()],
            app_version: AppVersion {
                software: Version::new(1, 60),
                firmware: Version::new(1, 60),
                hardware: Version::new(1, 0),
                sw_req_by_fw: Version::new(1, 40),
                fw_req_by_sw: Version::new(1, 40),
                api_req_by_sw: Version::new(1, 40),
            },
            eeprom_addr: 0x50,
            expander_addr: 0x38,
        }
    }
}

/// Runtime state of one configured platform
#[derive(Debug)]
pub(crate) struct DeviceState {
    pub info: DummyDevice,
    pub loaded: Option<String>,
    pub net: BTreeMap<i32, String>,
    pub prefs: BTreeMap<String, String>,
}

impl DeviceState {
    fn new(info: DummyDevice) -> Self {
        let mut net = BTreeMap::new();
        net.insert(NetCommand::EthEnable as i32, "1".to_string());
        net.insert(NetCommand::EthIp as i32, info.address.to_string());
        net.insert(NetCommand::EthNetmask as i32, "255.255.255.0".to_string());
        net.insert(NetCommand::EthMac as i32, "00:0e:ba:00:00:01".to_string());
        net.insert(NetCommand::EthDhcpEnable as i32, "0".to_string());
        net.insert(NetCommand::UsbIp as i32, "10.1.0.1".to_string());
        net.insert(NetCommand::UsbNetmask as i32, "255.255.255.0".to_string());
        net.insert(NetCommand::UsbMac as i32, "00:0e:ba:00:00:02".to_string());
        Self {
            info,
            loaded: None,
            net,
            prefs: BTreeMap::new(),
        }
    }

    pub fn load(&mut self, app: &str, flags: LoadFlags) -> Result<(), PlatformStatus> {
        if !self.info.apps.iter().any(|a| a == app) {
            return Err(PlatformStatus::AppNotFound);
        }
        if !self.info.licensed_apps.iter().any(|a| a == app) {
            return Err(PlatformStatus::UnlicensedApp);
        }
        match &self.loaded {
            Some(running) if running != app && !flags.contains(LoadFlags::UNLOAD) => {
                Err(PlatformStatus::AppAlreadyLoaded)
            }
            _ => {
                log::debug!("dummy {}: loaded {}", self.info.address, app);
                self.loaded = Some(app.to_string());
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct Channel {
    pub conn: i32,
    pub config: AppConfig,
    /// Collect handles of asynchronously submitted queues
    pub pending: VecDeque<i32>,
}

/// SPI master settings
#[derive(Debug, Default)]
pub(crate) struct SpiMaster {
    pub bitrate_khz: u32,
    pub mode: SpiMode,
    pub bitorder: BitOrder,
    pub ss_polarity: u8,
    pub word_delay: u8,
    pub ss_enable: u8,
}

/// Everything the emulator knows, shared by the platform and app views
pub(crate) struct State {
    pub config: DummyConfig,
    pub devices: Vec<DeviceState>,
    next_handle: i32,
    /// Platform handle -> device index
    pub platforms: BTreeMap<i32, usize>,
    /// Connection handle -> device index
    pub connections: BTreeMap<i32, usize>,
    pub channels: BTreeMap<i32, Channel>,
    pub queues: BTreeMap<i32, Queue>,
    pub collects: BTreeMap<i32, Collect>,
    pub i2c: I2cBus,
    pub i2c_bitrate_khz: u16,
    pub i2c_bus_timeout_ms: u16,
    pub pullup: Pullup,
    pub power: TargetPower,
    pub level_shift: f32,
    pub i2c_slave: I2cSlave,
    pub spi: SpiBus,
    pub spi_master: SpiMaster,
    pub spi_slave: SpiSlave,
    pub gpio: Gpio,
    pub slept_ms: u64,
}

impl State {
    fn new(config: DummyConfig) -> Self {
        let mut i2c = I2cBus::default();
        i2c.attach(config.eeprom_addr, Box::new(At24c02::default()));
        i2c.attach(config.expander_addr, Box::new(Pca9554::default()));
        let mut spi = SpiBus::default();
        spi.attach(0, Box::new(At25080a::default()));

        Self {
            devices: config.devices.iter().cloned().map(DeviceState::new).collect(),
            config,
            next_handle: 1,
            platforms: BTreeMap::new(),
            connections: BTreeMap::new(),
            channels: BTreeMap::new(),
            queues: BTreeMap::new(),
            collects: BTreeMap::new(),
            i2c,
            i2c_bitrate_khz: 100,
            i2c_bus_timeout_ms: 200,
            pullup: Pullup::NONE,
            power: TargetPower::NONE,
            level_shift: 3.3,
            i2c_slave: I2cSlave::default(),
            spi,
            spi_master: SpiMaster::default(),
            spi_slave: SpiSlave::default(),
            gpio: Gpio::default(),
            slept_ms: 0,
        }
    }

    /// Handles are unique across every kind, so mixing them up is caught
    pub fn alloc_handle(&mut self) -> i32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Index of the configured device with this network address
    pub fn device_by_addr(&self, net_addr: &str) -> Option<usize> {
        let addr: Ipv4Addr = net_addr.trim().parse().ok()?;
        self.devices.iter().position(|d| d.info.address == addr)
    }
}

/// An emulated set of Promira platforms
///
/// Cloning is cheap; every clone and every view shares the same state.
#[derive(Clone)]
pub struct Dummy {
    state: Arc<Mutex<State>>,
}

impl Dummy {
    /// Create an emulator with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(config))),
        }
    }

    /// Create an emulator with one free platform at 192.168.11.240
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Platform management API view
    pub fn platform(&self) -> DummyPlatform {
        DummyPlatform::new(self.state.clone())
    }

    /// promact_is API view
    pub fn app(&self) -> DummyApp {
        DummyApp::new(self.state.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Contents of the I2C EEPROM
    pub fn i2c_eeprom(&self) -> Vec<u8> {
        let state = self.lock();
        state
            .i2c
            .target::<At24c02>(state.config.eeprom_addr)
            .map(|e| e.memory().to_vec())
            .unwrap_or_default()
    }

    /// Register writes seen by the I/O expander, in order
    pub fn expander_writes(&self) -> Vec<(u8, u8)> {
        let state = self.lock();
        state
            .i2c
            .target::<Pca9554>(state.config.expander_addr)
            .map(|e| e.writes().to_vec())
            .unwrap_or_default()
    }

    /// Every I2C master transfer so far
    pub fn i2c_log(&self) -> Vec<I2cTransfer> {
        self.lock().i2c.log().to_vec()
    }

    /// Contents of the SPI EEPROM
    pub fn spi_eeprom(&self) -> Vec<u8> {
        self.lock()
            .spi
            .target::<At25080a>(0)
            .map(|e| e.memory().to_vec())
            .unwrap_or_default()
    }

    /// Total milliseconds the host was asked to sleep
    pub fn slept_ms(&self) -> u64 {
        self.lock().slept_ms
    }

    /// Application currently running on the platform at `addr`
    pub fn loaded_app(&self, addr: Ipv4Addr) -> Option<String> {
        let state = self.lock();
        state
            .devices
            .iter()
            .find(|d| d.info.address == addr)
            .and_then(|d| d.loaded.clone())
    }

    /// Queue an action of the external I2C master
    pub fn push_i2c_master(&self, action: I2cMasterAction) {
        self.lock().i2c_slave.script.push_back(action);
    }

    /// Bytes sent to the external I2C master, one entry per master read
    pub fn i2c_slave_sent(&self) -> Vec<Vec<u8>> {
        self.lock().i2c_slave.sent.clone()
    }

    /// Queue an action of the external SPI master
    pub fn push_spi_master(&self, action: SpiMasterAction) {
        self.lock().spi_slave.script.push_back(action);
    }

    /// Drive the GPIO input levels
    pub fn set_gpio_levels(&self, levels: u32) {
        self.lock().gpio.levels = levels;
    }

    /// Queue an input change, seen by the next `gpio_change`
    pub fn push_gpio_change(&self, levels: u32) {
        self.lock().gpio.changes.push_back(levels);
    }

    /// Current GPIO direction and output registers
    pub fn gpio_outputs(&self) -> (u32, u32) {
        let state = self.lock();
        (state.gpio.direction, state.gpio.output)
    }
}

impl Default for Dummy {
    fn default() -> Self {
        Self::new_default()
    }
}

pub(crate) fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_attached() {
        let dummy = Dummy::new_default();
        assert_eq!(dummy.i2c_eeprom().len(), 256);
        assert_eq!(dummy.spi_eeprom().len(), 1024);
        assert!(dummy.expander_writes().is_empty());
        assert_eq!(dummy.slept_ms(), 0);
    }

    #[test]
    fn test_load_rules() {
        let mut device = DeviceState::new(DummyDevice {
            apps: vec![PROMACT_IS_APP.to_string(), "com.example.other".to_string()],
            ..Default::default()
        });
        assert_eq!(
            device.load("com.example.missing", LoadFlags::empty()),
            Err(PlatformStatus::AppNotFound)
        );
        assert_eq!(
            device.load("com.example.other", LoadFlags::empty()),
            Err(PlatformStatus::UnlicensedApp)
        );
        assert_eq!(device.load(PROMACT_IS_APP, LoadFlags::empty()), Ok(()));
        assert_eq!(device.load(PROMACT_IS_APP, LoadFlags::empty()), Ok(()));
    }

    #[test]
    fn test_handles_are_unique() {
        let mut state = State::new(DummyConfig::default());
        let a = state.alloc_handle();
        let b = state.alloc_handle();
        assert!(a > 0 && b > a);
        assert_eq!(state.device_by_addr("192.168.11.240"), Some(0));
        assert_eq!(state.device_by_addr("10.0.0.1"), None);
        assert_eq!(state.device_by_addr("not an address"), None);
    }
}
