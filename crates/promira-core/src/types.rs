//! Handles, flags and protocol enums shared by every backend

use bitflags::bitflags;
use core::fmt;
use std::net::Ipv4Addr;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i32);

        impl $name {
            /// Raw handle value passed to the vendor library
            pub const fn raw(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle! {
    /// Open Promira platform (management API)
    PlatformHandle
}
handle! {
    /// Connection to the promact_is application
    ConnectionHandle
}
handle! {
    /// Channel on an application connection
    ChannelHandle
}
handle! {
    /// Command queue created on a connection
    QueueHandle
}
handle! {
    /// Responses of a submitted queue, waiting to be collected
    CollectHandle
}

/// Device status bit reported by device discovery: held by another host
pub const DEVICE_NOT_FREE: u32 = 0x0000_0001;

/// A Promira platform found on the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// IPv4 address of the device
    pub address: Ipv4Addr,
    /// Unique ID (serial number as an integer), non-zero when valid
    pub unique_id: u32,
    /// Whether another host is connected to the device
    pub in_use: bool,
}

impl DeviceInfo {
    /// Build from the raw values of `pm_find_devices_ext`
    ///
    /// Addresses are packed little-endian: the first octet is in the low
    /// byte.
    pub fn from_raw(address: u32, unique_id: u32, status: u32) -> Self {
        Self {
            address: ipv4_from_raw(address),
            unique_id,
            in_use: status & DEVICE_NOT_FREE != 0,
        }
    }

    /// Serial number in the `NNNN-NNNNNN` form printed on the device label
    pub fn serial(&self) -> String {
        serial_string(self.unique_id)
    }
}

/// Format a unique ID as the `NNNN-NNNNNN` serial number
pub fn serial_string(unique_id: u32) -> String {
    format!("{:04}-{:06}", unique_id / 1_000_000, unique_id % 1_000_000)
}

/// Decode an address as packed by the discovery functions
pub fn ipv4_from_raw(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw.to_le_bytes())
}

/// Encode an address the way the discovery functions pack it
pub fn ipv4_to_raw(addr: Ipv4Addr) -> u32 {
    u32::from_le_bytes(addr.octets())
}

/// Network settings that can be queried or configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum NetCommand {
    /// Ethernet interface enable
    EthEnable = 0,
    /// Ethernet IP address
    EthIp = 1,
    /// Ethernet netmask
    EthNetmask = 2,
    /// Ethernet MAC address
    EthMac = 3,
    /// DHCP enable on Ethernet
    EthDhcpEnable = 4,
    /// Renew the DHCP lease
    EthDhcpRenew = 5,
    /// USB (Ethernet over USB) IP address
    UsbIp = 6,
    /// USB netmask
    UsbNetmask = 7,
    /// USB MAC address
    UsbMac = 8,
}

bitflags! {
    /// Flags for `pm_load_ext`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LoadFlags: i32 {
        /// Unload the running application before loading
        const UNLOAD = 0x01;
    }
}

bitflags! {
    /// Subsystems routed to the adapter pins
    ///
    /// The empty set hands every pin to GPIO.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AppConfig: i32 {
        /// SPI subsystem
        const SPI = 0x0000_0001;
        /// I2C subsystem
        const I2C = 0x0000_0010;
    }
}

impl AppConfig {
    /// Every pin controlled by the GPIO subsystem
    pub const GPIO: AppConfig = AppConfig::empty();
}

bitflags! {
    /// I2C transaction flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct I2cFlags: i32 {
        /// Use a 10-bit slave address
        const TEN_BIT_ADDR = 0x01;
        /// Combined format (repeated start)
        const COMBINED_FMT = 0x02;
        /// Do not issue a stop condition
        const NO_STOP = 0x04;
        /// First byte read is the remaining length
        const SIZED_READ = 0x10;
        /// Sized read with one extra byte (e.g. PEC)
        const SIZED_READ_EXTRA1 = 0x20;
    }
}

bitflags! {
    /// I2C pull-up resistors
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Pullup: u8 {
        /// SCL and SDA pull-ups
        const BOTH = 0x03;
    }
}

impl Pullup {
    /// No pull-ups
    pub const NONE: Pullup = Pullup::empty();
}

bitflags! {
    /// Target power pins
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TargetPower: u8 {
        /// Target power pin 1 at 5 V
        const TARGET1_5V = 0x01;
        /// Target power pin 2
        const TARGET2 = 0x02;
        /// Target power pin 1 at 3.3 V
        const TARGET1_3V = 0x05;
        /// Both power pins
        const BOTH = 0x03;
    }
}

impl TargetPower {
    /// Power pins off
    pub const NONE: TargetPower = TargetPower::empty();
}

/// Kind of command a queue carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModuleId {
    /// I2C active module
    I2cActive = 1,
    /// SPI active module
    SpiActive = 2,
    /// GPIO module
    Gpio = 3,
}

impl ModuleId {
    /// Look up a module from its raw id
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(ModuleId::I2cActive),
            2 => Some(ModuleId::SpiActive),
            3 => Some(ModuleId::Gpio),
            _ => None,
        }
    }
}

/// Type of a collected queue response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Command {
    /// I2C write
    I2cWrite = 100,
    /// I2C read
    I2cRead = 101,
    /// I2C queue delay
    I2cDelayMs = 102,
    /// SPI master output enable
    SpiOe = 200,
    /// SPI slave select
    SpiSs = 201,
    /// SPI delay in milliseconds
    SpiDelayMs = 202,
    /// SPI delay in clock cycles
    SpiDelayCycles = 203,
    /// SPI delay in nanoseconds
    SpiDelayNs = 204,
    /// SPI data read back during a write or read
    SpiRead = 205,
    /// GPIO direction
    GpioDirection = 300,
    /// GPIO get
    GpioGet = 301,
    /// GPIO set
    GpioSet = 302,
    /// GPIO change wait
    GpioChange = 303,
    /// GPIO delay
    GpioDelayMs = 304,
}

impl Command {
    /// Look up a response type from its raw code
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            100 => Command::I2cWrite,
            101 => Command::I2cRead,
            102 => Command::I2cDelayMs,
            200 => Command::SpiOe,
            201 => Command::SpiSs,
            202 => Command::SpiDelayMs,
            203 => Command::SpiDelayCycles,
            204 => Command::SpiDelayNs,
            205 => Command::SpiRead,
            300 => Command::GpioDirection,
            301 => Command::GpioGet,
            302 => Command::GpioSet,
            303 => Command::GpioChange,
            304 => Command::GpioDelayMs,
            _ => return None,
        })
    }
}

/// One response taken from a collect handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Raw response type (see [`Command`])
    pub command: i32,
    /// Length of the response payload
    pub length: i32,
    /// Result of the command on the device
    pub result: i32,
}

impl Response {
    /// Typed response kind, if known
    pub fn kind(&self) -> Option<Command> {
        Command::from_code(self.command)
    }
}

/// SPI clock polarity/phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0 = 0,
    /// CPOL=0, CPHA=1
    Mode1 = 1,
    /// CPOL=1, CPHA=0
    Mode2 = 2,
    /// CPOL=1, CPHA=1
    Mode3 = 3,
}

impl TryFrom<u8> for SpiMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SpiMode::Mode0),
            1 => Ok(SpiMode::Mode1),
            2 => Ok(SpiMode::Mode2),
            3 => Ok(SpiMode::Mode3),
            _ => Err(format!("Invalid SPI mode {} (expected 0-3)", value)),
        }
    }
}

/// SPI bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum BitOrder {
    /// Most significant bit first
    #[default]
    Msb = 0,
    /// Least significant bit first
    Lsb = 1,
}

/// SPI data line mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum SpiIoMode {
    /// Single data line each way
    #[default]
    Standard = 0,
    /// Two bidirectional data lines
    Dual = 2,
    /// Four bidirectional data lines
    Quad = 4,
}

impl SpiIoMode {
    /// Number of data lines
    pub fn width(self) -> u32 {
        match self {
            SpiIoMode::Standard => 1,
            SpiIoMode::Dual => 2,
            SpiIoMode::Quad => 4,
        }
    }
}

impl TryFrom<u8> for SpiIoMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SpiIoMode::Standard),
            2 => Ok(SpiIoMode::Dual),
            4 => Ok(SpiIoMode::Quad),
            _ => Err(format!(
                "Invalid I/O mode {} (0 - standard, 2 - dual, 4 - quad)",
                value
            )),
        }
    }
}

/// SPI slave protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum SlaveMode {
    /// Standard SPI slave
    #[default]
    Standard = 0,
}

bitflags! {
    /// Options for the standard SPI slave
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiSlaveFlags: u8 {
        /// Slave ignores slave select
        const NO_SS = 0x01;
        /// Multi-I/O applies to reads (default: writes)
        const MULTI_IO_READ = 0x02;
    }
}

/// Result of polling the I2C slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cSlaveEvent {
    /// Nothing happened before the timeout
    NoData,
    /// The master wrote to us; fetch with `i2c_slave_read`
    Read,
    /// The master read from us; fetch stats with `i2c_slave_write_stats`
    Write,
    /// Data was lost
    DataLost,
    /// Unrecognised poll result
    Other(i32),
}

impl I2cSlaveEvent {
    /// Decode the raw poll result
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0x00 => I2cSlaveEvent::NoData,
            0x01 => I2cSlaveEvent::Read,
            0x02 => I2cSlaveEvent::Write,
            0x80 => I2cSlaveEvent::DataLost,
            other => I2cSlaveEvent::Other(other),
        }
    }

    /// Encode as the raw poll result
    pub fn to_raw(self) -> i32 {
        match self {
            I2cSlaveEvent::NoData => 0x00,
            I2cSlaveEvent::Read => 0x01,
            I2cSlaveEvent::Write => 0x02,
            I2cSlaveEvent::DataLost => 0x80,
            I2cSlaveEvent::Other(raw) => raw,
        }
    }
}

/// Result of polling the SPI slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiSlaveEvent {
    /// Nothing happened before the timeout
    NoData,
    /// A transfer is waiting; fetch with `spi_slave_read`
    Data,
    /// Transfers were dropped because the device queue was full
    DataLost,
    /// Unrecognised poll result
    Other(i32),
}

impl SpiSlaveEvent {
    /// Decode the raw poll result
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0x00 => SpiSlaveEvent::NoData,
            0x01 => SpiSlaveEvent::Data,
            0x80 => SpiSlaveEvent::DataLost,
            other => SpiSlaveEvent::Other(other),
        }
    }

    /// Encode as the raw poll result
    pub fn to_raw(self) -> i32 {
        match self {
            SpiSlaveEvent::NoData => 0x00,
            SpiSlaveEvent::Data => 0x01,
            SpiSlaveEvent::DataLost => 0x80,
            SpiSlaveEvent::Other(raw) => raw,
        }
    }
}

/// Details of one SPI slave transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpiSlaveReadInfo {
    /// Bits clocked in from the master
    pub in_data_bits: u32,
    /// Bits clocked out to the master
    pub out_data_bits: u32,
    /// Header bits
    pub header_bits: u8,
    /// Response id used for this transfer
    pub resp_id: u8,
    /// Slave select lines asserted during the transfer
    pub ss_mask: u8,
    /// Set on the last chunk of a transfer split by the host read size
    pub is_last: bool,
}
