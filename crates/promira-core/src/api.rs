//! API traits
//!
//! One method per vendor entry point. The sample commands only ever see
//! these traits; whether a call ends up in the vendor shared library or in
//! the in-memory emulator is decided when the backend is constructed.
//!
//! All traits are object safe so callers can work with `&dyn PlatformApi`
//! and `&dyn Promact`.

use crate::error::Result;
use crate::types::*;
use crate::version::{AppVersion, PromiraVersion};
use std::net::Ipv4Addr;

/// Platform management API (`pm_*`)
pub trait PlatformApi {
    /// Addresses of the Promira platforms on the network
    fn find_devices(&self) -> Result<Vec<Ipv4Addr>>;

    /// Platforms on the network with their unique IDs and in-use status
    fn find_devices_ext(&self) -> Result<Vec<DeviceInfo>>;

    /// Open the platform at `net_addr`
    fn open(&self, net_addr: &str) -> Result<PlatformHandle>;

    /// Close an open platform
    fn close(&self, pm: PlatformHandle) -> Result<()>;

    /// Version matrix of the platform
    ///
    /// For an invalid handle only the software and required API versions
    /// are meaningful.
    fn version(&self, pm: PlatformHandle) -> Result<PromiraVersion>;

    /// Version matrix of an installed application (only `firmware` is set)
    fn app_version(&self, pm: PlatformHandle, app_name: &str) -> Result<PromiraVersion>;

    /// Sleep on the host
    fn sleep_ms(&self, milliseconds: u32) -> Result<()>;

    /// Read a network setting
    fn query_net(&self, pm: PlatformHandle, cmd: NetCommand) -> Result<String>;

    /// Change a network setting
    fn config_net(&self, pm: PlatformHandle, cmd: NetCommand, data: &str) -> Result<()>;

    /// Read a preference
    fn query_pref(&self, pm: PlatformHandle, key: &str) -> Result<String>;

    /// Change a preference
    fn config_pref(&self, pm: PlatformHandle, key: &str, data: &str) -> Result<()>;

    /// Comma separated list of installed applications
    fn apps(&self, pm: PlatformHandle) -> Result<String>;

    /// Comma separated list of licensed applications
    fn licensed_apps(&self, pm: PlatformHandle) -> Result<String>;

    /// Start an application on the platform
    fn load(&self, pm: PlatformHandle, app_name: &str) -> Result<()>;

    /// Start an application with load flags
    fn load_ext(&self, pm: PlatformHandle, app_name: &str, flags: LoadFlags) -> Result<()>;

    /// Network address the handle was opened with
    fn net_addr(&self, pm: PlatformHandle) -> Option<String>;

    /// Unique ID of the platform
    fn unique_id(&self, pm: PlatformHandle) -> Result<u32>;

    /// Description of a platform status code
    fn status_string(&self, status: i32) -> Option<String>;

    /// Reset the platform to factory state
    fn init_device(&self, pm: PlatformHandle) -> Result<()>;

    /// Licence text installed on the platform
    fn read_license(&self, pm: PlatformHandle) -> Result<String>;

    /// Comma separated list of features licensed for an application
    fn features(&self, pm: PlatformHandle, app: &str) -> Result<String>;

    /// Value of one licensed feature
    fn feature_value(&self, pm: PlatformHandle, app: &str, feature: &str) -> Result<String>;

    /// Description of one licensed feature
    fn feature_description(&self, pm: PlatformHandle, app: &str, feature: &str)
        -> Result<String>;
}

/// General, channel and queue part of the promact_is API (`ps_app_*`,
/// `ps_channel_*`, `ps_queue_*`, `ps_collect_*`)
pub trait AppApi {
    /// Connect to the application running on the platform at `net_addr`
    fn connect(&self, net_addr: &str) -> Result<ConnectionHandle>;

    /// Drop a connection
    fn disconnect(&self, conn: ConnectionHandle) -> Result<()>;

    /// Version matrix of the application
    fn app_version(&self, channel: ChannelHandle) -> Result<AppVersion>;

    /// Sleep on the host
    fn sleep_ms(&self, milliseconds: u32) -> Result<()>;

    /// Description of an application status code
    fn status_string(&self, status: i32) -> Option<String>;

    /// Route subsystems to the adapter pins, returns the active configuration
    fn configure(&self, channel: ChannelHandle, config: AppConfig) -> Result<AppConfig>;

    /// Open a channel on a connection
    fn channel_open(&self, conn: ConnectionHandle) -> Result<ChannelHandle>;

    /// Close a channel
    fn channel_close(&self, channel: ChannelHandle) -> Result<()>;

    /// Queues submitted on the channel and not yet completed
    fn channel_submitted_count(&self, channel: ChannelHandle) -> Result<usize>;

    /// Queues completed on the channel and not yet collected
    fn channel_uncollected_count(&self, channel: ChannelHandle) -> Result<usize>;

    /// Create a queue for commands of one module
    fn queue_create(&self, conn: ConnectionHandle, module: ModuleId) -> Result<QueueHandle>;

    /// Destroy a queue
    fn queue_destroy(&self, queue: QueueHandle) -> Result<()>;

    /// Remove every command from a queue
    fn queue_clear(&self, queue: QueueHandle) -> Result<()>;

    /// Append a delay
    fn queue_delay_ms(&self, queue: QueueHandle, milliseconds: i32) -> Result<()>;

    /// Append a synchronisation point
    fn queue_sync(&self, queue: QueueHandle) -> Result<()>;

    /// Number of commands in a queue
    fn queue_size(&self, queue: QueueHandle) -> Result<usize>;

    /// Run a queue and wait for it; responses are read from the returned handle
    fn queue_submit(
        &self,
        queue: QueueHandle,
        channel: ChannelHandle,
        ctrl_id: u8,
    ) -> Result<CollectHandle>;

    /// Run a queue without waiting
    fn queue_async_submit(&self, queue: QueueHandle, channel: ChannelHandle, ctrl_id: u8)
        -> Result<()>;

    /// Wait for the next asynchronously submitted queue
    fn queue_async_collect(&self, channel: ChannelHandle) -> Result<CollectHandle>;

    /// Next response of a submitted queue
    ///
    /// Returns `Ok(None)` once every response has been consumed.
    fn collect_resp(&self, collect: CollectHandle, timeout_ms: i32) -> Result<Option<Response>>;

    /// Switch target power pins, returns the resulting state
    fn phy_target_power(&self, channel: ChannelHandle, power: TargetPower)
        -> Result<TargetPower>;

    /// Set the I/O level shifter voltage, returns the applied level
    fn phy_level_shift(&self, channel: ChannelHandle, level: f32) -> Result<f32>;
}

/// I2C part of the promact_is API (`ps_i2c_*`)
pub trait I2cApi {
    /// Free a bus held low by a slave
    fn i2c_free_bus(&self, channel: ChannelHandle) -> Result<()>;

    /// Set the bus lock timeout, returns the applied value
    fn i2c_bus_timeout(&self, channel: ChannelHandle, timeout_ms: u16) -> Result<u16>;

    /// Set the bitrate, returns the applied value
    fn i2c_bitrate(&self, channel: ChannelHandle, bitrate_khz: u16) -> Result<u16>;

    /// Switch the pull-up resistors, returns the resulting state
    fn i2c_pullup(&self, channel: ChannelHandle, pullup: Pullup) -> Result<Pullup>;

    /// Read from a slave, returns the number of bytes read
    ///
    /// Zero bytes means the slave did not acknowledge its address.
    fn i2c_read(
        &self,
        channel: ChannelHandle,
        slave_addr: u16,
        flags: I2cFlags,
        buf: &mut [u8],
    ) -> Result<usize>;

    /// Write to a slave, returns the number of bytes written
    ///
    /// Zero bytes means the slave did not acknowledge its address.
    fn i2c_write(
        &self,
        channel: ChannelHandle,
        slave_addr: u16,
        flags: I2cFlags,
        data: &[u8],
    ) -> Result<usize>;

    /// Queue a read
    fn queue_i2c_read(
        &self,
        queue: QueueHandle,
        slave_addr: u16,
        flags: I2cFlags,
        num_bytes: u16,
    ) -> Result<()>;

    /// Queue a write
    fn queue_i2c_write(
        &self,
        queue: QueueHandle,
        slave_addr: u16,
        flags: I2cFlags,
        data: &[u8],
    ) -> Result<()>;

    /// Data of the current queued read response
    fn collect_i2c_read(&self, collect: CollectHandle, buf: &mut [u8]) -> Result<usize>;

    /// Byte count of the current queued write response
    fn collect_i2c_write(&self, collect: CollectHandle) -> Result<usize>;

    /// Act as a slave at `addr`
    fn i2c_slave_enable(
        &self,
        channel: ChannelHandle,
        addr: u16,
        max_tx_bytes: u16,
        max_rx_bytes: u16,
    ) -> Result<()>;

    /// Stop acting as a slave
    fn i2c_slave_disable(&self, channel: ChannelHandle) -> Result<()>;

    /// Data returned when a master reads from us
    fn i2c_slave_set_resp(&self, channel: ChannelHandle, data: &[u8]) -> Result<usize>;

    /// Wait for slave activity; a negative timeout blocks forever
    fn i2c_slave_poll(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<I2cSlaveEvent>;

    /// Address used and bytes sent by the last master read
    fn i2c_slave_write_stats(&self, channel: ChannelHandle) -> Result<(u8, usize)>;

    /// Address used and data of the last master write
    fn i2c_slave_read(&self, channel: ChannelHandle, buf: &mut [u8]) -> Result<(u8, usize)>;

    /// Number of transactions lost
    fn i2c_slave_data_lost_stats(&self, channel: ChannelHandle) -> Result<usize>;
}

/// SPI part of the promact_is API (`ps_spi_*`)
pub trait SpiApi {
    /// Set the bitrate, returns the applied value
    fn spi_bitrate(&self, channel: ChannelHandle, bitrate_khz: u32) -> Result<u32>;

    /// Clock mode, bit order and slave select polarity
    fn spi_configure(
        &self,
        channel: ChannelHandle,
        mode: SpiMode,
        bitorder: BitOrder,
        ss_polarity: u8,
    ) -> Result<()>;

    /// Delay between words, in clock cycles
    fn spi_configure_delays(&self, channel: ChannelHandle, word_delay: u8) -> Result<()>;

    /// Slave select lines driven by the master
    fn spi_enable_ss(&self, channel: ChannelHandle, ss_enable: u8) -> Result<()>;

    /// Queue master output enable/disable
    fn queue_spi_oe(&self, queue: QueueHandle, enable: bool) -> Result<()>;

    /// Queue a slave select change
    fn queue_spi_ss(&self, queue: QueueHandle, ss_assert: u8) -> Result<()>;

    /// Queue a delay in clock cycles
    fn queue_spi_delay_cycles(&self, queue: QueueHandle, cycles: u32) -> Result<()>;

    /// Queue a delay in nanoseconds
    fn queue_spi_delay_ns(&self, queue: QueueHandle, nanoseconds: u32) -> Result<()>;

    /// Queue a write of `num_words` words taken from `data`
    ///
    /// The data read back while writing is returned as a `SpiRead` response.
    fn queue_spi_write(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Queue a write of the same word `num_words` times
    fn queue_spi_write_word(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
        word: u32,
    ) -> Result<()>;

    /// Queue a read of `num_words` words
    fn queue_spi_read(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
    ) -> Result<()>;

    /// Data of the current `SpiRead` response
    fn collect_spi_read(&self, collect: CollectHandle, buf: &mut [u8]) -> Result<usize>;

    /// Act as an SPI slave
    fn spi_slave_enable(&self, channel: ChannelHandle, mode: SlaveMode) -> Result<()>;

    /// Stop acting as an SPI slave
    fn spi_slave_disable(&self, channel: ChannelHandle) -> Result<()>;

    /// Configure the standard slave
    fn spi_std_slave_configure(
        &self,
        channel: ChannelHandle,
        io: SpiIoMode,
        flags: SpiSlaveFlags,
    ) -> Result<()>;

    /// Inactivity time that ends a transfer when slave select is ignored
    fn spi_slave_timeout(&self, channel: ChannelHandle, timeout_ns: u32) -> Result<u32>;

    /// Size after which received transfers are split into chunks
    fn spi_slave_host_read_size(&self, channel: ChannelHandle, read_size: u32) -> Result<u32>;

    /// Data returned to the master
    fn spi_std_slave_set_resp(&self, channel: ChannelHandle, resp: &[u8]) -> Result<usize>;

    /// Wait for slave activity; a negative timeout blocks forever
    fn spi_slave_poll(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<SpiSlaveEvent>;

    /// Next received transfer
    fn spi_slave_read(
        &self,
        channel: ChannelHandle,
        buf: &mut [u8],
    ) -> Result<(SpiSlaveReadInfo, usize)>;

    /// Number of transfers lost because the device queue was full
    fn spi_slave_data_lost_stats(&self, channel: ChannelHandle) -> Result<usize>;
}

/// GPIO part of the promact_is API (`ps_gpio_*`)
pub trait GpioApi {
    /// Set line directions; a 1 bit makes the line an output
    fn gpio_direction(&self, channel: ChannelHandle, direction_mask: u32) -> Result<()>;

    /// Current state of the input lines
    fn gpio_get(&self, channel: ChannelHandle) -> Result<u32>;

    /// Drive the output lines
    fn gpio_set(&self, channel: ChannelHandle, value: u32) -> Result<()>;

    /// Wait until an input changes or the timeout expires, returns the inputs
    fn gpio_change(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<u32>;
}

/// Everything the promact_is application offers
pub trait Promact: AppApi + I2cApi + SpiApi + GpioApi {}

impl<T: AppApi + I2cApi + SpiApi + GpioApi + ?Sized> Promact for T {}
