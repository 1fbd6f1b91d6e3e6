//! promact_is application API over `promact_is.so` / `promact_is.dll`

use crate::raw::{c_string, len_u16, len_u32, ptr_to_string, RawAppVersion, RawSpiSlaveReadInfo};
use once_cell::sync::Lazy;
use promira_core::{
    check_app, AppApi, AppConfig, AppStatus, AppVersion, BitOrder, ChannelHandle, CollectHandle,
    ConnectionHandle, Error, GpioApi, I2cApi, I2cFlags, I2cSlaveEvent, ModuleId, Pullup,
    QueueHandle, Response, Result, SlaveMode, SpiApi, SpiIoMode, SpiMode, SpiSlaveEvent,
    SpiSlaveFlags, SpiSlaveReadInfo, TargetPower,
};
use promira_loader::{symbol_table, Binder, APP_LIBRARY};
use std::ffi::{c_char, c_int};

pub(crate) static APP_BINDER: Lazy<Binder> = Lazy::new(|| Binder::new(APP_LIBRARY));

symbol_table! {
    struct AppSymbols {
        c_ps_app_connect: unsafe extern "C" fn(*const c_char) -> c_int;
        c_ps_app_disconnect: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_app_version: unsafe extern "C" fn(c_int, *mut RawAppVersion) -> c_int;
        c_ps_app_sleep_ms: unsafe extern "C" fn(u32) -> c_int;
        c_ps_app_status_string: unsafe extern "C" fn(c_int) -> *const c_char;
        c_ps_app_configure: unsafe extern "C" fn(c_int, c_int) -> c_int;
        c_ps_channel_open: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_channel_close: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_channel_submitted_count: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_channel_uncollected_count: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_queue_create: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_queue_destroy: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_queue_clear: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_queue_delay_ms: unsafe extern "C" fn(c_int, c_int) -> c_int;
        c_ps_queue_sync: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_queue_size: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_queue_submit: unsafe extern "C" fn(c_int, c_int, u8, *mut u8) -> c_int;
        c_ps_queue_async_submit: unsafe extern "C" fn(c_int, c_int, u8) -> c_int;
        c_ps_queue_async_collect: unsafe extern "C" fn(c_int, *mut u8) -> c_int;
        c_ps_collect_resp: unsafe extern "C" fn(c_int, *mut c_int, *mut c_int, c_int) -> c_int;
        c_ps_phy_target_power: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_phy_level_shift: unsafe extern "C" fn(c_int, f32) -> f32;

        c_ps_i2c_free_bus: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_i2c_bus_timeout: unsafe extern "C" fn(c_int, u16) -> c_int;
        c_ps_i2c_bitrate: unsafe extern "C" fn(c_int, u16) -> c_int;
        c_ps_i2c_pullup: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_i2c_read: unsafe extern "C" fn(c_int, u16, c_int, u16, *mut u8, *mut u16) -> c_int;
        c_ps_i2c_write: unsafe extern "C" fn(c_int, u16, c_int, u16, *const u8, *mut u16) -> c_int;
        c_ps_queue_i2c_read: unsafe extern "C" fn(c_int, u16, c_int, u16) -> c_int;
        c_ps_queue_i2c_write: unsafe extern "C" fn(c_int, u16, c_int, u16, *const u8) -> c_int;
        c_ps_collect_i2c_read: unsafe extern "C" fn(c_int, u16, *mut u8, *mut u16) -> c_int;
        c_ps_collect_i2c_write: unsafe extern "C" fn(c_int, *mut u16) -> c_int;
        c_ps_i2c_slave_enable: unsafe extern "C" fn(c_int, u16, u16, u16) -> c_int;
        c_ps_i2c_slave_disable: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_i2c_slave_set_resp: unsafe extern "C" fn(c_int, u8, *const u8) -> c_int;
        c_ps_i2c_slave_poll: unsafe extern "C" fn(c_int, c_int) -> c_int;
        c_ps_i2c_slave_write_stats: unsafe extern "C" fn(c_int, *mut u8, *mut u16) -> c_int;
        c_ps_i2c_slave_read: unsafe extern "C" fn(c_int, *mut u8, u16, *mut u8, *mut u16) -> c_int;
        c_ps_i2c_slave_data_lost_stats: unsafe extern "C" fn(c_int) -> c_int;

        c_ps_spi_bitrate: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_spi_configure: unsafe extern "C" fn(c_int, c_int, c_int, u8) -> c_int;
        c_ps_spi_configure_delays: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_spi_enable_ss: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_queue_spi_oe: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_queue_spi_ss: unsafe extern "C" fn(c_int, u8) -> c_int;
        c_ps_queue_spi_delay_cycles: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_queue_spi_delay_ns: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_queue_spi_write: unsafe extern "C" fn(c_int, c_int, u8, u32, *const u8) -> c_int;
        c_ps_queue_spi_write_word: unsafe extern "C" fn(c_int, c_int, u8, u32, u32) -> c_int;
        c_ps_queue_spi_read: unsafe extern "C" fn(c_int, c_int, u8, u32) -> c_int;
        c_ps_collect_spi_read: unsafe extern "C" fn(c_int, *mut u8, u32, *mut u8) -> c_int;
        c_ps_spi_slave_enable: unsafe extern "C" fn(c_int, c_int) -> c_int;
        c_ps_spi_slave_disable: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_spi_std_slave_configure: unsafe extern "C" fn(c_int, c_int, u8) -> c_int;
        c_ps_spi_slave_timeout: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_spi_slave_host_read_size: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_spi_std_slave_set_resp: unsafe extern "C" fn(c_int, u16, *const u8) -> c_int;
        c_ps_spi_slave_poll: unsafe extern "C" fn(c_int, c_int) -> c_int;
        c_ps_spi_slave_read:
            unsafe extern "C" fn(c_int, *mut RawSpiSlaveReadInfo, u32, *mut u8) -> c_int;
        c_ps_spi_slave_data_lost_stats: unsafe extern "C" fn(c_int) -> c_int;

        c_ps_gpio_direction: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_gpio_get: unsafe extern "C" fn(c_int) -> c_int;
        c_ps_gpio_set: unsafe extern "C" fn(c_int, u32) -> c_int;
        c_ps_gpio_change: unsafe extern "C" fn(c_int, c_int) -> c_int;
    }
}

static PS: AppSymbols = AppSymbols::new();

/// Bind `$sym` and call it, turning a bind failure into the application error
macro_rules! ps_call {
    ($sym:ident ( $($arg:expr),* $(,)? )) => {{
        let f = PS
            .$sym
            .get(&APP_BINDER)
            .map_err(|e| Error::App(e.app_status()))?;
        // SAFETY: arguments follow the declared C signature; buffers passed
        // with a length are at least that long.
        unsafe { f($($arg),*) }
    }};
}

/// Call and discard the non-negative result
macro_rules! ps_check {
    ($sym:ident ( $($arg:expr),* $(,)? )) => {{
        check_app(ps_call!($sym($($arg),*)))?;
        Ok(())
    }};
}

/// promact_is API backed by the vendor library
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeApp;

impl NativeApp {
    /// Handle to the process-wide promact_is library
    pub fn new() -> Self {
        NativeApp
    }
}

/// Handle-returning calls report failure as zero or a negative code
fn check_handle(ret: c_int, zero: AppStatus) -> Result<i32> {
    match check_app(ret)? {
        0 => Err(Error::App(zero)),
        handle => Ok(handle),
    }
}

impl AppApi for NativeApp {
    fn connect(&self, net_addr: &str) -> Result<ConnectionHandle> {
        let addr = c_string(net_addr)?;
        let conn = check_handle(ps_call!(c_ps_app_connect(addr.as_ptr())), AppStatus::UnableToOpen)?;
        log::debug!("Connected to {} as {}", net_addr, conn);
        Ok(ConnectionHandle(conn))
    }

    fn disconnect(&self, conn: ConnectionHandle) -> Result<()> {
        ps_check!(c_ps_app_disconnect(conn.raw()))
    }

    fn app_version(&self, channel: ChannelHandle) -> Result<AppVersion> {
        let mut raw = RawAppVersion::default();
        check_app(ps_call!(c_ps_app_version(channel.raw(), &mut raw)))?;
        Ok(raw.into())
    }

    fn sleep_ms(&self, milliseconds: u32) -> Result<()> {
        ps_check!(c_ps_app_sleep_ms(milliseconds))
    }

    fn status_string(&self, status: i32) -> Option<String> {
        let f = PS.c_ps_app_status_string.get(&APP_BINDER).ok()?;
        // SAFETY: the library returns NULL or a static NUL terminated string.
        unsafe { ptr_to_string(f(status)) }
    }

    fn configure(&self, channel: ChannelHandle, config: AppConfig) -> Result<AppConfig> {
        let ret = check_app(ps_call!(c_ps_app_configure(channel.raw(), config.bits())))?;
        Ok(AppConfig::from_bits_truncate(ret))
    }

    fn channel_open(&self, conn: ConnectionHandle) -> Result<ChannelHandle> {
        let channel = check_handle(ps_call!(c_ps_channel_open(conn.raw())), AppStatus::UnableToOpen)?;
        Ok(ChannelHandle(channel))
    }

    fn channel_close(&self, channel: ChannelHandle) -> Result<()> {
        ps_check!(c_ps_channel_close(channel.raw()))
    }

    fn channel_submitted_count(&self, channel: ChannelHandle) -> Result<usize> {
        Ok(check_app(ps_call!(c_ps_channel_submitted_count(channel.raw())))? as usize)
    }

    fn channel_uncollected_count(&self, channel: ChannelHandle) -> Result<usize> {
        Ok(check_app(ps_call!(c_ps_channel_uncollected_count(channel.raw())))? as usize)
    }

    fn queue_create(&self, conn: ConnectionHandle, module: ModuleId) -> Result<QueueHandle> {
        let queue = check_handle(
            ps_call!(c_ps_queue_create(conn.raw(), module as u8)),
            AppStatus::MemoryAllocError,
        )?;
        Ok(QueueHandle(queue))
    }

    fn queue_destroy(&self, queue: QueueHandle) -> Result<()> {
        ps_check!(c_ps_queue_destroy(queue.raw()))
    }

    fn queue_clear(&self, queue: QueueHandle) -> Result<()> {
        ps_check!(c_ps_queue_clear(queue.raw()))
    }

    fn queue_delay_ms(&self, queue: QueueHandle, milliseconds: i32) -> Result<()> {
        ps_check!(c_ps_queue_delay_ms(queue.raw(), milliseconds))
    }

    fn queue_sync(&self, queue: QueueHandle) -> Result<()> {
        ps_check!(c_ps_queue_sync(queue.raw()))
    }

    fn queue_size(&self, queue: QueueHandle) -> Result<usize> {
        Ok(check_app(ps_call!(c_ps_queue_size(queue.raw())))? as usize)
    }

    fn queue_submit(
        &self,
        queue: QueueHandle,
        channel: ChannelHandle,
        ctrl_id: u8,
    ) -> Result<CollectHandle> {
        let mut queue_type = 0u8;
        let collect = check_app(ps_call!(c_ps_queue_submit(
            queue.raw(),
            channel.raw(),
            ctrl_id,
            &mut queue_type
        )))?;
        log::trace!("Submitted queue {} (type {}) -> {}", queue, queue_type, collect);
        Ok(CollectHandle(collect))
    }

    fn queue_async_submit(
        &self,
        queue: QueueHandle,
        channel: ChannelHandle,
        ctrl_id: u8,
    ) -> Result<()> {
        ps_check!(c_ps_queue_async_submit(queue.raw(), channel.raw(), ctrl_id))
    }

    fn queue_async_collect(&self, channel: ChannelHandle) -> Result<CollectHandle> {
        let mut queue_type = 0u8;
        let collect = check_app(ps_call!(c_ps_queue_async_collect(channel.raw(), &mut queue_type)))?;
        Ok(CollectHandle(collect))
    }

    fn collect_resp(&self, collect: CollectHandle, timeout_ms: i32) -> Result<Option<Response>> {
        let mut length = 0;
        let mut result = 0;
        let command = ps_call!(c_ps_collect_resp(collect.raw(), &mut length, &mut result, timeout_ms));
        if command == AppStatus::NoMoreCmdsToCollect.code() {
            return Ok(None);
        }
        check_app(command)?;
        Ok(Some(Response {
            command,
            length,
            result,
        }))
    }

    fn phy_target_power(&self, channel: ChannelHandle, power: TargetPower) -> Result<TargetPower> {
        let ret = check_app(ps_call!(c_ps_phy_target_power(channel.raw(), power.bits())))?;
        Ok(TargetPower::from_bits_retain(ret as u8))
    }

    fn phy_level_shift(&self, channel: ChannelHandle, level: f32) -> Result<f32> {
        let applied = ps_call!(c_ps_phy_level_shift(channel.raw(), level));
        if applied < 0.0 {
            check_app(applied as c_int)?;
        }
        Ok(applied)
    }
}

impl I2cApi for NativeApp {
    fn i2c_free_bus(&self, channel: ChannelHandle) -> Result<()> {
        ps_check!(c_ps_i2c_free_bus(channel.raw()))
    }

    fn i2c_bus_timeout(&self, channel: ChannelHandle, timeout_ms: u16) -> Result<u16> {
        Ok(check_app(ps_call!(c_ps_i2c_bus_timeout(channel.raw(), timeout_ms)))? as u16)
    }

    fn i2c_bitrate(&self, channel: ChannelHandle, bitrate_khz: u16) -> Result<u16> {
        Ok(check_app(ps_call!(c_ps_i2c_bitrate(channel.raw(), bitrate_khz)))? as u16)
    }

    fn i2c_pullup(&self, channel: ChannelHandle, pullup: Pullup) -> Result<Pullup> {
        let ret = check_app(ps_call!(c_ps_i2c_pullup(channel.raw(), pullup.bits())))?;
        Ok(Pullup::from_bits_retain(ret as u8))
    }

    fn i2c_read(
        &self,
        channel: ChannelHandle,
        slave_addr: u16,
        flags: I2cFlags,
        buf: &mut [u8],
    ) -> Result<usize> {
        let mut num_read = 0u16;
        check_app(ps_call!(c_ps_i2c_read(
            channel.raw(),
            slave_addr,
            flags.bits(),
            len_u16(buf.len()),
            buf.as_mut_ptr(),
            &mut num_read
        )))?;
        Ok(num_read as usize)
    }

    fn i2c_write(
        &self,
        channel: ChannelHandle,
        slave_addr: u16,
        flags: I2cFlags,
        data: &[u8],
    ) -> Result<usize> {
        let mut num_written = 0u16;
        check_app(ps_call!(c_ps_i2c_write(
            channel.raw(),
            slave_addr,
            flags.bits(),
            len_u16(data.len()),
            data.as_ptr(),
            &mut num_written
        )))?;
        Ok(num_written as usize)
    }

    fn queue_i2c_read(
        &self,
        queue: QueueHandle,
        slave_addr: u16,
        flags: I2cFlags,
        num_bytes: u16,
    ) -> Result<()> {
        ps_check!(c_ps_queue_i2c_read(queue.raw(), slave_addr, flags.bits(), num_bytes))
    }

    fn queue_i2c_write(
        &self,
        queue: QueueHandle,
        slave_addr: u16,
        flags: I2cFlags,
        data: &[u8],
    ) -> Result<()> {
        ps_check!(c_ps_queue_i2c_write(
            queue.raw(),
            slave_addr,
            flags.bits(),
            len_u16(data.len()),
            data.as_ptr()
        ))
    }

    fn collect_i2c_read(&self, collect: CollectHandle, buf: &mut [u8]) -> Result<usize> {
        let mut num_read = 0u16;
        check_app(ps_call!(c_ps_collect_i2c_read(
            collect.raw(),
            len_u16(buf.len()),
            buf.as_mut_ptr(),
            &mut num_read
        )))?;
        Ok(num_read as usize)
    }

    fn collect_i2c_write(&self, collect: CollectHandle) -> Result<usize> {
        let mut num_written = 0u16;
        check_app(ps_call!(c_ps_collect_i2c_write(collect.raw(), &mut num_written)))?;
        Ok(num_written as usize)
    }

    fn i2c_slave_enable(
        &self,
        channel: ChannelHandle,
        addr: u16,
        max_tx_bytes: u16,
        max_rx_bytes: u16,
    ) -> Result<()> {
        ps_check!(c_ps_i2c_slave_enable(channel.raw(), addr, max_tx_bytes, max_rx_bytes))
    }

    fn i2c_slave_disable(&self, channel: ChannelHandle) -> Result<()> {
        ps_check!(c_ps_i2c_slave_disable(channel.raw()))
    }

    fn i2c_slave_set_resp(&self, channel: ChannelHandle, data: &[u8]) -> Result<usize> {
        let len = data.len().min(u8::MAX as usize);
        Ok(check_app(ps_call!(c_ps_i2c_slave_set_resp(channel.raw(), len as u8, data.as_ptr())))?
            as usize)
    }

    fn i2c_slave_poll(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<I2cSlaveEvent> {
        let ret = check_app(ps_call!(c_ps_i2c_slave_poll(channel.raw(), timeout_ms)))?;
        Ok(I2cSlaveEvent::from_raw(ret))
    }

    fn i2c_slave_write_stats(&self, channel: ChannelHandle) -> Result<(u8, usize)> {
        let mut addr = 0u8;
        let mut num_written = 0u16;
        check_app(ps_call!(c_ps_i2c_slave_write_stats(channel.raw(), &mut addr, &mut num_written)))?;
        Ok((addr, num_written as usize))
    }

    fn i2c_slave_read(&self, channel: ChannelHandle, buf: &mut [u8]) -> Result<(u8, usize)> {
        let mut addr = 0u8;
        let mut num_read = 0u16;
        check_app(ps_call!(c_ps_i2c_slave_read(
            channel.raw(),
            &mut addr,
            len_u16(buf.len()),
            buf.as_mut_ptr(),
            &mut num_read
        )))?;
        Ok((addr, num_read as usize))
    }

    fn i2c_slave_data_lost_stats(&self, channel: ChannelHandle) -> Result<usize> {
        Ok(check_app(ps_call!(c_ps_i2c_slave_data_lost_stats(channel.raw())))? as usize)
    }
}

impl SpiApi for NativeApp {
    fn spi_bitrate(&self, channel: ChannelHandle, bitrate_khz: u32) -> Result<u32> {
        Ok(check_app(ps_call!(c_ps_spi_bitrate(channel.raw(), bitrate_khz)))? as u32)
    }

    fn spi_configure(
        &self,
        channel: ChannelHandle,
        mode: SpiMode,
        bitorder: BitOrder,
        ss_polarity: u8,
    ) -> Result<()> {
        ps_check!(c_ps_spi_configure(
            channel.raw(),
            mode as c_int,
            bitorder as c_int,
            ss_polarity
        ))
    }

    fn spi_configure_delays(&self, channel: ChannelHandle, word_delay: u8) -> Result<()> {
        ps_check!(c_ps_spi_configure_delays(channel.raw(), word_delay))
    }

    fn spi_enable_ss(&self, channel: ChannelHandle, ss_enable: u8) -> Result<()> {
        ps_check!(c_ps_spi_enable_ss(channel.raw(), ss_enable))
    }

    fn queue_spi_oe(&self, queue: QueueHandle, enable: bool) -> Result<()> {
        ps_check!(c_ps_queue_spi_oe(queue.raw(), enable as u8))
    }

    fn queue_spi_ss(&self, queue: QueueHandle, ss_assert: u8) -> Result<()> {
        ps_check!(c_ps_queue_spi_ss(queue.raw(), ss_assert))
    }

    fn queue_spi_delay_cycles(&self, queue: QueueHandle, cycles: u32) -> Result<()> {
        ps_check!(c_ps_queue_spi_delay_cycles(queue.raw(), cycles))
    }

    fn queue_spi_delay_ns(&self, queue: QueueHandle, nanoseconds: u32) -> Result<()> {
        ps_check!(c_ps_queue_spi_delay_ns(queue.raw(), nanoseconds))
    }

    fn queue_spi_write(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
        data: &[u8],
    ) -> Result<()> {
        let needed = (num_words as usize * word_size as usize).div_ceil(8);
        if data.len() < needed {
            return Err(Error::InvalidParameter(format!(
                "{} words of {} bits need {} bytes, got {}",
                num_words,
                word_size,
                needed,
                data.len()
            )));
        }
        ps_check!(c_ps_queue_spi_write(
            queue.raw(),
            io as c_int,
            word_size,
            num_words,
            data.as_ptr()
        ))
    }

    fn queue_spi_write_word(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
        word: u32,
    ) -> Result<()> {
        ps_check!(c_ps_queue_spi_write_word(
            queue.raw(),
            io as c_int,
            word_size,
            num_words,
            word
        ))
    }

    fn queue_spi_read(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
    ) -> Result<()> {
        ps_check!(c_ps_queue_spi_read(queue.raw(), io as c_int, word_size, num_words))
    }

    fn collect_spi_read(&self, collect: CollectHandle, buf: &mut [u8]) -> Result<usize> {
        let mut word_size = 0u8;
        let n = check_app(ps_call!(c_ps_collect_spi_read(
            collect.raw(),
            &mut word_size,
            len_u32(buf.len()),
            buf.as_mut_ptr()
        )))?;
        Ok(n as usize)
    }

    fn spi_slave_enable(&self, channel: ChannelHandle, mode: SlaveMode) -> Result<()> {
        ps_check!(c_ps_spi_slave_enable(channel.raw(), mode as c_int))
    }

    fn spi_slave_disable(&self, channel: ChannelHandle) -> Result<()> {
        ps_check!(c_ps_spi_slave_disable(channel.raw()))
    }

    fn spi_std_slave_configure(
        &self,
        channel: ChannelHandle,
        io: SpiIoMode,
        flags: SpiSlaveFlags,
    ) -> Result<()> {
        ps_check!(c_ps_spi_std_slave_configure(channel.raw(), io as c_int, flags.bits()))
    }

    fn spi_slave_timeout(&self, channel: ChannelHandle, timeout_ns: u32) -> Result<u32> {
        Ok(check_app(ps_call!(c_ps_spi_slave_timeout(channel.raw(), timeout_ns)))? as u32)
    }

    fn spi_slave_host_read_size(&self, channel: ChannelHandle, read_size: u32) -> Result<u32> {
        Ok(check_app(ps_call!(c_ps_spi_slave_host_read_size(channel.raw(), read_size)))? as u32)
    }

    fn spi_std_slave_set_resp(&self, channel: ChannelHandle, resp: &[u8]) -> Result<usize> {
        Ok(check_app(ps_call!(c_ps_spi_std_slave_set_resp(
            channel.raw(),
            len_u16(resp.len()),
            resp.as_ptr()
        )))? as usize)
    }

    fn spi_slave_poll(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<SpiSlaveEvent> {
        let ret = check_app(ps_call!(c_ps_spi_slave_poll(channel.raw(), timeout_ms)))?;
        Ok(SpiSlaveEvent::from_raw(ret))
    }

    fn spi_slave_read(
        &self,
        channel: ChannelHandle,
        buf: &mut [u8],
    ) -> Result<(SpiSlaveReadInfo, usize)> {
        let mut info = RawSpiSlaveReadInfo::default();
        let n = check_app(ps_call!(c_ps_spi_slave_read(
            channel.raw(),
            &mut info,
            len_u32(buf.len()),
            buf.as_mut_ptr()
        )))?;
        Ok((info.into(), n as usize))
    }

    fn spi_slave_data_lost_stats(&self, channel: ChannelHandle) -> Result<usize> {
        Ok(check_app(ps_call!(c_ps_spi_slave_data_lost_stats(channel.raw())))? as usize)
    }
}

impl GpioApi for NativeApp {
    fn gpio_direction(&self, channel: ChannelHandle, direction_mask: u32) -> Result<()> {
        ps_check!(c_ps_gpio_direction(channel.raw(), direction_mask))
    }

    fn gpio_get(&self, channel: ChannelHandle) -> Result<u32> {
        Ok(check_app(ps_call!(c_ps_gpio_get(channel.raw())))? as u32)
    }

    fn gpio_set(&self, channel: ChannelHandle, value: u32) -> Result<()> {
        ps_check!(c_ps_gpio_set(channel.raw(), value))
    }

    fn gpio_change(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<u32> {
        Ok(check_app(ps_call!(c_ps_gpio_change(channel.raw(), timeout_ms)))? as u32)
    }
}
