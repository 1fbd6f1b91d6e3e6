//! promact_is API over the emulated buses

use crate::queue::{Collect, Collected, Queue, QueuedCmd};
use crate::{lock, Channel, State};
use promira_core::{
    AppApi, AppConfig, AppStatus, AppVersion, BitOrder, ChannelHandle, CollectHandle, Command,
    ConnectionHandle, Error, GpioApi, I2cApi, I2cFlags, I2cSlaveEvent, ModuleId, Pullup,
    QueueHandle, Response, Result, SlaveMode, SpiApi, SpiIoMode, SpiMode, SpiSlaveEvent,
    SpiSlaveFlags, SpiSlaveReadInfo, TargetPower, PROMACT_IS_APP,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// promact_is view of a [`Dummy`](crate::Dummy)
pub struct DummyApp {
    state: Arc<Mutex<State>>,
}

fn app_err(status: AppStatus) -> Error {
    Error::App(status)
}

/// Bytes needed for `num_words` words of `word_size` bits
fn word_bytes(word_size: u8, num_words: u32) -> usize {
    (num_words as usize * word_size as usize).div_ceil(8)
}

impl DummyApp {
    pub(crate) fn new(state: Arc<Mutex<State>>) -> Self {
        Self { state }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Lock the state and check that `channel` is open
    fn channel(&self, channel: ChannelHandle) -> Result<MutexGuard<'_, State>> {
        let state = self.lock();
        if !state.channels.contains_key(&channel.raw()) {
            return Err(app_err(AppStatus::InvalidHandle));
        }
        Ok(state)
    }

    /// Lock the state and check that `channel` has I2C routed to the pins
    fn i2c_channel(&self, channel: ChannelHandle) -> Result<MutexGuard<'_, State>> {
        let state = self.channel(channel)?;
        if !state.channels[&channel.raw()].config.contains(AppConfig::I2C) {
            return Err(app_err(AppStatus::I2cNotEnabled));
        }
        Ok(state)
    }

    /// Lock the state and check that `channel` has SPI routed to the pins
    fn spi_channel(&self, channel: ChannelHandle) -> Result<MutexGuard<'_, State>> {
        let state = self.channel(channel)?;
        if !state.channels[&channel.raw()].config.contains(AppConfig::SPI) {
            return Err(app_err(AppStatus::SpiNotEnabled));
        }
        Ok(state)
    }

    fn push(&self, queue: QueueHandle, cmd: QueuedCmd) -> Result<()> {
        let mut state = self.lock();
        let queue = state
            .queues
            .get_mut(&queue.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?;
        queue.push(cmd).map_err(app_err)
    }

    /// Run a queue on the buses, returning its collect handle
    fn run(&self, queue: QueueHandle, channel: ChannelHandle) -> Result<i32> {
        let mut state = self.channel(channel)?;
        let queue = state
            .queues
            .get(&queue.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?;
        if queue.cmds.is_empty() {
            return Err(app_err(AppStatus::QueueEmpty));
        }
        let config = state.channels[&channel.raw()].config;
        match queue.module {
            ModuleId::I2cActive if !config.contains(AppConfig::I2C) => {
                return Err(app_err(AppStatus::I2cNotEnabled))
            }
            ModuleId::SpiActive if !config.contains(AppConfig::SPI) => {
                return Err(app_err(AppStatus::SpiNotEnabled))
            }
            _ => {}
        }
        let delay = queue.delay_command();
        let cmds = queue.cmds.clone();
        log::trace!("dummy: running {} queued commands", cmds.len());

        let responses = cmds
            .into_iter()
            .map(|cmd| execute(&mut state, delay, cmd))
            .collect();
        let handle = state.alloc_handle();
        state.collects.insert(handle, Collect::new(responses));
        Ok(handle)
    }
}

/// Execute one queued command against the emulated buses
fn execute(state: &mut State, delay: Command, cmd: QueuedCmd) -> Collected {
    let not_driven = AppStatus::SpiOutputNotEnabled.code();
    match cmd {
        QueuedCmd::I2cWrite { addr, flags, data } => {
            let n = state.i2c.write(addr, flags, &data);
            Collected::status(Command::I2cWrite, n as i32)
        }
        QueuedCmd::I2cRead { addr, flags, len } => {
            let mut buf = vec![0u8; len];
            let n = state.i2c.read(addr, flags, &mut buf);
            buf.truncate(n);
            Collected {
                command: Command::I2cRead,
                result: n as i32,
                data: buf,
            }
        }
        QueuedCmd::DelayMs(ms) => Collected::status(delay, ms),
        QueuedCmd::SpiOe(enable) => {
            state.spi.set_output_enabled(enable);
            Collected::status(Command::SpiOe, 0)
        }
        QueuedCmd::SpiSs(mask) => {
            if !state.spi.output_enabled() {
                return Collected::status(Command::SpiSs, not_driven);
            }
            state.spi.set_ss(mask & state.spi_master.ss_enable);
            Collected::status(Command::SpiSs, 0)
        }
        QueuedCmd::SpiDelayCycles(cycles) => {
            Collected::status(Command::SpiDelayCycles, cycles as i32)
        }
        QueuedCmd::SpiDelayNs(ns) => Collected::status(Command::SpiDelayNs, ns as i32),
        QueuedCmd::SpiShift { io, mosi } => {
            if !state.spi.output_enabled() {
                return Collected::status(Command::SpiRead, not_driven);
            }
            if io != SpiIoMode::Standard {
                log::trace!("dummy: {:?} transfer of {} bytes", io, mosi.len());
            }
            let miso = state.spi.transfer(&mosi);
            Collected {
                command: Command::SpiRead,
                result: miso.len() as i32,
                data: miso,
            }
        }
    }
}

impl AppApi for DummyApp {
    fn connect(&self, net_addr: &str) -> Result<ConnectionHandle> {
        let mut state = self.lock();
        let index = state
            .device_by_addr(net_addr)
            .ok_or(app_err(AppStatus::UnableToOpen))?;
        if state.devices[index].loaded.as_deref() != Some(PROMACT_IS_APP) {
            log::debug!("dummy {}: promact_is is not running", net_addr);
            return Err(app_err(AppStatus::UnableToOpen));
        }
        let handle = state.alloc_handle();
        state.connections.insert(handle, index);
        Ok(ConnectionHandle(handle))
    }

    fn disconnect(&self, conn: ConnectionHandle) -> Result<()> {
        let mut state = self.lock();
        state
            .connections
            .remove(&conn.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?;
        state.channels.retain(|_, ch| ch.conn != conn.raw());
        state.queues.retain(|_, q| q.conn != conn.raw());
        Ok(())
    }

    fn app_version(&self, channel: ChannelHandle) -> Result<AppVersion> {
        let state = self.channel(channel)?;
        Ok(state.config.app_version)
    }

    fn sleep_ms(&self, milliseconds: u32) -> Result<()> {
        self.lock().slept_ms += u64::from(milliseconds);
        Ok(())
    }

    fn status_string(&self, status: i32) -> Option<String> {
        AppStatus::from_code(status).map(|s| s.as_str().to_string())
    }

    fn configure(&self, channel: ChannelHandle, config: AppConfig) -> Result<AppConfig> {
        let mut state = self.channel(channel)?;
        if let Some(ch) = state.channels.get_mut(&channel.raw()) {
            ch.config = config;
        }
        Ok(config)
    }

    fn channel_open(&self, conn: ConnectionHandle) -> Result<ChannelHandle> {
        let mut state = self.lock();
        if !state.connections.contains_key(&conn.raw()) {
            return Err(app_err(AppStatus::InvalidHandle));
        }
        let handle = state.alloc_handle();
        state.channels.insert(
            handle,
            Channel {
                conn: conn.raw(),
                config: AppConfig::SPI | AppConfig::I2C,
                pending: VecDeque::new(),
            },
        );
        Ok(ChannelHandle(handle))
    }

    fn channel_close(&self, channel: ChannelHandle) -> Result<()> {
        self.lock()
            .channels
            .remove(&channel.raw())
            .map(|_| ())
            .ok_or(app_err(AppStatus::InvalidHandle))
    }

    fn channel_submitted_count(&self, channel: ChannelHandle) -> Result<usize> {
        // Queues complete as soon as they are submitted
        self.channel(channel).map(|_| 0)
    }

    fn channel_uncollected_count(&self, channel: ChannelHandle) -> Result<usize> {
        let state = self.channel(channel)?;
        Ok(state.channels[&channel.raw()].pending.len())
    }

    fn queue_create(&self, conn: ConnectionHandle, module: ModuleId) -> Result<QueueHandle> {
        let mut state = self.lock();
        if !state.connections.contains_key(&conn.raw()) {
            return Err(app_err(AppStatus::InvalidHandle));
        }
        let handle = state.alloc_handle();
        state.queues.insert(handle, Queue::new(module, conn.raw()));
        Ok(QueueHandle(handle))
    }

    fn queue_destroy(&self, queue: QueueHandle) -> Result<()> {
        self.lock()
            .queues
            .remove(&queue.raw())
            .map(|_| ())
            .ok_or(app_err(AppStatus::InvalidHandle))
    }

    fn queue_clear(&self, queue: QueueHandle) -> Result<()> {
        let mut state = self.lock();
        let queue = state
            .queues
            .get_mut(&queue.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?;
        queue.cmds.clear();
        Ok(())
    }

    fn queue_delay_ms(&self, queue: QueueHandle, milliseconds: i32) -> Result<()> {
        self.push(queue, QueuedCmd::DelayMs(milliseconds))
    }

    fn queue_sync(&self, queue: QueueHandle) -> Result<()> {
        // Commands already run in order; only the handle is checked
        if !self.lock().queues.contains_key(&queue.raw()) {
            return Err(app_err(AppStatus::InvalidHandle));
        }
        Ok(())
    }

    fn queue_size(&self, queue: QueueHandle) -> Result<usize> {
        self.lock()
            .queues
            .get(&queue.raw())
            .map(|q| q.cmds.len())
            .ok_or(app_err(AppStatus::InvalidHandle))
    }

    fn queue_submit(
        &self,
        queue: QueueHandle,
        channel: ChannelHandle,
        _ctrl_id: u8,
    ) -> Result<CollectHandle> {
        self.run(queue, channel).map(CollectHandle)
    }

    fn queue_async_submit(
        &self,
        queue: QueueHandle,
        channel: ChannelHandle,
        _ctrl_id: u8,
    ) -> Result<()> {
        let collect = self.run(queue, channel)?;
        let mut state = self.lock();
        if let Some(ch) = state.channels.get_mut(&channel.raw()) {
            ch.pending.push_back(collect);
        }
        Ok(())
    }

    fn queue_async_collect(&self, channel: ChannelHandle) -> Result<CollectHandle> {
        let mut state = self.channel(channel)?;
        state
            .channels
            .get_mut(&channel.raw())
            .and_then(|ch| ch.pending.pop_front())
            .map(CollectHandle)
            .ok_or(app_err(AppStatus::NoMoreQueuesToCollect))
    }

    fn collect_resp(&self, collect: CollectHandle, _timeout_ms: i32) -> Result<Option<Response>> {
        let mut state = self.lock();
        let collect = state
            .collects
            .get_mut(&collect.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?;
        Ok(collect.next())
    }

    fn phy_target_power(&self, channel: ChannelHandle, power: TargetPower) -> Result<TargetPower> {
        let mut state = self.channel(channel)?;
        state.power = power;
        Ok(power)
    }

    fn phy_level_shift(&self, channel: ChannelHandle, level: f32) -> Result<f32> {
        let mut state = self.channel(channel)?;
        state.level_shift = level.clamp(0.9, 3.45);
        Ok(state.level_shift)
    }
}

impl I2cApi for DummyApp {
    fn i2c_free_bus(&self, channel: ChannelHandle) -> Result<()> {
        let _state = self.i2c_channel(channel)?;
        Err(app_err(AppStatus::I2cBusAlreadyFree))
    }

    fn i2c_bus_timeout(&self, channel: ChannelHandle, timeout_ms: u16) -> Result<u16> {
        let mut state = self.i2c_channel(channel)?;
        state.i2c_bus_timeout_ms = timeout_ms;
        Ok(timeout_ms)
    }

    fn i2c_bitrate(&self, channel: ChannelHandle, bitrate_khz: u16) -> Result<u16> {
        let mut state = self.i2c_channel(channel)?;
        if bitrate_khz > 0 {
            state.i2c_bitrate_khz = bitrate_khz.min(1000);
        }
        Ok(state.i2c_bitrate_khz)
    }

    fn i2c_pullup(&self, channel: ChannelHandle, pullup: Pullup) -> Result<Pullup> {
        let mut state = self.channel(channel)?;
        state.pullup = pullup;
        Ok(pullup)
    }

    fn i2c_read(
        &self,
        channel: ChannelHandle,
        slave_addr: u16,
        flags: I2cFlags,
        buf: &mut [u8],
    ) -> Result<usize> {
        let mut state = self.i2c_channel(channel)?;
        Ok(state.i2c.read(slave_addr, flags, buf))
    }

    fn i2c_write(
        &self,
        channel: ChannelHandle,
        slave_addr: u16,
        flags: I2cFlags,
        data: &[u8],
    ) -> Result<usize> {
        let mut state = self.i2c_channel(channel)?;
        Ok(state.i2c.write(slave_addr, flags, data))
    }

    fn queue_i2c_read(
        &self,
        queue: QueueHandle,
        slave_addr: u16,
        flags: I2cFlags,
        num_bytes: u16,
    ) -> Result<()> {
        self.push(
            queue,
            QueuedCmd::I2cRead {
                addr: slave_addr,
                flags,
                len: num_bytes as usize,
            },
        )
    }

    fn queue_i2c_write(
        &self,
        queue: QueueHandle,
        slave_addr: u16,
        flags: I2cFlags,
        data: &[u8],
    ) -> Result<()> {
        self.push(
            queue,
            QueuedCmd::I2cWrite {
                addr: slave_addr,
                flags,
                data: data.to_vec(),
            },
        )
    }

    fn collect_i2c_read(&self, collect: CollectHandle, buf: &mut [u8]) -> Result<usize> {
        let state = self.lock();
        let current = state
            .collects
            .get(&collect.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?
            .current(Command::I2cRead)
            .map_err(app_err)?;
        let n = current.data.len().min(buf.len());
        buf[..n].copy_from_slice(&current.data[..n]);
        Ok(n)
    }

    fn collect_i2c_write(&self, collect: CollectHandle) -> Result<usize> {
        let state = self.lock();
        let current = state
            .collects
            .get(&collect.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?
            .current(Command::I2cWrite)
            .map_err(app_err)?;
        Ok(current.result.max(0) as usize)
    }

    fn i2c_slave_enable(
        &self,
        channel: ChannelHandle,
        addr: u16,
        _max_tx_bytes: u16,
        _max_rx_bytes: u16,
    ) -> Result<()> {
        let mut state = self.i2c_channel(channel)?;
        if addr > 0x7f {
            return Err(app_err(AppStatus::I2cSlaveBadConfig));
        }
        state.i2c_slave.addr = Some(addr as u8);
        Ok(())
    }

    fn i2c_slave_disable(&self, channel: ChannelHandle) -> Result<()> {
        let mut state = self.i2c_channel(channel)?;
        state.i2c_slave.addr = None;
        Ok(())
    }

    fn i2c_slave_set_resp(&self, channel: ChannelHandle, data: &[u8]) -> Result<usize> {
        let mut state = self.i2c_channel(channel)?;
        state.i2c_slave.response = data.to_vec();
        Ok(data.len())
    }

    fn i2c_slave_poll(&self, channel: ChannelHandle, _timeout_ms: i32) -> Result<I2cSlaveEvent> {
        let mut state = self.i2c_channel(channel)?;
        Ok(state.i2c_slave.poll())
    }

    fn i2c_slave_write_stats(&self, channel: ChannelHandle) -> Result<(u8, usize)> {
        let mut state = self.i2c_channel(channel)?;
        let addr = state.i2c_slave.addr.unwrap_or(0);
        let sent = state
            .i2c_slave
            .take_read()
            .ok_or(app_err(AppStatus::I2cSlaveReadError))?;
        Ok((addr, sent))
    }

    fn i2c_slave_read(&self, channel: ChannelHandle, buf: &mut [u8]) -> Result<(u8, usize)> {
        let mut state = self.i2c_channel(channel)?;
        let addr = state.i2c_slave.addr.unwrap_or(0);
        let data = state
            .i2c_slave
            .take_write()
            .ok_or(app_err(AppStatus::I2cSlaveReadError))?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok((addr, n))
    }

    fn i2c_slave_data_lost_stats(&self, channel: ChannelHandle) -> Result<usize> {
        let mut state = self.i2c_channel(channel)?;
        Ok(state.i2c_slave.take_lost())
    }
}

impl SpiApi for DummyApp {
    fn spi_bitrate(&self, channel: ChannelHandle, bitrate_khz: u32) -> Result<u32> {
        let mut state = self.spi_channel(channel)?;
        if bitrate_khz > 0 {
            state.spi_master.bitrate_khz = bitrate_khz.min(80_000);
        }
        Ok(state.spi_master.bitrate_khz)
    }

    fn spi_configure(
        &self,
        channel: ChannelHandle,
        mode: SpiMode,
        bitorder: BitOrder,
        ss_polarity: u8,
    ) -> Result<()> {
        let mut state = self.spi_channel(channel)?;
        state.spi_master.mode = mode;
        state.spi_master.bitorder = bitorder;
        state.spi_master.ss_polarity = ss_polarity;
        Ok(())
    }

    fn spi_configure_delays(&self, channel: ChannelHandle, word_delay: u8) -> Result<()> {
        let mut state = self.spi_channel(channel)?;
        state.spi_master.word_delay = word_delay;
        Ok(())
    }

    fn spi_enable_ss(&self, channel: ChannelHandle, ss_enable: u8) -> Result<()> {
        let mut state = self.spi_channel(channel)?;
        state.spi_master.ss_enable = ss_enable;
        Ok(())
    }

    fn queue_spi_oe(&self, queue: QueueHandle, enable: bool) -> Result<()> {
        self.push(queue, QueuedCmd::SpiOe(enable))
    }

    fn queue_spi_ss(&self, queue: QueueHandle, ss_assert: u8) -> Result<()> {
        self.push(queue, QueuedCmd::SpiSs(ss_assert))
    }

    fn queue_spi_delay_cycles(&self, queue: QueueHandle, cycles: u32) -> Result<()> {
        self.push(queue, QueuedCmd::SpiDelayCycles(cycles))
    }

    fn queue_spi_delay_ns(&self, queue: QueueHandle, nanoseconds: u32) -> Result<()> {
        self.push(queue, QueuedCmd::SpiDelayNs(nanoseconds))
    }

    fn queue_spi_write(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
        data: &[u8],
    ) -> Result<()> {
        let needed = word_bytes(word_size, num_words);
        if needed == 0 {
            return Err(app_err(AppStatus::SpiWrite0Bytes));
        }
        if data.len() < needed {
            return Err(Error::InvalidParameter(format!(
                "{} words of {} bits need {} bytes, got {}",
                num_words,
                word_size,
                needed,
                data.len()
            )));
        }
        self.push(
            queue,
            QueuedCmd::SpiShift {
                io,
                mosi: data[..needed].to_vec(),
            },
        )
    }

    fn queue_spi_write_word(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
        word: u32,
    ) -> Result<()> {
        let bytes_per_word = usize::from(word_size).div_ceil(8).clamp(1, 4);
        let word_be = word.to_be_bytes();
        let pattern = &word_be[4 - bytes_per_word..];
        let mosi = pattern
            .iter()
            .copied()
            .cycle()
            .take(bytes_per_word * num_words as usize)
            .collect::<Vec<u8>>();
        if mosi.is_empty() {
            return Err(app_err(AppStatus::SpiWrite0Bytes));
        }
        self.push(queue, QueuedCmd::SpiShift { io, mosi })
    }

    fn queue_spi_read(
        &self,
        queue: QueueHandle,
        io: SpiIoMode,
        word_size: u8,
        num_words: u32,
    ) -> Result<()> {
        let mosi = vec![0u8; word_bytes(word_size, num_words)];
        self.push(queue, QueuedCmd::SpiShift { io, mosi })
    }

    fn collect_spi_read(&self, collect: CollectHandle, buf: &mut [u8]) -> Result<usize> {
        let state = self.lock();
        let current = state
            .collects
            .get(&collect.raw())
            .ok_or(app_err(AppStatus::InvalidHandle))?
            .current(Command::SpiRead)
            .map_err(app_err)?;
        if current.result < 0 {
            return Err(app_err(AppStatus::SpiOutputNotEnabled));
        }
        let n = current.data.len().min(buf.len());
        buf[..n].copy_from_slice(&current.data[..n]);
        Ok(n)
    }

    fn spi_slave_enable(&self, channel: ChannelHandle, _mode: SlaveMode) -> Result<()> {
        let mut state = self.spi_channel(channel)?;
        if state.spi.output_enabled() {
            return Err(app_err(AppStatus::SpiOutputEnabled));
        }
        state.spi_slave.enabled = true;
        Ok(())
    }

    fn spi_slave_disable(&self, channel: ChannelHandle) -> Result<()> {
        let mut state = self.spi_channel(channel)?;
        state.spi_slave.enabled = false;
        Ok(())
    }

    fn spi_std_slave_configure(
        &self,
        channel: ChannelHandle,
        io: SpiIoMode,
        flags: SpiSlaveFlags,
    ) -> Result<()> {
        let mut state = self.spi_channel(channel)?;
        log::trace!("dummy: SPI slave {:?} {:?}", io, flags);
        state.spi_slave.flags = flags;
        Ok(())
    }

    fn spi_slave_timeout(&self, channel: ChannelHandle, timeout_ns: u32) -> Result<u32> {
        let _state = self.spi_channel(channel)?;
        Ok(timeout_ns)
    }

    fn spi_slave_host_read_size(&self, channel: ChannelHandle, read_size: u32) -> Result<u32> {
        let mut state = self.spi_channel(channel)?;
        state.spi_slave.host_read_size = read_size.clamp(1, 65535) as usize;
        Ok(state.spi_slave.host_read_size as u32)
    }

    fn spi_std_slave_set_resp(&self, channel: ChannelHandle, resp: &[u8]) -> Result<usize> {
        let mut state = self.spi_channel(channel)?;
        state.spi_slave.response = resp.to_vec();
        Ok(resp.len())
    }

    fn spi_slave_poll(&self, channel: ChannelHandle, _timeout_ms: i32) -> Result<SpiSlaveEvent> {
        let mut state = self.spi_channel(channel)?;
        Ok(state.spi_slave.poll())
    }

    fn spi_slave_read(
        &self,
        channel: ChannelHandle,
        buf: &mut [u8],
    ) -> Result<(SpiSlaveReadInfo, usize)> {
        let mut state = self.spi_channel(channel)?;
        Ok(state.spi_slave.read(buf))
    }

    fn spi_slave_data_lost_stats(&self, channel: ChannelHandle) -> Result<usize> {
        let mut state = self.spi_channel(channel)?;
        Ok(state.spi_slave.take_lost())
    }
}

impl GpioApi for DummyApp {
    fn gpio_direction(&self, channel: ChannelHandle, direction_mask: u32) -> Result<()> {
        let mut state = self.channel(channel)?;
        state.gpio.set_direction(direction_mask);
        Ok(())
    }

    fn gpio_get(&self, channel: ChannelHandle) -> Result<u32> {
        let state = self.channel(channel)?;
        Ok(state.gpio.get())
    }

    fn gpio_set(&self, channel: ChannelHandle, value: u32) -> Result<()> {
        let mut state = self.channel(channel)?;
        state.gpio.set(value);
        Ok(())
    }

    fn gpio_change(&self, channel: ChannelHandle, timeout_ms: i32) -> Result<u32> {
        let mut state = self.channel(channel)?;
        let (changed, value) = state.gpio.change();
        if !changed && timeout_ms > 0 {
            // Nothing scripted: the whole timeout elapses
            state.slept_ms += timeout_ms as u64;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dummy, I2cMasterAction, SpiMasterAction};
    use promira_core::*;

    struct Open {
        dummy: Dummy,
        conn: ConnectionHandle,
        channel: ChannelHandle,
    }

    fn open() -> Open {
        let dummy = Dummy::new_default();
        let pm = dummy.platform();
        let handle = pm.open("192.168.11.240").unwrap();
        pm.load(handle, PROMACT_IS_APP).unwrap();
        let app = dummy.app();
        let conn = app.connect("192.168.11.240").unwrap();
        let channel = app.channel_open(conn).unwrap();
        Open {
            dummy,
            conn,
            channel,
        }
    }

    fn collect_all(app: &dyn Promact, collect: CollectHandle) -> Vec<(Response, Vec<u8>)> {
        let mut out = Vec::new();
        while let Some(resp) = app.collect_resp(collect, -1).unwrap() {
            let mut buf = vec![0u8; resp.length.max(0) as usize];
            if resp.kind() == Some(Command::SpiRead) {
                app.collect_spi_read(collect, &mut buf).unwrap();
            }
            out.push((resp, buf));
        }
        out
    }

    #[test]
    fn test_connect_needs_loaded_app() {
        let dummy = Dummy::new_default();
        assert_eq!(
            dummy.app().connect("192.168.11.240"),
            Err(Error::App(AppStatus::UnableToOpen))
        );
    }

    #[test]
    fn test_subsystem_checks() {
        let o = open();
        let app = o.dummy.app();
        app.configure(o.channel, AppConfig::GPIO).unwrap();
        assert_eq!(
            app.i2c_bitrate(o.channel, 100),
            Err(Error::App(AppStatus::I2cNotEnabled))
        );
        assert_eq!(
            app.spi_bitrate(o.channel, 1000),
            Err(Error::App(AppStatus::SpiNotEnabled))
        );
        // Pull-ups are on the adapter, not the subsystem
        assert_eq!(app.i2c_pullup(o.channel, Pullup::NONE), Ok(Pullup::NONE));

        app.configure(o.channel, AppConfig::I2C).unwrap();
        assert_eq!(app.i2c_bitrate(o.channel, 400), Ok(400));
    }

    #[test]
    fn test_i2c_eeprom_direct() {
        let o = open();
        let app = o.dummy.app();
        assert_eq!(
            app.i2c_write(o.channel, 0x50, I2cFlags::empty(), &[0x00, 1, 2, 3])
                .unwrap(),
            4
        );
        assert_eq!(
            app.i2c_write(o.channel, 0x50, I2cFlags::NO_STOP, &[0x00])
                .unwrap(),
            1
        );
        let mut buf = [0u8; 3];
        assert_eq!(
            app.i2c_read(o.channel, 0x50, I2cFlags::empty(), &mut buf)
                .unwrap(),
            3
        );
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(
            app.i2c_write(o.channel, 0x51, I2cFlags::empty(), &[0])
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_i2c_queue() {
        let o = open();
        let app = o.dummy.app();
        let queue = app.queue_create(o.conn, ModuleId::I2cActive).unwrap();
        app.queue_i2c_write(queue, 0x50, I2cFlags::empty(), &[0x10, 0xab])
            .unwrap();
        app.queue_i2c_write(queue, 0x50, I2cFlags::NO_STOP, &[0x10])
            .unwrap();
        app.queue_i2c_read(queue, 0x50, I2cFlags::empty(), 1).unwrap();
        assert_eq!(app.queue_size(queue).unwrap(), 3);
        assert_eq!(
            app.queue_spi_ss(queue, 1),
            Err(Error::App(AppStatus::QueueInvalidCmdType))
        );

        let collect = app.queue_submit(queue, o.channel, 0).unwrap();
        let first = app.collect_resp(collect, -1).unwrap().unwrap();
        assert_eq!(first.kind(), Some(Command::I2cWrite));
        assert_eq!(app.collect_i2c_write(collect).unwrap(), 2);
        let mut buf = [0u8; 1];
        assert_eq!(
            app.collect_i2c_read(collect, &mut buf),
            Err(Error::App(AppStatus::MismatchedCmd))
        );
        app.collect_resp(collect, -1).unwrap();
        app.collect_resp(collect, -1).unwrap();
        assert_eq!(app.collect_i2c_read(collect, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0xab);
        assert_eq!(app.collect_resp(collect, -1).unwrap(), None);
    }

    #[test]
    fn test_spi_eeprom_queue_round_trip() {
        let o = open();
        let app = o.dummy.app();
        app.spi_enable_ss(o.channel, 0x1).unwrap();
        let queue = app.queue_create(o.conn, ModuleId::SpiActive).unwrap();
        app.queue_spi_oe(queue, true).unwrap();
        app.queue_spi_ss(queue, 0x1).unwrap();
        app.queue_spi_write(queue, SpiIoMode::Standard, 8, 1, &[0x06])
            .unwrap();
        app.queue_spi_ss(queue, 0).unwrap();
        app.queue_spi_ss(queue, 0x1).unwrap();
        app.queue_spi_write(queue, SpiIoMode::Standard, 8, 5, &[0x02, 0x00, 0x40, 0xde, 0xad])
            .unwrap();
        app.queue_spi_ss(queue, 0).unwrap();
        app.queue_spi_ss(queue, 0x1).unwrap();
        app.queue_spi_write(queue, SpiIoMode::Standard, 8, 3, &[0x03, 0x00, 0x40])
            .unwrap();
        app.queue_spi_write_word(queue, SpiIoMode::Standard, 8, 2, 0)
            .unwrap();
        app.queue_spi_ss(queue, 0).unwrap();
        let collect = app.queue_submit(queue, o.channel, 0).unwrap();

        let reads: Vec<Vec<u8>> = collect_all(&app, collect)
            .into_iter()
            .filter(|(r, _)| r.kind() == Some(Command::SpiRead))
            .map(|(_, data)| data)
            .collect();
        assert_eq!(reads.last().unwrap(), &vec![0xde, 0xad]);
        assert_eq!(&o.dummy.spi_eeprom()[0x40..0x42], &[0xde, 0xad]);
    }

    #[test]
    fn test_spi_without_output_enable() {
        let o = open();
        let app = o.dummy.app();
        app.spi_enable_ss(o.channel, 0x1).unwrap();
        let queue = app.queue_create(o.conn, ModuleId::SpiActive).unwrap();
        app.queue_spi_ss(queue, 0x1).unwrap();
        let collect = app.queue_submit(queue, o.channel, 0).unwrap();
        let resp = app.collect_resp(collect, -1).unwrap().unwrap();
        assert_eq!(resp.result, AppStatus::SpiOutputNotEnabled.code());
    }

    #[test]
    fn test_empty_queue_and_async() {
        let o = open();
        let app = o.dummy.app();
        let queue = app.queue_create(o.conn, ModuleId::I2cActive).unwrap();
        assert_eq!(
            app.queue_submit(queue, o.channel, 0),
            Err(Error::App(AppStatus::QueueEmpty))
        );

        app.queue_delay_ms(queue, 5).unwrap();
        app.queue_async_submit(queue, o.channel, 0).unwrap();
        assert_eq!(app.channel_uncollected_count(o.channel).unwrap(), 1);
        let collect = app.queue_async_collect(o.channel).unwrap();
        let resp = app.collect_resp(collect, -1).unwrap().unwrap();
        assert_eq!(resp.kind(), Some(Command::I2cDelayMs));
        assert_eq!(
            app.queue_async_collect(o.channel),
            Err(Error::App(AppStatus::NoMoreQueuesToCollect))
        );

        app.queue_clear(queue).unwrap();
        assert_eq!(app.queue_size(queue).unwrap(), 0);
    }

    #[test]
    fn test_i2c_slave_script() {
        let o = open();
        let app = o.dummy.app();
        o.dummy.push_i2c_master(I2cMasterAction::Write(vec![9, 8, 7]));
        o.dummy.push_i2c_master(I2cMasterAction::Read(4));

        app.i2c_slave_set_resp(o.channel, b"AB").unwrap();
        assert_eq!(
            app.i2c_slave_poll(o.channel, 100).unwrap(),
            I2cSlaveEvent::NoData
        );
        app.i2c_slave_enable(o.channel, 0x40, 0, 0).unwrap();

        assert_eq!(app.i2c_slave_poll(o.channel, 100).unwrap(), I2cSlaveEvent::Read);
        let mut buf = [0u8; 16];
        assert_eq!(app.i2c_slave_read(o.channel, &mut buf).unwrap(), (0x40, 3));
        assert_eq!(&buf[..3], &[9, 8, 7]);

        assert_eq!(app.i2c_slave_poll(o.channel, 100).unwrap(), I2cSlaveEvent::Write);
        assert_eq!(app.i2c_slave_write_stats(o.channel).unwrap(), (0x40, 4));
        assert_eq!(o.dummy.i2c_slave_sent(), vec![b"ABAB".to_vec()]);
    }

    #[test]
    fn test_spi_slave_requires_output_off() {
        let o = open();
        let app = o.dummy.app();
        let queue = app.queue_create(o.conn, ModuleId::SpiActive).unwrap();
        app.queue_spi_oe(queue, true).unwrap();
        app.queue_submit(queue, o.channel, 0).unwrap();
        assert_eq!(
            app.spi_slave_enable(o.channel, SlaveMode::Standard),
            Err(Error::App(AppStatus::SpiOutputEnabled))
        );

        app.queue_clear(queue).unwrap();
        app.queue_spi_oe(queue, false).unwrap();
        app.queue_submit(queue, o.channel, 0).unwrap();
        app.spi_slave_enable(o.channel, SlaveMode::Standard).unwrap();

        o.dummy.push_spi_master(SpiMasterAction::Transfer(vec![1, 2, 3]));
        assert_eq!(app.spi_slave_poll(o.channel, 10).unwrap(), SpiSlaveEvent::Data);
        let mut buf = [0u8; 8];
        let (info, n) = app.spi_slave_read(o.channel, &mut buf).unwrap();
        assert_eq!(n, 3);
        assert_eq!(info.in_data_bits, 24);
        assert!(info.is_last);
    }

    #[test]
    fn test_gpio_change_timeout_counts_time() {
        let o = open();
        let app = o.dummy.app();
        app.configure(o.channel, AppConfig::GPIO).unwrap();
        app.gpio_direction(o.channel, 0).unwrap();
        let before = app.gpio_get(o.channel).unwrap();
        assert_eq!(app.gpio_change(o.channel, 2000).unwrap(), before);
        assert_eq!(o.dummy.slept_ms(), 2000);

        o.dummy.push_gpio_change(0x6);
        assert_eq!(app.gpio_change(o.channel, 2000).unwrap(), 0x6);
        assert_eq!(o.dummy.slept_ms(), 2000);
    }

    #[test]
    fn test_disconnect_drops_channels() {
        let o = open();
        let app = o.dummy.app();
        app.disconnect(o.conn).unwrap();
        assert_eq!(
            app.channel_close(o.channel),
            Err(Error::App(AppStatus::InvalidHandle))
        );
    }
}
