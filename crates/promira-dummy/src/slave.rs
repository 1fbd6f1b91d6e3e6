//! Scripted slave-mode traffic

use promira_core::{I2cSlaveEvent, SpiSlaveEvent, SpiSlaveFlags, SpiSlaveReadInfo};
use std::collections::VecDeque;

/// What an external I2C master does next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cMasterAction {
    /// Master writes these bytes to us
    Write(Vec<u8>),
    /// Master reads this many bytes from us
    Read(usize),
    /// A transaction was lost
    DataLost,
}

#[derive(Debug, Default)]
pub(crate) struct I2cSlave {
    pub addr: Option<u8>,
    pub response: Vec<u8>,
    pub script: VecDeque<I2cMasterAction>,
    pending: Option<I2cMasterAction>,
    lost: usize,
    /// Bytes clocked out to the master, one entry per master read
    pub sent: Vec<Vec<u8>>,
}

impl I2cSlave {
    pub fn poll(&mut self) -> I2cSlaveEvent {
        if self.addr.is_none() {
            return I2cSlaveEvent::NoData;
        }
        let Some(action) = self.script.pop_front() else {
            return I2cSlaveEvent::NoData;
        };
        let event = match &action {
            I2cMasterAction::Write(_) => I2cSlaveEvent::Read,
            I2cMasterAction::Read(n) => {
                let sent = self.response.iter().copied().cycle().take(*n).collect();
                self.sent.push(sent);
                I2cSlaveEvent::Write
            }
            I2cMasterAction::DataLost => {
                self.lost += 1;
                I2cSlaveEvent::DataLost
            }
        };
        self.pending = Some(action);
        event
    }

    /// Data of a pending master write
    pub fn take_write(&mut self) -> Option<Vec<u8>> {
        match self.pending.take() {
            Some(I2cMasterAction::Write(data)) => Some(data),
            other => {
                self.pending = other;
                None
            }
        }
    }

    /// Byte count of a pending master read
    pub fn take_read(&mut self) -> Option<usize> {
        match self.pending.take() {
            Some(I2cMasterAction::Read(n)) => Some(if self.response.is_empty() { 0 } else { n }),
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn take_lost(&mut self) -> usize {
        std::mem::take(&mut self.lost)
    }
}

/// What an external SPI master does next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiMasterAction {
    /// One transfer, as clocked in on MOSI
    Transfer(Vec<u8>),
    /// Transfers dropped because the device queue was full
    DataLost(usize),
}

#[derive(Debug)]
pub(crate) struct SpiSlave {
    pub enabled: bool,
    pub flags: SpiSlaveFlags,
    pub response: Vec<u8>,
    pub host_read_size: usize,
    pub script: VecDeque<SpiMasterAction>,
    chunks: VecDeque<(Vec<u8>, bool)>,
    lost: usize,
}

impl Default for SpiSlave {
    fn default() -> Self {
        Self {
            enabled: false,
            flags: SpiSlaveFlags::empty(),
            response: Vec::new(),
            host_read_size: 65535,
            script: VecDeque::new(),
            chunks: VecDeque::new(),
            lost: 0,
        }
    }
}

impl SpiSlave {
    pub fn poll(&mut self) -> SpiSlaveEvent {
        if !self.enabled {
            return SpiSlaveEvent::NoData;
        }
        if !self.chunks.is_empty() {
            return SpiSlaveEvent::Data;
        }
        match self.script.pop_front() {
            Some(SpiMasterAction::Transfer(data)) => {
                let size = self.host_read_size.max(1);
                let count = data.len().div_ceil(size);
                for (i, chunk) in data.chunks(size).enumerate() {
                    self.chunks.push_back((chunk.to_vec(), i + 1 == count));
                }
                SpiSlaveEvent::Data
            }
            Some(SpiMasterAction::DataLost(n)) => {
                self.lost += n;
                SpiSlaveEvent::DataLost
            }
            None => SpiSlaveEvent::NoData,
        }
    }

    /// Next received chunk, copied into `buf`
    pub fn read(&mut self, buf: &mut [u8]) -> (SpiSlaveReadInfo, usize) {
        let Some((chunk, is_last)) = self.chunks.pop_front() else {
            return (SpiSlaveReadInfo::default(), 0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        let bits = (chunk.len() * 8) as u32;
        let info = SpiSlaveReadInfo {
            in_data_bits: bits,
            out_data_bits: if self.response.is_empty() { 0 } else { bits },
            header_bits: 0,
            resp_id: 0,
            ss_mask: if self.flags.contains(SpiSlaveFlags::NO_SS) { 0 } else { 0x1 },
            is_last,
        };
        (info, n)
    }

    pub fn take_lost(&mut self) -> usize {
        std::mem::take(&mut self.lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i2c_slave_events() {
        let mut slave = I2cSlave {
            addr: Some(0x40),
            response: b"ABC".to_vec(),
            ..Default::default()
        };
        slave.script.push_back(I2cMasterAction::Write(vec![1, 2]));
        slave.script.push_back(I2cMasterAction::Read(5));

        assert_eq!(slave.poll(), I2cSlaveEvent::Read);
        assert_eq!(slave.take_read(), None);
        assert_eq!(slave.take_write(), Some(vec![1, 2]));

        assert_eq!(slave.poll(), I2cSlaveEvent::Write);
        assert_eq!(slave.take_read(), Some(5));
        assert_eq!(slave.sent, vec![b"ABCAB".to_vec()]);

        assert_eq!(slave.poll(), I2cSlaveEvent::NoData);
    }

    #[test]
    fn test_disabled_i2c_slave_sees_nothing() {
        let mut slave = I2cSlave::default();
        slave.script.push_back(I2cMasterAction::DataLost);
        assert_eq!(slave.poll(), I2cSlaveEvent::NoData);
    }

    #[test]
    fn test_spi_transfer_split_by_host_read_size() {
        let mut slave = SpiSlave {
            enabled: true,
            host_read_size: 4,
            ..Default::default()
        };
        slave.script.push_back(SpiMasterAction::Transfer((0..10).collect()));

        assert_eq!(slave.poll(), SpiSlaveEvent::Data);
        let mut buf = [0u8; 16];
        let mut sizes = Vec::new();
        loop {
            let (info, n) = slave.read(&mut buf);
            sizes.push(n);
            if info.is_last {
                break;
            }
            assert_eq!(slave.poll(), SpiSlaveEvent::Data);
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(slave.poll(), SpiSlaveEvent::NoData);
    }

    #[test]
    fn test_spi_data_lost() {
        let mut slave = SpiSlave {
            enabled: true,
            ..Default::default()
        };
        slave.script.push_back(SpiMasterAction::DataLost(3));
        assert_eq!(slave.poll(), SpiSlaveEvent::DataLost);
        assert_eq!(slave.take_lost(), 3);
        assert_eq!(slave.take_lost(), 0);
    }
}
