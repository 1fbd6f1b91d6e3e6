//! Emulated I2C bus and targets

use promira_core::I2cFlags;
use std::any::Any;
use std::collections::BTreeMap;

/// A device answering on the emulated I2C bus
pub trait I2cTarget: Any + Send {
    /// Master writes `data`; returns the number of bytes acknowledged
    fn write(&mut self, data: &[u8]) -> usize;

    /// Master reads into `buf`; returns the number of bytes supplied
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Downcast support for inspection in tests
    fn as_any(&self) -> &dyn Any;
}

/// AT24C02-style EEPROM: 256 bytes, 8 byte write pages
///
/// The first byte of a write sets the address pointer. Data bytes wrap
/// within the current page, reads wrap at the end of the array.
#[derive(Debug, Clone)]
pub struct At24c02 {
    memory: Vec<u8>,
    pointer: u8,
    page_size: usize,
}

impl Default for At24c02 {
    fn default() -> Self {
        Self {
            memory: vec![0xff; 256],
            pointer: 0,
            page_size: 8,
        }
    }
}

impl At24c02 {
    /// EEPROM contents
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }
}

impl I2cTarget for At24c02 {
    fn write(&mut self, data: &[u8]) -> usize {
        let Some((&addr, payload)) = data.split_first() else {
            return 0;
        };
        self.pointer = addr;
        let page_base = addr as usize & !(self.page_size - 1);
        let mut offset = addr as usize - page_base;
        for &byte in payload {
            self.memory[page_base + offset] = byte;
            offset = (offset + 1) % self.page_size;
        }
        self.pointer = (page_base + offset) as u8;
        data.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        for byte in buf.iter_mut() {
            *byte = self.memory[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
        }
        buf.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// PCA9554-style 8-bit I/O expander
///
/// Registers: 0 input, 1 output, 2 polarity inversion, 3 configuration
/// (1 = input). Register writes are recorded in order.
#[derive(Debug, Clone)]
pub struct Pca9554 {
    registers: [u8; 4],
    pointer: u8,
    writes: Vec<(u8, u8)>,
}

impl Default for Pca9554 {
    fn default() -> Self {
        Self {
            registers: [0xff, 0xff, 0x00, 0xff],
            pointer: 0,
            writes: Vec::new(),
        }
    }
}

impl Pca9554 {
    /// Output register
    pub fn output(&self) -> u8 {
        self.registers[1]
    }

    /// Configuration register
    pub fn config(&self) -> u8 {
        self.registers[3]
    }

    /// Every `(register, value)` written so far
    pub fn writes(&self) -> &[(u8, u8)] {
        &self.writes
    }

    fn input(&self) -> u8 {
        // Inputs float high; outputs read back what they drive
        (self.registers[1] & !self.registers[3]) | self.registers[3]
    }
}

impl I2cTarget for Pca9554 {
    fn write(&mut self, data: &[u8]) -> usize {
        let Some((&reg, values)) = data.split_first() else {
            return 0;
        };
        self.pointer = reg & 0x03;
        for &value in values {
            if self.pointer != 0 {
                self.registers[self.pointer as usize] = value;
            }
            self.writes.push((self.pointer, value));
        }
        data.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let value = match self.pointer {
            0 => self.input(),
            p => self.registers[p as usize],
        };
        buf.fill(value);
        buf.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Direction of a recorded transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Master to target
    Write,
    /// Target to master
    Read,
}

/// One transfer seen on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cTransfer {
    /// Target address
    pub addr: u16,
    /// Transfer flags
    pub flags: I2cFlags,
    /// Direction
    pub direction: Direction,
    /// Bytes moved; empty when nothing acknowledged
    pub data: Vec<u8>,
}

/// Emulated I2C bus
#[derive(Default)]
pub struct I2cBus {
    targets: BTreeMap<u16, Box<dyn I2cTarget>>,
    log: Vec<I2cTransfer>,
}

impl I2cBus {
    /// Attach a target at `addr`
    pub fn attach(&mut self, addr: u16, target: Box<dyn I2cTarget>) {
        self.targets.insert(addr, target);
    }

    /// Target at `addr`, if it has type `T`
    pub fn target<T: I2cTarget>(&self, addr: u16) -> Option<&T> {
        self.targets.get(&addr)?.as_any().downcast_ref::<T>()
    }

    /// Transfers so far
    pub fn log(&self) -> &[I2cTransfer] {
        &self.log
    }

    /// Master write; 0 when no target acknowledges
    pub fn write(&mut self, addr: u16, flags: I2cFlags, data: &[u8]) -> usize {
        let n = match self.targets.get_mut(&addr) {
            Some(target) => target.write(data),
            None => 0,
        };
        log::trace!("i2c write 0x{:02x} {:02x?} -> {}", addr, data, n);
        self.log.push(I2cTransfer {
            addr,
            flags,
            direction: Direction::Write,
            data: data[..n].to_vec(),
        });
        n
    }

    /// Master read; 0 when no target acknowledges
    pub fn read(&mut self, addr: u16, flags: I2cFlags, buf: &mut [u8]) -> usize {
        let n = match self.targets.get_mut(&addr) {
            Some(target) => target.read(buf),
            None => 0,
        };
        log::trace!("i2c read 0x{:02x} {} bytes -> {}", addr, buf.len(), n);
        self.log.push(I2cTransfer {
            addr,
            flags,
            direction: Direction::Read,
            data: buf[..n].to_vec(),
        });
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eeprom_page_write_wraps_within_page() {
        let mut eeprom = At24c02::default();
        // Address 6: two bytes fit before the page boundary
        eeprom.write(&[6, 1, 2, 3, 4]);
        assert_eq!(&eeprom.memory()[6..8], &[1, 2]);
        assert_eq!(&eeprom.memory()[0..2], &[3, 4]);
        assert_eq!(eeprom.memory()[8], 0xff);
    }

    #[test]
    fn test_eeprom_random_read() {
        let mut eeprom = At24c02::default();
        eeprom.write(&[0x10, 0xaa, 0xbb]);
        eeprom.write(&[0x10]);
        let mut buf = [0u8; 3];
        assert_eq!(eeprom.read(&mut buf), 3);
        assert_eq!(buf, [0xaa, 0xbb, 0xff]);
    }

    #[test]
    fn test_expander_records_register_writes() {
        let mut exp = Pca9554::default();
        exp.write(&[0x03, 0x00]);
        exp.write(&[0x01, 0xfe]);
        assert_eq!(exp.config(), 0x00);
        assert_eq!(exp.output(), 0xfe);
        assert_eq!(exp.writes(), &[(3, 0x00), (1, 0xfe)]);

        exp.write(&[0x00]);
        let mut buf = [0u8; 1];
        exp.read(&mut buf);
        assert_eq!(buf[0], 0xfe);
    }

    #[test]
    fn test_absent_target_nacks() {
        let mut bus = I2cBus::default();
        bus.attach(0x50, Box::new(At24c02::default()));
        assert_eq!(bus.write(0x51, I2cFlags::empty(), &[0, 1]), 0);
        assert_eq!(bus.write(0x50, I2cFlags::empty(), &[0, 1]), 2);
        assert!(bus.target::<At24c02>(0x50).is_some());
        assert!(bus.target::<Pca9554>(0x50).is_none());
        assert_eq!(bus.log().len(), 2);
        assert!(bus.log()[0].data.is_empty());
    }
}
