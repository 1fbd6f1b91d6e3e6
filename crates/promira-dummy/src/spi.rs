//! Emulated SPI bus and targets

use std::any::Any;

/// A device on one slave select line
pub trait SpiTarget: Any + Send {
    /// Slave select asserted
    fn select(&mut self);

    /// Slave select released
    fn deselect(&mut self);

    /// Exchange one byte
    fn transfer(&mut self, mosi: u8) -> u8;

    /// Downcast support for inspection in tests
    fn as_any(&self) -> &dyn Any;
}

const WRSR: u8 = 0x01;
const WRITE: u8 = 0x02;
const READ: u8 = 0x03;
const WRDI: u8 = 0x04;
const RDSR: u8 = 0x05;
const WREN: u8 = 0x06;

const STATUS_WEL: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Opcode,
    Address { opcode: u8, high: Option<u8> },
    Read { addr: usize },
    Write { addr: usize },
    Status,
    Ignore,
}

/// AT25080A-style EEPROM: 1 KiB, 32 byte write pages
///
/// Writes are buffered and committed when slave select is released, and
/// only if a WREN preceded them. Data bytes wrap within the page.
#[derive(Debug, Clone)]
pub struct At25080a {
    memory: Vec<u8>,
    page_size: usize,
    write_enabled: bool,
    phase: Phase,
    pending: Vec<(usize, u8)>,
}

impl Default for At25080a {
    fn default() -> Self {
        Self {
            memory: vec![0xff; 1024],
            page_size: 32,
            write_enabled: false,
            phase: Phase::Opcode,
            pending: Vec::new(),
        }
    }
}

impl At25080a {
    /// EEPROM contents
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Whether the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    fn mask(&self, addr: usize) -> usize {
        addr % self.memory.len()
    }
}

impl SpiTarget for At25080a {
    fn select(&mut self) {
        self.phase = Phase::Opcode;
        self.pending.clear();
    }

    fn deselect(&mut self) {
        if matches!(self.phase, Phase::Write { .. }) {
            if !self.pending.is_empty() {
                for &(addr, byte) in &self.pending {
                    self.memory[addr] = byte;
                }
                log::trace!("at25080a: committed {} bytes", self.pending.len());
            }
            self.write_enabled = false;
        }
        self.pending.clear();
        self.phase = Phase::Opcode;
    }

    fn transfer(&mut self, mosi: u8) -> u8 {
        match self.phase {
            Phase::Opcode => {
                self.phase = match mosi {
                    WREN => {
                        self.write_enabled = true;
                        Phase::Ignore
                    }
                    WRDI => {
                        self.write_enabled = false;
                        Phase::Ignore
                    }
                    RDSR => Phase::Status,
                    READ => Phase::Address {
                        opcode: READ,
                        high: None,
                    },
                    WRITE if self.write_enabled => Phase::Address {
                        opcode: WRITE,
                        high: None,
                    },
                    WRSR | WRITE => Phase::Ignore,
                    _ => Phase::Ignore,
                };
                0xff
            }
            Phase::Address { opcode, high: None } => {
                self.phase = Phase::Address {
                    opcode,
                    high: Some(mosi),
                };
                0xff
            }
            Phase::Address {
                opcode,
                high: Some(high),
            } => {
                let addr = self.mask(((high as usize) << 8) | mosi as usize);
                self.phase = if opcode == READ {
                    Phase::Read { addr }
                } else {
                    Phase::Write { addr }
                };
                0xff
            }
            Phase::Read { addr } => {
                self.phase = Phase::Read {
                    addr: self.mask(addr + 1),
                };
                self.memory[addr]
            }
            Phase::Write { addr } => {
                self.pending.push((addr, mosi));
                let page_base = addr & !(self.page_size - 1);
                let next = page_base + (addr + 1 - page_base) % self.page_size;
                self.phase = Phase::Write { addr: next };
                0xff
            }
            Phase::Status => {
                if self.write_enabled {
                    STATUS_WEL
                } else {
                    0
                }
            }
            Phase::Ignore => 0xff,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Emulated SPI bus with up to 8 slave select lines
#[derive(Default)]
pub struct SpiBus {
    targets: [Option<Box<dyn SpiTarget>>; 8],
    asserted: u8,
    output_enabled: bool,
}

impl SpiBus {
    /// Attach a target to slave select line `line`
    pub fn attach(&mut self, line: usize, target: Box<dyn SpiTarget>) {
        if let Some(slot) = self.targets.get_mut(line) {
            *slot = Some(target);
        }
    }

    /// Target on `line`, if it has type `T`
    pub fn target<T: SpiTarget>(&self, line: usize) -> Option<&T> {
        self.targets
            .get(line)?
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Whether the master drives the bus
    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    /// Enable or disable master output; disabling releases slave select
    pub fn set_output_enabled(&mut self, enable: bool) {
        if !enable {
            self.set_ss(0);
        }
        self.output_enabled = enable;
    }

    /// Drive the slave select lines in `mask`
    pub fn set_ss(&mut self, mask: u8) {
        for (line, slot) in self.targets.iter_mut().enumerate() {
            let bit = 1u8 << line;
            let Some(target) = slot else { continue };
            match (self.asserted & bit != 0, mask & bit != 0) {
                (false, true) => target.select(),
                (true, false) => target.deselect(),
                _ => {}
            }
        }
        self.asserted = mask;
    }

    /// Clock `mosi` out and return what the selected targets sent back
    ///
    /// Lines nobody drives read as 0xff.
    pub fn transfer(&mut self, mosi: &[u8]) -> Vec<u8> {
        let asserted = self.asserted;
        let miso: Vec<u8> = mosi
            .iter()
            .map(|&byte| {
                self.targets
                    .iter_mut()
                    .enumerate()
                    .filter(|(line, _)| asserted & (1 << line) != 0)
                    .filter_map(|(_, slot)| slot.as_mut())
                    .fold(0xff, |acc, target| acc & target.transfer(byte))
            })
            .collect();
        log::trace!("spi ss=0x{:02x} mosi {:02x?} miso {:02x?}", asserted, mosi, miso);
        miso
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(bus: &mut SpiBus, bytes: &[u8]) -> Vec<u8> {
        bus.set_ss(0x1);
        let miso = bus.transfer(bytes);
        bus.set_ss(0);
        miso
    }

    fn bus() -> SpiBus {
        let mut bus = SpiBus::default();
        bus.attach(0, Box::new(At25080a::default()));
        bus.set_output_enabled(true);
        bus
    }

    #[test]
    fn test_write_needs_wren() {
        let mut bus = bus();
        transaction(&mut bus, &[WRITE, 0x00, 0x10, 0xaa]);
        assert_eq!(bus.target::<At25080a>(0).unwrap().memory()[0x10], 0xff);

        transaction(&mut bus, &[WREN]);
        transaction(&mut bus, &[WRITE, 0x00, 0x10, 0xaa]);
        let eeprom = bus.target::<At25080a>(0).unwrap();
        assert_eq!(eeprom.memory()[0x10], 0xaa);
        assert!(!eeprom.write_enabled());
    }

    #[test]
    fn test_read_returns_data_after_header() {
        let mut bus = bus();
        transaction(&mut bus, &[WREN]);
        transaction(&mut bus, &[WRITE, 0x01, 0x00, 1, 2, 3]);
        let miso = transaction(&mut bus, &[READ, 0x01, 0x00, 0, 0, 0]);
        assert_eq!(miso, vec![0xff, 0xff, 0xff, 1, 2, 3]);
    }

    #[test]
    fn test_page_wrap() {
        let mut bus = bus();
        transaction(&mut bus, &[WREN]);
        transaction(&mut bus, &[WRITE, 0x00, 0x1f, 7, 8]);
        let mem = bus.target::<At25080a>(0).unwrap().memory();
        assert_eq!(mem[0x1f], 7);
        assert_eq!(mem[0x00], 8);
        assert_eq!(mem[0x20], 0xff);
    }

    #[test]
    fn test_status_reports_wel() {
        let mut bus = bus();
        transaction(&mut bus, &[WREN]);
        assert_eq!(transaction(&mut bus, &[RDSR, 0]), vec![0xff, STATUS_WEL]);
    }

    #[test]
    fn test_unselected_bus_floats_high() {
        let mut bus = bus();
        assert_eq!(bus.transfer(&[0x03, 0x00]), vec![0xff, 0xff]);
    }
}
