//! Emulated GPIO lines

use std::collections::VecDeque;

/// Line with a passive pull-up on the adapter (GPIO2)
const PULLED_UP: u32 = 0x4;

/// Sixteen GPIO lines
///
/// `levels` is what the outside world presents on the pins. Outputs read
/// back what they drive.
#[derive(Debug)]
pub(crate) struct Gpio {
    pub direction: u32,
    pub output: u32,
    pub levels: u32,
    /// Levels applied by successive `gpio_change` calls
    pub changes: VecDeque<u32>,
}

impl Default for Gpio {
    fn default() -> Self {
        Self {
            direction: 0,
            output: 0,
            levels: PULLED_UP,
            changes: VecDeque::new(),
        }
    }
}

impl Gpio {
    const MASK: u32 = 0xffff;

    pub fn set_direction(&mut self, mask: u32) {
        self.direction = mask & Self::MASK;
    }

    pub fn set(&mut self, value: u32) {
        self.output = value & Self::MASK;
    }

    pub fn get(&self) -> u32 {
        ((self.levels & !self.direction) | (self.output & self.direction)) & Self::MASK
    }

    /// Apply the next scripted change, if any; returns the new state
    pub fn change(&mut self) -> (bool, u32) {
        let before = self.get();
        if let Some(levels) = self.changes.pop_front() {
            self.levels = levels;
        }
        let after = self.get();
        (after != before, after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pullup_reads_high_as_input() {
        let mut gpio = Gpio::default();
        gpio.set_direction(0x1 | 0x8);
        gpio.set(0x1);
        assert_eq!(gpio.get() & PULLED_UP, PULLED_UP);
        assert_eq!(gpio.get() & 0x1, 0x1);
        assert_eq!(gpio.get() & 0x2, 0);

        gpio.set_direction(0xffff);
        gpio.set(0);
        assert_eq!(gpio.get(), 0);
    }

    #[test]
    fn test_scripted_change() {
        let mut gpio = Gpio::default();
        assert_eq!(gpio.change(), (false, PULLED_UP));

        gpio.changes.push_back(0x2);
        assert_eq!(gpio.change(), (true, 0x2));
    }
}
