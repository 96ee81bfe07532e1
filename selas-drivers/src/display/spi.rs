//! SPI-expander KS0108 transport
//!
//! Replaces direct pin writes with a 16-bit virtual port on an MCP23S17
//! relay: every logical signal (register-select, read/write, per-chip
//! select, eight data bits) maps onto one expander pin, and each bus
//! operation becomes a single atomic `write_gpio` transaction. Enable
//! stays a direct MCU pin, pulsed with explicit microsecond delays
//! around each virtual-port write because the relay adds unpredictable
//! bus latency. No ready polling is performed - the relay is orders of
//! magnitude slower than the controller's command execution.

use embedded_hal::delay::DelayNs;
use selas_core::geometry::{Geometry, CHIP_COLUMNS};
use selas_core::traits::Display;
use selas_hal::gpio::{Direction, OutputPin};
use selas_hal::spi::SpiBus;

use crate::expander::mcp23s17::PINS;
use crate::expander::{Error as ExpanderError, Mcp23S17};

use super::{cmd, Error};

/// Virtual-port mask for an expander pin index
pub const fn pin(n: u8) -> u16 {
    1 << n
}

/// Signal-to-virtual-port mapping
///
/// Each field holds the single-bit mask of the expander pin carrying
/// that signal; `data[i]` carries data bus bit `i`.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortMap<const CHIPS: usize> {
    /// Register-select line
    pub rs: u16,
    /// Read/write line
    pub rw: u16,
    /// One chip-select line per chip
    pub cs: [u16; CHIPS],
    /// Data bus lines, bit 0 first
    pub data: [u16; 8],
}

impl<const CHIPS: usize> PortMap<CHIPS> {
    /// Union of every mapped pin
    pub fn used_mask(&self) -> u16 {
        let mut mask = self.rs | self.rw;
        for &cs in &self.cs {
            mask |= cs;
        }
        for &data in &self.data {
            mask |= data;
        }
        mask
    }
}

/// KS0108 driver relayed through an MCP23S17 virtual port
pub struct SpiKs0108<SPI, CS, O, D, const CHIPS: usize> {
    geometry: Geometry,
    expander: Mcp23S17<SPI, CS>,
    map: PortMap<CHIPS>,
    e: O,
    delay: D,
    txdata: u16,
}

impl<SPI, CS, O, D, E, const CHIPS: usize> SpiKs0108<SPI, CS, O, D, CHIPS>
where
    SPI: SpiBus<Error = E>,
    CS: OutputPin,
    O: OutputPin,
    D: DelayNs,
{
    /// Create a new driver over an expander handle
    ///
    /// `geometry.chips()` must equal the number of mapped chip selects.
    pub fn new(
        geometry: Geometry,
        expander: Mcp23S17<SPI, CS>,
        map: PortMap<CHIPS>,
        e: O,
        delay: D,
    ) -> Result<Self, Error<ExpanderError<E>>> {
        if geometry.chips() != CHIPS {
            return Err(Error::ChipCount);
        }

        Ok(Self {
            geometry,
            expander,
            map,
            e,
            delay,
            txdata: 0,
        })
    }

    /// Access the underlying expander, e.g. to service its interrupts
    pub fn expander_mut(&mut self) -> &mut Mcp23S17<SPI, CS> {
        &mut self.expander
    }

    /// Switch the panel on or off without touching its RAM
    pub fn set_display_on(&mut self, on: bool) -> Result<(), Error<ExpanderError<E>>> {
        let command = if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF };
        for chip in 0..self.geometry.chips() {
            self.write_command(command, chip)?;
        }
        Ok(())
    }

    fn write_command(&mut self, command: u8, chip: usize) -> Result<(), Error<ExpanderError<E>>> {
        self.select_chip(chip);
        self.set_bit(self.map.rs, false);
        self.set_bit(self.map.rw, false);

        self.set_data_value(command);
        self.flush_port()?;
        self.pulse_enable();
        Ok(())
    }

    fn write_data(&mut self, data: u8, chip: usize) -> Result<(), Error<ExpanderError<E>>> {
        self.select_chip(chip);
        self.set_bit(self.map.rs, true);
        self.set_bit(self.map.rw, false);

        self.set_data_value(data);
        self.flush_port()?;
        self.pulse_enable();
        Ok(())
    }

    fn flush_port(&mut self) -> Result<(), Error<ExpanderError<E>>> {
        self.expander.write_gpio(self.txdata).map_err(Error::Bus)
    }

    fn select_chip(&mut self, chip: usize) {
        for i in 0..CHIPS {
            self.set_bit(self.map.cs[i], i == chip);
        }
    }

    fn set_data_value(&mut self, value: u8) {
        for i in 0..8 {
            self.set_bit(self.map.data[i], value >> i & 1 != 0);
        }
    }

    fn set_bit(&mut self, mask: u16, level: bool) {
        if level {
            self.txdata |= mask;
        } else {
            self.txdata &= !mask;
        }
    }

    fn pulse_enable(&mut self) {
        self.delay.delay_us(1);
        self.e.set_high();
        self.delay.delay_us(1);
        self.e.set_low();
    }

    fn write_page(
        &mut self,
        buffer: &[u8],
        page: usize,
        chip: usize,
    ) -> Result<(), Error<ExpanderError<E>>> {
        for column in 0..CHIP_COLUMNS {
            self.write_data(buffer[self.geometry.buffer_offset(page, chip, column)], chip)?;
        }
        Ok(())
    }
}

impl<SPI, CS, O, D, E, const CHIPS: usize> Display for SpiKs0108<SPI, CS, O, D, CHIPS>
where
    SPI: SpiBus<Error = E>,
    CS: OutputPin,
    O: OutputPin,
    D: DelayNs,
{
    type Error = Error<ExpanderError<E>>;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.e.set_low();
        self.expander.init().map_err(Error::Bus)?;

        // Every mapped signal becomes an expander output
        let used = self.map.used_mask();
        for pin_index in 0..PINS as u8 {
            if used & pin(pin_index) != 0 {
                self.expander
                    .setup(pin_index, Direction::Output, 0)
                    .map_err(Error::Bus)?;
            }
        }

        self.set_bit(self.map.rs, false);
        self.set_bit(self.map.rw, false);

        for chip in 0..self.geometry.chips() {
            self.write_command(cmd::DISPLAY_ON, chip)?;
            self.write_command(cmd::DISPLAY_START, chip)?;
        }
        Ok(())
    }

    fn print_buffer(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
        if buffer.len() != self.geometry.buffer_len() {
            return Err(Error::BufferSize);
        }

        for page in 0..self.geometry.pages() {
            for chip in 0..self.geometry.chips() {
                self.write_command(cmd::set_page(page), chip)?;
                self.write_command(cmd::RESET_COLUMN, chip)?;
                self.write_page(buffer, page, chip)?;
            }
        }
        Ok(())
    }
}
