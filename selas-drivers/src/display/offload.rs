//! FIFO offload KS0108 transport
//!
//! The timing-critical half of this transport lives in hardware: two
//! fixed-rate consumer pipelines (PIO state machines, or a timer ISR
//! feeding the bus) drain their own input queues at the same fixed
//! clock. The control pipeline shifts a 4-bit word onto the RW, RS and
//! chip-select lines; the data pipeline shifts an 8-bit word onto the
//! data lines while strobing enable. Output timing is therefore immune
//! to host scheduling jitter, and no busy polling is needed.
//!
//! The pipelines know nothing about each other. The only cross-queue
//! ordering guarantee is enqueue order at matching fixed drain rates,
//! so this producer must push the control word for a page/chip
//! selection before every data word that selection governs - exactly
//! the command sequence of the shared write protocol.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use selas_core::geometry::{Geometry, CHIP_COLUMNS};
use selas_core::traits::Display;
use selas_hal::gpio::OutputPin;

use super::{cmd, Error};

/// Fixed-rate word consumer feeding one pipeline
///
/// Implementations drain pushed words in FIFO order at a fixed rate,
/// independent of the host. `push` blocks while the queue is full.
pub trait FifoTx {
    /// Enqueue one word
    fn push(&mut self, word: u32);
}

/// Control word: read/write line (always 0 here - writes only)
pub const CTRL_RW: u32 = 1 << 0;

/// Control word: register-select line (0 = command, 1 = data)
pub const CTRL_RS: u32 = 1 << 1;

/// Control word: first chip-select line; chip `n` maps to bit `2 + n`
pub const CTRL_CS0: u32 = 1 << 2;

/// Chips addressable within the 4-bit control word
pub const MAX_CHIPS: usize = 2;

/// Build the control word selecting `chip` in command or data mode
pub const fn ctrl_word(chip: usize, data_mode: bool) -> u32 {
    let rs = if data_mode { CTRL_RS } else { 0 };
    rs | CTRL_CS0 << chip
}

/// KS0108 producer for a two-pipeline offload device
pub struct OffloadKs0108<C, F, O, D> {
    geometry: Geometry,
    ctrl: C,
    data: F,
    reset: Option<O>,
    delay: D,
}

impl<C, F, O, D> OffloadKs0108<C, F, O, D>
where
    C: FifoTx,
    F: FifoTx,
    O: OutputPin,
    D: DelayNs,
{
    /// Create a new producer
    ///
    /// The control word carries one chip-select bit per chip, which
    /// caps this transport at [`MAX_CHIPS`] chips.
    pub fn new(
        geometry: Geometry,
        ctrl: C,
        data: F,
        reset: Option<O>,
        delay: D,
    ) -> Result<Self, Error<Infallible>> {
        if geometry.chips() > MAX_CHIPS {
            return Err(Error::ChipCount);
        }

        Ok(Self {
            geometry,
            ctrl,
            data,
            reset,
            delay,
        })
    }

    fn reset_pulse(&mut self) {
        if let Some(reset) = self.reset.as_mut() {
            reset.set_high();
            self.delay.delay_us(1);
            reset.set_low();
            self.delay.delay_us(1);
            reset.set_high();
        }
    }

    fn write_page(&mut self, buffer: &[u8], page: usize, chip: usize) {
        self.ctrl.push(ctrl_word(chip, true));
        for column in 0..CHIP_COLUMNS {
            self.data
                .push(buffer[self.geometry.buffer_offset(page, chip, column)] as u32);
        }
    }
}

impl<C, F, O, D> Display for OffloadKs0108<C, F, O, D>
where
    C: FifoTx,
    F: FifoTx,
    O: OutputPin,
    D: DelayNs,
{
    type Error = Error<Infallible>;

    fn init(&mut self) -> Result<(), Self::Error> {
        // Park every control line low before releasing the controller
        self.ctrl.push(0x0);
        self.reset_pulse();

        for chip in 0..self.geometry.chips() {
            self.ctrl.push(ctrl_word(chip, false));
            self.data.push(cmd::DISPLAY_ON as u32);
            self.data.push(cmd::DISPLAY_START as u32);
        }
        Ok(())
    }

    fn print_buffer(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
        if buffer.len() != self.geometry.buffer_len() {
            return Err(Error::BufferSize);
        }

        for page in 0..self.geometry.pages() {
            for chip in 0..self.geometry.chips() {
                self.ctrl.push(ctrl_word(chip, false));
                self.data.push(cmd::set_page(page) as u32);
                self.data.push(cmd::RESET_COLUMN as u32);
                self.write_page(buffer, page, chip);
            }
        }
        Ok(())
    }
}
