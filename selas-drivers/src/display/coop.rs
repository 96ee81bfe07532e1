//! Cooperative GPIO KS0108 transport
//!
//! Same wire protocol as [`parallel`](super::parallel), but built for a
//! cooperative scheduler: when the controller reports busy, the driver
//! yields before polling again so other tasks run while the previous
//! byte settles. That yield is the only suspension point in the write
//! path. Cancellation is not supported; dropping the future mid-frame
//! leaves the panel partially written.
//!
//! After the command init the driver pushes one all-zero frame so the
//! panel comes up blank instead of showing stale RAM.

use core::convert::Infallible;

use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;
use selas_core::geometry::{Geometry, CHIP_COLUMNS};
use selas_core::traits::AsyncDisplay;
use selas_hal::gpio::{Direction, IoPin, OutputPin, Pull};

use super::{cmd, is_ready, Error, PollBudget, STATUS_BUSY, STATUS_RESET};

/// Cooperative KS0108 driver over a direct GPIO bus
pub struct CoopKs0108<IO, O, D, const CHIPS: usize> {
    geometry: Geometry,
    data: [IO; 8],
    e: O,
    rs: O,
    rw: O,
    cs: [O; CHIPS],
    reset: Option<O>,
    delay: D,
    budget: PollBudget,
}

impl<IO, O, D, const CHIPS: usize> CoopKs0108<IO, O, D, CHIPS>
where
    IO: IoPin,
    O: OutputPin,
    D: DelayNs,
{
    /// Create a new driver
    ///
    /// `geometry.chips()` must equal the number of chip-select pins.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        geometry: Geometry,
        data: [IO; 8],
        e: O,
        rs: O,
        rw: O,
        cs: [O; CHIPS],
        reset: Option<O>,
        delay: D,
    ) -> Result<Self, Error<Infallible>> {
        if geometry.chips() != CHIPS {
            return Err(Error::ChipCount);
        }

        Ok(Self {
            geometry,
            data,
            e,
            rs,
            rw,
            cs,
            reset,
            delay,
            budget: PollBudget::default(),
        })
    }

    /// Replace the busy-poll retry budget
    pub fn with_poll_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Blank the whole panel without needing a caller-side buffer
    pub async fn clear(&mut self) -> Result<(), Error<Infallible>> {
        for page in 0..self.geometry.pages() {
            for chip in 0..self.geometry.chips() {
                self.write_command(cmd::set_page(page), chip).await?;
                self.write_command(cmd::RESET_COLUMN, chip).await?;
                for _ in 0..CHIP_COLUMNS {
                    self.write_data(0x00, chip).await?;
                }
            }
        }
        Ok(())
    }

    async fn write_command(&mut self, command: u8, chip: usize) -> Result<(), Error<Infallible>> {
        self.wait_ready(chip).await?;
        self.set_data_direction(Direction::Output);
        self.select_chip(chip);
        self.rs.set_low();
        self.rw.set_low();

        self.set_data_value(command);
        self.pulse_enable();
        Ok(())
    }

    async fn write_data(&mut self, data: u8, chip: usize) -> Result<(), Error<Infallible>> {
        self.wait_ready(chip).await?;
        self.set_data_direction(Direction::Output);
        self.select_chip(chip);
        self.rs.set_high();
        self.rw.set_low();

        self.set_data_value(data);
        self.pulse_enable();
        Ok(())
    }

    async fn wait_ready(&mut self, chip: usize) -> Result<(), Error<Infallible>> {
        self.set_data_direction(Direction::Input);
        self.select_chip(chip);
        self.rs.set_low();
        self.rw.set_high();

        for _ in 0..self.budget.max_polls {
            self.pulse_enable();
            if is_ready(self.sample_status()) {
                return Ok(());
            }
            yield_now().await;
        }
        Err(Error::ReadyTimeout)
    }

    fn sample_status(&mut self) -> u8 {
        let mut status = 0;
        if self.data[7].is_high() {
            status |= STATUS_BUSY;
        }
        if self.data[4].is_high() {
            status |= STATUS_RESET;
        }
        status
    }

    fn select_chip(&mut self, chip: usize) {
        for (i, cs) in self.cs.iter_mut().enumerate() {
            cs.set_state(i == chip);
        }
    }

    fn set_data_direction(&mut self, direction: Direction) {
        for pin in &mut self.data {
            pin.set_direction(direction, Pull::Down);
        }
    }

    fn set_data_value(&mut self, value: u8) {
        for (i, pin) in self.data.iter_mut().enumerate() {
            pin.set_state(value >> i & 1 != 0);
        }
    }

    fn pulse_enable(&mut self) {
        self.e.set_high();
        self.e.set_low();
    }

    async fn reset_pulse(&mut self) {
        if let Some(reset) = self.reset.as_mut() {
            reset.set_high();
            self.delay.delay_us(1).await;
            reset.set_low();
            self.delay.delay_us(1).await;
            reset.set_high();
        }
    }

    async fn write_page(
        &mut self,
        buffer: &[u8],
        page: usize,
        chip: usize,
    ) -> Result<(), Error<Infallible>> {
        for column in 0..CHIP_COLUMNS {
            self.write_data(buffer[self.geometry.buffer_offset(page, chip, column)], chip)
                .await?;
        }
        Ok(())
    }
}

impl<IO, O, D, const CHIPS: usize> AsyncDisplay for CoopKs0108<IO, O, D, CHIPS>
where
    IO: IoPin,
    O: OutputPin,
    D: DelayNs,
{
    type Error = Error<Infallible>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        self.e.set_low();
        self.rs.set_low();
        self.rw.set_low();
        self.set_data_direction(Direction::Output);
        self.reset_pulse().await;

        for chip in 0..self.geometry.chips() {
            self.write_command(cmd::DISPLAY_ON, chip).await?;
            self.write_command(cmd::DISPLAY_START, chip).await?;
        }

        self.clear().await
    }

    async fn print_buffer(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
        if buffer.len() != self.geometry.buffer_len() {
            return Err(Error::BufferSize);
        }

        for page in 0..self.geometry.pages() {
            for chip in 0..self.geometry.chips() {
                self.write_command(cmd::set_page(page), chip).await?;
                self.write_command(cmd::RESET_COLUMN, chip).await?;
                self.write_page(buffer, page, chip).await?;
            }
        }
        Ok(())
    }
}
