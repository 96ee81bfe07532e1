//! Direct GPIO KS0108 transport
//!
//! Drives the controller over a raw parallel bus: eight
//! direction-switchable data lines plus enable, register-select,
//! read/write, and one chip select per 64-column chip. Before every
//! byte the driver turns the data bus around, strobes enable in read
//! mode, and samples the status flags until the controller reports
//! ready. The poll spins with no explicit delay - pin toggling alone
//! exceeds the controller's minimum pulse timing - and only the reset
//! pulse uses the delay provider.
//!
//! The bus is exclusively owned by the driver instance; `&mut self`
//! receivers make concurrent callers unrepresentable.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use selas_core::geometry::{Geometry, CHIP_COLUMNS};
use selas_core::traits::Display;
use selas_hal::gpio::{Direction, IoPin, OutputPin, Pull};

use super::{cmd, is_ready, Error, PollBudget, STATUS_BUSY, STATUS_RESET};

/// Blocking KS0108 driver over a direct GPIO bus
pub struct ParallelKs0108<IO, O, D, const CHIPS: usize> {
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

impl<IO, O, D, const CHIPS: usize> ParallelKs0108<IO, O, D, CHIPS>
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
    pub fn clear(&mut self) -> Result<(), Error<Infallible>> {
        for page in 0..self.geometry.pages() {
            for chip in 0..self.geometry.chips() {
                self.write_command(cmd::set_page(page), chip)?;
                self.write_command(cmd::RESET_COLUMN, chip)?;
                for _ in 0..CHIP_COLUMNS {
                    self.write_data(0x00, chip)?;
                }
            }
        }
        Ok(())
    }

    /// Switch the panel on or off without touching its RAM
    pub fn set_display_on(&mut self, on: bool) -> Result<(), Error<Infallible>> {
        let command = if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF };
        for chip in 0..self.geometry.chips() {
            self.write_command(command, chip)?;
        }
        Ok(())
    }

    fn write_command(&mut self, command: u8, chip: usize) -> Result<(), Error<Infallible>> {
        self.wait_ready(chip)?;
        self.set_data_direction(Direction::Output);
        self.select_chip(chip);
        self.rs.set_low();
        self.rw.set_low();

        self.set_data_value(command);
        self.pulse_enable();
        Ok(())
    }

    fn write_data(&mut self, data: u8, chip: usize) -> Result<(), Error<Infallible>> {
        self.wait_ready(chip)?;
        self.set_data_direction(Direction::Output);
        self.select_chip(chip);
        self.rs.set_high();
        self.rw.set_low();

        self.set_data_value(data);
        self.pulse_enable();
        Ok(())
    }

    fn wait_ready(&mut self, chip: usize) -> Result<(), Error<Infallible>> {
        self.set_data_direction(Direction::Input);
        self.select_chip(chip);
        self.rs.set_low();
        self.rw.set_high();

        for _ in 0..self.budget.max_polls {
            self.pulse_enable();
            if is_ready(self.sample_status()) {
                return Ok(());
            }
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

    fn reset_pulse(&mut self) {
        if let Some(reset) = self.reset.as_mut() {
            reset.set_high();
            self.delay.delay_us(1);
            reset.set_low();
            self.delay.delay_us(1);
            reset.set_high();
        }
    }

    fn write_page(&mut self, buffer: &[u8], page: usize, chip: usize) -> Result<(), Error<Infallible>> {
        for column in 0..CHIP_COLUMNS {
            self.write_data(buffer[self.geometry.buffer_offset(page, chip, column)], chip)?;
        }
        Ok(())
    }
}

impl<IO, O, D, const CHIPS: usize> Display for ParallelKs0108<IO, O, D, CHIPS>
where
    IO: IoPin,
    O: OutputPin,
    D: DelayNs,
{
    type Error = Error<Infallible>;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.e.set_low();
        self.rs.set_low();
        self.rw.set_low();
        self.set_data_direction(Direction::Output);
        self.reset_pulse();

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

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock pin that remembers its level and direction
    struct TestPin {
        level: bool,
        direction: Direction,
    }

    impl TestPin {
        fn new() -> Self {
            Self {
                level: false,
                direction: Direction::Input,
            }
        }
    }

    impl OutputPin for TestPin {
        fn set_high(&mut self) {
            self.level = true;
        }

        fn set_low(&mut self) {
            self.level = false;
        }

        fn toggle(&mut self) {
            self.level = !self.level;
        }

        fn is_set_high(&self) -> bool {
            self.level
        }
    }

    impl selas_hal::gpio::InputPin for TestPin {
        fn is_high(&self) -> bool {
            self.level
        }
    }

    impl IoPin for TestPin {
        fn set_direction(&mut self, direction: Direction, _pull: Pull) {
            self.direction = direction;
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn driver() -> ParallelKs0108<TestPin, TestPin, NoDelay, 2> {
        let geometry = Geometry::new(128, 64).unwrap();
        ParallelKs0108::new(
            geometry,
            core::array::from_fn(|_| TestPin::new()),
            TestPin::new(),
            TestPin::new(),
            TestPin::new(),
            core::array::from_fn(|_| TestPin::new()),
            None,
            NoDelay,
        )
        .unwrap()
    }

    #[test]
    fn test_chip_count_mismatch() {
        let geometry = Geometry::new(192, 64).unwrap();
        let result: Result<ParallelKs0108<TestPin, TestPin, NoDelay, 2>, _> = ParallelKs0108::new(
            geometry,
            core::array::from_fn(|_| TestPin::new()),
            TestPin::new(),
            TestPin::new(),
            TestPin::new(),
            core::array::from_fn(|_| TestPin::new()),
            None,
            NoDelay,
        );
        assert!(matches!(result, Err(Error::ChipCount)));
    }

    #[test]
    fn test_select_chip_is_exclusive() {
        let mut drv = driver();

        drv.select_chip(1);
        assert!(!drv.cs[0].level);
        assert!(drv.cs[1].level);

        drv.select_chip(0);
        assert!(drv.cs[0].level);
        assert!(!drv.cs[1].level);
    }

    #[test]
    fn test_write_command_drives_bus() {
        let mut drv = driver();

        drv.write_command(0xB8, 0).unwrap();

        // Command mode: RS low, RW low, data pins back in output mode
        assert!(!drv.rs.level);
        assert!(!drv.rw.level);
        assert!(drv.data.iter().all(|p| p.direction == Direction::Output));
        // 0xB8 = 0b1011_1000 across the data pins
        let value = drv
            .data
            .iter()
            .enumerate()
            .fold(0u8, |v, (i, p)| v | (p.level as u8) << i);
        assert_eq!(value, 0xB8);
        // Enable parked low after the strobe
        assert!(!drv.e.level);
    }

    #[test]
    fn test_busy_controller_times_out() {
        let mut drv = driver().with_poll_budget(PollBudget { max_polls: 8 });
        // Status bit 7 stuck high
        drv.data[7].level = true;

        assert_eq!(drv.write_data(0xFF, 0), Err(Error::ReadyTimeout));
    }

    #[test]
    fn test_buffer_length_is_validated() {
        let mut drv = driver();
        let short = [0u8; 100];

        assert_eq!(drv.print_buffer(&short), Err(Error::BufferSize));
    }
}
