//! Single-pin adapter over a shared expander
//!
//! Lets peripheral code written against individual pins sit behind the
//! SPI relay: each adapter owns one pin index and borrows the expander
//! through a `RefCell`, so several adapters can share one device within
//! a single execution context.
//!
//! Reads come from the shadow state. Refresh the snapshot (or run the
//! interrupt service) to observe external level changes, and do not
//! call back into a pin from an edge callback - the expander is already
//! borrowed while dispatching.

use core::cell::RefCell;

use selas_hal::gpio::{Direction, OutputPin};
use selas_hal::spi::SpiBus;

use super::mcp23s17::{flags, EdgeCallback, EdgeTrigger, Error, Mcp23S17};

/// One expander pin with the familiar pin verbs
pub struct ExpanderPin<'a, SPI, CS> {
    expander: &'a RefCell<Mcp23S17<SPI, CS>>,
    pin: u8,
}

impl<'a, SPI, CS, E> ExpanderPin<'a, SPI, CS>
where
    SPI: SpiBus<Error = E>,
    CS: OutputPin,
{
    /// Claim `pin` on the shared expander and configure it
    ///
    /// Input pins get interrupt-on-change (against the previous value)
    /// plus the pull-up, matching how panel buttons and encoder lines
    /// are wired; output pins get a plain push-pull setup.
    pub fn new(
        expander: &'a RefCell<Mcp23S17<SPI, CS>>,
        pin: u8,
        direction: Direction,
    ) -> Result<Self, Error<E>> {
        let setup_flags = match direction {
            Direction::Input => flags::INT_ENABLE | flags::PULL_UP,
            Direction::Output => 0,
        };
        expander.borrow_mut().setup(pin, direction, setup_flags)?;

        Ok(Self { expander, pin })
    }

    /// Reconfigure the pin direction
    pub fn set_direction(&self, direction: Direction) -> Result<(), Error<E>> {
        let setup_flags = match direction {
            Direction::Input => flags::INT_ENABLE | flags::PULL_UP,
            Direction::Output => 0,
        };
        self.expander.borrow_mut().setup(self.pin, direction, setup_flags)
    }

    /// Drive the pin high
    pub fn set_high(&self) -> Result<(), Error<E>> {
        self.expander.borrow_mut().output(self.pin, true)
    }

    /// Drive the pin low
    pub fn set_low(&self) -> Result<(), Error<E>> {
        self.expander.borrow_mut().output(self.pin, false)
    }

    /// Invert the pin's shadow level
    pub fn toggle(&self) -> Result<(), Error<E>> {
        let level = self.is_high()?;
        self.expander.borrow_mut().output(self.pin, !level)
    }

    /// Read the pin's shadow level
    pub fn is_high(&self) -> Result<bool, Error<E>> {
        self.expander.borrow().input(self.pin)
    }

    /// Register an edge callback for this pin
    pub fn on_edge(&self, trigger: EdgeTrigger, callback: EdgeCallback) -> Result<(), Error<E>> {
        self.expander.borrow_mut().subscribe(self.pin, trigger, callback)
    }
}
