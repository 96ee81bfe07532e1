//! selas-hal adapters for embassy-rp GPIO types

use embassy_rp::gpio::{Flex, Output, Pull as RpPull};
use selas_hal::gpio::{Direction, InputPin, IoPin, OutputPin, Pull};

/// Push-pull control pin
pub struct RpOutput<'d>(pub Output<'d>);

impl OutputPin for RpOutput<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn toggle(&mut self) {
        self.0.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// Direction-switchable data bus pin
pub struct RpBusPin<'d>(Flex<'d>);

impl<'d> RpBusPin<'d> {
    /// Wrap a flex pin, parked as a low output
    pub fn new(mut pin: Flex<'d>) -> Self {
        pin.set_low();
        pin.set_as_output();
        Self(pin)
    }
}

impl OutputPin for RpBusPin<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn toggle(&mut self) {
        self.0.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

impl InputPin for RpBusPin<'_> {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

impl IoPin for RpBusPin<'_> {
    fn set_direction(&mut self, direction: Direction, pull: Pull) {
        match direction {
            Direction::Input => {
                self.0.set_as_input();
                self.0.set_pull(match pull {
                    Pull::None => RpPull::None,
                    Pull::Up => RpPull::Up,
                    Pull::Down => RpPull::Down,
                });
            }
            Direction::Output => self.0.set_as_output(),
        }
    }
}
