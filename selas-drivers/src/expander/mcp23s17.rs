//! MCP23S17 SPI GPIO expander driver
//!
//! Every hardware register has a software shadow. Mutations recompute
//! the full 8-bit register value from shadow state and write it whole -
//! the device's documented register semantics do not cover partial
//! writes, so no delta-write shortcut is taken. Logical reads come from
//! the shadows without touching the bus; only [`Mcp23S17::read_gpio`]
//! (and the refresh paths built on it) issues a read transaction.
//!
//! # Transaction framing
//!
//! One command byte (`0x40 | addr << 1` write, `0x41 | addr << 1` read),
//! the register address, then data. With sequential-operation mode
//! enabled in IOCON a 16-bit port access is a single two-byte
//! transaction; otherwise it is two discrete single-byte transactions,
//! and an external pin change landing between them is observable as a
//! torn snapshot.
//!
//! # Edge dispatch
//!
//! Edges are detected purely by diffing consecutive 16-bit snapshots;
//! the INTF/INTCAP registers are not consulted. Two edges on one pin
//! between services coalesce into the final value, and edges on
//! different pins land in one dispatch round. [`Mcp23S17::service_interrupt`]
//! runs from normal execution context: wire the INT line so the
//! application calls it after the line fires rather than from the
//! interrupt handler, which keeps bus transactions un-reentered.

use heapless::Vec;
use selas_hal::gpio::{Direction, OutputPin};
use selas_hal::spi::SpiBus;

/// Register addresses (IOCON.BANK = 0 layout)
pub mod reg {
    /// Port A direction (1 = input)
    pub const IODIRA: u8 = 0x00;
    /// Port B direction
    pub const IODIRB: u8 = 0x01;
    /// Port A input polarity
    pub const IPOLA: u8 = 0x02;
    /// Port B input polarity
    pub const IPOLB: u8 = 0x03;
    /// Port A interrupt-on-change enable
    pub const GPINTENA: u8 = 0x04;
    /// Port B interrupt-on-change enable
    pub const GPINTENB: u8 = 0x05;
    /// Port A default compare value
    pub const DEFVALA: u8 = 0x06;
    /// Port B default compare value
    pub const DEFVALB: u8 = 0x07;
    /// Port A interrupt control (compare against DEFVAL or previous)
    pub const INTCONA: u8 = 0x08;
    /// Port B interrupt control
    pub const INTCONB: u8 = 0x09;
    /// Global configuration
    pub const IOCON: u8 = 0x0A;
    /// Port A pull-up enable
    pub const GPPUA: u8 = 0x0C;
    /// Port B pull-up enable
    pub const GPPUB: u8 = 0x0D;
    /// Port A interrupt flags (unused - edges come from snapshot diffs)
    pub const INTFA: u8 = 0x0E;
    /// Port B interrupt flags (unused)
    pub const INTFB: u8 = 0x0F;
    /// Port A interrupt capture (unused)
    pub const INTCAPA: u8 = 0x10;
    /// Port B interrupt capture (unused)
    pub const INTCAPB: u8 = 0x11;
    /// Port A data
    pub const GPIOA: u8 = 0x12;
    /// Port B data
    pub const GPIOB: u8 = 0x13;
    /// Port A output latch
    pub const OLATA: u8 = 0x14;
    /// Port B output latch
    pub const OLATB: u8 = 0x15;
}

/// IOCON bit flags
pub mod iocon {
    /// INT pin active-high
    pub const INTPOL: u8 = 0x02;
    /// INT pin open-drain
    pub const ODR: u8 = 0x04;
    /// Hardware address enable
    pub const HAEN: u8 = 0x08;
    /// Disable SDA slew rate control
    pub const DISSLW: u8 = 0x10;
    /// Sequential operation disabled when set
    pub const SEQOP: u8 = 0x20;
    /// Mirror the two INT pins
    pub const MIRROR: u8 = 0x40;
    /// Split register banks
    pub const BANK: u8 = 0x80;
}

/// Per-pin setup flags for [`Mcp23S17::setup`]
pub mod flags {
    /// Invert the input polarity
    pub const INVERT_POLARITY: u8 = 0x01;
    /// Enable interrupt-on-change
    pub const INT_ENABLE: u8 = 0x02;
    /// Compare value for DEFVAL-based interrupts is high
    pub const INT_DEFAULT_HIGH: u8 = 0x04;
    /// Interrupt compares against DEFVAL instead of the previous value
    pub const INT_COMPARE_DEFAULT: u8 = 0x08;
    /// Enable the internal pull-up
    pub const PULL_UP: u8 = 0x10;
}

const CMD_WRITE: u8 = 0x40;
const CMD_READ: u8 = 0x41;

/// Pins on the expander
pub const PINS: usize = 16;

const PORT_PINS: u8 = 8;

/// Edge subscriptions per expander instance
pub const MAX_SUBSCRIPTIONS: usize = 8;

/// Edge filter for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTrigger {
    /// Low-to-high transitions only
    Rising,
    /// High-to-low transitions only
    Falling,
    /// Any transition
    Both,
}

impl EdgeTrigger {
    fn matches(self, new_level: bool) -> bool {
        match self {
            EdgeTrigger::Rising => new_level,
            EdgeTrigger::Falling => !new_level,
            EdgeTrigger::Both => true,
        }
    }
}

/// Callback invoked with (pin, new level) on a matching edge
pub type EdgeCallback = fn(u8, bool);

/// Expander errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Pin index outside 0..16
    InvalidPin,
    /// Subscription table full
    SubscriberLimit,
    /// SPI transaction failed
    Bus(E),
}

/// Expander configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExpanderConfig {
    /// Hardware address set by the A0-A2 pins (0-7)
    pub device_id: u8,
    /// IOCON value written during init
    pub iocon: u8,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            iocon: iocon::HAEN,
        }
    }
}

/// Shadow copies of one port's registers
#[derive(Debug, Clone, Copy, Default)]
struct PortShadow {
    iodir: u8,
    ipol: u8,
    gpinten: u8,
    defval: u8,
    intcon: u8,
    gppu: u8,
    gpio: u8,
}

struct Subscription {
    pin: u8,
    trigger: EdgeTrigger,
    callback: EdgeCallback,
}

/// MCP23S17 16-bit SPI GPIO expander
pub struct Mcp23S17<SPI, CS> {
    spi: SPI,
    cs: CS,
    /// Device id pre-shifted into command-byte position
    addr: u8,
    iocon: u8,
    a: PortShadow,
    b: PortShadow,
    subscriptions: Vec<Subscription, MAX_SUBSCRIPTIONS>,
}

impl<SPI, CS, E> Mcp23S17<SPI, CS>
where
    SPI: SpiBus<Error = E>,
    CS: OutputPin,
{
    /// Create a new expander handle
    ///
    /// Call [`init`](Self::init) before any pin operation.
    pub fn new(spi: SPI, cs: CS, config: ExpanderConfig) -> Self {
        Self {
            spi,
            cs,
            addr: (config.device_id & 0x07) << 1,
            iocon: config.iocon,
            a: PortShadow::default(),
            b: PortShadow::default(),
            subscriptions: Vec::new(),
        }
    }

    /// Write IOCON and put every pin into its power-on default:
    /// input with the pull-up enabled.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        self.cs.set_high();
        self.write_register(reg::IOCON, self.iocon)?;

        for pin in 0..PINS as u8 {
            self.setup(pin, Direction::Input, flags::PULL_UP)?;
        }
        Ok(())
    }

    /// Configure one pin: direction plus the [`flags`] bits
    ///
    /// Recomputes and rewrites all six configuration registers of the
    /// pin's port in full.
    pub fn setup(&mut self, pin: u8, direction: Direction, setup_flags: u8) -> Result<(), Error<E>> {
        validate_pin(pin)?;
        let mask = pin_mask(pin);
        let offset = pin / PORT_PINS;

        let port = if pin < PORT_PINS { &mut self.a } else { &mut self.b };
        set_bit(&mut port.iodir, mask, matches!(direction, Direction::Input));
        set_bit(&mut port.ipol, mask, setup_flags & flags::INVERT_POLARITY != 0);
        set_bit(&mut port.gpinten, mask, setup_flags & flags::INT_ENABLE != 0);
        set_bit(&mut port.defval, mask, setup_flags & flags::INT_DEFAULT_HIGH != 0);
        set_bit(&mut port.intcon, mask, setup_flags & flags::INT_COMPARE_DEFAULT != 0);
        set_bit(&mut port.gppu, mask, setup_flags & flags::PULL_UP != 0);
        let shadow = *port;

        self.write_register(reg::IODIRA + offset, shadow.iodir)?;
        self.write_register(reg::IPOLA + offset, shadow.ipol)?;
        self.write_register(reg::GPINTENA + offset, shadow.gpinten)?;
        self.write_register(reg::DEFVALA + offset, shadow.defval)?;
        self.write_register(reg::INTCONA + offset, shadow.intcon)?;
        self.write_register(reg::GPPUA + offset, shadow.gppu)
    }

    /// Enable or disable the pull-up on one pin
    pub fn pullup(&mut self, pin: u8, enabled: bool) -> Result<(), Error<E>> {
        validate_pin(pin)?;
        let mask = pin_mask(pin);
        let offset = pin / PORT_PINS;

        let port = if pin < PORT_PINS { &mut self.a } else { &mut self.b };
        set_bit(&mut port.gppu, mask, enabled);
        let gppu = port.gppu;

        self.write_register(reg::GPPUA + offset, gppu)
    }

    /// Drive one output pin
    pub fn output(&mut self, pin: u8, level: bool) -> Result<(), Error<E>> {
        validate_pin(pin)?;
        let mask = pin_mask(pin);
        let offset = pin / PORT_PINS;

        let port = if pin < PORT_PINS { &mut self.a } else { &mut self.b };
        set_bit(&mut port.gpio, mask, level);
        let gpio = port.gpio;

        self.write_register(reg::GPIOA + offset, gpio)
    }

    /// Drive several output pins with one 16-bit port write
    pub fn output_pins(&mut self, mapping: &[(u8, bool)]) -> Result<(), Error<E>> {
        for &(pin, _) in mapping {
            validate_pin(pin)?;
        }

        for &(pin, level) in mapping {
            let mask = pin_mask(pin);
            let port = if pin < PORT_PINS { &mut self.a } else { &mut self.b };
            set_bit(&mut port.gpio, mask, level);
        }

        let snapshot = self.gpio_snapshot();
        self.write_register_word(reg::GPIOA, snapshot)
    }

    /// Read one pin's logical level from the shadow state
    ///
    /// No bus transaction; refresh first with [`read_gpio`](Self::read_gpio)
    /// to observe external changes.
    pub fn input(&self, pin: u8) -> Result<bool, Error<E>> {
        validate_pin(pin)?;
        let port = if pin < PORT_PINS { &self.a } else { &self.b };
        Ok(port.gpio & pin_mask(pin) != 0)
    }

    /// Read several pins, optionally refreshing the snapshot first
    pub fn input_pins(
        &mut self,
        pins: &[u8],
        refresh: bool,
    ) -> Result<Vec<bool, PINS>, Error<E>> {
        if pins.len() > PINS {
            return Err(Error::InvalidPin);
        }
        for &pin in pins {
            validate_pin(pin)?;
        }

        if refresh {
            self.read_gpio()?;
        }

        let mut levels = Vec::new();
        for &pin in pins {
            let port = if pin < PORT_PINS { &self.a } else { &self.b };
            let _ = levels.push(port.gpio & pin_mask(pin) != 0);
        }
        Ok(levels)
    }

    /// Set all 16 pins at once and update the shadows
    pub fn write_gpio(&mut self, data: u16) -> Result<(), Error<E>> {
        self.a.gpio = data as u8;
        self.b.gpio = (data >> 8) as u8;
        self.write_register_word(reg::GPIOA, data)
    }

    /// Read all 16 pins from hardware, refreshing the shadows
    pub fn read_gpio(&mut self) -> Result<u16, Error<E>> {
        let data = self.read_register_word(reg::GPIOA)?;
        self.a.gpio = data as u8;
        self.b.gpio = (data >> 8) as u8;
        Ok(data)
    }

    /// Register an edge callback for one pin
    pub fn subscribe(
        &mut self,
        pin: u8,
        trigger: EdgeTrigger,
        callback: EdgeCallback,
    ) -> Result<(), Error<E>> {
        validate_pin(pin)?;
        self.subscriptions
            .push(Subscription {
                pin,
                trigger,
                callback,
            })
            .map_err(|_| Error::SubscriberLimit)
    }

    /// Snapshot, diff, and dispatch edges to subscribers
    ///
    /// Call from normal execution context after the INT line fires.
    /// Callbacks run synchronously here and must not re-enter the
    /// expander.
    pub fn service_interrupt(&mut self) -> Result<(), Error<E>> {
        let previous = self.gpio_snapshot();
        let current = self.read_gpio()?;

        for &(pin, level) in &diff_snapshots(previous, current) {
            for sub in &self.subscriptions {
                if sub.pin == pin && sub.trigger.matches(level) {
                    (sub.callback)(pin, level);
                }
            }
        }
        Ok(())
    }

    /// Borrow the underlying SPI bus
    pub fn bus_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Give back the bus and chip-select pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn gpio_snapshot(&self) -> u16 {
        (self.b.gpio as u16) << 8 | self.a.gpio as u16
    }

    fn sequential_op_enabled(&self) -> bool {
        // SEQOP set means sequential operation disabled
        self.iocon & iocon::SEQOP == 0
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.cs.set_low();
        let result = self.spi.write(&[CMD_WRITE | self.addr, register, value]);
        self.cs.set_high();
        result.map_err(Error::Bus)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut value = [0u8; 1];

        self.cs.set_low();
        let mut result = self.spi.write(&[CMD_READ | self.addr, register]);
        if result.is_ok() {
            result = self.spi.read(&mut value);
        }
        self.cs.set_high();

        result.map_err(Error::Bus)?;
        Ok(value[0])
    }

    fn write_register_word(&mut self, register: u8, data: u16) -> Result<(), Error<E>> {
        if self.sequential_op_enabled() {
            self.cs.set_low();
            let result = self
                .spi
                .write(&[CMD_WRITE | self.addr, register, data as u8, (data >> 8) as u8]);
            self.cs.set_high();
            return result.map_err(Error::Bus);
        }

        self.write_register(register, data as u8)?;
        self.write_register(register + 1, (data >> 8) as u8)
    }

    fn read_register_word(&mut self, register: u8) -> Result<u16, Error<E>> {
        if self.sequential_op_enabled() {
            let mut value = [0u8; 2];

            self.cs.set_low();
            let mut result = self.spi.write(&[CMD_READ | self.addr, register]);
            if result.is_ok() {
                result = self.spi.read(&mut value);
            }
            self.cs.set_high();

            result.map_err(Error::Bus)?;
            return Ok((value[1] as u16) << 8 | value[0] as u16);
        }

        let low = self.read_register(register)?;
        let high = self.read_register(register + 1)?;
        Ok((high as u16) << 8 | low as u16)
    }
}

/// Bit-by-bit diff of two 16-bit port snapshots
///
/// Returns the changed pins with their new levels, lowest pin first.
pub fn diff_snapshots(previous: u16, current: u16) -> Vec<(u8, bool), PINS> {
    let mut changes = Vec::new();
    for pin in 0..PINS as u8 {
        let mask = 1u16 << pin;
        if previous & mask != current & mask {
            let _ = changes.push((pin, current & mask != 0));
        }
    }
    changes
}

fn validate_pin<E>(pin: u8) -> Result<(), Error<E>> {
    if pin >= PINS as u8 {
        return Err(Error::InvalidPin);
    }
    Ok(())
}

fn pin_mask(pin: u8) -> u8 {
    1 << (pin % PORT_PINS)
}

fn set_bit(register: &mut u8, mask: u8, value: bool) {
    if value {
        *register |= mask;
    } else {
        *register &= !mask;
    }
}
