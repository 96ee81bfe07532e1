//! Shared test doubles for the transport suites
//!
//! Simulates the controller side of the bus. Pins hand out by the
//! harness implement the same read / write / configure capability set
//! the drivers expect from real hardware, against shared in-memory
//! state constructed per test. An enable strobe in write mode latches
//! the data lines into a decoded operation; a strobe in read mode
//! presents the next scripted status byte.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use selas_drivers::display::offload::FifoTx;
use selas_hal::gpio::{Direction, InputPin, IoPin, OutputPin, Pull};

/// One decoded bus operation, attributed to the selected chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Command { chip: usize, value: u8 },
    Data { chip: usize, value: u8 },
}

struct LcdState {
    data_levels: [bool; 8],
    data_dirs: [Direction; 8],
    rs: bool,
    rw: bool,
    cs: Vec<bool>,
    enable: bool,
    reset: bool,
    ops: Vec<Op>,
    polls: usize,
    status_script: VecDeque<u8>,
    default_status: u8,
}

impl LcdState {
    fn on_enable_rise(&mut self) {
        if self.rw {
            // Status read: present the next scripted byte
            self.polls += 1;
            let status = self
                .status_script
                .pop_front()
                .unwrap_or(self.default_status);
            for (i, level) in self.data_levels.iter_mut().enumerate() {
                *level = status >> i & 1 != 0;
            }
        } else {
            // Write: latch the byte for the selected chip
            let chip = self
                .cs
                .iter()
                .position(|&cs| cs)
                .expect("write strobe with no chip selected");
            assert_eq!(
                self.cs.iter().filter(|&&cs| cs).count(),
                1,
                "more than one chip selected"
            );
            let value = self
                .data_levels
                .iter()
                .enumerate()
                .fold(0u8, |v, (i, &level)| v | (level as u8) << i);
            self.ops.push(if self.rs {
                Op::Data { chip, value }
            } else {
                Op::Command { chip, value }
            });
        }
    }
}

/// Simulated KS0108 bus, handing out pins that share its state
pub struct LcdHarness {
    state: Rc<RefCell<LcdState>>,
}

#[derive(Clone, Copy)]
enum Role {
    Data(usize),
    Enable,
    Rs,
    Rw,
    Cs(usize),
    Reset,
}

pub struct HarnessPin {
    state: Rc<RefCell<LcdState>>,
    role: Role,
}

impl LcdHarness {
    pub fn new(chips: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(LcdState {
                data_levels: [false; 8],
                data_dirs: [Direction::Input; 8],
                rs: false,
                rw: false,
                cs: vec![false; chips],
                enable: false,
                reset: true,
                ops: Vec::new(),
                polls: 0,
                status_script: VecDeque::new(),
                default_status: 0x00,
            })),
        }
    }

    fn pin(&self, role: Role) -> HarnessPin {
        HarnessPin {
            state: Rc::clone(&self.state),
            role,
        }
    }

    pub fn data_pins(&self) -> [HarnessPin; 8] {
        core::array::from_fn(|i| self.pin(Role::Data(i)))
    }

    pub fn enable(&self) -> HarnessPin {
        self.pin(Role::Enable)
    }

    pub fn rs(&self) -> HarnessPin {
        self.pin(Role::Rs)
    }

    pub fn rw(&self) -> HarnessPin {
        self.pin(Role::Rw)
    }

    pub fn cs(&self, chip: usize) -> HarnessPin {
        self.pin(Role::Cs(chip))
    }

    pub fn reset(&self) -> HarnessPin {
        self.pin(Role::Reset)
    }

    /// Queue status bytes for upcoming read strobes
    pub fn script_status(&self, statuses: &[u8]) {
        self.state
            .borrow_mut()
            .status_script
            .extend(statuses.iter().copied());
    }

    /// Status presented once the script runs dry (0x00 = always ready)
    pub fn set_default_status(&self, status: u8) {
        self.state.borrow_mut().default_status = status;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// Read-mode enable strobes seen so far
    pub fn polls(&self) -> usize {
        self.state.borrow().polls
    }
}

impl OutputPin for HarnessPin {
    fn set_high(&mut self) {
        let mut state = self.state.borrow_mut();
        match self.role {
            Role::Data(i) => state.data_levels[i] = true,
            Role::Enable => {
                if !state.enable {
                    state.enable = true;
                    state.on_enable_rise();
                }
            }
            Role::Rs => state.rs = true,
            Role::Rw => state.rw = true,
            Role::Cs(i) => state.cs[i] = true,
            Role::Reset => state.reset = true,
        }
    }

    fn set_low(&mut self) {
        let mut state = self.state.borrow_mut();
        match self.role {
            Role::Data(i) => state.data_levels[i] = false,
            Role::Enable => state.enable = false,
            Role::Rs => state.rs = false,
            Role::Rw => state.rw = false,
            Role::Cs(i) => state.cs[i] = false,
            Role::Reset => state.reset = false,
        }
    }

    fn toggle(&mut self) {
        if self.is_set_high() {
            self.set_low();
        } else {
            self.set_high();
        }
    }

    fn is_set_high(&self) -> bool {
        let state = self.state.borrow();
        match self.role {
            Role::Data(i) => state.data_levels[i],
            Role::Enable => state.enable,
            Role::Rs => state.rs,
            Role::Rw => state.rw,
            Role::Cs(i) => state.cs[i],
            Role::Reset => state.reset,
        }
    }
}

impl InputPin for HarnessPin {
    fn is_high(&self) -> bool {
        self.is_set_high()
    }
}

impl IoPin for HarnessPin {
    fn set_direction(&mut self, direction: Direction, _pull: Pull) {
        if let Role::Data(i) = self.role {
            self.state.borrow_mut().data_dirs[i] = direction;
        }
    }
}

/// Delay provider that skips the waiting
pub struct NoopDelay;

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

impl embedded_hal_async::delay::DelayNs for NoopDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// Output pin that goes nowhere
pub struct NullPin;

impl OutputPin for NullPin {
    fn set_high(&mut self) {}
    fn set_low(&mut self) {}
    fn toggle(&mut self) {}
    fn is_set_high(&self) -> bool {
        false
    }
}

/// Which offload queue an entry was pushed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Ctrl,
    Data,
}

/// FIFO that tags its pushes into a log shared with the other queue,
/// preserving the producer's cross-queue enqueue order
pub struct SharedFifo {
    queue: Queue,
    log: Rc<RefCell<Vec<(Queue, u32)>>>,
}

impl FifoTx for SharedFifo {
    fn push(&mut self, word: u32) {
        self.log.borrow_mut().push((self.queue, word));
    }
}

/// Build a ctrl/data FIFO pair over one shared log
pub fn shared_fifos() -> (SharedFifo, SharedFifo, Rc<RefCell<Vec<(Queue, u32)>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    (
        SharedFifo {
            queue: Queue::Ctrl,
            log: Rc::clone(&log),
        },
        SharedFifo {
            queue: Queue::Data,
            log: Rc::clone(&log),
        },
        log,
    )
}
