//! RP2040 support for the Selas offload transport
//!
//! Carries the PIO programs and timing math that turn the abstract
//! two-pipeline offload device into RP2040 state machines. The crate
//! is host-testable; loading the programs and wiring the FIFOs is done
//! by the firmware against its embassy-rp peripherals.

#![no_std]
#![deny(unsafe_code)]

pub mod pio;
