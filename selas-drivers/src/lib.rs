//! Hardware driver implementations
//!
//! This crate provides the KS0108 display transports and the MCP23S17
//! SPI GPIO expander one of them relays through:
//!
//! - Direct GPIO transport (blocking bit-bang)
//! - Cooperative GPIO transport (yields while the controller is busy)
//! - FIFO offload transport (producer for two fixed-rate pipelines)
//! - SPI expander transport (signals multiplexed onto a 16-bit virtual port)
//! - MCP23S17 register model with shadow state and edge dispatch

#![no_std]
#![deny(unsafe_code)]

pub mod display;
pub mod expander;
