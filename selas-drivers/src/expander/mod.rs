//! MCP23S17 SPI GPIO expander
//!
//! Shadow-register model of the 16-bit expander, plus a single-pin
//! adapter for peripheral code written against individual pins.

pub mod mcp23s17;
pub mod pin;

pub use mcp23s17::{diff_snapshots, EdgeTrigger, Error, ExpanderConfig, Mcp23S17};
pub use pin::ExpanderPin;
