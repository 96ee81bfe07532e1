//! Facade traits implemented by the concrete transports

pub mod display;

pub use display::{AsyncDisplay, Display};
