//! Display facade traits
//!
//! One uniform output contract over the transport variants: bring the
//! panel up, then push whole frames. The transport is chosen at
//! construction time; callers only see these traits.

/// Blocking display transport
///
/// A `print_buffer` call either completes the full page/chip sweep or
/// returns an error; a frame is never silently left half-applied.
pub trait Display {
    /// Transport-specific error type
    type Error;

    /// Bring the controller(s) up: configure pins, pulse reset if one
    /// is wired, switch the display on and set the start line.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Write one full frame
    ///
    /// `buffer` must be page-major and exactly `width * height / 8`
    /// bytes long for the panel the transport was constructed with.
    fn print_buffer(&mut self, buffer: &[u8]) -> Result<(), Self::Error>;
}

/// Cooperative display transport
///
/// Same contract as [`Display`], for transports that yield to the
/// scheduler while waiting on the controller.
#[allow(async_fn_in_trait)]
pub trait AsyncDisplay {
    /// Transport-specific error type
    type Error;

    /// Bring the controller(s) up
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Write one full frame
    async fn print_buffer(&mut self, buffer: &[u8]) -> Result<(), Self::Error>;
}
