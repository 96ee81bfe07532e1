//! Board-agnostic core for the Selas KS0108 driver family
//!
//! This crate contains everything that does not depend on a transport
//! or on specific hardware:
//!
//! - Panel geometry and framebuffer addressing
//! - The display facade traits implemented by every transport

#![no_std]
#![deny(unsafe_code)]

pub mod geometry;
pub mod traits;
