//! Foundation types and traits for the pocket runtime.
//!
//! This crate holds the platform-agnostic pieces shared by every other crate:
//! the 16-bit color type, gamepad key masks, the collaborator traits the GUI
//! and lifecycle layers talk to (display, input, settings, audio), runtime
//! configuration and the error type.

pub mod backend;
pub mod color;
pub mod config;
pub mod error;
pub mod input;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
