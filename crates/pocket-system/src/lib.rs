//! Application lifecycle for the pocket runtime.
//!
//! [`System`] owns the collaborators of a running app. It performs the boot
//! checks, routes fatal errors into a crash record that survives a soft
//! reset, runs the statistics monitor and watchdog on a background thread,
//! writes save states atomically and hosts the built-in system menus.

pub mod app;
pub mod clock;
pub mod config;
pub mod crash;
pub mod fault;
pub mod logger;
pub mod menus;
pub mod monitor;
pub mod paths;
pub mod platform;
pub mod save;
pub mod stats;
pub mod system;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{AppDescriptor, Handlers, StartAction, SystemEvent};
pub use crash::CrashRecorder;
pub use fault::{FaultMemory, PanicTrace, RetainedRegion};
pub use monitor::{Monitor, Watchdog};
pub use paths::{PathKind, SavePaths};
pub use platform::{MemoryInfo, Platform, ResetReason, SystemProbe};
pub use stats::{Statistics, StatsHub};
pub use system::{Collaborators, System};
