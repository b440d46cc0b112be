//! Platform services below the collaborator traits.
//!
//! [`Platform`] is used from the main thread only. [`SystemProbe`] is the
//! thread-safe subset the monitor samples from its background thread.

use std::time::Duration;

use pocket_types::error::Result;
use pocket_types::input::BatteryReading;

/// Why the previous run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetReason {
    #[default]
    PowerOn,
    Software,
    /// A fatal error or fault ended the previous run.
    Panic,
    Watchdog,
    DeepSleep,
    Unknown,
}

/// Free memory figures, split into the internal and external pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    pub free_internal: u32,
    pub free_external: u32,
    pub largest_block_internal: u32,
    pub largest_block_external: u32,
}

pub trait Platform {
    fn reset_reason(&self) -> ResetReason;

    /// True when an app of that name is installed.
    fn find_app(&self, name: &str) -> bool;

    /// Persist the app started by the next restart.
    fn set_boot_app(&mut self, name: &str) -> Result<()>;

    fn set_time(&mut self, unix_secs: i64);

    fn random(&mut self) -> u32;

    /// Release shared peripheral buses before a reset.
    fn deinit_peripherals(&mut self) {}

    fn restart(&mut self) -> !;
    fn deep_sleep(&mut self) -> !;
    fn halt(&mut self) -> !;
}

pub trait SystemProbe: Send + Sync {
    fn memory(&self) -> MemoryInfo;

    /// Lowest amount of free stack seen on the main thread, in bytes.
    fn stack_high_water(&self) -> u32;

    /// `None` when the battery cannot be read.
    fn battery(&self) -> Option<BatteryReading>;

    /// Time since the app last polled the gamepad.
    fn gamepad_idle(&self) -> Duration;

    fn set_led(&self, on: bool);

    fn unix_time(&self) -> i64;

    /// Monotonic time since boot.
    fn uptime(&self) -> Duration;

    /// Terminate the process without unwinding.
    fn abort(&self) -> !;
}
