//! Mock platform and probe for tests.
//!
//! The non-returning calls unwind with a [`PlatformExit`] payload instead of
//! ending the process. [`run_until_exit`] catches it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use pocket_types::backend::{Shared, shared};
use pocket_types::error::{PocketError, Result};
use pocket_types::input::BatteryReading;

use crate::platform::{MemoryInfo, Platform, ResetReason, SystemProbe};

/// How a mocked platform left the running app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformExit {
    Restart,
    DeepSleep,
    Halt,
    Abort,
}

/// Run `f` and return the platform exit it ended with.
///
/// Panics if `f` returns normally or panics for another reason.
pub fn run_until_exit(f: impl FnOnce()) -> PlatformExit {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("expected a platform exit"),
        Err(payload) => match payload.downcast::<PlatformExit>() {
            Ok(exit) => *exit,
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// Observable state of a [`MockPlatform`].
#[derive(Debug, Default)]
pub struct PlatformState {
    pub reset_reason: ResetReason,
    pub apps: Vec<String>,
    pub boot_app: Option<String>,
    pub time: Option<i64>,
    pub next_random: u32,
    pub deinit_calls: usize,
    pub exits: Vec<PlatformExit>,
}

pub struct MockPlatform {
    state: Shared<PlatformState>,
}

impl MockPlatform {
    pub fn new(apps: &[&str]) -> Self {
        Self {
            state: shared(PlatformState {
                apps: apps.iter().map(|a| a.to_string()).collect(),
                next_random: 12_345,
                ..PlatformState::default()
            }),
        }
    }

    /// A platform sharing `state` with an earlier one, as after a reboot.
    pub fn from_state(state: Shared<PlatformState>) -> Self {
        Self { state }
    }

    pub fn with_reset_reason(self, reason: ResetReason) -> Self {
        self.state.borrow_mut().reset_reason = reason;
        self
    }

    /// Handle that stays valid after the platform is boxed.
    pub fn state(&self) -> Shared<PlatformState> {
        std::rc::Rc::clone(&self.state)
    }

    fn exit(&mut self, exit: PlatformExit) -> ! {
        self.state.borrow_mut().exits.push(exit.clone());
        panic::panic_any(exit)
    }
}

impl Platform for MockPlatform {
    fn reset_reason(&self) -> ResetReason {
        self.state.borrow().reset_reason
    }

    fn find_app(&self, name: &str) -> bool {
        self.state.borrow().apps.iter().any(|a| a == name)
    }

    fn set_boot_app(&mut self, name: &str) -> Result<()> {
        if !self.find_app(name) {
            return Err(PocketError::Platform(format!("no app named {name}")));
        }
        self.state.borrow_mut().boot_app = Some(name.to_string());
        Ok(())
    }

    fn set_time(&mut self, unix_secs: i64) {
        self.state.borrow_mut().time = Some(unix_secs);
    }

    fn random(&mut self) -> u32 {
        self.state.borrow().next_random
    }

    fn deinit_peripherals(&mut self) {
        self.state.borrow_mut().deinit_calls += 1;
    }

    fn restart(&mut self) -> ! {
        self.exit(PlatformExit::Restart)
    }

    fn deep_sleep(&mut self) -> ! {
        self.exit(PlatformExit::DeepSleep)
    }

    fn halt(&mut self) -> ! {
        self.exit(PlatformExit::Halt)
    }
}

/// Probe whose readings are set by the test.
pub struct MockProbe {
    memory: MemoryInfo,
    battery: Mutex<Option<BatteryReading>>,
    idle_ms: AtomicU64,
    uptime_ms: AtomicU64,
    unix_time: AtomicI64,
    stack: AtomicU32,
    led: AtomicBool,
    aborts: AtomicUsize,
}

impl MockProbe {
    pub fn new() -> Self {
        Self {
            memory: MemoryInfo {
                free_internal: 180 * 1024,
                free_external: 3 * 1024 * 1024,
                largest_block_internal: 96 * 1024,
                largest_block_external: 2 * 1024 * 1024,
            },
            battery: Mutex::new(Some(BatteryReading {
                percent: 80.0,
                voltage: 3.9,
            })),
            idle_ms: AtomicU64::new(0),
            uptime_ms: AtomicU64::new(0),
            unix_time: AtomicI64::new(1_700_000_000),
            stack: AtomicU32::new(4096),
            led: AtomicBool::new(false),
            aborts: AtomicUsize::new(0),
        }
    }

    pub fn set_battery(&self, battery: Option<BatteryReading>) {
        *self.battery.lock().unwrap_or_else(PoisonError::into_inner) = battery;
    }

    pub fn set_gamepad_idle(&self, idle: Duration) {
        self.idle_ms.store(idle.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_uptime(&self, uptime: Duration) {
        self.uptime_ms.store(uptime.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_unix_time(&self, secs: i64) {
        self.unix_time.store(secs, Ordering::Relaxed);
    }

    pub fn led(&self) -> bool {
        self.led.load(Ordering::Relaxed)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::Relaxed)
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for MockProbe {
    fn memory(&self) -> MemoryInfo {
        self.memory
    }

    fn stack_high_water(&self) -> u32 {
        self.stack.load(Ordering::Relaxed)
    }

    fn battery(&self) -> Option<BatteryReading> {
        *self.battery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gamepad_idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms.load(Ordering::Relaxed))
    }

    fn set_led(&self, on: bool) {
        self.led.store(on, Ordering::Relaxed);
    }

    fn unix_time(&self) -> i64 {
        self.unix_time.load(Ordering::Relaxed)
    }

    fn uptime(&self) -> Duration {
        Duration::from_millis(self.uptime_ms.load(Ordering::Relaxed))
    }

    fn abort(&self) -> ! {
        self.aborts.fetch_add(1, Ordering::Relaxed);
        panic::panic_any(PlatformExit::Abort)
    }
}
