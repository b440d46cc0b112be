//! Runtime statistics shared between the main thread and the monitor.
//!
//! The frame counters are written by [`StatsHub::tick`] on every frame and
//! drained by the monitor once per period. Both sides go through one mutex so
//! the snapshot-and-reset is atomic with respect to the tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pocket_types::backend::DisplayCounters;

/// Figures published by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    pub battery_percent: f32,
    pub battery_voltage: f32,
    pub busy_percent: f32,
    pub skipped_fps: f32,
    pub total_fps: f32,
    pub free_memory_int: u32,
    pub free_memory_ext: u32,
    pub free_block_int: u32,
    pub free_block_ext: u32,
    pub free_stack_main: u32,
}

/// Frame counters accumulated since the last monitor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub total_frames: u32,
    pub full_frames: u32,
    pub skipped_frames: u32,
    pub busy_time: Duration,
}

#[derive(Debug, Default)]
struct HubState {
    statistics: Statistics,
    counters: Counters,
    last_display: DisplayCounters,
    last_reset: Duration,
}

/// Cloneable handle to the shared statistics.
#[derive(Debug, Clone, Default)]
pub struct StatsHub {
    inner: Arc<Mutex<HubState>>,
}

impl StatsHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account one emulated frame. A frame the display did not present is
    /// counted as skipped. Returns the number of frames since the last sample.
    pub fn tick(&self, display: DisplayCounters, busy: Duration) -> u32 {
        let mut state = self.lock();
        if display.total_frames == state.last_display.total_frames {
            state.counters.skipped_frames += 1;
        } else if display.full_frames > state.last_display.full_frames {
            state.counters.full_frames += 1;
        }
        state.last_display = display;
        state.counters.total_frames += 1;
        state.counters.busy_time += busy;
        state.counters.total_frames
    }

    /// Take the counters and reset them. Also returns the time covered by
    /// the returned counters.
    pub fn take_counters(&self, now: Duration) -> (Counters, Duration) {
        let mut state = self.lock();
        let counters = std::mem::take(&mut state.counters);
        let elapsed = now.saturating_sub(state.last_reset);
        state.last_reset = now;
        (counters, elapsed)
    }

    /// Restart the sampling window at `now` without publishing anything.
    pub fn reset(&self, now: Duration) {
        let mut state = self.lock();
        state.counters = Counters::default();
        state.last_reset = now;
    }

    pub fn snapshot(&self) -> Statistics {
        self.lock().statistics
    }

    pub fn update(&self, f: impl FnOnce(&mut Statistics)) {
        f(&mut self.lock().statistics);
    }
}
