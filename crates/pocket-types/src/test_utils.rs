//! Mock collaborators for tests.
//!
//! [`MockDisplay`] keeps a real framebuffer so tests can assert on pixels,
//! and records every call for coarse assertions. [`ScriptedInput`] replays a
//! fixed sequence of gamepad states.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::backend::{
    Audio, AudioSink, Display, DisplayCounters, DisplayFilter, DisplayScaling, DisplayStatus,
    Input, Settings, Size, UpdateMode,
};
use crate::color::Rgb565;
use crate::error::Result;
use crate::input::{BatteryReading, Keys};

/// A recorded display call.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCall {
    Write { x: i32, y: i32, w: i32, h: i32 },
    Clear(Rgb565),
    ForceRedraw,
}

/// Display backed by an in-memory framebuffer.
pub struct MockDisplay {
    pub width: i32,
    pub height: i32,
    pub framebuffer: Vec<Rgb565>,
    pub calls: Vec<DisplayCall>,
    pub counters: DisplayCounters,
    pub backlight: i32,
    pub filter: DisplayFilter,
    pub scaling: DisplayScaling,
    pub update_mode: UpdateMode,
}

impl MockDisplay {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            framebuffer: vec![Rgb565::BLACK; (width.max(0) * height.max(0)) as usize],
            calls: Vec::new(),
            counters: DisplayCounters::default(),
            backlight: 80,
            filter: DisplayFilter::Off,
            scaling: DisplayScaling::Fit,
            update_mode: UpdateMode::Partial,
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Rgb565 {
        self.framebuffer[(y * self.width + x) as usize]
    }

    pub fn write_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DisplayCall::Write { .. }))
            .count()
    }

    pub fn writes(&self) -> Vec<(i32, i32, i32, i32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Write { x, y, w, h } => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect()
    }

    /// Number of framebuffer pixels equal to `color` inside a rectangle.
    pub fn count_in(&self, x: i32, y: i32, w: i32, h: i32, color: Rgb565) -> usize {
        let mut n = 0;
        for yy in y.max(0)..(y + h).min(self.height) {
            for xx in x.max(0)..(x + w).min(self.width) {
                if self.pixel(xx, yy) == color {
                    n += 1;
                }
            }
        }
        n
    }

    pub fn force_redraw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DisplayCall::ForceRedraw))
            .count()
    }
}

impl Display for MockDisplay {
    fn status(&self) -> DisplayStatus {
        DisplayStatus {
            screen: Size::new(self.width, self.height),
            source: Size::new(self.width, self.height),
            viewport: Size::new(self.width, self.height),
            counters: self.counters,
        }
    }

    fn write(&mut self, x: i32, y: i32, w: i32, h: i32, stride: usize, pixels: &[Rgb565]) {
        self.calls.push(DisplayCall::Write { x, y, w, h });
        let stride = if stride == 0 { w.max(0) as usize } else { stride };
        for row in 0..h.max(0) {
            let dy = y + row;
            if dy < 0 || dy >= self.height {
                continue;
            }
            for col in 0..w.max(0) {
                let dx = x + col;
                if dx < 0 || dx >= self.width {
                    continue;
                }
                if let Some(&p) = pixels.get(row as usize * stride + col as usize) {
                    self.framebuffer[(dy * self.width + dx) as usize] = p;
                }
            }
        }
    }

    fn force_redraw(&mut self) {
        self.calls.push(DisplayCall::ForceRedraw);
    }

    fn clear(&mut self, color: Rgb565) {
        self.calls.push(DisplayCall::Clear(color));
        self.framebuffer.fill(color);
    }

    fn backlight(&self) -> i32 {
        self.backlight
    }

    fn set_backlight(&mut self, percent: i32) {
        self.backlight = percent;
    }

    fn filter(&self) -> DisplayFilter {
        self.filter
    }

    fn set_filter(&mut self, filter: DisplayFilter) {
        self.filter = filter;
    }

    fn scaling(&self) -> DisplayScaling {
        self.scaling
    }

    fn set_scaling(&mut self, scaling: DisplayScaling) {
        self.scaling = scaling;
    }

    fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
    }
}

/// Input that replays a script of gamepad states, one per poll.
///
/// Running past the end of the script panics so a dialog that never exits
/// fails the test instead of hanging it.
pub struct ScriptedInput {
    pub script: VecDeque<Keys>,
    /// Keys reported by `key_is_pressed`, independent of the script.
    pub held: Keys,
    pub battery: Option<BatteryReading>,
    pub polls: usize,
    pub waits: Vec<(Keys, bool)>,
    pub deinit_calls: usize,
    last_read: Instant,
}

impl ScriptedInput {
    pub fn new(script: impl IntoIterator<Item = Keys>) -> Self {
        Self {
            script: script.into_iter().collect(),
            held: Keys::NONE,
            battery: Some(BatteryReading {
                percent: 100.0,
                voltage: 4.2,
            }),
            polls: 0,
            waits: Vec::new(),
            deinit_calls: 0,
            last_read: Instant::now(),
        }
    }

    /// A script of presses, each followed by a release.
    pub fn presses(keys: impl IntoIterator<Item = Keys>) -> Self {
        Self::new(keys.into_iter().flat_map(|k| [k, Keys::NONE]))
    }

    pub fn push(&mut self, keys: Keys) {
        self.script.push_back(keys);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Input for ScriptedInput {
    fn deinit(&mut self) {
        self.deinit_calls += 1;
    }

    fn read_gamepad(&mut self) -> Keys {
        self.polls += 1;
        self.last_read = Instant::now();
        match self.script.pop_front() {
            Some(keys) => keys,
            None => panic!("input script exhausted after {} polls", self.polls),
        }
    }

    fn read_battery(&mut self) -> Option<BatteryReading> {
        self.battery
    }

    fn wait_for_key(&mut self, mask: Keys, pressed: bool) {
        self.waits.push((mask, pressed));
    }

    fn key_is_pressed(&mut self, mask: Keys) -> bool {
        self.held.intersects(mask)
    }

    fn gamepad_last_read(&self) -> Duration {
        self.last_read.elapsed()
    }
}

/// Settings kept in a map. App-scoped keys are stored as `namespace/key`.
#[derive(Debug, Default)]
pub struct MemorySettings {
    pub namespace: String,
    pub ints: HashMap<String, i32>,
    pub strings: HashMap<String, String>,
    pub saves: usize,
    pub resets: usize,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn app_key(&self, key: &str) -> String {
        format!("{}/{key}", self.namespace)
    }
}

impl Settings for MemorySettings {
    fn init(&mut self, namespace: &str) -> Result<()> {
        self.namespace = namespace.to_string();
        Ok(())
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        self.ints.get(key).copied().unwrap_or(default)
    }

    fn set_i32(&mut self, key: &str, value: i32) {
        self.ints.insert(key.to_string(), value);
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.strings.insert(key.to_string(), value.to_string());
    }

    fn get_app_i32(&self, key: &str, default: i32) -> i32 {
        self.get_i32(&self.app_key(key), default)
    }

    fn set_app_i32(&mut self, key: &str, value: i32) {
        let key = self.app_key(key);
        self.set_i32(&key, value);
    }

    fn save(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        self.ints.clear();
        self.strings.clear();
        Ok(())
    }
}

/// Audio output that only remembers its state.
#[derive(Debug, Default)]
pub struct MockAudio {
    pub sample_rate: Option<u32>,
    pub volume: i32,
    pub sink: AudioSink,
    pub muted: bool,
    pub deinit_calls: usize,
}

impl MockAudio {
    pub fn new() -> Self {
        Self {
            volume: 5,
            ..Self::default()
        }
    }
}

impl Audio for MockAudio {
    fn init(&mut self, sample_rate: u32) -> Result<()> {
        self.sample_rate = Some(sample_rate);
        Ok(())
    }

    fn deinit(&mut self) {
        self.deinit_calls += 1;
    }

    fn volume(&self) -> i32 {
        self.volume
    }

    fn set_volume(&mut self, level: i32) {
        self.volume = level;
    }

    fn sink(&self) -> AudioSink {
        self.sink
    }

    fn set_sink(&mut self, sink: AudioSink) {
        self.sink = sink;
    }

    fn set_mute(&mut self, mute: bool) {
        self.muted = mute;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_write_clips() {
        let mut d = MockDisplay::new(4, 4);
        let px = vec![Rgb565::RED; 9];
        d.write(2, 2, 3, 3, 0, &px);
        assert_eq!(d.pixel(3, 3), Rgb565::RED);
        assert_eq!(d.pixel(1, 1), Rgb565::BLACK);
        assert_eq!(d.count_in(0, 0, 4, 4, Rgb565::RED), 4);
        assert_eq!(d.write_count(), 1);
    }

    #[test]
    fn display_write_honors_stride() {
        let mut d = MockDisplay::new(2, 2);
        let px = [Rgb565::RED, Rgb565::BLUE, Rgb565::WHITE, Rgb565::NAVY];
        d.write(0, 0, 1, 2, 2, &px);
        assert_eq!(d.pixel(0, 0), Rgb565::RED);
        assert_eq!(d.pixel(0, 1), Rgb565::WHITE);
    }

    #[test]
    fn scripted_input_replays() {
        let mut input = ScriptedInput::presses([Keys::A]);
        assert_eq!(input.read_gamepad(), Keys::A);
        assert_eq!(input.read_gamepad(), Keys::NONE);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "input script exhausted")]
    fn scripted_input_panics_when_exhausted() {
        let mut input = ScriptedInput::new([]);
        input.read_gamepad();
    }

    #[test]
    fn settings_namespaces() {
        let mut s = MemorySettings::new();
        s.init("nes").unwrap();
        s.set_app_i32("Speed", 2);
        s.set_i32("Speed", 1);
        assert_eq!(s.get_app_i32("Speed", 0), 2);
        assert_eq!(s.get_i32("Speed", 0), 1);
        s.reset().unwrap();
        assert_eq!(s.get_app_i32("Speed", 7), 7);
    }
}
