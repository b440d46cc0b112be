//! Collaborator traits.
//!
//! The GUI and lifecycle layers never touch hardware directly. Every driver
//! they depend on is reached through one of these traits, and the concrete
//! implementation is injected when the context objects are built.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Rgb565;
use crate::error::Result;
use crate::input::{BatteryReading, Keys};

/// Single-threaded shared handle to a collaborator.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value in a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Frame counters maintained by the display driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayCounters {
    pub total_frames: u64,
    pub full_frames: u64,
}

/// Snapshot of the display driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayStatus {
    pub screen: Size,
    pub source: Size,
    pub viewport: Size,
    pub counters: DisplayCounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayFilter {
    #[default]
    Off,
    Horizontal,
    Vertical,
    Both,
}

impl DisplayFilter {
    pub const ALL: [DisplayFilter; 4] = [
        DisplayFilter::Off,
        DisplayFilter::Horizontal,
        DisplayFilter::Vertical,
        DisplayFilter::Both,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DisplayFilter::Off => "Off",
            DisplayFilter::Horizontal => "Horiz",
            DisplayFilter::Vertical => "Vert",
            DisplayFilter::Both => "Both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayScaling {
    #[default]
    Off,
    Fit,
    Fill,
}

impl DisplayScaling {
    pub const ALL: [DisplayScaling; 3] =
        [DisplayScaling::Off, DisplayScaling::Fit, DisplayScaling::Fill];

    pub const fn label(self) -> &'static str {
        match self {
            DisplayScaling::Off => "Off  ",
            DisplayScaling::Fit => "Fit ",
            DisplayScaling::Fill => "Full ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    #[default]
    Partial,
    Full,
}

impl UpdateMode {
    pub const ALL: [UpdateMode; 2] = [UpdateMode::Partial, UpdateMode::Full];

    pub const fn label(self) -> &'static str {
        match self {
            UpdateMode::Partial => "Partial",
            UpdateMode::Full => "Full   ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioSink {
    #[default]
    Speaker,
    ExternalDac,
}

impl AudioSink {
    pub const fn label(self) -> &'static str {
        match self {
            AudioSink::Speaker => "Speaker",
            AudioSink::ExternalDac => "Ext DAC",
        }
    }
}

/// Display driver.
pub trait Display {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn status(&self) -> DisplayStatus;

    /// Blit a `width` x `height` block of pixels at (`x`, `y`). `stride` is
    /// the distance between rows of `pixels`, in pixels; 0 means `width`.
    fn write(&mut self, x: i32, y: i32, width: i32, height: i32, stride: usize, pixels: &[Rgb565]);

    fn force_redraw(&mut self);
    fn clear(&mut self, color: Rgb565);

    fn backlight(&self) -> i32;
    fn set_backlight(&mut self, percent: i32);
    fn filter(&self) -> DisplayFilter;
    fn set_filter(&mut self, filter: DisplayFilter);
    fn scaling(&self) -> DisplayScaling;
    fn set_scaling(&mut self, scaling: DisplayScaling);
    fn update_mode(&self) -> UpdateMode;
    fn set_update_mode(&mut self, mode: UpdateMode);
}

/// Gamepad and battery driver.
pub trait Input {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn deinit(&mut self) {}

    fn read_gamepad(&mut self) -> Keys;

    /// `None` when the battery cannot be read.
    fn read_battery(&mut self) -> Option<BatteryReading>;

    /// Block until every key in `mask` is pressed (`pressed == true`) or
    /// released.
    fn wait_for_key(&mut self, mask: Keys, pressed: bool);

    fn key_is_pressed(&mut self, mask: Keys) -> bool;

    /// Time elapsed since the gamepad was last polled.
    fn gamepad_last_read(&self) -> Duration;
}

/// Persistent key-value settings.
///
/// The plain accessors are global; the `app_` variants are scoped to the
/// namespace passed to [`Settings::init`].
pub trait Settings {
    fn init(&mut self, namespace: &str) -> Result<()>;

    fn get_i32(&self, key: &str, default: i32) -> i32;
    fn set_i32(&mut self, key: &str, value: i32);
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&mut self, key: &str, value: &str);

    fn get_app_i32(&self, key: &str, default: i32) -> i32;
    fn set_app_i32(&mut self, key: &str, value: i32);

    fn save(&mut self) -> Result<()>;
    fn reset(&mut self) -> Result<()>;
}

/// Audio output.
pub trait Audio {
    fn init(&mut self, sample_rate: u32) -> Result<()>;
    fn deinit(&mut self) {}

    fn volume(&self) -> i32;
    fn set_volume(&mut self, level: i32);
    fn sink(&self) -> AudioSink;
    fn set_sink(&mut self, sink: AudioSink);
    fn set_mute(&mut self, mute: bool);
}

/// Highest volume level understood by [`Audio::set_volume`].
pub const VOLUME_MAX: i32 = 10;
