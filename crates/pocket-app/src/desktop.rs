//! Host-side collaborators.
//!
//! The desktop runner has no panel, pad or battery. The display keeps an
//! RGB565 framebuffer in memory and input replays a key script. Settings,
//! the boot selection and the crash region are files in the state directory.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use pocket_gui::Image;
use pocket_system::{FaultMemory, MemoryInfo, Platform, ResetReason, SystemProbe};
use pocket_types::backend::{
    Audio, AudioSink, Display, DisplayCounters, DisplayFilter, DisplayScaling, DisplayStatus,
    Input, Settings, Size, UpdateMode,
};
use pocket_types::color::Rgb565;
use pocket_types::error::{PocketError, Result};
use pocket_types::input::{BatteryReading, Button, Keys};
use serde_json::Value;

/// Milliseconds since process start; shared by input and probe.
fn now_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

pub struct FramebufferDisplay {
    size: Size,
    pixels: Vec<Rgb565>,
    counters: DisplayCounters,
    backlight: i32,
    filter: DisplayFilter,
    scaling: DisplayScaling,
    update_mode: UpdateMode,
}

impl FramebufferDisplay {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            size: Size::new(width, height),
            pixels: vec![Rgb565::BLACK; (width.max(0) * height.max(0)) as usize],
            counters: DisplayCounters::default(),
            backlight: 80,
            filter: DisplayFilter::default(),
            scaling: DisplayScaling::default(),
            update_mode: UpdateMode::default(),
        }
    }

    /// Count a presented frame.
    pub fn present(&mut self, full: bool) {
        self.counters.total_frames += 1;
        if full {
            self.counters.full_frames += 1;
        }
    }

    pub fn snapshot(&self) -> Result<Image> {
        Image::from_pixels(
            self.size.width as u32,
            self.size.height as u32,
            self.pixels.clone(),
        )
    }
}

impl Display for FramebufferDisplay {
    fn status(&self) -> DisplayStatus {
        DisplayStatus {
            screen: self.size,
            source: self.size,
            viewport: self.size,
            counters: self.counters,
        }
    }

    fn write(&mut self, x: i32, y: i32, width: i32, height: i32, stride: usize, pixels: &[Rgb565]) {
        let stride = if stride == 0 { width.max(0) as usize } else { stride };
        for row in 0..height {
            let dy = y + row;
            if dy < 0 || dy >= self.size.height {
                continue;
            }
            for col in 0..width {
                let dx = x + col;
                if dx < 0 || dx >= self.size.width {
                    continue;
                }
                if let Some(&px) = pixels.get(row as usize * stride + col as usize) {
                    self.pixels[(dy * self.size.width + dx) as usize] = px;
                }
            }
        }
    }

    fn force_redraw(&mut self) {
        self.present(true);
    }

    fn clear(&mut self, color: Rgb565) {
        self.pixels.fill(color);
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

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Parse `"down,down,a"` into presses. `+` holds several buttons at once,
/// `-` is an idle poll.
pub fn parse_script(text: &str) -> Result<Vec<Keys>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|step| {
            if step == "-" {
                return Ok(Keys::NONE);
            }
            step.split('+').try_fold(Keys::NONE, |keys, name| {
                name.parse::<Button>()
                    .map(|b| keys | b.key())
                    .map_err(PocketError::Input)
            })
        })
        .collect()
}

/// Replays presses, each followed by a release. Once the script is spent
/// it keeps pressing B so open dialogs close.
pub struct ScriptInput {
    script: VecDeque<Keys>,
    release: bool,
    last_read_ms: Arc<AtomicU64>,
}

impl ScriptInput {
    pub fn new(presses: Vec<Keys>) -> Self {
        Self {
            script: presses.into(),
            release: false,
            last_read_ms: Arc::new(AtomicU64::new(now_ms())),
        }
    }

    /// Time of the last poll, for the probe's idle reading.
    pub fn last_read_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.last_read_ms)
    }
}

impl Input for ScriptInput {
    fn read_gamepad(&mut self) -> Keys {
        self.last_read_ms.store(now_ms(), Ordering::Relaxed);
        self.release = !self.release;
        if !self.release {
            return Keys::NONE;
        }
        match self.script.pop_front() {
            Some(keys) => keys,
            None => Keys::B,
        }
    }

    fn read_battery(&mut self) -> Option<BatteryReading> {
        None
    }

    fn wait_for_key(&mut self, _mask: Keys, _pressed: bool) {}

    fn key_is_pressed(&mut self, _mask: Keys) -> bool {
        false
    }

    fn gamepad_last_read(&self) -> Duration {
        Duration::from_millis(now_ms().saturating_sub(self.last_read_ms.load(Ordering::Relaxed)))
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Settings persisted as one JSON object. App keys are `namespace/key`.
pub struct JsonSettings {
    path: PathBuf,
    namespace: String,
    values: BTreeMap<String, Value>,
}

impl JsonSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: String::new(),
            values: BTreeMap::new(),
        }
    }

    fn app_key(&self, key: &str) -> String {
        format!("{}/{key}", self.namespace)
    }
}

impl Settings for JsonSettings {
    fn init(&mut self, namespace: &str) -> Result<()> {
        self.namespace = namespace.to_string();
        if !self.path.exists() {
            return Ok(());
        }
        let text = fs::read_to_string(&self.path)?;
        self.values = serde_json::from_str(&text)?;
        log::info!("{} settings loaded from {}", self.values.len(), self.path.display());
        Ok(())
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        self.values
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    fn set_i32(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), Value::from(value));
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), Value::from(value));
    }

    fn get_app_i32(&self, key: &str, default: i32) -> i32 {
        self.get_i32(&self.app_key(key), default)
    }

    fn set_app_i32(&mut self, key: &str, value: i32) {
        let key = self.app_key(key);
        self.set_i32(&key, value);
    }

    fn save(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.values)?)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.values.clear();
        self.save()
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct NullAudio {
    volume: i32,
    sink: AudioSink,
    muted: bool,
}

impl Default for NullAudio {
    fn default() -> Self {
        Self {
            volume: 5,
            sink: AudioSink::Speaker,
            muted: false,
        }
    }
}

impl Audio for NullAudio {
    fn init(&mut self, sample_rate: u32) -> Result<()> {
        log::info!("audio: {sample_rate} Hz (discarded)");
        Ok(())
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

// ---------------------------------------------------------------------------
// Platform and probe
// ---------------------------------------------------------------------------

fn host_unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Offset between the host clock and the runtime's wall clock.
pub type ClockOffset = Arc<AtomicI64>;

/// The boot selection and panic marker are files in the state directory.
pub struct DesktopPlatform {
    state_dir: PathBuf,
    apps: Vec<String>,
    clock: ClockOffset,
    seed: u32,
}

impl DesktopPlatform {
    pub fn new(state_dir: impl Into<PathBuf>, apps: Vec<String>, clock: ClockOffset) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(1);
        Self {
            state_dir: state_dir.into(),
            apps,
            clock,
            seed: nanos | 1,
        }
    }

    fn marker(&self, name: &str) -> PathBuf {
        self.state_dir.join(name)
    }

    fn exit(&self, how: &str, code: i32) -> ! {
        log::info!("{how}");
        log::logger().flush();
        std::process::exit(code)
    }
}

impl Platform for DesktopPlatform {
    fn reset_reason(&self) -> ResetReason {
        if self.marker("panic").exists() {
            if let Err(e) = fs::remove_file(self.marker("panic")) {
                log::warn!("could not clear panic marker: {e}");
            }
            ResetReason::Panic
        } else {
            ResetReason::PowerOn
        }
    }

    fn find_app(&self, name: &str) -> bool {
        self.apps.iter().any(|a| a == name)
    }

    fn set_boot_app(&mut self, name: &str) -> Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        fs::write(self.marker("boot_app"), name)?;
        Ok(())
    }

    fn set_time(&mut self, unix_secs: i64) {
        self.clock.store(unix_secs - host_unix_time(), Ordering::Relaxed);
    }

    fn random(&mut self) -> u32 {
        // xorshift32
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        x
    }

    fn restart(&mut self) -> ! {
        self.exit("restart requested", 0)
    }

    fn deep_sleep(&mut self) -> ! {
        self.exit("deep sleep requested", 0)
    }

    fn halt(&mut self) -> ! {
        self.exit("halt requested", 0)
    }
}

pub struct DesktopProbe {
    state_dir: PathBuf,
    clock: ClockOffset,
    last_input_ms: Arc<AtomicU64>,
}

impl DesktopProbe {
    pub fn new(
        state_dir: impl Into<PathBuf>,
        clock: ClockOffset,
        last_input_ms: Arc<AtomicU64>,
    ) -> Self {
        Self {
            state_dir: state_dir.into(),
            clock,
            last_input_ms,
        }
    }
}

impl SystemProbe for DesktopProbe {
    fn memory(&self) -> MemoryInfo {
        MemoryInfo::default()
    }

    fn stack_high_water(&self) -> u32 {
        0
    }

    fn battery(&self) -> Option<BatteryReading> {
        None
    }

    fn gamepad_idle(&self) -> Duration {
        Duration::from_millis(now_ms().saturating_sub(self.last_input_ms.load(Ordering::Relaxed)))
    }

    fn set_led(&self, on: bool) {
        log::trace!("led {}", if on { "on" } else { "off" });
    }

    fn unix_time(&self) -> i64 {
        host_unix_time() + self.clock.load(Ordering::Relaxed)
    }

    fn uptime(&self) -> Duration {
        Duration::from_millis(now_ms())
    }

    fn abort(&self) -> ! {
        // Next start reports the trace.
        if let Err(e) = fs::write(self.state_dir.join("panic"), b"") {
            log::error!("could not write panic marker: {e}");
        }
        log::logger().flush();
        std::process::abort()
    }
}

/// Crash region kept in a file so it survives the process.
pub struct FileFaultMemory {
    path: PathBuf,
}

impl FileFaultMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FaultMemory for FileFaultMemory {
    fn read(&self) -> Vec<u8> {
        fs::read(&self.path).unwrap_or_default()
    }

    fn write(&mut self, data: &[u8]) {
        if let Err(e) = fs::write(&self.path, data) {
            log::error!("could not write {}: {e}", self.path.display());
        }
    }
}
