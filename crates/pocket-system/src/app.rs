//! Application descriptor and the handler table an app registers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use pocket_gui::{Gui, Image};
use pocket_types::error::Result;
use pocket_vfs::Vfs;

/// Settings key holding the ROM the next boot should run.
pub const SETTING_ROM_FILE_PATH: &str = "RomFilePath";
/// Settings key holding the [`StartAction`] of the next boot.
pub const SETTING_START_ACTION: &str = "StartAction";
/// Settings key of the "boot into the app once" flag.
pub const SETTING_STARTUP_APP: &str = "StartupApp";
/// Settings key holding the wall-clock time at the last shutdown.
pub const SETTING_RTC_VALUE: &str = "RTCSavedValue";

/// What an app should do with its ROM when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartAction {
    #[default]
    Normal,
    /// Load the save state before running.
    Resume,
}

impl StartAction {
    pub const fn as_i32(self) -> i32 {
        match self {
            StartAction::Normal => 0,
            StartAction::Resume => 1,
        }
    }

    /// Unknown values fall back to [`StartAction::Normal`].
    pub const fn from_i32(value: i32) -> Self {
        match value {
            1 => StartAction::Resume,
            _ => StartAction::Normal,
        }
    }
}

/// Lifecycle notifications delivered to [`Handlers::event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// The system is about to restart or halt.
    Shutdown,
    /// The system is about to enter deep sleep.
    Sleep,
    /// A menu closed and the app should repaint its frame.
    Redraw,
}

/// Identity and runtime parameters of the running app.
#[derive(Debug, Clone)]
pub struct AppDescriptor {
    pub name: String,
    pub version: String,
    pub build_date: String,
    pub build_time: String,
    pub build_user: String,
    /// Set during boot by comparing `name` with the configured launcher.
    pub is_launcher: bool,
    pub rom_path: Option<String>,
    pub start_action: StartAction,
    pub refresh_rate: u32,
    pub sample_rate: u32,
    /// Speed multiplier index shared with the settings menu.
    pub speedup: Rc<Cell<u8>>,
    pub log_level: log::LevelFilter,
}

impl AppDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            build_date: String::new(),
            build_time: String::new(),
            build_user: String::new(),
            is_launcher: false,
            rom_path: None,
            start_action: StartAction::Normal,
            refresh_rate: 60,
            sample_rate: 32_000,
            speedup: Rc::new(Cell::new(0)),
            log_level: log::LevelFilter::Info,
        }
    }

    pub fn with_build(
        mut self,
        date: impl Into<String>,
        time: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        self.build_date = date.into();
        self.build_time = time.into();
        self.build_user = user.into();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}

/// Writes or reads a save state at the given path.
pub type StateHandler = Box<dyn FnMut(&mut dyn Vfs, &str) -> Result<()>>;
/// Resets the emulated machine; the flag asks for a hard reset.
pub type ResetHandler = Box<dyn FnMut(bool) -> bool>;
/// Returns the frame currently on screen.
pub type CaptureHandler = Box<dyn FnMut() -> Option<Image>>;
/// Opens the app's own settings page from the options menu.
pub type SettingsHandler = Rc<RefCell<dyn FnMut(&mut Gui)>>;
pub type EventHandler = Box<dyn FnMut(SystemEvent)>;

/// Callbacks an app registers with the system. Every entry is optional.
#[derive(Default)]
pub struct Handlers {
    pub load_state: Option<StateHandler>,
    pub save_state: Option<StateHandler>,
    pub reset: Option<ResetHandler>,
    pub capture_frame: Option<CaptureHandler>,
    pub settings: Option<SettingsHandler>,
    pub event: Option<EventHandler>,
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("load_state", &self.load_state.is_some())
            .field("save_state", &self.save_state.is_some())
            .field("reset", &self.reset.is_some())
            .field("capture_frame", &self.capture_frame.is_some())
            .field("settings", &self.settings.is_some())
            .field("event", &self.event.is_some())
            .finish()
    }
}
