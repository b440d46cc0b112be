//! The running app's system context.

use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::LevelFilter;
use pocket_gui::Gui;
use pocket_types::backend::{Audio, Display, Input, Settings, Shared};
use pocket_types::color::Rgb565;
use pocket_types::config::RuntimeConfig;
use pocket_types::error::{PocketError, Result};
use pocket_types::input::Keys;
use pocket_vfs::{Storage, Vfs, dirname};

use crate::app::{
    AppDescriptor, Handlers, SETTING_ROM_FILE_PATH, SETTING_RTC_VALUE, SETTING_START_ACTION,
    SETTING_STARTUP_APP, StartAction, SystemEvent,
};
use crate::clock;
use crate::crash::{self, CrashRecorder};
use crate::fault::{FaultMemory, PanicTrace};
use crate::logger::{SharedLog, lock_log};
use crate::monitor::{Monitor, Watchdog};
use crate::paths::{PathKind, SavePaths, is_valid_rom_path};
use crate::platform::{Platform, ResetReason, SystemProbe};
use crate::save;
use crate::stats::{Statistics, StatsHub};

/// Everything [`System::init`] needs from the outside.
pub struct Collaborators {
    pub storage: Shared<dyn Storage>,
    pub settings: Shared<dyn Settings>,
    pub display: Shared<dyn Display>,
    pub input: Shared<dyn Input>,
    pub audio: Shared<dyn Audio>,
    pub platform: Box<dyn Platform>,
    pub probe: Arc<dyn SystemProbe>,
    pub fault_memory: Box<dyn FaultMemory>,
    /// Ring the installed logger writes to.
    pub log: SharedLog,
}

pub struct System {
    app: AppDescriptor,
    handlers: Handlers,
    config: RuntimeConfig,
    paths: SavePaths,
    gui: Gui,
    storage: Shared<dyn Storage>,
    settings: Shared<dyn Settings>,
    display: Shared<dyn Display>,
    input: Shared<dyn Input>,
    audio: Shared<dyn Audio>,
    platform: Box<dyn Platform>,
    probe: Arc<dyn SystemProbe>,
    log: SharedLog,
    stats: StatsHub,
    crash: Arc<CrashRecorder>,
    watchdog: Watchdog,
    time_jumped: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
    storage_ready: bool,
    led: bool,
}

impl System {
    /// Bring up the collaborators in order and run the boot checks.
    ///
    /// Only a GUI that cannot start is an error. Every other failure is
    /// logged, and the boot checks may leave for the launcher instead of
    /// returning.
    pub fn init(
        mut app: AppDescriptor,
        handlers: Handlers,
        config: RuntimeConfig,
        parts: Collaborators,
    ) -> Result<Self> {
        let Collaborators {
            storage,
            settings,
            display,
            input,
            audio,
            platform,
            probe,
            fault_memory,
            log,
        } = parts;

        log::info!(
            "{} {} (built {} {} by {})",
            app.name,
            app.version,
            app.build_date,
            app.build_time,
            app.build_user
        );
        app.is_launcher = app.name == config.system.launcher;
        log::set_max_level(app.log_level);
        probe.set_led(false);

        let storage_ready = match storage.borrow_mut().mount() {
            Ok(()) => true,
            Err(e) => {
                log::error!("storage mount failed: {e}");
                false
            },
        };
        if let Err(e) = settings.borrow_mut().init(&app.name) {
            log::error!("settings init failed: {e}");
        }
        if let Err(e) = display.borrow_mut().init() {
            log::error!("display init failed: {e}");
        }
        let mut gui = Gui::new(
            Rc::clone(&display),
            Rc::clone(&input),
            Rc::clone(&settings),
            &config.gui,
        )?;
        gui.draw_hourglass();
        if let Err(e) = audio.borrow_mut().init(app.sample_rate) {
            log::error!("audio init failed: {e}");
        }
        if let Err(e) = input.borrow_mut().init() {
            log::error!("input init failed: {e}");
        }

        let stats = StatsHub::new();
        let crash = Arc::new(CrashRecorder::new(fault_memory, Arc::clone(&log), stats.clone()));
        let mut system = Self {
            paths: SavePaths::from_config(&config.paths),
            app,
            handlers,
            config,
            gui,
            storage,
            settings,
            display,
            input,
            audio,
            platform,
            probe,
            log,
            stats,
            crash,
            watchdog: Watchdog::new(None),
            time_jumped: Arc::new(AtomicBool::new(false)),
            monitor: None,
            storage_ready,
            led: false,
        };

        system.init_time();
        system.boot_checks();
        system.start_monitor();
        log::info!("system ready");
        Ok(system)
    }

    fn boot_checks(&mut self) {
        let launcher = self.config.system.launcher.clone();
        let previous = self.crash.take_previous();

        if self.platform.reset_reason() == ResetReason::Panic {
            let mut message = "Application crashed".to_string();
            if let Some(trace) = &previous {
                log::info!("panic trace found, saving it");
                if !trace.message.is_empty() {
                    message.clone_from(&trace.message);
                }
                let path = self.config.paths.trace_file.clone();
                match self.save_trace(&path, Some(trace)) {
                    Ok(()) => message.push_str("\nLog saved to SD Card."),
                    Err(e) => log::error!("could not save panic trace: {e}"),
                }
            }
            self.gui.clear(Rgb565::BLUE);
            self.gui.alert(Some("System Panic!"), Some(&message));
            self.switch_app(&launcher);
        }

        if !self.storage_ready {
            self.gui.clear(Rgb565::SKY_BLUE);
            self.gui.alert(Some("SD Card Error"), Some("Mount failed."));
            self.switch_app(&launcher);
        }

        if !self.app.is_launcher {
            {
                let settings = self.settings.borrow();
                self.app.start_action =
                    StartAction::from_i32(settings.get_i32(SETTING_START_ACTION, 0));
                self.app.rom_path = settings.get_string(SETTING_ROM_FILE_PATH);
            }
            self.app.refresh_rate = 60;

            if self.input.borrow_mut().key_is_pressed(Keys::ALL) {
                log::info!("key held at boot, returning to {launcher}");
                self.switch_app(&launcher);
            }
            if self.startup_app() == 0 {
                // Boot straight into this app only once.
                self.set_boot_app(&launcher);
            }
            if !is_valid_rom_path(self.app.rom_path.as_deref()) {
                self.gui.alert(Some("SD Card Error"), Some("Invalid ROM Path."));
                self.switch_app(&launcher);
            }
        }
    }

    /// A monitor sharing this system's statistics, watchdog and crash
    /// recorder. Clock jumps it detects are persisted by [`System::tick`].
    pub fn build_monitor(&mut self) -> Monitor {
        let monitor = Monitor::new(
            Arc::clone(&self.probe),
            self.stats.clone(),
            self.watchdog.clone(),
            Arc::clone(&self.crash),
            &self.config.system,
        );
        self.time_jumped = monitor.time_jump_flag();
        monitor
    }

    fn start_monitor(&mut self) {
        if self.config.system.spawn_monitor {
            let monitor = self.build_monitor();
            match monitor.spawn() {
                Ok(handle) => self.monitor = Some(handle),
                Err(e) => log::error!("could not start monitor: {e}"),
            }
        }
        // Loose until the first frame is presented.
        self.relax_watchdog();
    }

    fn relax_watchdog(&self) {
        self.watchdog
            .set(Some(self.config.system.input_timeout() * 2));
    }

    fn tighten_watchdog(&self) {
        self.watchdog.set(Some(self.config.system.input_timeout()));
    }

    /// Install a Rust panic hook that records into the crash trace.
    pub fn install_panic_hook(&self) {
        crash::install_panic_hook(Arc::clone(&self.crash));
    }

    // -----------------------------------------------------------------------
    // Per-frame accounting
    // -----------------------------------------------------------------------

    /// Account one emulated frame that kept the CPU busy for `busy`.
    pub fn tick(&mut self, busy: Duration) {
        let counters = self.display.borrow().status().counters;
        if self.stats.tick(counters, busy) == 1 {
            self.tighten_watchdog();
        }
        if self.time_jumped.swap(false, Ordering::Relaxed) {
            self.save_time();
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    fn init_time(&mut self) {
        let saved = self.settings.borrow().get_i32(SETTING_RTC_VALUE, 0);
        let (secs, source) = if saved > 0 {
            (i64::from(saved), "settings")
        } else {
            (self.config.system.fallback_epoch, "hardcoded")
        };
        self.platform.set_time(secs);
        log::info!("time is now {} (from {source})", clock::format_human(secs));
    }

    /// Persist the wall-clock time so the next boot can restore it.
    pub fn save_time(&mut self) {
        let now = self.probe.unix_time();
        let value = i32::try_from(now).unwrap_or(i32::MAX);
        let mut settings = self.settings.borrow_mut();
        settings.set_i32(SETTING_RTC_VALUE, value);
        if let Err(e) = settings.save() {
            log::warn!("could not save time: {e}");
        }
        log::info!("time saved: {}", clock::format_human(now));
    }

    pub fn set_time(&mut self, unix_secs: i64) {
        self.platform.set_time(unix_secs);
        log::info!("time set to {}", clock::format_human(unix_secs));
    }

    // -----------------------------------------------------------------------
    // App switching and power
    // -----------------------------------------------------------------------

    pub fn startup_app(&self) -> i32 {
        self.settings.borrow().get_i32(SETTING_STARTUP_APP, 1)
    }

    pub fn set_startup_app(&mut self, value: i32) {
        self.settings.borrow_mut().set_i32(SETTING_STARTUP_APP, value);
    }

    /// Select the app started by the next restart. Panics if it is not
    /// installed.
    pub fn set_boot_app(&mut self, name: &str) {
        if !self.platform.find_app(name) {
            self.panic("Unable to set boot app: App not found!", name);
        }
        if let Err(e) = self.platform.set_boot_app(name) {
            self.panic("Unable to set boot app!", &e.to_string());
        }
        log::info!("boot app set to {name}");
    }

    pub fn switch_app(&mut self, name: &str) -> ! {
        log::info!("switching to app {name}");
        self.gui.clear(Rgb565::BLACK);
        self.gui.draw_hourglass();
        self.set_boot_app(name);
        self.restart()
    }

    /// Record the ROM to run and how, then switch to `app`.
    pub fn start_game(&mut self, app: &str, rom_path: &str, action: StartAction) -> ! {
        {
            let mut settings = self.settings.borrow_mut();
            settings.set_string(SETTING_ROM_FILE_PATH, rom_path);
            settings.set_i32(SETTING_START_ACTION, action.as_i32());
        }
        self.switch_app(app)
    }

    fn shutdown_cleanup(&mut self) {
        self.input.borrow_mut().wait_for_key(Keys::ALL, false);
        self.emit(SystemEvent::Shutdown);
        self.save_time();
        if let Err(e) = self.settings.borrow_mut().save() {
            log::error!("could not save settings: {e}");
        }
        self.audio.borrow_mut().deinit();
        self.input.borrow_mut().deinit();
        self.platform.deinit_peripherals();
        self.storage.borrow_mut().unmount();
    }

    pub fn restart(&mut self) -> ! {
        log::info!("restarting");
        self.shutdown_cleanup();
        self.platform.restart()
    }

    pub fn sleep(&mut self) -> ! {
        log::info!("going to sleep");
        self.emit(SystemEvent::Sleep);
        self.shutdown_cleanup();
        self.platform.deep_sleep()
    }

    pub fn shutdown(&mut self) -> ! {
        log::info!("halting");
        self.shutdown_cleanup();
        self.platform.halt()
    }

    /// Record a fatal error and terminate.
    pub fn panic(&self, message: &str, context: &str) -> ! {
        self.crash.record_panic(message, context);
        self.probe.abort()
    }

    pub fn emit(&mut self, event: SystemEvent) {
        log::debug!("event {event:?}");
        if let Some(handler) = self.handlers.event.as_mut() {
            handler(event);
        }
    }

    // -----------------------------------------------------------------------
    // Save states and screenshots
    // -----------------------------------------------------------------------

    fn state_path(&self, has_handler: bool) -> Result<String> {
        match (&self.app.rom_path, has_handler) {
            (Some(rom), true) => self.paths.get(PathKind::SaveState, rom),
            _ => {
                log::error!("no ROM or handler defined");
                Err(PocketError::Unsupported(
                    "save states need a ROM and a handler".to_string(),
                ))
            },
        }
    }

    pub fn load_state(&mut self) -> Result<()> {
        let path = self.state_path(self.handlers.load_state.is_some())?;
        log::info!("loading state from {path}");
        self.gui.draw_hourglass();
        self.relax_watchdog();

        let result = match self.handlers.load_state.as_mut() {
            Some(handler) => {
                let mut storage = self.storage.borrow_mut();
                let vfs: &mut dyn Vfs = &mut *storage;
                handler(vfs, &path)
            },
            None => Err(PocketError::Unsupported("load state".to_string())),
        };
        if let Err(e) = &result {
            log::error!("load failed: {e}");
        }

        self.tighten_watchdog();
        result
    }

    /// Write the save state atomically. On success the next boot resumes
    /// from it and a thumbnail is saved next to it.
    pub fn save_state(&mut self) -> Result<()> {
        let path = self.state_path(self.handlers.save_state.is_some())?;
        log::info!("saving state to {path}");
        self.set_led(true);
        self.gui.draw_hourglass();
        self.relax_watchdog();

        let result = match self.handlers.save_state.as_mut() {
            Some(handler) => {
                let mut storage = self.storage.borrow_mut();
                save::save_atomic(&mut *storage, &path, |vfs, tmp| handler(vfs, tmp))
            },
            None => Err(PocketError::Unsupported("save state".to_string())),
        };

        match &result {
            Ok(()) => {
                {
                    let mut settings = self.settings.borrow_mut();
                    settings.set_i32(SETTING_START_ACTION, StartAction::Resume.as_i32());
                    if let Err(e) = settings.save() {
                        log::warn!("could not save settings: {e}");
                    }
                }
                let shot = self
                    .app
                    .rom_path
                    .as_deref()
                    .map(|rom| self.paths.get(PathKind::Screenshot, rom));
                if let Some(Ok(shot)) = shot {
                    let width = self.gui.screen_size().width / 2;
                    if let Err(e) = self.screenshot(&shot, width, 0) {
                        log::warn!("no thumbnail for save state: {e}");
                    }
                }
            },
            Err(_) => self.gui.alert(Some("Save failed"), None),
        }

        self.tighten_watchdog();
        self.set_led(false);
        result
    }

    /// Save the app's current frame as PNG, resized to `width` x `height`
    /// (0 keeps the aspect ratio, both 0 keeps the size).
    pub fn screenshot(&mut self, path: &str, width: i32, height: i32) -> Result<()> {
        let Some(capture) = self.handlers.capture_frame.as_mut() else {
            log::error!("no frame capture handler defined");
            return Err(PocketError::Unsupported("screenshot".to_string()));
        };
        let frame = capture();
        log::info!("saving {width}x{height} screenshot to {path}");

        self.set_led(true);
        let result = frame
            .ok_or_else(|| PocketError::Image("no frame to capture".to_string()))
            .and_then(|frame| frame.copy_resized(width, height))
            .and_then(|image| {
                let mut storage = self.storage.borrow_mut();
                let dir = dirname(path);
                if let Err(e) = storage.mkdir(dir) {
                    log::warn!("mkdir {dir} failed: {e}");
                }
                image.save_to_file(&mut *storage, path)
            });
        self.set_led(false);
        result
    }

    /// Ask the app to reset its emulated machine.
    pub fn emu_reset(&mut self, hard: bool) -> bool {
        match self.handlers.reset.as_mut() {
            Some(handler) => handler(hard),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Trace dumps
    // -----------------------------------------------------------------------

    /// Text of a trace dump. Without `trace` the live state is used.
    pub fn trace_text(&self, trace: Option<&PanicTrace>) -> String {
        let (stats, log) = match trace {
            Some(t) => (t.statistics, t.log.contents()),
            None => (self.stats.snapshot(), lock_log(&self.log).contents()),
        };
        let mut out = String::new();
        out.push_str(&format!("Application: {}\n", self.app.name));
        out.push_str(&format!("Version: {}\n", self.app.version));
        out.push_str(&format!(
            "Build date: {} {}\n",
            self.app.build_date, self.app.build_time
        ));
        out.push_str(&format!("Runtime: pocket-system {}\n", env!("CARGO_PKG_VERSION")));
        out.push_str(&format!(
            "Free memory: {} + {}\n",
            stats.free_memory_int, stats.free_memory_ext
        ));
        out.push_str(&format!(
            "Free block: {} + {}\n",
            stats.free_block_int, stats.free_block_ext
        ));
        out.push_str(&format!("Stack HWM: {}\n", stats.free_stack_main));
        out.push_str(&format!("Uptime: {}s\n", self.probe.uptime().as_secs()));
        if let Some(t) = trace {
            if !t.message.is_empty() {
                out.push_str(&format!("Panic message: {}\n", t.message));
            }
            if !t.context.is_empty() {
                out.push_str(&format!("Panic context: {}\n", t.context));
            }
        }
        out.push_str("\nLog output:\n");
        out.push_str(&log);
        out.push_str("\n\nEnd of trace\n\n");
        out
    }

    pub fn save_trace(&self, path: &str, trace: Option<&PanicTrace>) -> Result<()> {
        let text = self.trace_text(trace);
        let mut storage = self.storage.borrow_mut();
        let dir = dirname(path);
        if let Err(e) = storage.mkdir(dir) {
            log::warn!("mkdir {dir} failed: {e}");
        }
        storage.write(path, text.as_bytes())?;
        log::info!("trace saved to {path}");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn set_led(&mut self, on: bool) {
        self.probe.set_led(on);
        self.led = on;
    }

    pub fn led(&self) -> bool {
        self.led
    }

    pub fn set_log_level(&mut self, level: LevelFilter) {
        self.app.log_level = level;
        log::set_max_level(level);
    }

    pub fn log_level(&self) -> LevelFilter {
        self.app.log_level
    }

    pub fn app(&self) -> &AppDescriptor {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut AppDescriptor {
        &mut self.app
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn paths(&self) -> &SavePaths {
        &self.paths
    }

    pub fn gui(&self) -> &Gui {
        &self.gui
    }

    pub fn gui_mut(&mut self) -> &mut Gui {
        &mut self.gui
    }

    pub fn storage(&self) -> Shared<dyn Storage> {
        Rc::clone(&self.storage)
    }

    pub fn settings(&self) -> Shared<dyn Settings> {
        Rc::clone(&self.settings)
    }

    pub fn audio(&self) -> Shared<dyn Audio> {
        Rc::clone(&self.audio)
    }

    pub fn input(&self) -> Shared<dyn Input> {
        Rc::clone(&self.input)
    }

    pub fn display(&self) -> Shared<dyn Display> {
        Rc::clone(&self.display)
    }

    pub(crate) fn platform_mut(&mut self) -> &mut dyn Platform {
        self.platform.as_mut()
    }

    pub(crate) fn probe(&self) -> &dyn SystemProbe {
        self.probe.as_ref()
    }

    pub(crate) fn settings_handler(&self) -> Option<crate::app::SettingsHandler> {
        self.handlers.settings.as_ref().map(Rc::clone)
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn crash_recorder(&self) -> Arc<CrashRecorder> {
        Arc::clone(&self.crash)
    }

    pub fn log_ring(&self) -> SharedLog {
        Arc::clone(&self.log)
    }

    /// True when the background monitor thread is running.
    pub fn monitor_running(&self) -> bool {
        self.monitor.as_ref().is_some_and(|h| !h.is_finished())
    }
}
