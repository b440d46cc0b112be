//! Built-in menus shared by every app.

use std::rc::Rc;

use pocket_gui::dialog::{
    AudioOutControl, BrightnessControl, FilterControl, FnBehavior, FontTypeControl,
    ScalingControl, SpeedControl, UpdateModeControl, VolumeControl,
};
use pocket_gui::{DialogEvent, DialogOption, DialogReturn, Gui, OptionList, TextFlags};
use pocket_types::color::Rgb565;
use pocket_types::error::Result;
use pocket_types::input::Keys;

use crate::clock;
use crate::stats::Statistics;
use crate::system::System;

/// Upper bound of "Random time", early 2030.
const RANDOM_TIME_RANGE: u32 = 1_893_474_000;

/// `1.2-0-gabc123` reads `1.2   (abc123)`. Other versions are unchanged.
pub fn format_version(version: &str) -> String {
    match version.split_once("-0-g") {
        Some((release, hash)) => format!("{release}   ({hash})"),
        None => version.to_string(),
    }
}

/// First line of the game-menu status bars.
pub fn format_status_header(stats: &Statistics, refresh_rate: u32) -> String {
    let speed = if refresh_rate > 0 {
        stats.total_fps / refresh_rate as f32 * 100.0
    } else {
        0.0
    };
    format!(
        "SPEED: {:.0}% ({:.0}/{:.0}) / BUSY: {:.0}%",
        speed,
        stats.total_fps - stats.skipped_fps,
        stats.total_fps,
        stats.busy_percent
    )
}

/// Fit `path` in fewer than `max_len` characters, keeping its end.
pub fn truncate_rom_path(path: &str, max_len: usize) -> String {
    let chars: Vec<char> = path.chars().collect();
    let limit = max_len.saturating_sub(1);
    if chars.len() > max_len && max_len >= 4 {
        let tail: String = chars[chars.len() - (max_len - 4)..].iter().collect();
        format!("...{tail}")
    } else {
        chars.into_iter().take(limit).collect()
    }
}

impl System {
    /// Options dialog: display, audio and font settings, then `extra` rows.
    pub fn settings_menu(&mut self, extra: Vec<DialogOption>) -> Result<()> {
        let audio = self.audio();
        let mut options = OptionList::new();
        options.push(DialogOption::new(0, "Brightness").with_behavior(BrightnessControl))?;
        options.push(
            DialogOption::new(0, "Volume    ").with_behavior(VolumeControl::new(Rc::clone(&audio))),
        )?;
        options.push(DialogOption::new(0, "Audio out ").with_behavior(AudioOutControl::new(audio)))?;
        if !self.app().is_launcher {
            options.push(DialogOption::new(0, "Scaling   ").with_behavior(ScalingControl))?;
            options.push(DialogOption::new(0, "Filter    ").with_behavior(FilterControl))?;
            options.push(DialogOption::new(0, "Update    ").with_behavior(UpdateModeControl))?;
            options.push(
                DialogOption::new(0, "Speed     ")
                    .with_behavior(SpeedControl::new(Rc::clone(&self.app().speedup))),
            )?;
        }
        options.push(DialogOption::new(0, "Font type ").with_behavior(FontTypeControl))?;
        options.extend(extra)?;
        if let Some(handler) = self.settings_handler() {
            let more = FnBehavior::new(
                move |event: DialogEvent, _: &mut String, gui: &mut Gui| {
                    if event == DialogEvent::Enter {
                        (&mut *handler.borrow_mut())(gui);
                    }
                    DialogReturn::Ignore
                },
            );
            options.push(DialogOption::new(0, "More...").with_behavior(more))?;
        }

        self.gui_mut().dialog(Some("Options"), options, 0);

        if let Err(e) = self.settings().borrow_mut().save() {
            log::warn!("could not save settings: {e}");
        }
        Ok(())
    }

    pub fn about_menu(&mut self, extra: Vec<DialogOption>) -> Result<()> {
        let app = self.app();
        let mut options = OptionList::new();
        options.push(DialogOption::new(0, "Ver.").with_value(format_version(&app.version)))?;
        options.push(
            DialogOption::new(0, "Date")
                .with_value(format!("{} {}", app.build_date, app.build_time)),
        )?;
        options.push(DialogOption::new(0, "By").with_value(app.build_user.clone()))?;
        options.extend(extra)?;
        options.push(DialogOption::separator())?;
        options.push(DialogOption::new(1000, "Reboot to firmware"))?;
        options.push(DialogOption::new(2000, "Reset settings"))?;
        options.push(DialogOption::new(4000, "Debug"))?;
        options.push(DialogOption::new(0, "Close"))?;

        let title = self.app().name.clone();
        match self.gui_mut().dialog(Some(&title), options, -1) {
            Some(1000) => {
                let factory = self.config().system.factory_app.clone();
                self.switch_app(&factory);
            },
            Some(2000) => {
                if self.gui_mut().confirm(Some("Reset all settings?"), None, false) {
                    if let Err(e) = self.settings().borrow_mut().reset() {
                        log::error!("settings reset failed: {e}");
                    }
                    self.restart();
                }
            },
            Some(4000) => self.debug_menu()?,
            _ => {},
        }
        Ok(())
    }

    pub fn debug_menu(&mut self) -> Result<()> {
        let status = self.display().borrow().status();
        let stats = self.statistics();
        let now = self.probe().unix_time();
        let uptime = self.probe().uptime().as_secs();
        let res = |s: pocket_types::backend::Size| format!("{}x{}", s.width, s.height);

        let mut options = OptionList::new();
        options.extend([
            DialogOption::new(0, "Screen Res").with_value(res(status.screen)),
            DialogOption::new(0, "Source Res").with_value(res(status.source)),
            DialogOption::new(0, "Scaled Res").with_value(res(status.viewport)),
            DialogOption::new(0, "Stack HWM ").with_value(stats.free_stack_main.to_string()),
            DialogOption::new(0, "Heap free ")
                .with_value(format!("{}+{}", stats.free_memory_int, stats.free_memory_ext)),
            DialogOption::new(0, "Block free")
                .with_value(format!("{}+{}", stats.free_block_int, stats.free_block_ext)),
            DialogOption::new(0, "System RTC").with_value(clock::format_iso(now)),
            DialogOption::new(0, "Uptime    ").with_value(format!("{uptime}s")),
            DialogOption::separator(),
            DialogOption::new(1000, "Save screenshot"),
            DialogOption::new(2000, "Save trace"),
            DialogOption::new(4000, "Crash"),
            DialogOption::new(5000, "Random time"),
        ])?;

        match self.gui_mut().dialog(Some("Debugging"), options, 0) {
            Some(1000) => {
                let path = self.config().paths.screenshot.clone();
                if let Err(e) = self.screenshot(&path, 0, 0) {
                    log::error!("screenshot failed: {e}");
                }
            },
            Some(2000) => {
                let path = format!("{}/trace.txt", self.config().paths.base);
                if let Err(e) = self.save_trace(&path, None) {
                    log::error!("trace failed: {e}");
                }
            },
            Some(4000) => self.panic("Crash test!", "debug menu"),
            Some(5000) => {
                let secs = self.platform_mut().random() % RANDOM_TIME_RANGE;
                self.set_time(i64::from(secs));
            },
            _ => {},
        }
        Ok(())
    }

    /// In-game menu. Audio is muted while it is open.
    pub fn game_menu(&mut self) -> Result<()> {
        let mut options = OptionList::new();
        options.push(DialogOption::new(1000, "Save & Continue"))?;
        options.push(DialogOption::new(2000, "Save & Quit"))?;
        options.push(DialogOption::new(3000, "Restart"))?;
        if !self.config().system.has_option_button {
            options.push(DialogOption::new(5500, "Options"))?;
        }
        options.push(DialogOption::new(6000, "About"))?;
        options.push(DialogOption::new(7000, "Quit"))?;

        self.audio().borrow_mut().set_mute(true);
        self.draw_game_status_bars();
        let title = self.app().name.clone();
        let launcher = self.config().system.launcher.clone();

        match self.gui_mut().dialog(Some(&title), options, 0) {
            Some(1000) => {
                let _ = self.save_state();
            },
            Some(2000) => {
                if self.save_state().is_ok() {
                    self.switch_app(&launcher);
                }
            },
            Some(3000) => self.restart_menu()?,
            Some(5500) => self.settings_menu(Vec::new())?,
            Some(6000) => self.about_menu(Vec::new())?,
            Some(7000) => self.switch_app(&launcher),
            _ => {},
        }

        self.audio().borrow_mut().set_mute(false);
        self.emit(crate::app::SystemEvent::Redraw);
        Ok(())
    }

    fn restart_menu(&mut self) -> Result<()> {
        let options = OptionList::try_from(vec![
            DialogOption::new(3001, "Reload save"),
            DialogOption::new(3002, "Soft reset"),
            DialogOption::new(3003, "Hard reset"),
            DialogOption::new(0, "Cancel"),
        ])?;
        match self.gui_mut().dialog(Some("Restart"), options, 0) {
            Some(3001) => {
                let _ = self.load_state();
            },
            Some(3002) => {
                self.emu_reset(false);
            },
            Some(3003) => {
                self.emu_reset(true);
            },
            _ => {},
        }
        Ok(())
    }

    /// Options dialog over the paused game.
    pub fn game_settings_menu(&mut self) -> Result<()> {
        self.audio().borrow_mut().set_mute(true);
        self.draw_game_status_bars();
        let result = self.settings_menu(Vec::new());
        self.audio().borrow_mut().set_mute(false);
        self.emit(crate::app::SystemEvent::Redraw);
        result
    }

    /// Speed and load at the top, ROM path at the bottom.
    pub fn draw_game_status_bars(&mut self) {
        let header = format_status_header(&self.statistics(), self.app().refresh_rate);
        let rom = self.app().rom_path.clone().unwrap_or_default();
        let gui = self.gui_mut();
        let screen = gui.screen_size();
        let font = gui.font_info();
        let max_len = (screen.width / font.width.max(7)).clamp(1, 99) as usize;
        let footer = truncate_rom_path(&rom, max_len);
        let height = (font.height + 4).max(16);

        gui.input().borrow_mut().wait_for_key(Keys::ALL, false);
        gui.draw_rect(0, 0, screen.width, height, 0, Rgb565::BLACK, Some(Rgb565::BLACK));
        gui.draw_rect(0, -height, screen.width, height, 0, Rgb565::BLACK, Some(Rgb565::BLACK));
        gui.draw_text(0, 2, screen.width, &header, Rgb565::SILVER, Rgb565::BLACK, TextFlags::NONE);
        gui.draw_text(
            0,
            -height + 2,
            screen.width,
            &footer,
            Rgb565::SILVER,
            Rgb565::BLACK,
            TextFlags::NONE,
        );
        gui.draw_battery(-26, 3);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    use super::*;
    use crate::app::{Handlers, SystemEvent};
    use crate::fault::{FaultMemory, PanicTrace};
    use pocket_vfs::Vfs;
    use crate::system::tests::{ROM, Rig, SAVE};
    use crate::test_utils::{PlatformExit, run_until_exit};
    use pocket_gui::Image;

    fn taps(rig: &Rig, keys: &[Keys]) {
        let script: Vec<Keys> = keys.iter().flat_map(|&k| [k, Keys::NONE]).collect();
        rig.script(&script);
    }

    #[test]
    fn version_with_release_hash() {
        assert_eq!(format_version("1.2-0-gabc123"), "1.2   (abc123)");
        assert_eq!(format_version("1.2-5-gabc123"), "1.2-5-gabc123");
        assert_eq!(format_version("dev"), "dev");
    }

    #[test]
    fn status_header() {
        let stats = Statistics {
            total_fps: 60.0,
            skipped_fps: 6.0,
            busy_percent: 42.4,
            ..Statistics::default()
        };
        assert_eq!(format_status_header(&stats, 60), "SPEED: 100% (54/60) / BUSY: 42%");
        assert_eq!(format_status_header(&stats, 0), "SPEED: 0% (54/60) / BUSY: 42%");
    }

    #[test]
    fn rom_path_keeps_tail() {
        assert_eq!(truncate_rom_path("/sd/roms/nes/a.nes", 40), "/sd/roms/nes/a.nes");
        assert_eq!(truncate_rom_path("/sd/roms/nes/mario.nes", 10), "...io.nes");
        assert_eq!(truncate_rom_path("abcdef", 6), "abcde");
        assert_eq!(truncate_rom_path("", 10), "");
    }

    #[test]
    fn settings_menu_for_launcher_saves() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        let saves = rig.settings.borrow().saves;
        taps(&rig, &[Keys::B]);
        system.settings_menu(Vec::new()).unwrap();
        assert_eq!(rig.settings.borrow().saves, saves + 1);
        assert_eq!(rig.input.borrow().remaining(), 0);
    }

    #[test]
    fn more_row_runs_settings_handler() {
        let rig = Rig::new();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let handlers = Handlers {
            settings: Some(Rc::new(RefCell::new(move |_: &mut Gui| seen.set(seen.get() + 1)))),
            ..Handlers::default()
        };
        let mut system = rig.boot("launcher", handlers);
        // "More..." is the last row; up wraps to it.
        taps(&rig, &[Keys::UP, Keys::A, Keys::B]);
        system
            .settings_menu(vec![DialogOption::new(0, "Extra").with_value("x")])
            .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn game_settings_menu_has_video_rows_and_mutes() {
        let rig = Rig::with_rom();
        let mut system = rig.boot("nes", Handlers::default());
        // Brightness, volume, audio out, scaling, filter, update, speed, font.
        // Right on "Speed" steps the speed-up.
        taps(&rig, &[Keys::UP, Keys::UP, Keys::RIGHT, Keys::B]);
        system.game_settings_menu().unwrap();
        assert_eq!(system.app().speedup.get(), 1);
        assert!(!rig.audio.borrow().muted);
    }

    #[test]
    fn about_close_does_nothing() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        taps(&rig, &[Keys::A]);
        system.about_menu(Vec::new()).unwrap();
        assert_eq!(rig.boot_app(), None);
    }

    #[test]
    fn about_reset_settings_restarts() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        // Close -> Debug -> Reset settings, then Yes.
        taps(&rig, &[Keys::UP, Keys::UP, Keys::A, Keys::UP, Keys::A]);
        let exit = run_until_exit(|| {
            system.about_menu(Vec::new()).unwrap();
        });
        assert_eq!(exit, PlatformExit::Restart);
        assert_eq!(rig.settings.borrow().resets, 1);
    }

    #[test]
    fn about_reset_declined() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        taps(&rig, &[Keys::UP, Keys::UP, Keys::A, Keys::A]);
        system.about_menu(Vec::new()).unwrap();
        assert_eq!(rig.settings.borrow().resets, 0);
    }

    #[test]
    fn about_reboots_to_firmware() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        taps(&rig, &[Keys::UP, Keys::UP, Keys::UP, Keys::A]);
        let exit = run_until_exit(|| {
            system.about_menu(Vec::new()).unwrap();
        });
        assert_eq!(exit, PlatformExit::Restart);
        assert_eq!(rig.boot_app().as_deref(), Some("factory"));
    }

    #[test]
    fn debug_random_time() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        taps(&rig, &[Keys::UP, Keys::A]);
        system.debug_menu().unwrap();
        assert_eq!(rig.platform.borrow().time, Some(12_345));
    }

    #[test]
    fn debug_save_trace() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        taps(&rig, &[Keys::UP, Keys::UP, Keys::UP, Keys::A]);
        system.debug_menu().unwrap();
        assert!(rig.storage.borrow().exists("/sd/pocket/trace.txt"));
    }

    #[test]
    fn debug_crash_records_trace() {
        let rig = Rig::new();
        let mut system = rig.boot("launcher", Handlers::default());
        taps(&rig, &[Keys::UP, Keys::UP, Keys::A]);
        let exit = run_until_exit(|| {
            system.debug_menu().unwrap();
        });
        assert_eq!(exit, PlatformExit::Abort);
        let trace = PanicTrace::decode(&rig.region.read()).unwrap();
        assert_eq!(trace.message, "Crash test!");
    }

    fn game_handlers(resets: Rc<RefCell<Vec<bool>>>, events: Rc<RefCell<Vec<SystemEvent>>>) -> Handlers {
        Handlers {
            save_state: Some(Box::new(|vfs, path| vfs.write(path, b"state"))),
            capture_frame: Some(Box::new(|| Image::new(4, 4).ok())),
            reset: Some(Box::new(move |hard| {
                resets.borrow_mut().push(hard);
                true
            })),
            event: Some(Box::new(move |e| events.borrow_mut().push(e))),
            ..Handlers::default()
        }
    }

    #[test]
    fn game_menu_save_and_continue() {
        let rig = Rig::with_rom();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut system = rig.boot("nes", game_handlers(Rc::default(), Rc::clone(&events)));
        taps(&rig, &[Keys::A]);
        system.game_menu().unwrap();
        assert_eq!(rig.storage.borrow().read(SAVE).unwrap(), b"state");
        assert!(!rig.audio.borrow().muted);
        assert_eq!(*events.borrow(), vec![SystemEvent::Redraw]);
        assert_eq!(system.app().rom_path.as_deref(), Some(ROM));
    }

    #[test]
    fn game_menu_save_and_quit() {
        let rig = Rig::with_rom();
        let mut system = rig.boot("nes", game_handlers(Rc::default(), Rc::default()));
        taps(&rig, &[Keys::DOWN, Keys::A]);
        let exit = run_until_exit(|| {
            system.game_menu().unwrap();
        });
        assert_eq!(exit, PlatformExit::Restart);
        assert_eq!(rig.boot_app().as_deref(), Some("launcher"));
        assert!(rig.storage.borrow().exists(SAVE));
    }

    #[test]
    fn game_menu_soft_reset() {
        let rig = Rig::with_rom();
        let resets = Rc::new(RefCell::new(Vec::new()));
        let mut system = rig.boot("nes", game_handlers(Rc::clone(&resets), Rc::default()));
        taps(&rig, &[Keys::DOWN, Keys::DOWN, Keys::A, Keys::DOWN, Keys::A]);
        system.game_menu().unwrap();
        assert_eq!(*resets.borrow(), vec![false]);
    }

    #[test]
    fn game_menu_options_entry_without_option_button() {
        let mut rig = Rig::with_rom();
        rig.config.system.has_option_button = false;
        let mut system = rig.boot("nes", Handlers::default());
        // Save & Continue, Save & Quit, Restart, Options, About, Quit.
        taps(&rig, &[Keys::UP, Keys::UP, Keys::UP, Keys::A, Keys::B]);
        let saves = rig.settings.borrow().saves;
        system.game_menu().unwrap();
        assert_eq!(rig.settings.borrow().saves, saves + 1);
    }

    #[test]
    fn status_bars_are_black_strips() {
        let rig = Rig::with_rom();
        let mut system = rig.boot("nes", Handlers::default());
        system.tick(Duration::from_millis(1));
        system.draw_game_status_bars();
        let display = rig.display.borrow();
        let font = system.gui().font_info();
        let height = (font.height + 4).max(16);
        let writes = display.writes();
        assert!(writes.iter().any(|&(x, y, w, _)| (x, y, w) == (0, 0, 320)));
        assert!(writes.iter().any(|&(x, y, w, _)| (x, y, w) == (0, 240 - height, 320)));
        assert!(display.count_in(0, 0, 320, height, Rgb565::SILVER) > 0);
    }
}
