//! Pocket runtime desktop runner.
//!
//! Boots one app against host-backed collaborators, runs a few frames,
//! optionally opens one of the system menus driven by a key script, and
//! shuts down.
//!
//! Usage:
//!   pocket-app [--root DIR] [--app NAME] [--frames N] [--script KEYS]
//!              [--menu game|settings|about|debug] [--start APP:ROM]
//!              [--screenshot FILE]
//!
//! `--root` stands in for the SD card. `--script` is a comma separated list
//! of buttons (`down,down,a`); once it runs out, B is pressed until every
//! dialog is closed.

mod desktop;

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use log::LevelFilter;

use desktop::{
    ClockOffset, DesktopPlatform, DesktopProbe, FileFaultMemory, FramebufferDisplay, JsonSettings,
    NullAudio, ScriptInput, parse_script,
};
use pocket_gui::TextFlags;
use pocket_system::config::{CONFIG_PATH, load_config};
use pocket_system::logger::{RingLogger, shared_log};
use pocket_system::{AppDescriptor, Collaborators, Handlers, StartAction, System, SystemEvent};
use pocket_types::backend::{Shared, shared};
use pocket_types::color::Rgb565;
use pocket_types::config::RuntimeConfig;
use pocket_types::input::Keys;
use pocket_vfs::{RealVfs, Storage};

const SCREEN_WIDTH: i32 = 320;
const SCREEN_HEIGHT: i32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Menu {
    Game,
    Settings,
    About,
    Debug,
}

impl FromStr for Menu {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "game" => Ok(Menu::Game),
            "settings" => Ok(Menu::Settings),
            "about" => Ok(Menu::About),
            "debug" => Ok(Menu::Debug),
            other => bail!("unknown menu: {other}"),
        }
    }
}

#[derive(Debug, PartialEq)]
struct Args {
    root: PathBuf,
    app: Option<String>,
    frames: u32,
    script: Vec<Keys>,
    menu: Option<Menu>,
    start: Option<(String, String)>,
    screenshot: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            root: PathBuf::from("sdcard"),
            app: None,
            frames: 60,
            script: Vec::new(),
            menu: None,
            start: None,
            screenshot: None,
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut out = Args::default();
    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .ok_or_else(|| anyhow!("{flag} needs a value"))
        };
        match flag.as_str() {
            "--root" => out.root = PathBuf::from(value()?),
            "--app" => out.app = Some(value()?),
            "--frames" => {
                out.frames = value()?
                    .parse()
                    .context("--frames takes a number")?;
            },
            "--script" => out.script = parse_script(&value()?)?,
            "--menu" => out.menu = Some(value()?.parse()?),
            "--start" => {
                let target = value()?;
                let (app, rom) = target
                    .split_once(':')
                    .ok_or_else(|| anyhow!("--start takes APP:ROM"))?;
                out.start = Some((app.to_string(), rom.to_string()));
            },
            "--screenshot" => out.screenshot = Some(PathBuf::from(value()?)),
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(out)
}

/// Host directory backing `runtime_path` below `root`.
fn host_path(root: &Path, runtime_path: &str) -> PathBuf {
    root.join(runtime_path.trim_start_matches('/'))
}

fn read_config(root: &Path) -> Result<RuntimeConfig> {
    let mut vfs = RealVfs::new(root);
    vfs.mount()?;
    Ok(load_config(&vfs, CONFIG_PATH)?)
}

/// The demo app's machine state: a frame counter.
fn demo_handlers(frame: Rc<Cell<u32>>, display: Shared<FramebufferDisplay>) -> Handlers {
    let saved = Rc::clone(&frame);
    let loaded = Rc::clone(&frame);
    let reset = Rc::clone(&frame);
    Handlers {
        save_state: Some(Box::new(move |vfs, path| {
            let state = serde_json::json!({ "frame": saved.get() });
            vfs.write(path, &serde_json::to_vec(&state)?)
        })),
        load_state: Some(Box::new(move |vfs, path| {
            let state: serde_json::Value = serde_json::from_slice(&vfs.read(path)?)?;
            let n = state["frame"].as_u64().unwrap_or(0);
            loaded.set(u32::try_from(n).unwrap_or(0));
            Ok(())
        })),
        reset: Some(Box::new(move |_hard| {
            reset.set(0);
            true
        })),
        capture_frame: Some(Box::new(move || display.borrow().snapshot().ok())),
        settings: None,
        event: Some(Box::new(|event| log::debug!("app event: {event:?}"))),
    }
}

fn draw_frame(system: &mut System, frame: u32) {
    let gui = system.gui_mut();
    let shade = (frame % 32) as u8;
    let background = Rgb565::from_rgb888(shade * 4, shade * 2, 96);
    gui.draw_rect(0, 0, SCREEN_WIDTH, SCREEN_HEIGHT, 0, Rgb565::BLACK, Some(background));
    gui.draw_text(
        8,
        8,
        0,
        &format!("frame {frame}"),
        Rgb565::WHITE,
        background,
        TextFlags::NONE,
    );
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    fs::create_dir_all(&args.root)
        .with_context(|| format!("creating {}", args.root.display()))?;
    let config = read_config(&args.root)?;

    let log = shared_log(config.system.log_ring_size);
    let console =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    RingLogger::new(Arc::clone(&log))
        .with_console(console)
        .install(LevelFilter::Info)?;

    let state_dir = host_path(&args.root, &config.paths.base);
    fs::create_dir_all(&state_dir)?;

    let name = args
        .app
        .clone()
        .unwrap_or_else(|| config.system.launcher.clone());
    let mut apps = vec![config.system.launcher.clone(), config.system.factory_app.clone()];
    if !apps.contains(&name) {
        apps.push(name.clone());
    }
    if let Some((app, _)) = &args.start
        && !apps.contains(app)
    {
        apps.push(app.clone());
    }

    let display = shared(FramebufferDisplay::new(SCREEN_WIDTH, SCREEN_HEIGHT));
    let input = ScriptInput::new(args.script.clone());
    let last_input = input.last_read_handle();
    let clock = ClockOffset::default();
    let frame = Rc::new(Cell::new(0u32));

    let parts = Collaborators {
        storage: shared(RealVfs::new(&args.root)),
        settings: shared(JsonSettings::new(state_dir.join("settings.json"))),
        display: Rc::clone(&display) as Shared<dyn pocket_types::backend::Display>,
        input: shared(input),
        audio: shared(NullAudio::default()),
        platform: Box::new(DesktopPlatform::new(&state_dir, apps, Arc::clone(&clock))),
        probe: Arc::new(DesktopProbe::new(&state_dir, clock, last_input)),
        fault_memory: Box::new(FileFaultMemory::new(state_dir.join("fault.bin"))),
        log,
    };
    let app = AppDescriptor::new(name, env!("CARGO_PKG_VERSION")).with_build(
        option_env!("POCKET_BUILD_DATE").unwrap_or("unknown"),
        option_env!("POCKET_BUILD_TIME").unwrap_or(""),
        option_env!("USER").unwrap_or("unknown"),
    );
    let handlers = demo_handlers(Rc::clone(&frame), Rc::clone(&display));

    let mut system = System::init(app, handlers, config, parts)?;
    system.install_panic_hook();

    if let Some((app, rom)) = &args.start {
        system.start_game(app, rom, StartAction::Normal);
    }
    if system.app().start_action == StartAction::Resume
        && let Err(e) = system.load_state()
    {
        log::warn!("resume failed: {e}");
    }

    for _ in 0..args.frames {
        let started = Instant::now();
        draw_frame(&mut system, frame.get());
        display.borrow_mut().present(frame.get() % 30 == 0);
        frame.set(frame.get() + 1);
        system.tick(started.elapsed());
    }

    match args.menu {
        Some(Menu::Game) => system.game_menu()?,
        Some(Menu::Settings) => system.settings_menu(Vec::new())?,
        Some(Menu::About) => system.about_menu(Vec::new())?,
        Some(Menu::Debug) => system.debug_menu()?,
        None => {},
    }
    system.emit(SystemEvent::Redraw);

    if let Some(path) = &args.screenshot {
        let png = display.borrow().snapshot()?.encode_png()?;
        fs::write(path, png).with_context(|| format!("writing {}", path.display()))?;
        log::info!("screenshot written to {}", path.display());
    }

    system.shutdown()
}

fn main() {
    if let Err(e) = run() {
        eprintln!("pocket-app: {e:#}");
        std::process::exit(1);
    }
}
