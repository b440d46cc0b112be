//! Where per-ROM files live.
//!
//! Save states, battery saves and screenshots mirror the ROM's path below the
//! ROM root, placed under the saves root with an extra extension:
//! `/sd/roms/nes/mario.nes` saves to `/sd/pocket/saves/nes/mario.nes.sav`.

use pocket_types::config::PathConfig;
use pocket_types::error::{PocketError, Result};

/// Shortest ROM path, relative to the ROM root, considered valid.
pub const MIN_ROM_PATH_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    SaveState,
    SaveSram,
    Screenshot,
    RomFile,
}

impl PathKind {
    const fn extension(self) -> &'static str {
        match self {
            PathKind::SaveState => ".sav",
            PathKind::SaveSram => ".sram",
            PathKind::Screenshot => ".png",
            PathKind::RomFile => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePaths {
    roms: String,
    saves: String,
}

impl SavePaths {
    pub fn new(roms: impl Into<String>, saves: impl Into<String>) -> Self {
        Self {
            roms: trim_slash(roms.into()),
            saves: trim_slash(saves.into()),
        }
    }

    pub fn from_config(config: &PathConfig) -> Self {
        Self::new(config.roms.clone(), config.saves.clone())
    }

    pub fn roms_root(&self) -> &str {
        &self.roms
    }

    pub fn saves_root(&self) -> &str {
        &self.saves
    }

    /// Path of the `kind` file belonging to `rom_path`.
    pub fn get(&self, kind: PathKind, rom_path: &str) -> Result<String> {
        let relative = rom_path.strip_prefix(self.roms.as_str()).unwrap_or(rom_path);
        if relative.chars().count() < MIN_ROM_PATH_LEN {
            log::error!("invalid ROM path {rom_path:?}");
            return Err(PocketError::InvalidRomPath(rom_path.to_string()));
        }
        let sep = if relative.starts_with('/') { "" } else { "/" };
        let root = match kind {
            PathKind::RomFile => &self.roms,
            _ => &self.saves,
        };
        Ok(format!("{root}{sep}{relative}{}", kind.extension()))
    }
}

fn trim_slash(mut path: String) -> String {
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// True when `rom_path` is present and long enough to be a ROM.
pub fn is_valid_rom_path(rom_path: Option<&str>) -> bool {
    rom_path.is_some_and(|p| p.chars().count() >= MIN_ROM_PATH_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> SavePaths {
        SavePaths::new("/sd/roms/", "/sd/pocket/saves")
    }

    #[test]
    fn save_kinds() {
        let p = paths();
        let rom = "/sd/roms/nes/mario.nes";
        assert_eq!(
            p.get(PathKind::SaveState, rom).unwrap(),
            "/sd/pocket/saves/nes/mario.nes.sav"
        );
        assert_eq!(
            p.get(PathKind::SaveSram, rom).unwrap(),
            "/sd/pocket/saves/nes/mario.nes.sram"
        );
        assert_eq!(
            p.get(PathKind::Screenshot, rom).unwrap(),
            "/sd/pocket/saves/nes/mario.nes.png"
        );
    }

    #[test]
    fn relative_rom_path() {
        let p = paths();
        assert_eq!(p.get(PathKind::RomFile, "gb/tetris.gb").unwrap(), "/sd/roms/gb/tetris.gb");
        assert_eq!(
            p.get(PathKind::SaveState, "gb/tetris.gb").unwrap(),
            "/sd/pocket/saves/gb/tetris.gb.sav"
        );
    }

    #[test]
    fn path_outside_rom_root_is_kept() {
        let p = paths();
        assert_eq!(
            p.get(PathKind::SaveState, "/usb/game.gg").unwrap(),
            "/sd/pocket/saves/usb/game.gg.sav"
        );
    }

    #[test]
    fn short_path_is_rejected() {
        let p = paths();
        assert!(matches!(
            p.get(PathKind::SaveState, "/sd/roms/ab"),
            Err(PocketError::InvalidRomPath(_))
        ));
        assert!(p.get(PathKind::SaveState, "").is_err());
    }

    #[test]
    fn validity() {
        assert!(!is_valid_rom_path(None));
        assert!(!is_valid_rom_path(Some("abc")));
        assert!(is_valid_rom_path(Some("/a.b")));
    }

    #[test]
    fn from_config_uses_roots() {
        let p = SavePaths::from_config(&PathConfig::default());
        assert_eq!(p.roms_root(), "/sd/roms");
        assert_eq!(p.saves_root(), "/sd/pocket/saves");
    }
}
