//! Host-directory storage.
//!
//! Maps the runtime's absolute paths onto a directory of the host
//! filesystem, the way the desktop simulator stands in for the SD card.

use std::fs;
use std::path::{Component, Path, PathBuf};

use pocket_types::error::{PocketError, Result};

use crate::{EntryKind, Storage, Vfs, VfsEntry, VfsMetadata};

/// Storage rooted at a host directory.
#[derive(Debug)]
pub struct RealVfs {
    root: PathBuf,
    mounted: bool,
}

impl RealVfs {
    /// The root is not touched until [`Storage::mount`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a runtime path to a host path. `..` components are refused so
    /// nothing escapes the root.
    fn host_path(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path.trim_start_matches('/'));
        let mut out = self.root.clone();
        for comp in rel.components() {
            match comp {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {},
                _ => return Err(PocketError::Vfs(format!("path escapes root: {path}"))),
            }
        }
        Ok(out)
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(PocketError::Storage("storage not mounted".to_string()))
        }
    }
}

impl Vfs for RealVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        self.ensure_mounted()?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.host_path(path)?)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            entries.push(VfsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.ensure_mounted()?;
        Ok(fs::read(self.host_path(path)?)?)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.ensure_mounted()?;
        Ok(fs::write(self.host_path(path)?, data)?)
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        self.ensure_mounted()?;
        let meta = fs::metadata(self.host_path(path)?)?;
        Ok(VfsMetadata {
            kind: if meta.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            size: if meta.is_dir() { 0 } else { meta.len() },
        })
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        self.ensure_mounted()?;
        Ok(fs::create_dir_all(self.host_path(path)?)?)
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.ensure_mounted()?;
        let host = self.host_path(path)?;
        if host == self.root {
            return Err(PocketError::Vfs("cannot remove root".to_string()));
        }
        if host.is_dir() {
            fs::remove_dir(host)?;
        } else {
            fs::remove_file(host)?;
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.mounted && self.host_path(path).is_ok_and(|p| p.exists())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.ensure_mounted()?;
        Ok(fs::rename(self.host_path(from)?, self.host_path(to)?)?)
    }
}

impl Storage for RealVfs {
    fn mount(&mut self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(PocketError::Storage(format!(
                "mount point missing: {}",
                self.root.display()
            )));
        }
        self.mounted = true;
        log::info!("Storage mounted at {}", self.root.display());
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted() -> (tempfile::TempDir, RealVfs) {
        let dir = tempfile::tempdir().unwrap();
        let mut vfs = RealVfs::new(dir.path());
        vfs.mount().unwrap();
        (dir, vfs)
    }

    #[test]
    fn mount_requires_existing_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut vfs = RealVfs::new(dir.path().join("missing"));
        assert!(matches!(vfs.mount(), Err(PocketError::Storage(_))));
        assert!(!vfs.is_mounted());
    }

    #[test]
    fn operations_fail_before_mount() {
        let dir = tempfile::tempdir().unwrap();
        let mut vfs = RealVfs::new(dir.path());
        assert!(vfs.write("/f", b"x").is_err());
        assert!(!vfs.exists("/"));
    }

    #[test]
    fn files_land_under_root() {
        let (dir, mut vfs) = mounted();
        vfs.mkdir("/saves/nes").unwrap();
        vfs.write("/saves/nes/game.sav", b"state").unwrap();
        let host = dir.path().join("saves/nes/game.sav");
        assert_eq!(fs::read(host).unwrap(), b"state");
        assert_eq!(vfs.stat("/saves/nes/game.sav").unwrap().size, 5);
    }

    #[test]
    fn readdir_sorted() {
        let (_dir, mut vfs) = mounted();
        vfs.write("/b", b"").unwrap();
        vfs.write("/a", b"12").unwrap();
        vfs.mkdir("/c").unwrap();
        let entries = vfs.readdir("/").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(entries[0].size, 2);
        assert_eq!(entries[2].kind, EntryKind::Directory);
    }

    #[test]
    fn rename_replaces_target() {
        let (_dir, mut vfs) = mounted();
        vfs.write("/x.new", b"new").unwrap();
        vfs.write("/x", b"old").unwrap();
        vfs.rename("/x.new", "/x").unwrap();
        assert_eq!(vfs.read("/x").unwrap(), b"new");
        assert!(!vfs.exists("/x.new"));
    }

    #[test]
    fn parent_components_rejected() {
        let (_dir, vfs) = mounted();
        assert!(vfs.read("/../etc/passwd").is_err());
        assert!(!vfs.exists("/../etc"));
    }

    #[test]
    fn remove_file_and_root() {
        let (_dir, mut vfs) = mounted();
        vfs.write("/f", b"x").unwrap();
        vfs.remove("/f").unwrap();
        assert!(!vfs.exists("/f"));
        assert!(vfs.remove("/").is_err());
    }
}
