//! Storage abstraction for the pocket runtime.
//!
//! The lifecycle layer reads and writes save states, screenshots, trace
//! dumps and configuration through the [`Vfs`] trait. Paths are always
//! absolute, `/`-separated strings regardless of the host.

mod memory;
mod real;

pub use memory::MemoryVfs;
pub use real::RealVfs;

use pocket_types::error::Result;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry returned by [`Vfs::readdir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// Result of [`Vfs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
}

/// File operations needed by the runtime.
pub trait Vfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>>;
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    /// Create or truncate a file. The parent directory must exist.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;
    fn stat(&self, path: &str) -> Result<VfsMetadata>;
    /// Create a directory and any missing parents.
    fn mkdir(&mut self, path: &str) -> Result<()>;
    fn remove(&mut self, path: &str) -> Result<()>;
    fn exists(&self, path: &str) -> bool;
    /// Move a file. An existing file at `to` is replaced.
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;
}

/// A mountable storage device exposing a [`Vfs`].
pub trait Storage: Vfs {
    fn mount(&mut self) -> Result<()>;
    fn unmount(&mut self);
    fn is_mounted(&self) -> bool;
}

/// Directory part of a `/`-separated path, without the trailing slash.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// Final component of a `/`-separated path.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Extension of the final component, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i + 1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirname_cases() {
        assert_eq!(dirname("/sd/saves/nes/mario.nes.sav"), "/sd/saves/nes");
        assert_eq!(dirname("/file"), "/");
        assert_eq!(dirname("file"), ".");
    }

    #[test]
    fn basename_cases() {
        assert_eq!(basename("/sd/roms/nes/mario.nes"), "mario.nes");
        assert_eq!(basename("plain"), "plain");
        assert_eq!(basename("/dir/"), "");
    }

    #[test]
    fn extension_cases() {
        assert_eq!(extension("/roms/game.gb"), Some("gb"));
        assert_eq!(extension("/roms/archive.tar.gz"), Some("gz"));
        assert_eq!(extension("/roms/.hidden"), None);
        assert_eq!(extension("/roms/noext"), None);
    }
}
