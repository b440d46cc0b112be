//! In-memory storage.
//!
//! Backs unit tests and the simulator's scratch runs. The tree is a sorted
//! map from normalized absolute paths to nodes, so directory listings come
//! out in name order for free.

use std::borrow::Cow;
use std::collections::BTreeMap;

use pocket_types::error::{PocketError, Result};

use crate::{EntryKind, Storage, Vfs, VfsEntry, VfsMetadata};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Storage that lives entirely in RAM.
#[derive(Debug)]
pub struct MemoryVfs {
    nodes: BTreeMap<String, Node>,
    mounted: bool,
    /// Make the next `mount` call fail, simulating a missing card.
    pub fail_mount: bool,
}

impl MemoryVfs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self {
            nodes,
            mounted: true,
            fail_mount: false,
        }
    }

    /// Paths of every file currently stored, in order.
    pub fn files(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::File(_)))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading `/`, no empty components, no trailing `/` except for the root.
/// Borrows when the input already has that shape.
fn normalize(path: &str) -> Cow<'_, str> {
    let clean = path.starts_with('/')
        && !path.contains("//")
        && (path.len() == 1 || !path.ends_with('/'));
    if clean {
        return Cow::Borrowed(path);
    }
    let mut out = String::with_capacity(path.len() + 1);
    for part in path.split('/').filter(|p| !p.is_empty()) {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    Cow::Owned(out)
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

impl Vfs for MemoryVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(PocketError::Vfs(format!("not a directory: {path}")));
            },
            None => return Err(PocketError::Vfs(format!("no such directory: {path}"))),
        }
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        let entries = self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, node)| {
                let name = &k[prefix.len()..];
                if name.is_empty() || name.contains('/') {
                    return None;
                }
                let (kind, size) = match node {
                    Node::Dir => (EntryKind::Directory, 0),
                    Node::File(data) => (EntryKind::File, data.len() as u64),
                };
                Some(VfsEntry {
                    name: name.to_string(),
                    kind,
                    size,
                })
            })
            .collect();
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(PocketError::Vfs(format!("is a directory: {path}"))),
            None => Err(PocketError::Vfs(format!("no such file: {path}"))),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize(path);
        if matches!(self.nodes.get(path.as_ref()), Some(Node::Dir)) {
            return Err(PocketError::Vfs(format!("is a directory: {path}")));
        }
        let par = parent(&path);
        if !matches!(self.nodes.get(par), Some(Node::Dir)) {
            return Err(PocketError::Vfs(format!("parent directory does not exist: {par}")));
        }
        self.nodes.insert(path.into_owned(), Node::File(data.to_vec()));
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::File(data)) => Ok(VfsMetadata {
                kind: EntryKind::File,
                size: data.len() as u64,
            }),
            Some(Node::Dir) => Ok(VfsMetadata {
                kind: EntryKind::Directory,
                size: 0,
            }),
            None => Err(PocketError::Vfs(format!("no such path: {path}"))),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            match self.nodes.get(&current) {
                Some(Node::Dir) => {},
                Some(Node::File(_)) => {
                    return Err(PocketError::Vfs(format!("not a directory: {current}")));
                },
                None => {
                    self.nodes.insert(current.clone(), Node::Dir);
                },
            }
        }
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if path == "/" {
            return Err(PocketError::Vfs("cannot remove root".to_string()));
        }
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => {
                let prefix = format!("{path}/");
                let has_children = self
                    .nodes
                    .range(prefix.clone()..)
                    .next()
                    .is_some_and(|(k, _)| k.starts_with(&prefix));
                if has_children {
                    return Err(PocketError::Vfs(format!("directory not empty: {path}")));
                }
            },
            Some(Node::File(_)) => {},
            None => return Err(PocketError::Vfs(format!("no such path: {path}"))),
        }
        self.nodes.remove(path.as_ref());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(normalize(path).as_ref())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        let data = match self.nodes.get(from.as_ref()) {
            Some(Node::File(data)) => data.clone(),
            Some(Node::Dir) => {
                return Err(PocketError::Vfs(format!("cannot rename directory: {from}")));
            },
            None => return Err(PocketError::Vfs(format!("no such file: {from}"))),
        };
        if matches!(self.nodes.get(to.as_ref()), Some(Node::Dir)) {
            return Err(PocketError::Vfs(format!("is a directory: {to}")));
        }
        if !matches!(self.nodes.get(parent(&to)), Some(Node::Dir)) {
            return Err(PocketError::Vfs(format!(
                "parent directory does not exist: {}",
                parent(&to)
            )));
        }
        self.nodes.remove(from.as_ref());
        self.nodes.insert(to.into_owned(), Node::File(data));
        Ok(())
    }
}

impl Storage for MemoryVfs {
    fn mount(&mut self) -> Result<()> {
        if self.fail_mount {
            self.mounted = false;
            return Err(PocketError::Storage("no card inserted".to_string()));
        }
        self.mounted = true;
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

    #[test]
    fn fresh_tree_has_root_only() {
        let vfs = MemoryVfs::new();
        assert!(vfs.exists("/"));
        assert!(vfs.readdir("/").unwrap().is_empty());
    }

    #[test]
    fn write_read_and_stat() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/sd/saves").unwrap();
        vfs.write("/sd/saves/game.sav", &[1, 2, 3]).unwrap();
        assert_eq!(vfs.read("/sd/saves/game.sav").unwrap(), vec![1, 2, 3]);
        let meta = vfs.stat("/sd/saves/game.sav").unwrap();
        assert_eq!(meta.kind, EntryKind::File);
        assert_eq!(meta.size, 3);
        assert_eq!(vfs.stat("/sd").unwrap().kind, EntryKind::Directory);
    }

    #[test]
    fn mkdir_creates_parents_and_is_idempotent() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/a/b/c").unwrap();
        vfs.mkdir("/a/b/c").unwrap();
        assert!(vfs.exists("/a") && vfs.exists("/a/b") && vfs.exists("/a/b/c"));
    }

    #[test]
    fn mkdir_through_file_fails() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/file", b"x").unwrap();
        assert!(vfs.mkdir("/file/sub").is_err());
    }

    #[test]
    fn write_without_parent_fails() {
        let mut vfs = MemoryVfs::new();
        assert!(vfs.write("/missing/dir/file", b"x").is_err());
    }

    #[test]
    fn write_onto_directory_fails() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/dir").unwrap();
        assert!(vfs.write("/dir", b"x").is_err());
        assert_eq!(vfs.stat("/dir").unwrap().kind, EntryKind::Directory);
    }

    #[test]
    fn readdir_lists_direct_children_sorted() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/roms/nes/deep").unwrap();
        vfs.write("/roms/b.gb", b"bb").unwrap();
        vfs.write("/roms/a.gb", b"a").unwrap();
        let names: Vec<_> = vfs
            .readdir("/roms")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.gb", "b.gb", "nes"]);
    }

    #[test]
    fn readdir_on_file_fails() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/f", b"").unwrap();
        assert!(vfs.readdir("/f").is_err());
    }

    #[test]
    fn remove_rules() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/dir").unwrap();
        vfs.write("/dir/f", b"x").unwrap();
        assert!(vfs.remove("/").is_err());
        assert!(vfs.remove("/dir").is_err());
        vfs.remove("/dir/f").unwrap();
        vfs.remove("/dir").unwrap();
        assert!(vfs.remove("/dir").is_err());
    }

    #[test]
    fn rename_moves_and_replaces() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/old", b"old").unwrap();
        vfs.write("/new", b"new").unwrap();
        vfs.rename("/new", "/old").unwrap();
        assert_eq!(vfs.read("/old").unwrap(), b"new");
        assert!(!vfs.exists("/new"));
    }

    #[test]
    fn rename_missing_source_fails() {
        let mut vfs = MemoryVfs::new();
        assert!(vfs.rename("/ghost", "/x").is_err());
        assert!(!vfs.exists("/x"));
    }

    #[test]
    fn rename_into_missing_dir_keeps_source() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/f", b"x").unwrap();
        assert!(vfs.rename("/f", "/nodir/f").is_err());
        assert!(vfs.exists("/f"));
    }

    #[test]
    fn rename_directory_fails() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/d").unwrap();
        assert!(vfs.rename("/d", "/e").is_err());
    }

    #[test]
    fn sloppy_paths_are_normalized() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("dir/").unwrap();
        vfs.write("//dir//file", b"ok").unwrap();
        assert_eq!(vfs.read("/dir/file").unwrap(), b"ok");
        assert_eq!(vfs.files(), vec!["/dir/file".to_string()]);
    }

    #[test]
    fn mount_failure_is_reported() {
        let mut vfs = MemoryVfs::new();
        vfs.fail_mount = true;
        assert!(matches!(vfs.mount(), Err(PocketError::Storage(_))));
        assert!(!vfs.is_mounted());
        vfs.fail_mount = false;
        vfs.mount().unwrap();
        assert!(vfs.is_mounted());
        vfs.unmount();
        assert!(!vfs.is_mounted());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_is_idempotent(path in "[/a-z0-9_.]{0,40}") {
                let once = normalize(&path).into_owned();
                let twice = normalize(&once);
                prop_assert_eq!(twice.as_ref(), once.as_str());
            }

            #[test]
            fn normalize_shape(path in "[/a-z0-9_.]{0,40}") {
                let n = normalize(&path);
                prop_assert!(n.starts_with('/'));
                prop_assert!(!n.contains("//"));
                prop_assert!(n == "/" || !n.ends_with('/'));
            }

            #[test]
            fn rename_preserves_content(
                data in proptest::collection::vec(any::<u8>(), 0..256),
                a in "[a-z]{1,8}",
                b in "[A-Z]{1,8}",
            ) {
                let mut vfs = MemoryVfs::new();
                let from = format!("/{a}");
                let to = format!("/{b}");
                vfs.write(&from, &data).unwrap();
                vfs.rename(&from, &to).unwrap();
                prop_assert!(!vfs.exists(&from));
                prop_assert_eq!(vfs.read(&to).unwrap(), data);
            }
        }
    }
}
