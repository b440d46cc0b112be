//! Power-loss safe file replacement.
//!
//! The new content is written to `<path>.new` first. Only when that worked
//! is the old file moved to `<path>.bak` and the new one moved into place,
//! so at every point either the canonical file or its backup exists.

use pocket_types::error::Result;
use pocket_vfs::{Vfs, dirname};

pub fn temp_path(path: &str) -> String {
    format!("{path}.new")
}

pub fn backup_path(path: &str) -> String {
    format!("{path}.bak")
}

/// Replace `path` with what `write` produces at the temp path it is given.
///
/// On failure the previous file is restored and no `.new` or `.bak` file is
/// left behind.
pub fn save_atomic(
    vfs: &mut dyn Vfs,
    path: &str,
    write: impl FnOnce(&mut dyn Vfs, &str) -> Result<()>,
) -> Result<()> {
    let dir = dirname(path);
    if let Err(e) = vfs.mkdir(dir) {
        log::warn!("mkdir {dir} failed: {e}");
    }

    let tmp = temp_path(path);
    let bak = backup_path(path);
    recover_backup(vfs, path, &bak);

    let mut moved_to_bak = false;
    let result = write(&mut *vfs, &tmp).and_then(|()| {
        if vfs.exists(path) {
            vfs.rename(path, &bak)?;
            moved_to_bak = true;
        }
        vfs.rename(&tmp, path)
    });

    match result {
        Ok(()) => {
            if vfs.exists(&bak)
                && let Err(e) = vfs.remove(&bak)
            {
                log::warn!("could not remove {bak}: {e}");
            }
            Ok(())
        },
        Err(e) => {
            log::error!("saving {path} failed: {e}");
            rollback(vfs, path, &tmp, moved_to_bak.then_some(bak.as_str()));
            Err(e)
        },
    }
}

/// Settle a `.bak` left by an interrupted save. Without a canonical file the
/// backup is the latest complete save; next to one it is stale.
fn recover_backup(vfs: &mut dyn Vfs, path: &str, bak: &str) {
    if !vfs.exists(bak) {
        return;
    }
    if vfs.exists(path) {
        log::warn!("removing stale backup {bak}");
        if let Err(e) = vfs.remove(bak) {
            log::warn!("could not remove {bak}: {e}");
        }
    } else {
        log::warn!("restoring {path} from {bak}");
        if let Err(e) = vfs.rename(bak, path) {
            log::error!("could not restore {path} from backup: {e}");
        }
    }
}

/// `bak` is set only when this save moved the canonical file there.
fn rollback(vfs: &mut dyn Vfs, path: &str, tmp: &str, bak: Option<&str>) {
    if let Some(bak) = bak
        && vfs.exists(bak)
        && let Err(e) = vfs.rename(bak, path)
    {
        log::error!("could not restore {path} from backup: {e}");
    }
    if vfs.exists(tmp)
        && let Err(e) = vfs.remove(tmp)
    {
        log::warn!("could not remove {tmp}: {e}");
    }
}
