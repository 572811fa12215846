//! Atomic write and rename primitives for the local backend.
//!
//! Writes are staged into a temporary sibling, fsynced, then renamed over the final
//! name through a directory handle: `open_dir_nofollow(parent) -> renameat(tmp, final) ->
//! fsync(dirfd)`. A reader never observes a half-written file.
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::TMP_SUFFIX;

// Unique temporary names within a process.
static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[cfg(unix)]
fn errno_to_io(e: rustix::io::Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.raw_os_error())
}

/// Open a directory with `O_DIRECTORY | O_NOFOLLOW`.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be opened.
#[cfg(unix)]
pub fn open_dir_nofollow(dir: &Path) -> std::io::Result<rustix::fd::OwnedFd> {
    use rustix::fs::{openat, Mode, OFlags, CWD};
    openat(
        CWD,
        dir,
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC | OFlags::NOFOLLOW,
        Mode::empty(),
    )
    .map_err(errno_to_io)
}

fn tmp_name_for(target: &Path) -> String {
    let fname = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("target");
    let pid = std::process::id();
    let ctr = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{fname}.{pid}.{ctr}{TMP_SUFFIX}")
}

/// Write `content` to `target` atomically. The parent directory must exist.
///
/// # Errors
///
/// Returns an IO error if staging, syncing or the final rename fails. The temporary
/// file is removed on failure.
pub fn atomic_write(target: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
    let tmp = parent.join(tmp_name_for(target));
    let staged = (|| {
        let mut f = fs::OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        f.write_all(content)?;
        f.sync_all()
    })();
    if let Err(e) = staged {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = rename_in_dir(parent, &tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

#[cfg(unix)]
fn rename_in_dir(parent: &Path, tmp: &Path, target: &Path) -> std::io::Result<()> {
    use rustix::fs::renameat;
    let dirfd = open_dir_nofollow(parent)?;
    let (Some(tmp_name), Some(final_name)) = (tmp.file_name(), target.file_name()) else {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid file name"));
    };
    renameat(&dirfd, tmp_name, &dirfd, final_name).map_err(errno_to_io)?;
    let _ = rustix::fs::fsync(&dirfd);
    Ok(())
}

#[cfg(not(unix))]
fn rename_in_dir(_parent: &Path, tmp: &Path, target: &Path) -> std::io::Result<()> {
    fs::rename(tmp, target)
}

/// Rename `src` to `dst`. Returns `Ok(false)` when the rename crossed filesystems and
/// nothing was moved, so the caller can fall back to copy-verify-delete.
///
/// # Errors
///
/// Returns an IO error for any failure other than a cross-device rename.
pub fn rename(src: &Path, dst: &Path) -> std::io::Result<bool> {
    match fs::rename(src, dst) {
        Ok(()) => {
            if let Some(parent) = dst.parent() {
                let _ = fsync_dir(parent);
            }
            Ok(true)
        }
        Err(e) if is_cross_device(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_cross_device(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(rustix::io::Errno::XDEV.raw_os_error())
}

#[cfg(not(unix))]
fn is_cross_device(_e: &std::io::Error) -> bool {
    false
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> std::io::Result<()> {
    let fd = open_dir_nofollow(dir)?;
    rustix::fs::fsync(&fd).map_err(errno_to_io)
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// `ENOTDIR`: some ancestor of the path is not a directory.
#[cfg(unix)]
pub fn is_not_a_directory(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(rustix::io::Errno::NOTDIR.raw_os_error())
}

#[cfg(not(unix))]
pub fn is_not_a_directory(_e: &std::io::Error) -> bool {
    false
}
