use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::{check_delete_boundary, Backend, StorageAdapter};
use crate::fs::{atomic_write, kind_of, rename, sha256_hex, sha256_hex_of};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::node::{EntryKind, Outcome};
use crate::types::safepath::PathStyle;

/// Local filesystem backend.
#[derive(Clone, Debug, Default)]
pub struct LocalAdapter {
    root: Option<String>,
    timeout: Option<Duration>,
}

impl LocalAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse deletes at or above `root`.
    pub fn with_root(root: &str) -> Result<Self> {
        Ok(Self {
            root: Some(PathStyle::Filesystem.normalize_base(root)?),
            ..Self::default()
        })
    }

    /// Bound every call by `timeout`.
    ///
    /// A bounded call runs on its own thread. When it misses the deadline the caller
    /// gets `Timeout` right away; the filesystem call itself cannot be interrupted and
    /// is left to finish in the background. Writes are atomic renames, so a late one
    /// lands whole and the next run sees it as already satisfied.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn bounded<T, F>(&self, path: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&LocalAdapter) -> Result<T> + Send + 'static,
    {
        let Some(limit) = self.timeout else {
            return f(self);
        };
        let worker = self.clone();
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("treewright-local-io".to_string())
            .spawn(move || {
                let _ = tx.send(f(&worker));
            })
            .map_err(|e| Error::io(path, &e))?;
        match rx.recv_timeout(limit) {
            Ok(r) => r,
            Err(RecvTimeoutError::Timeout) => {
                warn!("local: {path} did not answer within {}ms", limit.as_millis());
                Err(Error::new(
                    ErrorKind::Timeout,
                    format!("{path}: no answer within {}ms", limit.as_millis()),
                )
                .at(path))
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::new(
                ErrorKind::AdapterIo,
                format!("{path}: worker thread exited without a result"),
            )
            .at(path)),
        }
    }

    fn kind(&self, path: &str) -> Result<EntryKind> {
        kind_of(Path::new(path)).map_err(|e| Error::io(path, &e))
    }
}

fn collision(path: &str, what: &str) -> Error {
    Error::new(ErrorKind::PathCollision, format!("{path}: {what}")).at(path)
}

/// Copy `src` to `dst` (file or whole directory), verifying every file by size and hash.
fn copy_verified(src: &Path, dst: &Path) -> std::io::Result<()> {
    let md = fs::metadata(src)?;
    if md.is_dir() {
        fs::create_dir(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_verified(&entry.path(), &dst.join(entry.file_name()))?;
        }
        return Ok(());
    }
    let bytes = fs::read(src)?;
    atomic_write(dst, &bytes)?;
    let written = fs::metadata(dst)?.len();
    if written != md.len() || sha256_hex_of(dst).as_deref() != Some(sha256_hex(&bytes).as_str()) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("copy verification failed for {}", dst.display()),
        ));
    }
    Ok(())
}

fn remove_any(p: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(p)?.is_dir() {
        fs::remove_dir_all(p)
    } else {
        fs::remove_file(p)
    }
}

// Unbounded operations. The trait impl routes each through `bounded`.
impl LocalAdapter {
    fn mkdir(&self, path: &str) -> Result<Outcome> {
        match self.kind(path)? {
            EntryKind::Directory => return Ok(Outcome::AlreadySatisfied),
            EntryKind::File => return Err(collision(path, "a file occupies this directory path")),
            EntryKind::Absent => {}
        }
        match fs::create_dir(path) {
            Ok(()) => {
                debug!("local: created directory {path}");
                Ok(Outcome::Applied)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => match self.kind(path)? {
                EntryKind::Directory => Ok(Outcome::AlreadySatisfied),
                _ => Err(collision(path, "a file occupies this directory path")),
            },
            Err(e) => Err(Error::io(path, &e)),
        }
    }

    fn write(&self, path: &str, content: &[u8], overwrite: bool) -> Result<Outcome> {
        match self.kind(path)? {
            EntryKind::Directory => return Err(collision(path, "a directory occupies this file path")),
            EntryKind::File => {
                let current = fs::read(path).map_err(|e| Error::io(path, &e))?;
                if current == content {
                    return Ok(Outcome::AlreadySatisfied);
                }
                if !overwrite {
                    return Err(Error::new(
                        ErrorKind::ContentConflict,
                        format!("{path}: existing content differs"),
                    )
                    .at(path));
                }
            }
            EntryKind::Absent => {}
        }
        atomic_write(Path::new(path), content).map_err(|e| Error::io(path, &e))?;
        debug!("local: wrote {} bytes to {path}", content.len());
        Ok(Outcome::Applied)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::io(path, &e))
    }

    fn size(&self, path: &str) -> Result<u64> {
        fs::metadata(path).map(|m| m.len()).map_err(|e| Error::io(path, &e))
    }

    fn rename_or_copy(&self, src: &str, dst: &str) -> Result<Outcome> {
        let src_kind = self.kind(src)?;
        if src_kind == EntryKind::Absent {
            return Err(Error::new(ErrorKind::NotFound, format!("{src}: source does not exist")).at(src));
        }
        match self.kind(dst)? {
            EntryKind::Absent => {}
            EntryKind::File if src_kind == EntryKind::File => {
                if self.read(src)? != self.read(dst)? {
                    return Err(collision(dst, "destination exists with different content"));
                }
                fs::remove_file(src).map_err(|e| Error::io(src, &e))?;
                return Ok(Outcome::AlreadySatisfied);
            }
            _ => return Err(collision(dst, "destination already exists")),
        }
        let (src_p, dst_p) = (Path::new(src), Path::new(dst));
        if rename(src_p, dst_p).map_err(|e| Error::io(src, &e))? {
            debug!("local: renamed {src} -> {dst}");
            return Ok(Outcome::Applied);
        }
        warn!("local: {src} -> {dst} crosses filesystems; copying with verification");
        if let Err(e) = copy_verified(src_p, dst_p) {
            let _ = remove_any(dst_p);
            return Err(Error::io(dst, &e));
        }
        remove_any(src_p).map_err(|e| {
            Error::new(
                ErrorKind::MigrationConsistency,
                format!("{src}: copied to {dst} but source removal failed: {e}"),
            )
            .at(src)
        })?;
        Ok(Outcome::Applied)
    }

    fn remove(&self, path: &str) -> Result<Outcome> {
        check_delete_boundary(PathStyle::Filesystem, self.root.as_deref(), path)?;
        let p = Path::new(path);
        match self.kind(path)? {
            EntryKind::Absent => Ok(Outcome::AlreadySatisfied),
            EntryKind::Directory => {
                fs::remove_dir_all(p).map_err(|e| Error::io(path, &e))?;
                debug!("local: removed directory tree {path}");
                Ok(Outcome::Applied)
            }
            EntryKind::File => {
                fs::remove_file(p).map_err(|e| Error::io(path, &e))?;
                debug!("local: removed file {path}");
                Ok(Outcome::Applied)
            }
        }
    }

    fn children(&self, path: &str) -> Result<Vec<String>> {
        match self.kind(path)? {
            EntryKind::Directory => {}
            EntryKind::File => return Err(collision(path, "not a directory")),
            EntryKind::Absent => {
                return Err(Error::new(ErrorKind::NotFound, format!("{path}: does not exist")).at(path))
            }
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| Error::io(path, &e))? {
            let entry = entry.map_err(|e| Error::io(path, &e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    #[cfg(unix)]
    fn chmod(&self, path: &str, mode: u32) -> Result<Outcome> {
        use std::os::unix::fs::PermissionsExt;
        let md = fs::metadata(path).map_err(|e| Error::io(path, &e))?;
        if md.permissions().mode() & 0o7777 == mode & 0o7777 {
            return Ok(Outcome::AlreadySatisfied);
        }
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, &e))?;
        Ok(Outcome::Applied)
    }
}

impl StorageAdapter for LocalAdapter {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn instance_id(&self) -> String {
        "local".to_string()
    }

    fn root_boundary(&self) -> Option<&str> {
        self.root.as_deref()
    }

    fn exists(&self, path: &str) -> Result<EntryKind> {
        let p = path.to_string();
        self.bounded(path, move |a| a.kind(&p))
    }

    fn create_directory(&self, path: &str) -> Result<Outcome> {
        let p = path.to_string();
        self.bounded(path, move |a| a.mkdir(&p))
    }

    fn write_file(&self, path: &str, content: &[u8], overwrite: bool) -> Result<Outcome> {
        if self.timeout.is_none() {
            return self.write(path, content, overwrite);
        }
        let (p, body) = (path.to_string(), content.to_vec());
        self.bounded(path, move |a| a.write(&p, &body, overwrite))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let p = path.to_string();
        self.bounded(path, move |a| a.read(&p))
    }

    fn file_size(&self, path: &str) -> Result<u64> {
        let p = path.to_string();
        self.bounded(path, move |a| a.size(&p))
    }

    fn move_or_copy(&self, src: &str, dst: &str) -> Result<Outcome> {
        let (s, d) = (src.to_string(), dst.to_string());
        self.bounded(src, move |a| a.rename_or_copy(&s, &d))
    }

    fn delete_recursive(&self, path: &str) -> Result<Outcome> {
        let p = path.to_string();
        self.bounded(path, move |a| a.remove(&p))
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let p = path.to_string();
        self.bounded(path, move |a| a.children(&p))
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &str, mode: u32) -> Result<Outcome> {
        let p = path.to_string();
        self.bounded(path, move |a| a.chmod(&p, mode))
    }
}
