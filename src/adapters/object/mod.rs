//! Object-store backends (S3, GCS) over a blocking [`ObjectClient`].
//!
//! Keys are forward-slash paths with no leading separator. A file is an object at
//! its key; a directory exists when a zero-byte marker `key/` or any object below
//! `key/` exists. Object stores have no rename, so moves are copy, verify, delete.
pub mod client;
pub mod gcs;
pub mod memory;
pub mod s3;
#[cfg(feature = "object-store")]
pub mod store;

pub use client::{Listing, ObjectClient, ObjectMeta};
pub use gcs::Gcs;
pub use memory::{ClientOp, MemoryObjectClient};
pub use s3::S3;
#[cfg(feature = "object-store")]
pub use store::ObjectStoreClient;

use std::marker::PhantomData;
use std::time::Duration;

use log::debug;

use super::{check_delete_boundary, Backend, StorageAdapter};
use crate::constants::DIR_MARKER_SUFFIX;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::node::{EntryKind, Outcome};
use crate::types::safepath::PathStyle;

/// Provider-specific rules layered over the shared object-store logic.
pub trait ObjectDialect: Send + Sync {
    const BACKEND: Backend;
    const SCHEME: &'static str;

    fn validate_key(key: &str) -> Result<()>;

    /// Objects larger than this are copied through the client (get + put).
    fn max_server_copy_bytes() -> Option<u64>;

    fn delete_batch_size() -> usize;
}

pub struct ObjectStoreAdapter<C: ObjectClient, D: ObjectDialect> {
    client: C,
    root: Option<String>,
    _dialect: PhantomData<D>,
}

pub type S3Adapter<C> = ObjectStoreAdapter<C, S3>;
pub type GcsAdapter<C> = ObjectStoreAdapter<C, Gcs>;

fn dir_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}{DIR_MARKER_SUFFIX}")
    }
}

fn collision(path: &str, what: &str) -> Error {
    Error::new(ErrorKind::PathCollision, format!("{path}: {what}")).at(path)
}

impl<C: ObjectClient, D: ObjectDialect> ObjectStoreAdapter<C, D> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            root: None,
            _dialect: PhantomData,
        }
    }

    /// Forward a per-request timeout to the client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.client.set_timeout(timeout);
        self
    }

    /// Refuse deletes at or above `prefix`.
    pub fn with_root(mut self, prefix: &str) -> Result<Self> {
        self.root = Some(PathStyle::ObjectKey.normalize_base(prefix)?);
        Ok(self)
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    fn key(&self, path: &str) -> Result<String> {
        let key = PathStyle::ObjectKey.normalize_base(path)?;
        D::validate_key(&key)?;
        Ok(key)
    }

    fn kind_of_key(&self, key: &str) -> Result<EntryKind> {
        if key.is_empty() {
            return Ok(EntryKind::Directory);
        }
        if self.client.head(key)?.is_some() {
            return Ok(EntryKind::File);
        }
        let below = self.client.list(&dir_prefix(key), Some('/'))?;
        if below.objects.is_empty() && below.prefixes.is_empty() {
            Ok(EntryKind::Absent)
        } else {
            Ok(EntryKind::Directory)
        }
    }

    fn copy_object(&self, src: &str, dst: &str) -> Result<()> {
        let meta = self
            .client
            .head(src)?
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("{src}: vanished during copy")).at(src))?;
        match D::max_server_copy_bytes() {
            Some(limit) if meta.size > limit => {
                let body = self.client.get(src)?;
                self.client.put(dst, &body)?;
            }
            _ => self.client.copy(src, dst)?,
        }
        let copied = self.client.head(dst)?.map(|m| m.size);
        if copied != Some(meta.size) {
            return Err(Error::new(
                ErrorKind::AdapterIo,
                format!("{dst}: size mismatch after copy ({copied:?} != {})", meta.size),
            )
            .at(dst));
        }
        Ok(())
    }

    fn delete_keys(&self, keys: &[String]) -> Result<()> {
        for chunk in keys.chunks(D::delete_batch_size().max(1)) {
            self.client.delete_many(chunk)?;
        }
        Ok(())
    }
}

impl<C: ObjectClient, D: ObjectDialect> StorageAdapter for ObjectStoreAdapter<C, D> {
    fn backend(&self) -> Backend {
        D::BACKEND
    }

    fn instance_id(&self) -> String {
        format!("{}://{}", D::SCHEME, self.client.bucket())
    }

    fn root_boundary(&self) -> Option<&str> {
        self.root.as_deref()
    }

    fn exists(&self, path: &str) -> Result<EntryKind> {
        let key = self.key(path)?;
        self.kind_of_key(&key)
    }

    fn create_directory(&self, path: &str) -> Result<Outcome> {
        let key = self.key(path)?;
        match self.kind_of_key(&key)? {
            EntryKind::Directory => Ok(Outcome::AlreadySatisfied),
            EntryKind::File => Err(collision(path, "an object occupies this directory key")),
            EntryKind::Absent => {
                self.client.put(&dir_prefix(&key), &[])?;
                debug!("{}: created marker {}", D::SCHEME, dir_prefix(&key));
                Ok(Outcome::Applied)
            }
        }
    }

    fn write_file(&self, path: &str, content: &[u8], overwrite: bool) -> Result<Outcome> {
        let key = self.key(path)?;
        match self.kind_of_key(&key)? {
            EntryKind::Directory => return Err(collision(path, "a directory occupies this file key")),
            EntryKind::File => {
                if self.client.get(&key)? == content {
                    return Ok(Outcome::AlreadySatisfied);
                }
                if !overwrite {
                    return Err(Error::new(
                        ErrorKind::ContentConflict,
                        format!("{path}: existing object differs"),
                    )
                    .at(path));
                }
            }
            EntryKind::Absent => {}
        }
        self.client.put(&key, content)?;
        debug!("{}: put {} bytes at {key}", D::SCHEME, content.len());
        Ok(Outcome::Applied)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let key = self.key(path)?;
        self.client.get(&key)
    }

    fn file_size(&self, path: &str) -> Result<u64> {
        let key = self.key(path)?;
        self.client
            .head(&key)?
            .map(|m| m.size)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("{path}: no such object")).at(path))
    }

    fn move_or_copy(&self, src: &str, dst: &str) -> Result<Outcome> {
        let (src_key, dst_key) = (self.key(src)?, self.key(dst)?);
        let src_kind = self.kind_of_key(&src_key)?;
        match (src_kind, self.kind_of_key(&dst_key)?) {
            (EntryKind::Absent, _) => {
                return Err(Error::new(ErrorKind::NotFound, format!("{src}: source does not exist")).at(src))
            }
            (_, EntryKind::Absent) => {}
            (EntryKind::File, EntryKind::File) => {
                if self.client.get(&src_key)? != self.client.get(&dst_key)? {
                    return Err(collision(dst, "destination exists with different content"));
                }
                self.client.delete(&src_key)?;
                return Ok(Outcome::AlreadySatisfied);
            }
            _ => return Err(collision(dst, "destination already exists")),
        }
        if src_kind == EntryKind::File {
            self.copy_object(&src_key, &dst_key)?;
            self.client.delete(&src_key).map_err(|e| {
                Error::new(
                    ErrorKind::MigrationConsistency,
                    format!("{src}: copied to {dst} but source delete failed: {}", e.msg),
                )
                .at(src)
            })?;
            return Ok(Outcome::Applied);
        }
        let (from, to) = (dir_prefix(&src_key), dir_prefix(&dst_key));
        let listing = self.client.list(&from, None)?;
        let mut copied = Vec::with_capacity(listing.objects.len());
        for obj in &listing.objects {
            let target = format!("{to}{}", &obj.key[from.len()..]);
            D::validate_key(&target)?;
            self.copy_object(&obj.key, &target)?;
            copied.push(obj.key.clone());
        }
        self.delete_keys(&copied).map_err(|e| {
            Error::new(
                ErrorKind::MigrationConsistency,
                format!("{src}: copied to {dst} but source delete failed: {}", e.msg),
            )
            .at(src)
        })?;
        debug!("{}: moved {} objects {from} -> {to}", D::SCHEME, copied.len());
        Ok(Outcome::Applied)
    }

    fn delete_recursive(&self, path: &str) -> Result<Outcome> {
        let key = self.key(path)?;
        check_delete_boundary(PathStyle::ObjectKey, self.root.as_deref(), &key)?;
        match self.kind_of_key(&key)? {
            EntryKind::Absent => Ok(Outcome::AlreadySatisfied),
            EntryKind::File => {
                self.client.delete(&key)?;
                Ok(Outcome::Applied)
            }
            EntryKind::Directory => {
                let keys: Vec<String> = self
                    .client
                    .list(&dir_prefix(&key), None)?
                    .objects
                    .into_iter()
                    .map(|o| o.key)
                    .collect();
                self.delete_keys(&keys)?;
                debug!("{}: deleted {} objects under {key}", D::SCHEME, keys.len());
                Ok(Outcome::Applied)
            }
        }
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let key = self.key(path)?;
        match self.kind_of_key(&key)? {
            EntryKind::Directory => {}
            EntryKind::File => return Err(collision(path, "not a directory")),
            EntryKind::Absent => {
                return Err(Error::new(ErrorKind::NotFound, format!("{path}: does not exist")).at(path))
            }
        }
        let prefix = dir_prefix(&key);
        let listing = self.client.list(&prefix, Some('/'))?;
        let mut names: Vec<String> = listing
            .objects
            .iter()
            .map(|o| o.key[prefix.len()..].to_string())
            .chain(
                listing
                    .prefixes
                    .iter()
                    .map(|p| p[prefix.len()..].trim_end_matches('/').to_string()),
            )
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
