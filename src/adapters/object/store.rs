//! [`ObjectClient`] over the `object_store` crate, driven from blocking code.
//!
//! Each request runs to completion on a small runtime owned by the client, so the
//! client must not be called from inside an async context. `object_store` paths
//! cannot end in `/`, so a directory marker `a/b/` is stored as the object
//! `a/b/.treewright-dir` and mapped back on the way out.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use log::debug;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tokio::runtime::{Builder, Runtime};

use super::client::{Listing, ObjectClient, ObjectMeta};
use crate::constants::{DIR_MARKER_SUFFIX, STORE_DIR_MARKER};
use crate::types::errors::{Error, ErrorKind, Result};

pub struct ObjectStoreClient {
    bucket: String,
    store: Arc<dyn ObjectStore>,
    runtime: Arc<Runtime>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreClient")
            .field("bucket", &self.bucket)
            .field("store", &self.store.to_string())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn store_error(key: &str, e: object_store::Error) -> Error {
    let kind = match e {
        object_store::Error::NotFound { .. } => ErrorKind::NotFound,
        _ => ErrorKind::AdapterIo,
    };
    Error::new(kind, format!("{key}: {e}")).at(key)
}

fn to_path(key: &str) -> Result<Path> {
    let raw = if key.ends_with(DIR_MARKER_SUFFIX) {
        format!("{key}{STORE_DIR_MARKER}")
    } else {
        key.to_string()
    };
    Path::parse(&raw).map_err(|e| Error::new(ErrorKind::InvalidSegment, format!("{key}: {e}")).at(key))
}

fn to_key(location: &Path) -> String {
    let raw = location.as_ref();
    match raw.strip_suffix(STORE_DIR_MARKER) {
        Some(dir) if dir.ends_with(DIR_MARKER_SUFFIX) => dir.to_string(),
        _ => raw.to_string(),
    }
}

impl ObjectStoreClient {
    /// Wrap `store`, reported as `bucket` in instance ids and messages.
    ///
    /// # Errors
    ///
    /// `AdapterIo` when the runtime cannot start.
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("treewright-object-io")
            .enable_all()
            .build()
            .map_err(|e| Error::new(ErrorKind::AdapterIo, format!("object store runtime: {e}")))?;
        Ok(Self {
            bucket: bucket.into(),
            store,
            runtime: Arc::new(runtime),
            timeout: None,
        })
    }

    /// Process-local store, mostly for tests.
    ///
    /// # Errors
    ///
    /// See [`ObjectStoreClient::new`].
    pub fn in_memory(bucket: impl Into<String>) -> Result<Self> {
        Self::new(bucket, Arc::new(object_store::memory::InMemory::new()))
    }

    /// Amazon S3 bucket configured from `AWS_*` environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidSpec` for incomplete configuration, otherwise see [`ObjectStoreClient::new`].
    #[cfg(feature = "s3")]
    pub fn s3_from_env(bucket: &str) -> Result<Self> {
        let store = object_store::aws::AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::new(ErrorKind::InvalidSpec, format!("s3://{bucket}: {e}")))?;
        Self::new(bucket, Arc::new(store))
    }

    /// Google Cloud Storage bucket configured from `GOOGLE_*` environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidSpec` for incomplete configuration, otherwise see [`ObjectStoreClient::new`].
    #[cfg(feature = "gcs")]
    pub fn gcs_from_env(bucket: &str) -> Result<Self> {
        let store = object_store::gcp::GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::new(ErrorKind::InvalidSpec, format!("gs://{bucket}: {e}")))?;
        Self::new(bucket, Arc::new(store))
    }

    fn block<T, F>(&self, key: &str, fut: F) -> Result<T>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        let out = match self.timeout {
            None => self.runtime.block_on(fut),
            Some(limit) => self
                .runtime
                .block_on(async { tokio::time::timeout(limit, fut).await })
                .map_err(|_| {
                    Error::new(
                        ErrorKind::Timeout,
                        format!("{}/{key}: no answer within {}ms", self.bucket, limit.as_millis()),
                    )
                    .at(key)
                })?,
        };
        out.map_err(|e| store_error(key, e))
    }

    fn meta(m: object_store::ObjectMeta) -> ObjectMeta {
        ObjectMeta {
            key: to_key(&m.location),
            size: m.size as u64,
        }
    }
}

impl ObjectClient for ObjectStoreClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let path = to_path(key)?;
        match self.block(key, self.store.head(&path)) {
            Ok(m) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: m.size as u64,
            })),
            Err(e) if e.kind == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = to_path(key)?;
        let bytes = self.block(key, async {
            match self.store.get(&path).await {
                Ok(found) => found.bytes().await,
                Err(e) => Err(e),
            }
        })?;
        Ok(bytes.to_vec())
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        let path = to_path(key)?;
        self.block(key, self.store.put(&path, PutPayload::from(body.to_vec())))?;
        debug!("object_store: put {} bytes at {}/{key}", body.len(), self.bucket);
        Ok(())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let (from, to) = (to_path(src)?, to_path(dst)?);
        self.block(src, self.store.copy(&from, &to))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = to_path(key)?;
        match self.block(key, self.store.delete(&path)) {
            Err(e) if e.kind == ErrorKind::NotFound => Ok(()),
            r => r,
        }
    }

    fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing> {
        let dir = prefix.trim_end_matches(DIR_MARKER_SUFFIX);
        let base = if dir.is_empty() { None } else { Some(to_path(dir)?) };
        let mut out = Listing::default();
        match delimiter {
            None => {
                let all: Vec<object_store::ObjectMeta> =
                    self.block(prefix, self.store.list(base.as_ref()).try_collect())?;
                out.objects = all.into_iter().map(Self::meta).collect();
            }
            Some('/') => {
                let res = self.block(prefix, self.store.list_with_delimiter(base.as_ref()))?;
                out.objects = res.objects.into_iter().map(Self::meta).collect();
                out.prefixes = res
                    .common_prefixes
                    .iter()
                    .map(|p| format!("{}{DIR_MARKER_SUFFIX}", p.as_ref()))
                    .collect();
            }
            Some(d) => {
                return Err(Error::new(
                    ErrorKind::AdapterIo,
                    format!("object_store listings only split on `/`, not `{d}`"),
                )
                .at(prefix))
            }
        }
        out.objects.sort_by(|a, b| a.key.cmp(&b.key));
        out.prefixes.sort();
        Ok(out)
    }
}
