use std::time::Duration;

use crate::types::errors::Result;

/// Metadata for one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
}

/// Result of a prefix listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub objects: Vec<ObjectMeta>,
    /// Rolled-up key prefixes (each ending in the delimiter) when listing with a delimiter.
    pub prefixes: Vec<String>,
}

/// Minimal blocking transport to one bucket.
///
/// Credentials, endpoints and retries belong to the implementation; the adapters only
/// issue these calls.
pub trait ObjectClient: Send + Sync {
    fn bucket(&self) -> &str;

    /// Bound every later request. A request that misses it fails with `Timeout` and
    /// must not have been applied by the time the error is returned, as far as the
    /// transport can tell.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;

    fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn put(&self, key: &str, body: &[u8]) -> Result<()>;

    /// Server-side copy within the bucket.
    fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    fn delete_many(&self, keys: &[String]) -> Result<()> {
        for k in keys {
            self.delete(k)?;
        }
        Ok(())
    }

    /// Keys starting with `prefix`, sorted. With a delimiter, keys that contain it after
    /// the prefix are rolled up into `prefixes`.
    fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing>;
}
