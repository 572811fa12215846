use super::ObjectDialect;
use crate::adapters::Backend;
use crate::constants::MAX_OBJECT_KEY_BYTES;
use crate::types::errors::{Error, ErrorKind, Result};

/// Google Cloud Storage conventions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gcs;

impl ObjectDialect for Gcs {
    const BACKEND: Backend = Backend::Gcs;
    const SCHEME: &'static str = "gs";

    fn validate_key(key: &str) -> Result<()> {
        if key.len() > MAX_OBJECT_KEY_BYTES {
            return Err(Error::new(
                ErrorKind::InvalidSegment,
                format!("GCS object name exceeds {MAX_OBJECT_KEY_BYTES} bytes"),
            )
            .at(key));
        }
        if key.contains(['\r', '\n']) {
            return Err(Error::new(
                ErrorKind::InvalidSegment,
                "GCS object names cannot contain carriage returns or line feeds",
            )
            .at(key));
        }
        if key.starts_with(".well-known/acme-challenge/") {
            return Err(Error::new(ErrorKind::InvalidSegment, "reserved GCS object name prefix").at(key));
        }
        Ok(())
    }

    // Rewrites handle any size; no client-side fallback needed.
    fn max_server_copy_bytes() -> Option<u64> {
        None
    }

    fn delete_batch_size() -> usize {
        1
    }
}
