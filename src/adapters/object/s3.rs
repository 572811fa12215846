use super::ObjectDialect;
use crate::adapters::Backend;
use crate::constants::{MAX_OBJECT_KEY_BYTES, S3_DELETE_BATCH, S3_MAX_COPY_BYTES};
use crate::types::errors::{Error, ErrorKind, Result};

/// Amazon S3 conventions.
#[derive(Clone, Copy, Debug, Default)]
pub struct S3;

impl ObjectDialect for S3 {
    const BACKEND: Backend = Backend::S3;
    const SCHEME: &'static str = "s3";

    fn validate_key(key: &str) -> Result<()> {
        if key.len() > MAX_OBJECT_KEY_BYTES {
            return Err(Error::new(
                ErrorKind::InvalidSegment,
                format!("S3 key exceeds {MAX_OBJECT_KEY_BYTES} bytes"),
            )
            .at(key));
        }
        Ok(())
    }

    fn max_server_copy_bytes() -> Option<u64> {
        Some(S3_MAX_COPY_BYTES)
    }

    fn delete_batch_size() -> usize {
        S3_DELETE_BATCH
    }
}
