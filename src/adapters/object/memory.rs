use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::client::{Listing, ObjectClient, ObjectMeta};
use crate::types::errors::{Error, ErrorKind, Result};

/// Operation names for failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientOp {
    Head,
    Get,
    Put,
    Copy,
    Delete,
    List,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, Vec<u8>>,
    failures: Vec<(ClientOp, String)>,
    latency: Option<Duration>,
}

/// In-process bucket. Clones share the same contents but not the request timeout.
///
/// Supports failure injection (`fail_on`) and artificial latency for exercising
/// partial-failure and timeout paths. A request whose latency exceeds the timeout
/// waits out the timeout and fails without touching the bucket.
#[derive(Clone, Debug)]
pub struct MemoryObjectClient {
    bucket: String,
    state: Arc<Mutex<State>>,
    timeout: Option<Duration>,
}

impl MemoryObjectClient {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Arc::new(Mutex::new(State::default())),
            timeout: None,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make every `op` on a key containing `key_fragment` fail with an IO error.
    pub fn fail_on(&self, op: ClientOp, key_fragment: impl Into<String>) {
        self.state().failures.push((op, key_fragment.into()));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Snapshot of all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.state().objects.keys().cloned().collect()
    }

    fn enter(&self, op: ClientOp, key: &str) -> Result<MutexGuard<'_, State>> {
        let latency = self.state().latency;
        match (latency, self.timeout) {
            (Some(d), Some(limit)) if d > limit => {
                std::thread::sleep(limit);
                return Err(Error::new(
                    ErrorKind::Timeout,
                    format!("{op:?} {}/{key}: no answer within {}ms", self.bucket, limit.as_millis()),
                )
                .at(key));
            }
            (Some(d), _) => std::thread::sleep(d),
            (None, _) => {}
        }
        let st = self.state();
        if st.failures.iter().any(|(o, frag)| *o == op && key.contains(frag.as_str())) {
            return Err(Error::new(
                ErrorKind::AdapterIo,
                format!("injected {op:?} failure for {}/{key}", self.bucket),
            )
            .at(key));
        }
        Ok(st)
    }
}

impl ObjectClient for MemoryObjectClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let st = self.enter(ClientOp::Head, key)?;
        Ok(st.objects.get(key).map(|b| ObjectMeta {
            key: key.to_string(),
            size: b.len() as u64,
        }))
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let st = self.enter(ClientOp::Get, key)?;
        st.objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no such key {key}")).at(key))
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        let mut st = self.enter(ClientOp::Put, key)?;
        st.objects.insert(key.to_string(), body.to_vec());
        Ok(())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut st = self.enter(ClientOp::Copy, src)?;
        let body = st
            .objects
            .get(src)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no such key {src}")).at(src))?;
        st.objects.insert(dst.to_string(), body);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut st = self.enter(ClientOp::Delete, key)?;
        st.objects.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing> {
        let st = self.enter(ClientOp::List, prefix)?;
        let mut out = Listing::default();
        let mut rolled = BTreeSet::new();
        for (k, v) in st.objects.range(prefix.to_string()..) {
            let Some(rest) = k.strip_prefix(prefix) else { break };
            match delimiter.and_then(|d| rest.find(d).map(|i| (d, i))) {
                Some((d, i)) => {
                    rolled.insert(format!("{prefix}{}{d}", &rest[..i]));
                }
                None => out.objects.push(ObjectMeta {
                    key: k.clone(),
                    size: v.len() as u64,
                }),
            }
        }
        out.prefixes = rolled.into_iter().collect();
        Ok(out)
    }
}
