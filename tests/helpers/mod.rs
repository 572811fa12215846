//! Shared test helpers for the treewright integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use log::Level;
use serde_json::Value;

use treewright::adapters::{Backend, StorageAdapter};
use treewright::logging::{AuditSink, FactsEmitter};
use treewright::policy::Policy;
use treewright::types::{EntryKind, Outcome, PathStyle, Result};
use treewright::TreeEngine;

/// Captures every fact as `(subsystem, event, decision, fields)`.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    pub fn of(&self, event: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, _, _)| e == event)
            .map(|(_, _, _, f)| f.clone())
            .collect()
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

pub fn engine() -> (TreeEngine<TestEmitter, TestAudit>, TestEmitter) {
    engine_with(Policy::default())
}

pub fn engine_with(policy: Policy) -> (TreeEngine<TestEmitter, TestAudit>, TestEmitter) {
    let facts = TestEmitter::default();
    (TreeEngine::new(facts.clone(), TestAudit, policy), facts)
}

pub fn s(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Wraps an adapter and records the name of every call made through it.
pub struct RecordingAdapter<T> {
    pub inner: T,
    pub calls: Mutex<Vec<(&'static str, String)>>,
}

impl<T: StorageAdapter> RecordingAdapter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn note(&self, name: &'static str, path: &str) {
        self.calls.lock().unwrap().push((name, path.to_string()));
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(n, _)| *n).collect()
    }
}

impl<T: StorageAdapter> StorageAdapter for RecordingAdapter<T> {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn instance_id(&self) -> String {
        self.inner.instance_id()
    }

    fn path_style(&self) -> PathStyle {
        self.inner.path_style()
    }

    fn root_boundary(&self) -> Option<&str> {
        self.inner.root_boundary()
    }

    fn exists(&self, path: &str) -> Result<EntryKind> {
        self.note("exists", path);
        self.inner.exists(path)
    }

    fn create_directory(&self, path: &str) -> Result<Outcome> {
        self.note("create_directory", path);
        self.inner.create_directory(path)
    }

    fn write_file(&self, path: &str, content: &[u8], overwrite: bool) -> Result<Outcome> {
        self.note("write_file", path);
        self.inner.write_file(path, content, overwrite)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.note("read_file", path);
        self.inner.read_file(path)
    }

    fn file_size(&self, path: &str) -> Result<u64> {
        self.note("file_size", path);
        self.inner.file_size(path)
    }

    fn move_or_copy(&self, src: &str, dst: &str) -> Result<Outcome> {
        self.note("move_or_copy", src);
        self.inner.move_or_copy(src, dst)
    }

    fn delete_recursive(&self, path: &str) -> Result<Outcome> {
        self.note("delete_recursive", path);
        self.inner.delete_recursive(path)
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>> {
        self.note("list_children", path);
        self.inner.list_children(path)
    }

    fn set_permissions(&self, path: &str, mode: u32) -> Result<Outcome> {
        self.note("set_permissions", path);
        self.inner.set_permissions(path, mode)
    }
}
