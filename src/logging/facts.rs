use std::io::Write;
use std::sync::Mutex;

use log::Level;
use serde_json::{json, Value};

/// Receives structured facts (one JSON object per event).
pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

/// Receives human-oriented audit lines.
pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Writes each fact as one JSON line. `JsonlSink::default()` discards everything.
#[derive(Default)]
pub struct JsonlSink {
    out: Option<Mutex<Box<dyn Write + Send>>>,
}

impl JsonlSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Some(Mutex::new(Box::new(out))),
        }
    }
}

impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink").field("enabled", &self.out.is_some()).finish()
    }
}

impl FactsEmitter for JsonlSink {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let Some(out) = &self.out else { return };
        let mut line = fields;
        if let Some(obj) = line.as_object_mut() {
            obj.entry("subsystem").or_insert(json!(subsystem));
            obj.entry("event").or_insert(json!(event));
            obj.entry("decision").or_insert(json!(decision));
        }
        if let Ok(mut w) = out.lock() {
            // Facts are best-effort; a broken writer never fails an operation.
            let _ = writeln!(w, "{line}");
        }
    }
}

impl AuditSink for JsonlSink {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Forwards facts and audit lines to the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl FactsEmitter for LogSink {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let level = match decision {
            "failure" => Level::Warn,
            _ => Level::Debug,
        };
        log::log!(target: "treewright::facts", level, "{subsystem} {event} {decision} {fields}");
    }
}

impl AuditSink for LogSink {
    fn log(&self, level: Level, msg: &str) {
        log::log!(target: "treewright::audit", level, "{msg}");
    }
}
