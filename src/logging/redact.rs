use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::types::plan::ApplyMode;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

// Fields that vary between otherwise identical runs.
const VOLATILE_FIELDS: &[&str] = &["duration_ms", "elapsed_ms", "backup_path", "sha256"];

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

/// Timestamp for facts: zero in dry-run so repeated previews are byte-identical.
pub fn ts_for_mode(mode: ApplyMode) -> String {
    match mode {
        ApplyMode::DryRun => TS_ZERO.to_string(),
        ApplyMode::Commit => now_iso(),
    }
}

/// Zero the timestamp and drop volatile fields so facts from two runs compare equal.
pub fn redact_event(mut v: Value) -> Value {
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), Value::String(TS_ZERO.to_string()));
        for f in VOLATILE_FIELDS {
            obj.remove(*f);
        }
        if let Some(Value::Object(err)) = obj.get_mut("error") {
            err.remove("msg");
        }
    }
    v
}
