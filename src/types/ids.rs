//! Deterministic UUIDv5 identifiers for plans and operations.
//!
//! The namespace derives from `NS_TAG`, and only relative keys are serialized, so
//! the same plan applied under two different bases gets the same `plan_id`.
use std::fmt::Write;
use uuid::Uuid;

use super::plan::{OperationPlan, PlannedAction, PlannedOp};
use crate::constants::NS_TAG;

fn namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, NS_TAG.as_bytes())
}

fn serialize_op(op: &PlannedOp) -> String {
    let tag = match op.action {
        PlannedAction::CreateDir => "D",
        PlannedAction::WriteFile => "F",
        PlannedAction::Skip => "S",
    };
    format!("{tag}:{}", op.rel)
}

/// Compute a deterministic UUIDv5 for a plan by serializing ops in order.
#[must_use]
pub fn plan_id(plan: &OperationPlan) -> Uuid {
    let mut s = String::new();
    for op in &plan.ops {
        s.push_str(&serialize_op(op));
        s.push('\n');
    }
    Uuid::new_v5(&namespace(), s.as_bytes())
}

/// Deterministic id for one op, a function of the plan id and position.
#[must_use]
pub fn op_id(plan_id: &Uuid, op: &PlannedOp, idx: usize) -> Uuid {
    let mut s = serialize_op(op);
    let _ = write!(s, "#{idx}");
    Uuid::new_v5(plan_id, s.as_bytes())
}

/// Id for runs that have no op plan (migration, validation, cleanup), keyed by verb and
/// relative keys.
#[must_use]
pub fn run_id(verb: &str, keys: &[String]) -> Uuid {
    let mut s = format!("{verb}\n");
    for k in keys {
        s.push_str(k);
        s.push('\n');
    }
    Uuid::new_v5(&namespace(), s.as_bytes())
}
