//! Physical plan cleaning for the oracle tie-break.

use serde_json::{Map, Value};

/// Keys whose values vary between runs of the same plan.
pub const VOLATILE_PLAN_KEYS: &[&str] = &[
    "Planning Time",
    "Execution Time",
    "Actual Rows",
    "Actual Loops",
    "Actual Startup Time",
    "Actual Total Time",
    "Shared Hit Blocks",
    "Shared Read Blocks",
    "Shared Dirtied Blocks",
    "Shared Written Blocks",
    "Local Hit Blocks",
    "Local Read Blocks",
    "Local Dirtied Blocks",
    "Local Written Blocks",
    "Temp Read Blocks",
    "Temp Written Blocks",
    "I/O Read Time",
    "I/O Write Time",
];

fn is_volatile(key: &str) -> bool {
    key.starts_with("Actual ") || VOLATILE_PLAN_KEYS.contains(&key)
}

/// Strip execution-specific keys from an `EXPLAIN (FORMAT JSON)` result.
///
/// The result document is usually a one-element array whose object holds
/// the plan under `"Plan"` next to timing keys; that object is lifted to
/// the root. Volatile keys are removed at every depth.
pub fn clean_plan_json(value: &Value) -> Value {
    let root = match value {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    };
    let root = match root {
        Value::Object(map) => map.get("Plan").unwrap_or(root),
        other => other,
    };
    strip_volatile(root)
}

fn strip_volatile(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_volatile(key))
                .map(|(key, v)| (key.clone(), strip_volatile(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_volatile).collect()),
        other => other.clone(),
    }
}
