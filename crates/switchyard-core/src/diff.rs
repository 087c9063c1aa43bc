//! Structural diff over JSON values.
//!
//! Specs are compared after serialization so that field additions in the
//! types never need a hand-written comparison. Paths use dot notation with
//! `[i]` for array indices.

use serde::Serialize;
use serde_json::Value;

/// Recursion limit; anything deeper is reported as a single update.
const MAX_DEPTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Updated { path: String, from: Value, to: Value },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Added { path, .. } | Change::Removed { path, .. } | Change::Updated { path, .. } => path,
        }
    }
}

/// Diff two values. `Null` and absent keys are treated alike.
pub fn diff_values(old: &Value, new: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    compare(old, new, String::new(), 0, &mut changes);
    changes
}

/// Serialize both sides and diff them.
pub fn diff<T: Serialize>(old: &T, new: &T) -> Result<Vec<Change>, serde_json::Error> {
    Ok(diff_values(&serde_json::to_value(old)?, &serde_json::to_value(new)?))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn compare(old: &Value, new: &Value, path: String, depth: usize, out: &mut Vec<Change>) {
    if depth > MAX_DEPTH {
        if old != new {
            out.push(Change::Updated {
                path,
                from: old.clone(),
                to: new.clone(),
            });
        }
        return;
    }

    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, old_val) in a {
                let child = join(&path, key);
                match b.get(key) {
                    Some(new_val) => compare(old_val, new_val, child, depth + 1, out),
                    None if !old_val.is_null() => out.push(Change::Removed {
                        path: child,
                        value: old_val.clone(),
                    }),
                    None => {}
                }
            }
            for (key, new_val) in b {
                if !a.contains_key(key) && !new_val.is_null() {
                    out.push(Change::Added {
                        path: join(&path, key),
                        value: new_val.clone(),
                    });
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for (i, old_val) in a.iter().enumerate() {
                let child = format!("{path}[{i}]");
                match b.get(i) {
                    Some(new_val) => compare(old_val, new_val, child, depth + 1, out),
                    None => out.push(Change::Removed {
                        path: child,
                        value: old_val.clone(),
                    }),
                }
            }
            for (i, new_val) in b.iter().enumerate().skip(a.len()) {
                out.push(Change::Added {
                    path: format!("{path}[{i}]"),
                    value: new_val.clone(),
                });
            }
        }
        (Value::Null, Value::Null) => {}
        (Value::Null, v) => out.push(Change::Added {
            path,
            value: v.clone(),
        }),
        (v, Value::Null) => out.push(Change::Removed {
            path,
            value: v.clone(),
        }),
        (a, b) if a != b => out.push(Change::Updated {
            path,
            from: a.clone(),
            to: b.clone(),
        }),
        _ => {}
    }
}
