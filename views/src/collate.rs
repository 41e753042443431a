use std::cmp::Ordering;

use serde_json::Value;

use crate::Row;

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

// Case-insensitive first, lowercase before uppercase on ties. Close to, not
// identical with, the ICU ordering CouchDB uses.
fn collate_str(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Order two view keys: `null < false < true < numbers < strings < arrays < objects`.
pub fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => collate_str(x, y),
        (Value::Array(xs), Value::Array(ys)) => xs
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| collate(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Value::Object(xs), Value::Object(ys)) => xs
            .iter()
            .zip(ys.iter())
            .map(|((xk, xv), (yk, yv))| collate_str(xk, yk).then_with(|| collate(xv, yv)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sort by key, then by document id. Stable, so duplicate emissions keep their order.
pub fn sort_rows(rows: &mut [Row]) {
    rows.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
}
