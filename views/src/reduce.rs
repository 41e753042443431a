//! Built-in reduce functions and key grouping, evaluated over mapped rows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::{collate, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Count,
    Sum,
    Stats,
}

impl FromStr for Reducer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('_') {
            "count" => Ok(Reducer::Count),
            "sum" => Ok(Reducer::Sum),
            "stats" => Ok(Reducer::Stats),
            _ => Err(Error::UnknownReducer(s.to_owned())),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reducer::Count => "_count",
            Reducer::Sum => "_sum",
            Reducer::Stats => "_stats",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub sum: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub sumsqr: f64,
}

impl Stats {
    fn of(values: &[f64]) -> Self {
        let mut s = Stats {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sumsqr: 0.0,
        };
        for v in values.iter().copied() {
            s.sum += v;
            s.count += 1;
            s.min = s.min.min(v);
            s.max = s.max.max(v);
            s.sumsqr += v * v;
        }
        s
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl Reducer {
    fn numbers(&self, values: &[&Value]) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| Error::NotNumeric {
                    reducer: match self {
                        Reducer::Sum => "_sum",
                        _ => "_stats",
                    },
                    value: (*v).clone(),
                })
            })
            .collect()
    }

    pub fn reduce(&self, values: &[&Value]) -> Result<Value> {
        match self {
            Reducer::Count => Ok(Value::from(values.len())),
            Reducer::Sum => {
                let numbers = self.numbers(values)?;
                let ints: Option<Vec<i64>> = values.iter().map(|v| v.as_i64()).collect();
                match ints.and_then(|ints| ints.into_iter().try_fold(0i64, i64::checked_add)) {
                    Some(total) => Ok(Value::from(total)),
                    None => Ok(Value::from(numbers.iter().sum::<f64>())),
                }
            }
            Reducer::Stats => Ok(serde_json::to_value(Stats::of(&self.numbers(values)?))?),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Everything reduces to one row keyed `null`.
    None,
    /// One row per distinct key.
    Exact,
    /// Array keys are cut to their first n elements; other keys are kept whole.
    Level(usize),
}

impl Grouping {
    fn group_key(&self, key: &Value) -> Value {
        match (self, key) {
            (Grouping::None, _) | (Grouping::Level(0), _) => Value::Null,
            (Grouping::Exact, k) => k.clone(),
            (Grouping::Level(n), Value::Array(items)) => {
                Value::Array(items.iter().take(*n).cloned().collect())
            }
            (Grouping::Level(_), k) => k.clone(),
        }
    }
}

/// Pick the grouping for a query. Asking for grouping without a reducer is an error.
pub fn grouping(
    reducer: Option<Reducer>,
    group: bool,
    group_level: Option<usize>,
) -> Result<Option<(Reducer, Grouping)>> {
    let grouping = match (group_level, group) {
        (Some(level), _) => Grouping::Level(level),
        (None, true) => Grouping::Exact,
        (None, false) => Grouping::None,
    };
    match reducer {
        Some(r) => Ok(Some((r, grouping))),
        None if grouping != Grouping::None => Err(Error::GroupWithoutReduce),
        None => Ok(None),
    }
}

/// Group `rows` and reduce each group. The output is in key collation order.
pub fn reduce(rows: &[Row], reducer: Reducer, grouping: Grouping) -> Result<Vec<Row>> {
    let mut keyed: Vec<(Value, &Value)> = rows
        .iter()
        .map(|r| (grouping.group_key(&r.key), &r.value))
        .collect();
    keyed.sort_by(|a, b| collate(&a.0, &b.0));

    let mut out = Vec::new();
    let mut start = 0;
    while start < keyed.len() {
        let mut end = start + 1;
        while end < keyed.len() && collate(&keyed[start].0, &keyed[end].0) == Ordering::Equal {
            end += 1;
        }
        let values: Vec<&Value> = keyed[start..end].iter().map(|(_, v)| *v).collect();
        out.push(Row {
            id: None,
            key: keyed[start].0.clone(),
            value: reducer.reduce(&values)?,
        });
        start = end;
    }
    Ok(out)
}
