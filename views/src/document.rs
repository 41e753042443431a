use std::borrow::Cow;
use std::fmt;
use std::mem;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A dotted path into a document, e.g. `tweet.coordinates.coordinates[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys.into_iter().map(|k| Segment::Key(k.into())).collect(),
        }
    }

    /// Render as a JavaScript member expression rooted at `doc`.
    pub fn to_js(&self) -> String {
        let mut s = String::from("doc");
        for seg in self.segments.iter() {
            match seg {
                Segment::Key(k) if is_identifier(k) => {
                    s.push('.');
                    s.push_str(k);
                }
                Segment::Key(k) => {
                    s.push('[');
                    s.push_str(&Value::from(k.as_str()).to_string());
                    s.push(']');
                }
                Segment::Index(i) => s.push_str(&format!("[{}]", i)),
            }
        }
        s
    }
}

fn is_identifier(k: &str) -> bool {
    let mut chars = k.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let err = |reason: &str| Error::FieldPath {
            path: s.to_owned(),
            reason: reason.to_owned(),
        };
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut after_index = false;
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(err("empty segment"));
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(mem::take(&mut key)));
                    }
                    after_index = false;
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(mem::take(&mut key)));
                    } else if segments.is_empty() {
                        return Err(err("path must start with a field name"));
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(d) if d.is_ascii_digit() => digits.push(d),
                            Some(_) => return Err(err("index must be a number")),
                            None => return Err(err("unterminated index")),
                        }
                    }
                    let idx = digits.parse().map_err(|_| err("empty index"))?;
                    segments.push(Segment::Index(idx));
                    after_index = true;
                }
                ']' => return Err(err("unexpected ']'")),
                c => {
                    if after_index {
                        return Err(err("expected '.' or '[' after index"));
                    }
                    key.push(c);
                }
            }
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if !after_index {
            return Err(err("empty segment"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => write!(f, "{}", k)?,
                Segment::Key(k) => write!(f, ".{}", k)?,
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

fn js_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(js_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Absent,
    Null,
    Present(&'a Value),
}

impl<'a> Field<'a> {
    pub fn present(self) -> Option<&'a Value> {
        match self {
            Field::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_present(self) -> bool {
        self.present().is_some()
    }

    /// The value, if it would pass a JavaScript `if (doc.field)` check.
    pub fn truthy(self) -> Option<&'a Value> {
        self.present().filter(|v| match v {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
    }

    /// Text to run a pattern against, as JavaScript would stringify it.
    /// Objects never match.
    pub fn text(self) -> Option<Cow<'a, str>> {
        match self.present()? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Object(_) => None,
            v => Some(Cow::Owned(js_string(v))),
        }
    }

    /// The value as it would be emitted: absent and null both become `null`.
    pub fn to_value(self) -> Value {
        self.present().cloned().unwrap_or(Value::Null)
    }
}

/// A JSON document handed to a view. Views only ever read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn field(&self, path: &FieldPath) -> Field<'_> {
        let mut cur = &self.0;
        for seg in path.segments.iter() {
            let next = match (seg, cur) {
                (Segment::Key(k), Value::Object(map)) => map.get(k),
                (Segment::Index(i), Value::Array(items)) => items.get(*i),
                _ => None,
            };
            match next {
                Some(v) => cur = v,
                None => return Field::Absent,
            }
        }
        if cur.is_null() {
            Field::Null
        } else {
            Field::Present(cur)
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    /// Design documents are never passed to map functions.
    pub fn is_design(&self) -> bool {
        self.id().map_or(false, |id| id.starts_with("_design/"))
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_path() {
        let p = path("tweet.coordinates.coordinates[1]");
        assert_eq!(p.to_string(), "tweet.coordinates.coordinates[1]");
        assert_eq!(p.to_js(), "doc.tweet.coordinates.coordinates[1]");
        assert_eq!(path("a[0][2].b").to_string(), "a[0][2].b");

        for bad in &["", "a..b", "a.", ".a", "[0]", "a[x]", "a[", "a[]", "a]", "a[0]b"] {
            assert!(bad.parse::<FieldPath>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_js_quotes_odd_keys() {
        let p = FieldPath::keys(vec!["geo", "sa2-code", "9lives"]);
        assert_eq!(p.to_js(), r#"doc.geo["sa2-code"]["9lives"]"#);
    }

    #[test]
    fn test_field_presence() {
        let doc = Document::new(json!({
            "tweet": {"coordinates": null, "text": "hi", "place": {"bbox": [[1, 2]]}},
            "sa2": "",
            "sentiment": {"compound": 0},
        }));
        assert_eq!(doc.field(&path("tweet.coordinates")), Field::Null);
        assert_eq!(doc.field(&path("tweet.missing")), Field::Absent);
        assert_eq!(doc.field(&path("tweet.text.length")), Field::Absent);
        assert_eq!(doc.field(&path("tweet.place.bbox[0][1]")), Field::Present(&json!(2)));
        assert_eq!(doc.field(&path("tweet.place.bbox[3]")), Field::Absent);

        assert!(doc.field(&path("sa2")).is_present());
        assert!(doc.field(&path("sa2")).truthy().is_none());
        assert!(doc.field(&path("sentiment.compound")).truthy().is_none());
        assert_eq!(doc.field(&path("tweet.coordinates")).to_value(), Value::Null);
    }

    #[test]
    fn test_text() {
        let doc = Document::new(json!({
            "a": "x",
            "b": 12,
            "c": null,
            "e": 2.0,
            "f": ["auspol", 1, null, true],
            "g": {"auspol": true},
        }));
        assert_eq!(doc.field(&path("a")).text().unwrap(), "x");
        assert_eq!(doc.field(&path("b")).text().unwrap(), "12");
        assert_eq!(doc.field(&path("e")).text().unwrap(), "2");
        assert_eq!(doc.field(&path("f")).text().unwrap(), "auspol,1,,true");
        assert!(doc.field(&path("g")).text().is_none());
        assert!(doc.field(&path("c")).text().is_none());
        assert!(doc.field(&path("d")).text().is_none());
    }

    #[test]
    fn test_design() {
        assert!(Document::new(json!({"_id": "_design/tweets"})).is_design());
        assert!(!Document::new(json!({"_id": "123"})).is_design());
        assert!(!Document::new(json!({})).is_design());
    }
}
