//! Loading documents from exported files.
//!
//! A file may hold a JSON array of documents, a CouchDB `_all_docs?include_docs=true`
//! response (`{"rows": [{"doc": ...}]}`), a `_find` response (`{"docs": [...]}`), a single
//! document, or one document per line. Lines may end with a `,` as in streamed
//! `_all_docs` exports.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::Document;

fn document(path: &Path, line: usize, value: Value) -> Result<Document> {
    if value.is_object() {
        Ok(Document::new(value))
    } else {
        Err(Error::Input {
            path: path.to_owned(),
            line,
            reason: format!("expected a JSON object, got {}", value),
        })
    }
}

// A view row (`{"id", "key", "value", "doc"}`) carries its document under `doc`.
// Rows without one come from queries lacking include_docs and are dropped.
fn unwrap_row(mut row: Value) -> Option<Value> {
    let is_row = row.get("_id").is_none()
        && row.get("id").is_some()
        && (row.get("key").is_some() || row.get("doc").is_some());
    if !is_row {
        return Some(row);
    }
    row.get_mut("doc").map(Value::take).filter(Value::is_object)
}

fn from_value(path: &Path, value: Value) -> Result<Vec<Document>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| document(path, i + 1, v))
            .collect(),
        Value::Object(mut map) => {
            if let Some(Value::Array(rows)) = map.remove("rows") {
                Ok(rows
                    .into_iter()
                    .filter_map(|mut r| r.get_mut("doc").map(Value::take))
                    .filter(Value::is_object)
                    .map(Document::new)
                    .collect())
            } else if let Some(Value::Array(docs)) = map.remove("docs") {
                docs.into_iter()
                    .enumerate()
                    .map(|(i, v)| document(path, i + 1, v))
                    .collect()
            } else {
                Ok(vec![Document::new(Value::Object(map))])
            }
        }
        other => Err(Error::Input {
            path: path.to_owned(),
            line: 1,
            reason: format!("expected documents, got {}", other),
        }),
    }
}

fn from_lines(path: &Path, contents: &str) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim().trim_end_matches(',');
        if line.is_empty() || line == "[" || line == "]" {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(v) if v.is_object() => match unwrap_row(v) {
                Some(doc) => docs.push(Document::new(doc)),
                None => debug!("{:?}:{}: row without doc", path, i + 1),
            },
            Ok(v) => docs.push(document(path, i + 1, v)?),
            Err(e) => warn!("{:?}:{}: skipped malformed line: {}", path, i + 1, e),
        }
    }
    Ok(docs)
}

/// Parse the documents in `contents`; `path` is only used in messages.
pub fn parse(path: &Path, contents: &str) -> Result<Vec<Document>> {
    match serde_json::from_str::<Value>(contents) {
        Ok(value) => from_value(path, value),
        Err(_) => from_lines(path, contents),
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let docs = parse(path, &contents)?;
    debug!("loaded {} documents from {:?}", docs.len(), path);
    Ok(docs)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(Document::id).collect()
    }

    #[test]
    fn test_array_and_single() {
        let p = Path::new("a.json");
        let docs = parse(p, r#"[{"_id": "a"}, {"_id": "b"}]"#).unwrap();
        assert_eq!(ids(&docs), vec!["a", "b"]);
        let docs = parse(p, r#"{"_id": "a", "doc": {"text": "auspol"}}"#).unwrap();
        assert_eq!(ids(&docs), vec!["a"]);
        assert!(parse(p, "[1]").is_err());
        assert!(parse(p, "42").is_err());
    }

    #[test]
    fn test_all_docs_export() {
        let p = Path::new("all_docs.json");
        let body = json!({
            "total_rows": 3,
            "offset": 0,
            "rows": [
                {"id": "a", "key": "a", "value": {"rev": "1-x"}, "doc": {"_id": "a"}},
                {"id": "b", "key": "b", "value": {"rev": "1-y"}},
                {"id": "c", "key": "c", "value": {"rev": "1-z"}, "doc": {"_id": "c"}},
            ]
        });
        let docs = parse(p, &body.to_string()).unwrap();
        assert_eq!(ids(&docs), vec!["a", "c"]);

        let streamed = "{\"total_rows\":2,\"offset\":0,\"rows\":[\n\
            {\"id\":\"a\",\"doc\":{\"_id\":\"a\"}},\n\
            {\"id\":\"b\",\"doc\":{\"_id\":\"b\"}}\n\
            ]}\n";
        let docs = parse(p, streamed).unwrap();
        assert_eq!(ids(&docs), vec!["a", "b"]);
    }

    #[test]
    fn test_truncated_all_docs_export() {
        let p = Path::new("all_docs.json");
        let truncated = "{\"total_rows\":3,\"offset\":0,\"rows\":[\n\
            {\"id\":\"a\",\"key\":\"a\",\"value\":{\"rev\":\"1-x\"},\"doc\":{\"_id\":\"a\",\"tweet\":{\"text\":\"#auspol\"}}},\n\
            {\"id\":\"b\",\"key\":\"b\",\"value\":{\"rev\":\"1-y\"}},\n\
            {\"id\":\"c\",\"key\":\"c\",\"value\":{\"rev\":\"1-z\"},\"doc\":{\"_id\":\"c\"}},\n";
        let docs = parse(p, truncated).unwrap();
        assert_eq!(ids(&docs), vec!["a", "c"]);
        assert!(docs[0].as_value().get("tweet").is_some());
        assert!(docs[0].as_value().get("value").is_none());
    }

    #[test]
    fn test_find_response() {
        let docs = parse(Path::new("f.json"), r#"{"docs": [{"_id": "a"}], "bookmark": "x"}"#).unwrap();
        assert_eq!(ids(&docs), vec!["a"]);
    }

    #[test]
    fn test_json_lines() {
        let p = Path::new("tweets.jsonl");
        let contents = "{\"_id\": \"a\"},\n\n{\"_id\": \"b\", \"id\": 7, \"key\": 1}\nnot json\n{\"_id\": \"c\"}\n";
        let docs = parse(p, contents).unwrap();
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);
        assert!(parse(p, "{\"_id\": \"a\"}\n[1, 2]\n").is_err());
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        fs::write(&path, r#"[{"_id": "a"}]"#).unwrap();
        assert_eq!(load(&path).unwrap().len(), 1);
        assert!(matches!(load(dir.path().join("missing")), Err(Error::Io(_))));
    }
}
