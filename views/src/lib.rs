use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod app;
mod collate;
pub mod design;
mod document;
mod error;
mod generator;
pub mod input;
mod keywords;
pub mod reduce;

pub use collate::{collate, sort_rows};
pub use document::{Document, Field, FieldPath};
pub use error::{Error, Result};
pub use generator::{Condition, MapGenerator, Projection};
pub use keywords::{Keywords, Pattern, ELECTION_KEYWORDS};

/// One emitted key/value pair, tagged with the `_id` of the document that emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: Value,
    pub value: Value,
}

impl Row {
    pub fn new(doc: &Document, key: Value, value: Value) -> Self {
        Self {
            id: doc.id().map(str::to_owned),
            key,
            value,
        }
    }
}

/// A map function: called once per document, emits zero or more rows.
pub trait View: Send + Sync {
    fn map(&self, doc: &Document) -> Vec<Row>;

    /// Source of the equivalent CouchDB JavaScript map function.
    fn source(&self) -> String;
}

/// Map every document through `view` and order the rows the way CouchDB would.
pub fn map_all<'a, I>(view: &dyn View, docs: I) -> Vec<Row>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut rows = Vec::new();
    for doc in docs {
        if doc.is_design() {
            trace!("skip design document {:?}", doc.id());
            continue;
        }
        rows.extend(view.map(doc));
    }
    sort_rows(&mut rows);
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    pub rows: Vec<Row>,
}

impl ViewResponse {
    pub fn mapped(rows: Vec<Row>) -> Self {
        Self {
            total_rows: Some(rows.len()),
            offset: Some(0),
            rows,
        }
    }

    /// Reduced responses carry no totals.
    pub fn reduced(rows: Vec<Row>) -> Self {
        Self {
            total_rows: None,
            offset: None,
            rows,
        }
    }
}
