//! CouchDB design documents, as sent with `PUT /{db}/_design/{name}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reduce::Reducer;
use crate::View;

const PREFIX: &str = "_design/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSource {
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub language: String,
    pub views: BTreeMap<String, ViewSource>,
}

impl DesignDocument {
    pub fn new(name: &str) -> Self {
        Self {
            id: format!("{}{}", PREFIX, name),
            language: "javascript".to_owned(),
            views: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.id.strip_prefix(PREFIX).unwrap_or(&self.id)
    }

    pub fn add_view(&mut self, name: &str, view: &dyn View, reduce: Option<Reducer>) -> &mut Self {
        self.views.insert(
            name.to_owned(),
            ViewSource {
                map: view.source(),
                reduce: reduce.map(|r| r.to_string()),
            },
        );
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn path(&self, db: &str) -> String {
        format!("{}/{}", db, self.id)
    }

    /// Query path of one of the views. `group_level` only applies to reduced views.
    pub fn view_path(&self, db: &str, view: &str, group_level: Option<usize>) -> String {
        let mut path = format!("{}/_view/{}", self.path(db), view);
        if let Some(level) = group_level {
            path.push_str(&format!("?group_level={}", level));
        }
        path
    }
}
