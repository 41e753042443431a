//! Map functions over harvested election tweets.
//!
//! Documents look like
//! `{"_id": ..., "tweet": {"text": ..., "coordinates": ...}, "sa2": ..., "sentiment": {"compound": ...}}`
//! for the sentiment view, and `{"_id": ..., "doc": {"text": ...}}` for the id view.

use log::trace;
use serde_json::{json, Value};

use crate::{Document, FieldPath, Keywords, Row, View};

/// Key tag shared by both views.
pub const TAG: &str = "election";

/// Emits `["election", sa2] -> sentiment.compound` for geotagged tweets that
/// mention one of the keywords.
#[derive(Debug, Clone)]
pub struct SentimentView {
    keywords: Keywords,
    keep_zero_compound: bool,
    coordinates: FieldPath,
    text: FieldPath,
    sa2: FieldPath,
    compound: FieldPath,
}

impl SentimentView {
    pub fn new(keywords: Keywords) -> Self {
        Self {
            keywords,
            keep_zero_compound: false,
            coordinates: FieldPath::keys(vec!["tweet", "coordinates"]),
            text: FieldPath::keys(vec!["tweet", "text"]),
            sa2: FieldPath::keys(vec!["sa2"]),
            compound: FieldPath::keys(vec!["sentiment", "compound"]),
        }
    }

    /// By default a compound score of exactly zero is treated as missing, so
    /// neutral tweets are left out. Set this to emit them as well.
    pub fn keep_zero_compound(mut self, keep: bool) -> Self {
        self.keep_zero_compound = keep;
        self
    }

    fn emit(&self, doc: &Document) -> Option<Row> {
        doc.field(&self.coordinates).present()?;
        let text = doc.field(&self.text).text()?;
        if !self.keywords.any_match(&text) {
            return None;
        }
        let sa2 = doc.field(&self.sa2).truthy()?;
        let compound = if self.keep_zero_compound {
            doc.field(&self.compound).present()?
        } else {
            doc.field(&self.compound).truthy()?
        };
        Some(Row::new(doc, json!([TAG, sa2]), compound.clone()))
    }
}

impl Default for SentimentView {
    fn default() -> Self {
        Self::new(Keywords::election())
    }
}

impl View for SentimentView {
    fn map(&self, doc: &Document) -> Vec<Row> {
        match self.emit(doc) {
            Some(row) => {
                trace!("emit {:?} -> {}", row.key, row.value);
                vec![row]
            }
            None => {
                trace!("skip {:?}", doc.id());
                Vec::new()
            }
        }
    }

    fn source(&self) -> String {
        let compound = self.compound.to_js();
        let compound_check = if self.keep_zero_compound {
            format!("{} != null", compound)
        } else {
            compound.clone()
        };
        format!(
            "function (doc) {{ var regs = {regs}; \
             if ({coords} != null && {text} != null && regs.some(function (r) {{ return r.test({text}); }})) {{ \
             if ({sa2} && {check}) {{ emit([\"{tag}\", {sa2}], {compound}); }} }} }}",
            regs = self.keywords.to_js(),
            coords = self.coordinates.to_js(),
            text = self.text.to_js(),
            sa2 = self.sa2.to_js(),
            check = compound_check,
            tag = TAG,
            compound = compound,
        )
    }
}

/// Emits `"election" -> _id` once for every keyword the nested `doc.text` matches.
#[derive(Debug, Clone)]
pub struct IdView {
    keywords: Keywords,
    text: FieldPath,
    id: FieldPath,
}

impl IdView {
    pub fn new(keywords: Keywords) -> Self {
        Self {
            keywords,
            text: FieldPath::keys(vec!["doc", "text"]),
            id: FieldPath::keys(vec!["_id"]),
        }
    }
}

impl Default for IdView {
    fn default() -> Self {
        Self::new(Keywords::election())
    }
}

impl View for IdView {
    fn map(&self, doc: &Document) -> Vec<Row> {
        let text = match doc.field(&self.text).text() {
            Some(text) => text,
            None => return Vec::new(),
        };
        let id: Value = doc.field(&self.id).to_value();
        // No dedup: a text matching two keywords emits two identical rows.
        self.keywords
            .matches(&text)
            .map(|p| {
                trace!("{} matched {:?}", p, doc.id());
                Row::new(doc, Value::from(TAG), id.clone())
            })
            .collect()
    }

    fn source(&self) -> String {
        format!(
            "function (doc) {{ var regs = {regs}; \
             if ({text} != null) {{ for (var i = 0; i < regs.length; i++) {{ \
             if (regs[i].test({text})) {{ emit(\"{tag}\", {id}); }} }} }} }}",
            regs = self.keywords.to_js(),
            text = self.text.to_js(),
            tag = TAG,
            id = self.id.to_js(),
        )
    }
}
