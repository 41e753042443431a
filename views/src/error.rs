use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the tooling around the views. The views themselves never fail:
/// a document missing a field simply emits nothing.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("invalid regex literal '{literal}': {reason}")]
    RegexLiteral { literal: String, reason: String },
    #[error("invalid field path '{path}': {reason}")]
    FieldPath { path: String, reason: String },
    #[error("unknown reduce function '{0}', expected _count, _sum or _stats")]
    UnknownReducer(String),
    #[error("unknown view '{0}', expected sentiment or ids")]
    UnknownView(String),
    #[error("{reducer} expects numeric values, got {value}")]
    NotNumeric {
        reducer: &'static str,
        value: serde_json::Value,
    },
    #[error("grouping needs a reduce function")]
    GroupWithoutReduce,
    #[error("{path:?}:{line}: {reason}")]
    Input {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
