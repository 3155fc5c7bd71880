//! Record and result types for the Partner API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A generic sObject record: a type tag, an optional Id, and flat
/// field→value pairs. The Partner API transports every field as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub sobject_type: String,
    pub id: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(sobject_type: impl Into<String>) -> Self {
        Self {
            sobject_type: sobject_type.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub records: Vec<Record>,
    /// Locator for the next page; `None` on the last page.
    pub query_locator: Option<String>,
    /// Whether this is the last page.
    pub done: bool,
    /// Total result size across all pages.
    pub size: u32,
}

/// Error information attached to a failed record operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub status_code: String,
    pub message: String,
    pub fields: Vec<String>,
}

/// Per-record result of `create`/`update`/`undelete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResult {
    pub id: Option<String>,
    pub success: bool,
    pub errors: Vec<ApiError>,
}

/// Per-record result of `delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub id: Option<String>,
    pub success: bool,
    pub errors: Vec<ApiError>,
}

/// Result of `executeAnonymous`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteAnonymousResult {
    pub compiled: bool,
    pub success: bool,
    pub compile_problem: Option<String>,
    pub exception_message: Option<String>,
    pub exception_stack_trace: Option<String>,
    pub line: Option<i32>,
    pub column: Option<i32>,
}
