use serde::{Deserialize, Serialize};

use crate::report::types::ReportRecord;

/// Raw item payload as returned by Kissflow. The schema is owned upstream,
/// so it is kept as untyped JSON and only read through the field mapper.
pub type ExternalRecord = serde_json::Value;

/// A validated Kissflow item identifier (e.g., "KFF-0111").
/// Extracted by parse_item_id() in kissflow/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemId(pub(super) String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /api/v1/qsr/fetch-data`.
#[derive(Debug, Serialize)]
pub struct FetchRequest<'a> {
    pub item_id: &'a str,
}

/// Mapped item plus the checklist of fields still to be filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    pub data: ReportRecord,
    #[serde(rename = "missingFields", default)]
    pub missing_fields: Vec<String>,
}

/// Error body of a non-2xx backend response. `detail` is a string for
/// handled errors and a list for request validation failures.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn user_message(self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .or(self.message)
    }
}
