use serde::{Deserialize, Serialize};

/// Body of a successful report response.
///
/// `url` is a signed, time-limited read link for the uploaded workbook and
/// `path` is the object path the workbook was stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLink {
    pub url: String,
    pub path: String,
}

/// Body of every failed report response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
