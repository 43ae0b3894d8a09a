use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record read from a document database collection.
///
/// `fields` keeps the order in which the database returned the fields, which
/// later decides the column order of the exported worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document's own identifier (last segment of its resource name).
    pub id: String,
    /// Stored fields, already decoded into plain JSON values.
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}
