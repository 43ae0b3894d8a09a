//! # Firestore Document Reader
//!
//! Reads complete collections through the Firestore REST API (v1).
//!
//! ## Workflow
//!
//! 1.  **Listing**: `list_documents` requests
//!     `projects/{project}/databases/(default)/documents/{collection}` and keeps
//!     following `nextPageToken` until the collection is exhausted, so callers
//!     always get every document in one `Vec`.
//!
//! 2.  **Decoding**: Firestore wraps every field in a typed value
//!     (`{"stringValue": "..."}`, `{"mapValue": {"fields": {...}}}`, ...).
//!     `decode_value` unwraps these into plain `serde_json::Value`s, keeping
//!     the field order of the response. Timestamps, geo points, bytes and
//!     references become small objects rather than scalars.
//!
//! 3.  **Identity**: the document id is the last segment of the document's
//!     resource name.

use crate::clients::access_token::{AccessTokenError, AccessTokenSource};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use common::model::document::Document;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";
const PAGE_SIZE: u32 = 300;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("could not obtain an access token: {0}")]
    AccessToken(#[from] AccessTokenError),

    #[error("request for collection '{collection}' failed: {source}")]
    Request {
        collection: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("listing collection '{collection}' returned status {status}: {body}")]
    Status {
        collection: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Read access to a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return every document of `collection`, in the store's iteration order.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DatabaseError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Firestore REST client bound to one project and database.
#[derive(Clone)]
pub struct FirestoreClient {
    base_url: String,
    project_id: String,
    database: String,
    tokens: AccessTokenSource,
    http: reqwest::Client,
}

impl FirestoreClient {
    pub fn new(project_id: &str, tokens: AccessTokenSource, http: reqwest::Client) -> Self {
        Self {
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id: project_id.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            tokens,
            http,
        }
    }

    /// Talk to a local emulator (`host:port`) over plain HTTP.
    pub fn with_emulator_host(mut self, host: &str) -> Self {
        self.base_url = format!("http://{}/v1", host.trim_end_matches('/'));
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.base_url, self.project_id, self.database, collection
        )
    }

    async fn fetch_page(
        &self,
        collection: &str,
        token: &str,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse, DatabaseError> {
        let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token.to_string()));
        }

        let request_error = |source| DatabaseError::Request {
            collection: collection.to_string(),
            source,
        };

        let response = self
            .http
            .get(self.collection_url(collection))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatabaseError::Status {
                collection: collection.to_string(),
                status,
                body,
            });
        }

        response.json().await.map_err(request_error)
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        let token = self.tokens.token().await?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(collection, &token, page_token.as_deref())
                .await?;
            log::debug!(
                "Fetched {} documents from '{}' (page token: {:?})",
                page.documents.len(),
                collection,
                page_token
            );
            documents.extend(page.documents.into_iter().map(decode_document));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(documents)
    }
}

fn decode_document(raw: RawDocument) -> Document {
    let id = raw
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Document::new(id, decode_fields(&raw.fields))
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Unwrap a Firestore typed value into a plain JSON value.
///
/// Values the Admin SDK hands out as objects keep that object shape, so they
/// end up as JSON text in a cell like maps and arrays do:
/// - timestamps become `{"_seconds", "_nanoseconds"}`
/// - geo points become `{"_latitude", "_longitude"}`
/// - bytes become `{"type": "Buffer", "data": [..]}`
/// - references become `{"_path": {"segments": [..]}}`, relative to the
///   documents root
///
/// Doubles Firestore spells as strings (`"NaN"`, `"Infinity"`, `"-Infinity"`)
/// stay strings. A timestamp or bytes value that does not parse is kept as
/// the text Firestore sent.
pub(crate) fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| inner.clone()),
            _ => inner.clone(),
        },
        "timestampValue" => inner
            .as_str()
            .and_then(decode_timestamp)
            .unwrap_or_else(|| inner.clone()),
        "bytesValue" => inner
            .as_str()
            .and_then(decode_bytes)
            .unwrap_or_else(|| inner.clone()),
        "referenceValue" => inner
            .as_str()
            .map(decode_reference)
            .unwrap_or_else(|| inner.clone()),
        "geoPointValue" => json!({
            "_latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "_longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        }),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        // booleanValue, doubleValue, stringValue
        _ => inner.clone(),
    }
}

fn decode_timestamp(text: &str) -> Option<Value> {
    let ts = DateTime::parse_from_rfc3339(text).ok()?;
    Some(json!({
        "_seconds": ts.timestamp(),
        "_nanoseconds": ts.timestamp_subsec_nanos(),
    }))
}

fn decode_bytes(text: &str) -> Option<Value> {
    let data = STANDARD.decode(text).ok()?;
    Some(json!({"type": "Buffer", "data": data}))
}

fn decode_reference(name: &str) -> Value {
    let relative = name
        .split_once("/documents/")
        .map(|(_, path)| path)
        .unwrap_or(name);
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    json!({"_path": {"segments": segments}})
}
