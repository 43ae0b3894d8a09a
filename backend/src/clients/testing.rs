//! In-memory stand-ins for the managed services, recording every call.

use super::firestore::{DatabaseError, DocumentStore};
use super::identity::{IdTokenVerifier, IdentityError, VerifiedToken};
use super::storage::{ArtifactStore, StorageError};
use super::ReportClients;
use async_trait::async_trait;
use common::model::document::Document;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Accepts exactly one token.
pub(crate) struct FakeVerifier {
    valid_token: String,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeVerifier {
    pub(crate) fn accepting(token: &str) -> Self {
        Self {
            valid_token: token.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl IdTokenVerifier for FakeVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        self.calls.lock().unwrap().push(token.to_string());
        if token == self.valid_token {
            Ok(VerifiedToken {
                uid: "uid-test".to_string(),
                email: Some("agronomo@example.com".to_string()),
            })
        } else {
            Err(IdentityError::JwtValidationFailed("Invalid signature".to_string()))
        }
    }
}

/// Serves fixed collections; unknown collections are empty.
#[derive(Default)]
pub(crate) struct FakeDocumentStore {
    collections: HashMap<String, Vec<Document>>,
    failing: Option<String>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeDocumentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_collection(mut self, name: &str, documents: Vec<Document>) -> Self {
        self.collections.insert(name.to_string(), documents);
        self
    }

    /// Make reads of `name` fail.
    pub(crate) fn failing_on(mut self, name: &str) -> Self {
        self.failing = Some(name.to_string());
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        self.calls.lock().unwrap().push(collection.to_string());
        if self.failing.as_deref() == Some(collection) {
            return Err(DatabaseError::Status {
                collection: collection.to_string(),
                status: reqwest::StatusCode::FORBIDDEN,
                body: "permission denied".to_string(),
            });
        }
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Upload {
    pub(crate) path: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct FakeArtifactStore {
    fail_upload: bool,
    fail_sign: bool,
    pub(crate) uploads: Mutex<Vec<Upload>>,
    pub(crate) signed: Mutex<Vec<(String, Duration)>>,
}

impl FakeArtifactStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_sign() -> Self {
        Self {
            fail_sign: true,
            ..Self::default()
        }
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

fn backend_error(message: &str) -> object_store::Error {
    object_store::Error::Generic {
        store: "fake",
        source: message.to_string().into(),
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.fail_upload {
            return Err(StorageError::Upload {
                path: path.to_string(),
                source: backend_error("bucket unavailable"),
            });
        }
        self.uploads.lock().unwrap().push(Upload {
            path: path.to_string(),
            content_type: content_type.to_string(),
            bytes,
        });
        Ok(())
    }

    async fn signed_read_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if self.fail_sign {
            return Err(StorageError::Sign {
                path: path.to_string(),
                source: backend_error("signBlob permission denied"),
            });
        }
        self.signed
            .lock()
            .unwrap()
            .push((path.to_string(), expires_in));
        Ok(format!(
            "https://storage.example.com/{}?X-Goog-Expires={}",
            path,
            expires_in.as_secs()
        ))
    }
}

pub(crate) fn clients(
    verifier: Arc<FakeVerifier>,
    documents: Arc<FakeDocumentStore>,
    artifacts: Arc<FakeArtifactStore>,
) -> ReportClients {
    ReportClients::new(verifier, documents, artifacts)
}

/// Build a document from a JSON object literal.
pub(crate) fn doc(id: &str, fields: Value) -> Document {
    let fields: Map<String, Value> = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Document::new(id, fields)
}
