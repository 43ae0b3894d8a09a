//! Handles to the managed services a report request talks to.
//!
//! The main components are:
//! - `IdTokenVerifier` (`identity`): checks the caller's bearer token.
//! - `DocumentStore` (`firestore`): reads whole collections from the document database.
//! - `ArtifactStore` (`storage`): uploads the workbook and signs a download URL.
//!
//! `ReportClients` bundles one handle of each. It is built once in `main.rs`
//! and shared with every request as `web::Data`, so tests can hand the
//! handler fakes instead of the real services.

pub mod access_token;
pub mod firestore;
pub mod identity;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::ServerConfig;
use access_token::AccessTokenSource;
use firestore::{DocumentStore, FirestoreClient};
use identity::{FirebaseTokenVerifier, IdTokenVerifier};
use std::sync::Arc;
use storage::{ArtifactStore, ObjectArtifactStore, StorageError};

/// The collaborators used by the report pipeline.
///
/// Every handle is immutable and shared between requests; none of them keeps
/// per-request state.
#[derive(Clone)]
pub struct ReportClients {
    /// Verifies `Authorization: Bearer <token>` ID tokens.
    pub verifier: Arc<dyn IdTokenVerifier>,
    /// Reads the exported collections.
    pub documents: Arc<dyn DocumentStore>,
    /// Stores the generated workbook and issues signed read URLs.
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl ReportClients {
    pub fn new(
        verifier: Arc<dyn IdTokenVerifier>,
        documents: Arc<dyn DocumentStore>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            verifier,
            documents,
            artifacts,
        }
    }

    /// Build the production clients for Firebase Auth, Firestore and Cloud Storage.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::new();

        let verifier = FirebaseTokenVerifier::new(&config.project_id, http.clone());

        let tokens = match (&config.firestore_emulator_host, &config.access_token) {
            (Some(_), _) => AccessTokenSource::Emulator,
            (None, Some(token)) => AccessTokenSource::Static(token.clone()),
            (None, None) => AccessTokenSource::MetadataServer(http.clone()),
        };
        let mut documents = FirestoreClient::new(&config.project_id, tokens, http);
        if let Some(host) = &config.firestore_emulator_host {
            log::info!("Using Firestore emulator at {}", host);
            documents = documents.with_emulator_host(host);
        }

        let artifacts = ObjectArtifactStore::gcs(&config.bucket)?;

        Ok(Self::new(
            Arc::new(verifier),
            Arc::new(documents),
            Arc::new(artifacts),
        ))
    }
}
