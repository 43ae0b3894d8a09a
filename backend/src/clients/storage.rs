//! Object storage for generated reports.
//!
//! `ObjectArtifactStore` works with any `object_store` backend that can also
//! sign URLs; production uses Google Cloud Storage.

use async_trait::async_trait;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(#[from] object_store::path::Error),

    #[error("could not configure object store: {0}")]
    Config(#[source] object_store::Error),

    #[error("upload of '{path}' failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: object_store::Error,
    },

    #[error("signing URL for '{path}' failed: {source}")]
    Sign {
        path: String,
        #[source]
        source: object_store::Error,
    },
}

/// Write access plus signed read links for stored artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any existing object.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// A credential-less `GET` URL for `path`, valid for `expires_in`.
    async fn signed_read_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}

pub struct ObjectArtifactStore<S> {
    store: Arc<S>,
}

impl<S> ObjectArtifactStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl ObjectArtifactStore<GoogleCloudStorage> {
    /// Google Cloud Storage bucket, with credentials taken from the environment
    /// (`GOOGLE_SERVICE_ACCOUNT`, `GOOGLE_APPLICATION_CREDENTIALS`, or the
    /// metadata server).
    pub fn gcs(bucket: &str) -> Result<Self, StorageError> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(StorageError::Config)?;
        Ok(Self::new(Arc::new(store)))
    }
}

#[async_trait]
impl<S> ArtifactStore for ObjectArtifactStore<S>
where
    S: ObjectStore + Signer,
{
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let location = Path::parse(path)?;

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(bytes), options)
            .await
            .map_err(|source| StorageError::Upload {
                path: path.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn signed_read_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let location = Path::parse(path)?;
        let url = self
            .store
            .signed_url(reqwest::Method::GET, &location, expires_in)
            .await
            .map_err(|source| StorageError::Sign {
                path: path.to_string(),
                source,
            })?;
        Ok(url.to_string())
    }
}
