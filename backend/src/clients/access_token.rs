//! OAuth2 access tokens for the Google REST APIs.

use serde::Deserialize;

/// Token endpoint of the GCE/Cloud Run metadata server.
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Token the Firestore emulator accepts as an admin credential.
const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, thiserror::Error)]
pub enum AccessTokenError {
    #[error("metadata server request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metadata server returned status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Where outgoing requests get their bearer token from.
///
/// Tokens are resolved on every call; nothing is cached.
#[derive(Clone)]
pub enum AccessTokenSource {
    /// A fixed token supplied through configuration.
    Static(String),
    /// The local emulator, which accepts a well-known token.
    Emulator,
    /// The metadata server of the runtime's default service account.
    MetadataServer(reqwest::Client),
}

impl AccessTokenSource {
    pub async fn token(&self) -> Result<String, AccessTokenError> {
        match self {
            AccessTokenSource::Static(token) => Ok(token.clone()),
            AccessTokenSource::Emulator => Ok(EMULATOR_TOKEN.to_string()),
            AccessTokenSource::MetadataServer(http) => {
                let response = http
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(AccessTokenError::Status(response.status()));
                }
                let token: MetadataToken = response.json().await?;
                Ok(token.access_token)
            }
        }
    }
}
