//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by Google's `securetoken` service account.
//! The public keys are fetched from the JWKS endpoint on every verification;
//! nothing is cached between requests.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Public keys used to sign Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Firebase rejects `sub` claims longer than this.
const MAX_SUBJECT_LEN: usize = 128;

/// Identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("ID token is empty")]
    EmptyToken,

    #[error("Token is missing the 'kid' header")]
    MissingKid,

    #[error("No key found for kid '{0}'")]
    KeyNotFound(String),

    #[error("Invalid JWK format: {0}")]
    InvalidKeyFormat(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    #[error("JWT validation failed: {0}")]
    JwtValidationFailed(String),
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => IdentityError::JwtValidationFailed("Token expired".into()),
            ErrorKind::InvalidSignature => {
                IdentityError::JwtValidationFailed("Invalid signature".into())
            }
            ErrorKind::InvalidToken => IdentityError::JwtValidationFailed("Invalid token".into()),
            _ => IdentityError::JwtValidationFailed(e.to_string()),
        }
    }
}

/// Verifies caller ID tokens against an identity provider.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    auth_time: Option<i64>,
}

/// Verifies Firebase Authentication ID tokens for one project.
#[derive(Clone)]
pub struct FirebaseTokenVerifier {
    project_id: String,
    jwks_url: String,
    http: reqwest::Client,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: &str, http: reqwest::Client) -> Self {
        Self {
            project_id: project_id.to_string(),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            http,
        }
    }

    /// Use a different JWKS endpoint.
    #[cfg(test)]
    pub fn with_jwks_url(mut self, url: &str) -> Self {
        self.jwks_url = url.to_string();
        self
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer()]);
        validation.set_audience(&[&self.project_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, IdentityError> {
        log::debug!("Fetching JWKS from: {}", self.jwks_url);

        let response = self.http.get(&self.jwks_url).send().await.map_err(|e| {
            IdentityError::JwksFetchFailed(format!(
                "Failed to fetch JWKS from '{}': {}",
                self.jwks_url, e
            ))
        })?;

        if !response.status().is_success() {
            return Err(IdentityError::JwksFetchFailed(format!(
                "JWKS request to '{}' returned status {}",
                self.jwks_url,
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            IdentityError::JwksFetchFailed(format!(
                "Failed to parse JWKS JSON from '{}': {}",
                self.jwks_url, e
            ))
        })
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseTokenVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        if token.trim().is_empty() {
            return Err(IdentityError::EmptyToken);
        }

        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::JwtValidationFailed(format!(
                "Unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header.kid.ok_or(IdentityError::MissingKid)?;

        let jwks = self.fetch_jwks().await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| IdentityError::KeyNotFound(kid.clone()))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;

        let data = decode::<FirebaseClaims>(token, &key, &self.validation()).map_err(|e| {
            log::warn!("ID token decode failed: kind={:?} msg={}", e.kind(), e);
            IdentityError::from(e)
        })?;

        check_claims(&data.claims, chrono::Utc::now().timestamp())?;

        Ok(VerifiedToken {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Firebase-specific checks `jsonwebtoken` does not cover.
fn check_claims(claims: &FirebaseClaims, now: i64) -> Result<(), IdentityError> {
    if claims.sub.is_empty() || claims.sub.len() > MAX_SUBJECT_LEN {
        return Err(IdentityError::JwtValidationFailed(
            "Invalid 'sub' claim".to_string(),
        ));
    }
    if matches!(claims.auth_time, Some(auth_time) if auth_time > now) {
        return Err(IdentityError::JwtValidationFailed(
            "'auth_time' is in the future".to_string(),
        ));
    }
    Ok(())
}
