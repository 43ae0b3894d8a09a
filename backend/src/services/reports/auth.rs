//! Bearer-token gate in front of the report pipeline.
//!
//! The header lookup is case-insensitive. A missing header, a value that is
//! not valid text, or one that does not start with `Bearer ` is rejected
//! before the identity provider is contacted. Whatever follows `Bearer ` is
//! handed to the verifier as-is, and any verifier failure, transient or not,
//! is reported as an invalid token.

use crate::clients::identity::{IdTokenVerifier, VerifiedToken};
use crate::error::ReportError;
use actix_web::http::header;
use actix_web::HttpRequest;

const BEARER_PREFIX: &str = "Bearer ";

/// Return the raw token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(req: &HttpRequest) -> Result<&str, ReportError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(ReportError::MissingAuthorization)
}

/// Check the caller's token with the identity provider.
pub(crate) async fn authenticate(
    req: &HttpRequest,
    verifier: &dyn IdTokenVerifier,
) -> Result<VerifiedToken, ReportError> {
    let token = bearer_token(req)?;
    verifier
        .verify_id_token(token)
        .await
        .map_err(ReportError::InvalidToken)
}
