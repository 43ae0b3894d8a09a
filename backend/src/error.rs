//! Errors a report request can end with.
//!
//! Authorization failures map to `401 Unauthorized` with a fixed message.
//! Everything else is a `500 Internal Server Error` carrying the fault's own
//! message. The stage that failed is not reported separately.

use crate::clients::firestore::DatabaseError;
use crate::clients::identity::IdentityError;
use crate::clients::storage::StorageError;
use crate::xlsx::XlsxError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::report::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No `Authorization` header, or one that does not start with `Bearer `.
    #[error("Missing or invalid Authorization header")]
    MissingAuthorization,

    /// The identity provider did not accept the token.
    #[error("Invalid ID token")]
    InvalidToken(#[source] IdentityError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Workbook(#[from] XlsxError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Internal(String),
}

impl ReportError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ReportError::MissingAuthorization | ReportError::InvalidToken(_)
        )
    }
}

impl ResponseError for ReportError {
    fn status_code(&self) -> StatusCode {
        if self.is_unauthorized() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}
