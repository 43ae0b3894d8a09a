//! # Report Service Module
//!
//! This module exposes the report endpoint and the pipeline behind it.
//! A request is handled as one linear sequence: authenticate the caller,
//! export the fixed collections, assemble the workbook, publish it, and reply
//! with a signed download link.
//!
//! ## Sub-modules:
//! - `auth`: Extracts the bearer token and checks it with the identity provider.
//! - `export`: Reads each collection and flattens its documents into worksheet rows.
//! - `assemble`: Turns the exported sheets into an `.xlsx` workbook.
//! - `publish`: Uploads the workbook and signs a one-hour read URL.
//! - `generate`: The HTTP handler that runs the steps above in order.

mod assemble;
mod auth;
mod export;
mod generate;
mod publish;

use actix_web::web::{route, scope};
use actix_web::Scope;

/// The base path for all report-related API endpoints.
const API_PATH: &str = "/api/reports";

/// Configures and returns the Actix `Scope` for the report routes.
///
/// # Registered Routes:
///
/// *   **`ANY /generate`**:
///     - **Handler**: `generate::process`
///     - **Description**: Requires `Authorization: Bearer <ID token>`. Exports every
///       configured collection into one workbook, stores it under
///       `reports/report-<millis>.xlsx` and answers `{"url", "path"}` with a signed
///       URL valid for one hour. Answers `401` with `{"error"}` for a missing or
///       rejected token and `500` with `{"error"}` for any other failure.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/generate", route().to(generate::process))
}
