//! # Report Generation Service
//!
//! Backend logic for `/api/reports/generate`. Any HTTP method is accepted.
//!
//! ## Workflow
//!
//! 1.  **Authentication**: The bearer token is taken from the `Authorization` header
//!     and verified. Nothing else is contacted when this fails.
//!
//! 2.  **Export**: Every collection in `export::COLLECTIONS` is read in order and
//!     flattened into sheet rows.
//!
//! 3.  **Assembly**: The sheets become one workbook, serialized on a blocking thread.
//!
//! 4.  **Publication**: The workbook is uploaded under `reports/report-<millis>.xlsx`
//!     and a read URL valid for one hour is signed for it.
//!
//! 5.  **HTTP Response**: `200 OK` with `{"url", "path"}`. Authorization failures answer
//!     `401` and any later failure answers `500`, both as `{"error"}`. Partial work is
//!     never returned and an uploaded object is left in place if signing fails.

use super::{assemble, auth, export, publish};
use crate::clients::ReportClients;
use crate::error::ReportError;
use actix_web::{web, HttpRequest, HttpResponse, Responder, ResponseError};
use chrono::Utc;
use common::model::report::ReportLink;
use log::{error, info, warn};
use uuid::Uuid;

/// Actix web handler for `/api/reports/generate`.
///
/// Each request gets a fresh id that prefixes its log lines.
pub async fn process(req: HttpRequest, clients: web::Data<ReportClients>) -> impl Responder {
    let report_id = Uuid::new_v4().to_string();
    match generate_report(&req, &clients, &report_id).await {
        Ok(link) => HttpResponse::Ok().json(link),
        Err(e) => {
            if e.is_unauthorized() {
                warn!("[{}] Rejected report request: {}", report_id, e);
            } else {
                error!("[{}] generate_report error: {}", report_id, e);
            }
            e.error_response()
        }
    }
}

/// Run the pipeline once for an authenticated caller.
async fn generate_report(
    req: &HttpRequest,
    clients: &ReportClients,
    report_id: &str,
) -> Result<ReportLink, ReportError> {
    let caller = auth::authenticate(req, clients.verifier.as_ref()).await?;
    info!(
        "[{}] Report requested by uid {} ({})",
        report_id,
        caller.uid,
        caller.email.as_deref().unwrap_or("no email")
    );

    let sheets =
        export::export_collections(clients.documents.as_ref(), &export::COLLECTIONS).await?;

    let now = Utc::now();
    let bytes = assemble::serialize(assemble::assemble(&sheets, now)).await?;
    info!("[{}] Workbook ready ({} bytes)", report_id, bytes.len());

    let link = publish::publish(clients.artifacts.as_ref(), bytes, now).await?;
    info!("[{}] Report published at {}", report_id, link.path);
    Ok(link)
}

#[cfg(test)]
mod tests {
    use crate::clients::testing::{
        clients, doc, FakeArtifactStore, FakeDocumentStore, FakeVerifier,
    };
    use crate::services::reports::configure_routes;
    use crate::xlsx::XLSX_CONTENT_TYPE;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use common::model::report::{ErrorBody, ReportLink};
    use regex::Regex;
    use serde_json::json;
    use std::io::{Cursor, Read};
    use std::sync::Arc;
    use zip::ZipArchive;

    const TOKEN: &str = "valid-token";
    const URI: &str = "/api/reports/generate";

    struct Fakes {
        verifier: Arc<FakeVerifier>,
        documents: Arc<FakeDocumentStore>,
        artifacts: Arc<FakeArtifactStore>,
    }

    impl Fakes {
        fn new(documents: FakeDocumentStore, artifacts: FakeArtifactStore) -> Self {
            Self {
                verifier: Arc::new(FakeVerifier::accepting(TOKEN)),
                documents: Arc::new(documents),
                artifacts: Arc::new(artifacts),
            }
        }

        fn data(&self) -> web::Data<crate::clients::ReportClients> {
            web::Data::new(clients(
                self.verifier.clone(),
                self.documents.clone(),
                self.artifacts.clone(),
            ))
        }
    }

    async fn call(fakes: &Fakes, req: test::TestRequest) -> (StatusCode, web::Bytes) {
        let app = test::init_service(
            App::new()
                .app_data(fakes.data())
                .service(configure_routes()),
        )
        .await;
        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        (status, test::read_body(resp).await)
    }

    fn sheet_xml(bytes: &[u8], index: usize) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut xml = String::new();
        archive
            .by_name(&format!("xl/worksheets/sheet{}.xml", index))
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    fn shared_strings(bytes: &[u8]) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/sharedStrings.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    /// The shared strings table in index order.
    fn shared_string_list(bytes: &[u8]) -> Vec<String> {
        let item = Regex::new(r"<si><t[^>]*>(.*?)</t></si>").unwrap();
        item.captures_iter(&shared_strings(bytes))
            .map(|c| c[1].to_string())
            .collect()
    }

    /// The text of the shared-string cell at `cell` in `xml`.
    fn text_cell(xml: &str, strings: &[String], cell: &str) -> String {
        let pattern = format!(r#"<c r="{}" t="s"><v>(\d+)</v></c>"#, cell);
        let caps = Regex::new(&pattern).unwrap().captures(xml).unwrap();
        let index: usize = caps[1].parse().unwrap();
        strings[index].clone()
    }

    #[actix_rt::test]
    async fn test_missing_header_is_rejected_before_any_work() {
        let fakes = Fakes::new(FakeDocumentStore::new(), FakeArtifactStore::new());
        let (status, body) = call(&fakes, test::TestRequest::post().uri(URI)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "Missing or invalid Authorization header");
        assert_eq!(fakes.verifier.call_count(), 0);
        assert_eq!(fakes.documents.call_count(), 0);
        assert_eq!(fakes.artifacts.upload_count(), 0);
    }

    #[actix_rt::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let fakes = Fakes::new(FakeDocumentStore::new(), FakeArtifactStore::new());
        let req = test::TestRequest::get()
            .uri(URI)
            .insert_header(("Authorization", format!("Basic {}", TOKEN)));
        let (status, body) = call(&fakes, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "Missing or invalid Authorization header");
        assert_eq!(fakes.verifier.call_count(), 0);
    }

    #[actix_rt::test]
    async fn test_rejected_token_is_unauthorized() {
        let fakes = Fakes::new(FakeDocumentStore::new(), FakeArtifactStore::new());
        let req = test::TestRequest::post()
            .uri(URI)
            .insert_header(("Authorization", "Bearer forged-token"));
        let (status, body) = call(&fakes, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "Invalid ID token");
        assert_eq!(fakes.verifier.call_count(), 1);
        assert_eq!(fakes.documents.call_count(), 0);
        assert_eq!(fakes.artifacts.upload_count(), 0);
    }

    #[actix_rt::test]
    async fn test_generates_and_publishes_report() {
        let documents = FakeDocumentStore::new().with_collection(
            "actividades",
            vec![
                doc("d1", json!({"a": 1})),
                doc("d2", json!({"a": 2, "b": 3})),
            ],
        );
        let fakes = Fakes::new(documents, FakeArtifactStore::new());
        let req = test::TestRequest::post()
            .uri(URI)
            .insert_header(("Authorization", format!("Bearer {}", TOKEN)));
        let (status, body) = call(&fakes, req).await;

        assert_eq!(status, StatusCode::OK);
        let link: ReportLink = serde_json::from_slice(&body).unwrap();
        let path_re = Regex::new(r"^reports/report-\d+\.xlsx$").unwrap();
        assert!(path_re.is_match(&link.path), "unexpected path {}", link.path);
        assert!(link.url.contains(&link.path));
        assert!(link.url.ends_with("X-Goog-Expires=3600"));

        assert_eq!(fakes.documents.call_count(), 5);
        let uploads = fakes.artifacts.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, link.path);
        assert_eq!(uploads[0].content_type, XLSX_CONTENT_TYPE);

        let bytes = &uploads[0].bytes;
        let actividades = sheet_xml(bytes, 1);
        assert!(actividades.contains(r#"<dimension ref="A1:B3"/>"#));
        assert!(actividades.contains(r#"<c r="B2"><v>1</v></c>"#));
        assert!(actividades.contains(r#"<c r="B3"><v>2</v></c>"#));
        assert!(!actividades.contains(r#"r="C"#));

        for index in 2..=5 {
            let xml = sheet_xml(bytes, index);
            assert!(
                xml.contains(r#"<dimension ref="A1:A1"/>"#),
                "sheet{} not a placeholder",
                index
            );
        }

        let strings = shared_string_list(bytes);
        assert_eq!(text_cell(&actividades, &strings, "A1"), "id");
        assert_eq!(text_cell(&actividades, &strings, "B1"), "a");
        assert_eq!(text_cell(&actividades, &strings, "A2"), "d1");
        assert_eq!(text_cell(&actividades, &strings, "A3"), "d2");
        for index in 2..=5 {
            let xml = sheet_xml(bytes, index);
            assert_eq!(text_cell(&xml, &strings, "A1"), "(sin datos)");
        }
        assert!(!strings.iter().any(|s| s == "b"));
    }

    #[actix_rt::test]
    async fn test_upload_failure_is_internal_error() {
        let fakes = Fakes::new(FakeDocumentStore::new(), FakeArtifactStore::failing_upload());
        let req = test::TestRequest::post()
            .uri(URI)
            .insert_header(("Authorization", format!("Bearer {}", TOKEN)));
        let (status, body) = call(&fakes, req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body.get("url").is_none());
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert!(fakes.artifacts.signed.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_database_failure_is_internal_error() {
        let fakes = Fakes::new(
            FakeDocumentStore::new().failing_on("productores"),
            FakeArtifactStore::new(),
        );
        let req = test::TestRequest::get()
            .uri(URI)
            .insert_header(("Authorization", format!("Bearer {}", TOKEN)));
        let (status, body) = call(&fakes, req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(body.error.contains("productores"), "unexpected error {}", body.error);
        assert_eq!(fakes.documents.call_count(), 2);
        assert_eq!(fakes.artifacts.upload_count(), 0);
    }
}
