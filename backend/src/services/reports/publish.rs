//! Uploads a finished workbook and hands back a time-limited read link.

use crate::clients::storage::ArtifactStore;
use crate::error::ReportError;
use crate::xlsx::XLSX_CONTENT_TYPE;
use chrono::{DateTime, Utc};
use common::model::report::ReportLink;
use log::info;
use std::time::Duration;

/// Lifetime of the signed read link.
pub(crate) const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Object path for a report generated at `millis` since the Unix epoch.
pub(crate) fn report_path(millis: i64) -> String {
    format!("reports/report-{}.xlsx", millis)
}

/// Store `bytes` under a timestamped path and sign a read link for it.
///
/// Nothing is signed when the upload fails.
pub(crate) async fn publish(
    store: &dyn ArtifactStore,
    bytes: Vec<u8>,
    now: DateTime<Utc>,
) -> Result<ReportLink, ReportError> {
    let path = report_path(now.timestamp_millis());
    let size = bytes.len();

    store.upload(&path, bytes, XLSX_CONTENT_TYPE).await?;
    info!("Uploaded {} ({} bytes)", path, size);

    let url = store.signed_read_url(&path, SIGNED_URL_TTL).await?;
    Ok(ReportLink { url, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::testing::FakeArtifactStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_709_285_400_123).unwrap()
    }

    #[test]
    fn test_report_path() {
        assert_eq!(report_path(1_709_285_400_123), "reports/report-1709285400123.xlsx");
    }

    #[actix_rt::test]
    async fn test_publish_uploads_then_signs() {
        let store = FakeArtifactStore::new();
        let link = publish(&store, b"PK\x03\x04".to_vec(), now()).await.unwrap();

        assert_eq!(link.path, "reports/report-1709285400123.xlsx");
        assert_eq!(
            link.url,
            "https://storage.example.com/reports/report-1709285400123.xlsx?X-Goog-Expires=3600"
        );

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, link.path);
        assert_eq!(uploads[0].content_type, XLSX_CONTENT_TYPE);
        assert_eq!(uploads[0].bytes, b"PK\x03\x04");

        let signed = store.signed.lock().unwrap();
        assert_eq!(*signed, vec![(link.path.clone(), SIGNED_URL_TTL)]);
    }

    #[actix_rt::test]
    async fn test_failed_upload_is_not_signed() {
        let store = FakeArtifactStore::failing_upload();
        let err = publish(&store, vec![1, 2, 3], now()).await.unwrap_err();
        assert!(matches!(err, ReportError::Storage(_)));
        assert!(store.signed.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_failed_signing_is_an_error() {
        let store = FakeArtifactStore::failing_sign();
        let err = publish(&store, vec![1, 2, 3], now()).await.unwrap_err();
        assert!(matches!(err, ReportError::Storage(_)));
        assert_eq!(store.upload_count(), 1);
    }
}
