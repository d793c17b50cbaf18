//! Request plumbing: credentials, encoding, timeouts and error mapping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::FakeSheets;
use chrono::Utc;
use gsheets::{
    AccessToken, AuthError, BoxFuture, ErrorKind, GetValuesRequestOptions, NewSheet,
    RefreshingCredentials, TokenSource,
};
use pretty_assertions::assert_eq;

const DOC: &str = "abc123";

struct CountingSource {
    calls: AtomicUsize,
    lifetime: chrono::Duration,
    fail: bool,
}

impl CountingSource {
    fn new(lifetime: chrono::Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            lifetime,
            fail: false,
        }
    }
}

impl TokenSource for CountingSource {
    fn fetch_token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail {
                return Err(AuthError("invalid_grant".into()));
            }
            Ok(AccessToken::new(
                format!("token-{n}"),
                Some(Utc::now() + self.lifetime),
            ))
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_transient() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    fake.set_latency(Duration::from_secs(10));
    let client = fake.client().with_timeout(Duration::from_millis(100));

    let err = client.spreadsheet(DOC).load_info().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_ranges_are_encoded_and_key_is_sent() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;
    doc.add_sheet(NewSheet::titled("Q1 Sales").with_grid(10, 2))
        .await
        .unwrap();

    let sheet = doc.sheet_by_title("Q1 Sales").unwrap();
    let values = sheet
        .get_cells_in_range("A1:B2", GetValuesRequestOptions::new())
        .await
        .unwrap();
    assert!(values.is_empty());

    let last = fake.requests().pop().unwrap();
    assert_eq!(
        last.path,
        "spreadsheets/abc123/values/%27Q1%20Sales%27%21A1%3AB2"
    );
    assert_eq!(last.header("x-goog-api-key"), Some("test-key"));
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.client().spreadsheet(DOC);

    for (status, kind) in [
        (401, ErrorKind::Auth),
        (403, ErrorKind::Auth),
        (404, ErrorKind::NotFound),
        (409, ErrorKind::Conflict),
        (400, ErrorKind::Validation),
        (429, ErrorKind::Transient),
        (503, ErrorKind::Transient),
    ] {
        fake.fail_next(status, "injected");
        let err = doc.load_info().await.unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
        assert_eq!(err.is_retryable(), kind == ErrorKind::Transient);
        assert_eq!(err.context().unwrap().spreadsheet_id, DOC);
    }
    doc.load_info().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let creds = Arc::new(RefreshingCredentials::new(CountingSource::new(
        chrono::Duration::hours(1),
    )));
    let client = fake.client_with(creds.clone());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.spreadsheet(DOC).load_info().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(creds.refresh_count(), 1);
    let requests = fake.requests();
    assert_eq!(requests.len(), 8);
    assert!(requests
        .iter()
        .all(|r| r.header("authorization") == Some("Bearer token-1")));
}

#[tokio::test]
async fn test_short_lived_tokens_are_refreshed_per_call() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let creds = Arc::new(RefreshingCredentials::new(CountingSource::new(
        chrono::Duration::seconds(30),
    )));
    let mut doc = fake.client_with(creds.clone()).spreadsheet(DOC);

    doc.load_info().await.unwrap();
    doc.load_info().await.unwrap();
    assert_eq!(creds.refresh_count(), 2);
    let last = fake.requests().pop().unwrap();
    assert_eq!(last.header("authorization"), Some("Bearer token-2"));
}

#[tokio::test]
async fn test_token_failure_sends_nothing() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let source = CountingSource {
        fail: true,
        ..CountingSource::new(chrono::Duration::hours(1))
    };
    let creds = Arc::new(RefreshingCredentials::new(source));
    let mut doc = fake.client_with(creds).spreadsheet(DOC);

    let err = doc.load_info().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(!err.is_retryable());
    assert_eq!(fake.request_count(), 0);
}
