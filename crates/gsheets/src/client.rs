//! Shared handle to the Sheets API.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::auth::CredentialProvider;
use crate::error::{Error, RequestContext, Result};
use crate::spreadsheet::Spreadsheet;
use crate::transport::{ApiRequest, Transport};
use crate::wire::BatchUpdateResponse;

/// Characters left alone in a path segment (RFC 3986 unreserved)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one path segment (a spreadsheet id or an A1 range)
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

pub(crate) fn spreadsheet_path(spreadsheet_id: &str) -> String {
    format!("spreadsheets/{}", encode_segment(spreadsheet_id))
}

pub(crate) fn values_path(spreadsheet_id: &str, a1_range: &str) -> String {
    format!(
        "{}/values/{}",
        spreadsheet_path(spreadsheet_id),
        encode_segment(a1_range)
    )
}

/// Transport plus credentials, shared by every entity of a document.
///
/// Cloning is cheap; clones share the same transport and credentials.
#[derive(Clone)]
pub struct SheetsClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Option<Duration>,
}

impl SheetsClient {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            transport,
            credentials,
            timeout: None,
        }
    }

    /// Client over HTTPS with the default [`crate::http::HttpConfig`]
    #[cfg(feature = "reqwest")]
    pub fn with_credentials(credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let transport = crate::http::HttpTransport::new(crate::http::HttpConfig::default())
            .map_err(|e| Error::from_transport(e, RequestContext::default()))?;
        Ok(Self::new(Arc::new(transport), credentials))
    }

    /// Bound every call, auth included. A call that runs out of time fails
    /// with [`Error::Transient`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Handle for an existing document. Nothing is fetched until
    /// [`Spreadsheet::load_info`].
    pub fn spreadsheet(&self, spreadsheet_id: impl Into<String>) -> Spreadsheet {
        Spreadsheet::new(self.clone(), spreadsheet_id)
    }

    /// Send one request with credentials attached
    pub(crate) async fn call(
        &self,
        mut request: ApiRequest,
        context: &RequestContext,
    ) -> Result<Value> {
        let send = async {
            let header = self
                .credentials
                .auth_header()
                .await
                .map_err(|e| Error::from_auth(e, context.clone()))?;
            request.headers.push((header.name, header.value));

            tracing::debug!(
                method = request.method.as_str(),
                path = %request.path,
                "sheets request"
            );
            self.transport
                .request(request)
                .await
                .map_err(|e| Error::from_transport(e, context.clone()))
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| Error::Transient {
                    message: format!("request timed out after {limit:?}"),
                    status: None,
                    context: context.clone(),
                })?,
            None => send.await,
        }
    }

    /// Send a request and decode the response body
    pub(crate) async fn call_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        context: &RequestContext,
    ) -> Result<T> {
        let body = self.call(request, context).await?;
        decode(body, context)
    }

    /// `spreadsheets.batchUpdate` with the given requests.
    ///
    /// The server applies all requests or none.
    pub(crate) async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Vec<Value>,
        extra: Option<Value>,
        context: &RequestContext,
    ) -> Result<BatchUpdateResponse> {
        let mut body = json!({ "requests": requests });
        if let (Some(Value::Object(extra)), Some(obj)) = (extra, body.as_object_mut()) {
            obj.extend(extra);
        }
        let request =
            ApiRequest::post(format!("{}:batchUpdate", spreadsheet_path(spreadsheet_id)))
                .with_body(body);
        self.call_json(request, context).await
    }
}

impl fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: Value, context: &RequestContext) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| Error::unexpected(format!("could not decode response: {e}"), context))
}
