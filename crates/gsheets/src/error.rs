//! Error types for the Sheets client.

use std::fmt;

use thiserror::Error;

use crate::auth::AuthError;
use crate::transport::TransportError;

/// Where a failed operation was pointed at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub spreadsheet_id: String,
    pub sheet_id: Option<i64>,
    pub range: Option<String>,
}

impl RequestContext {
    pub fn spreadsheet(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_id: None,
            range: None,
        }
    }

    pub fn with_sheet(mut self, sheet_id: i64) -> Self {
        self.sheet_id = Some(sheet_id);
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spreadsheet {}", self.spreadsheet_id)?;
        if let Some(sheet_id) = self.sheet_id {
            write!(f, ", sheet {sheet_id}")?;
        }
        if let Some(range) = &self.range {
            write!(f, ", range {range}")?;
        }
        Ok(())
    }
}

/// Errors returned by the client.
///
/// Server failures are classified by HTTP status; local checks that fail
/// before anything is sent surface as [`Error::Validation`] or [`Error::Usage`].
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials missing, expired or lacking permission (401/403)
    #[error("authorization failed ({context}): {message}")]
    Auth {
        message: String,
        context: RequestContext,
    },

    /// The document, sheet or range does not exist (404)
    #[error("not found ({context}): {message}")]
    NotFound {
        message: String,
        context: RequestContext,
    },

    /// Rejected input: bad range, bad rule, duplicate title, out of bounds
    #[error(
        "validation failed{}: {message}",
        .context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default()
    )]
    Validation {
        message: String,
        context: Option<RequestContext>,
    },

    /// Concurrent modification detected (409/412 or optimistic check)
    #[error("conflict ({context}): {message}")]
    Conflict {
        message: String,
        context: RequestContext,
    },

    /// Network failure, timeout, rate limit or 5xx; safe to retry
    #[error("transient failure ({context}): {message}")]
    Transient {
        message: String,
        status: Option<u16>,
        context: RequestContext,
    },

    /// The API was called in a way that cannot work, e.g. reading a cell
    /// that was never loaded or saving a row after the sheet changed shape
    #[error("usage error: {0}")]
    Usage(String),

    /// The server answered with something this client cannot decode
    #[error("unexpected response ({context}): {message}")]
    UnexpectedResponse {
        message: String,
        context: RequestContext,
    },
}

/// Coarse error category, convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    NotFound,
    Validation,
    Conflict,
    Transient,
    Usage,
    UnexpectedResponse,
}

impl Error {
    /// A local validation failure (nothing was sent)
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            context: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    pub(crate) fn unexpected(message: impl Into<String>, context: &RequestContext) -> Self {
        Error::UnexpectedResponse {
            message: message.into(),
            context: context.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth { .. } => ErrorKind::Auth,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Transient { .. } => ErrorKind::Transient,
            Error::Usage(_) => ErrorKind::Usage,
            Error::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    /// The request context, when the error came from a remote call
    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            Error::Auth { context, .. }
            | Error::NotFound { context, .. }
            | Error::Conflict { context, .. }
            | Error::Transient { context, .. }
            | Error::UnexpectedResponse { context, .. } => Some(context),
            Error::Validation { context, .. } => context.as_ref(),
            Error::Usage(_) => None,
        }
    }

    /// Classify a transport failure by HTTP status
    pub fn from_transport(err: TransportError, context: RequestContext) -> Self {
        let message = match &err.reason {
            Some(reason) => format!("{} [{}]", err.message, reason),
            None => err.message.clone(),
        };
        match err.status {
            None => Error::Transient {
                message,
                status: None,
                context,
            },
            Some(401) | Some(403) => Error::Auth { message, context },
            Some(404) => Error::NotFound { message, context },
            Some(409) | Some(412) => Error::Conflict { message, context },
            Some(status @ 429) | Some(status @ 500..=599) => Error::Transient {
                message,
                status: Some(status),
                context,
            },
            Some(400..=499) => Error::Validation {
                message,
                context: Some(context),
            },
            Some(status) => Error::UnexpectedResponse {
                message: format!("HTTP {status}: {message}"),
                context,
            },
        }
    }

    pub(crate) fn from_auth(err: AuthError, context: RequestContext) -> Self {
        Error::Auth {
            message: err.to_string(),
            context,
        }
    }
}

impl From<gsheets_core::Error> for Error {
    fn from(err: gsheets_core::Error) -> Self {
        Error::validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
