//! Error taxonomy shared by the models, the API client and the lifecycle
//! controller.
//!
//! Validation errors stay at the form layer, API errors describe a failed
//! backend call, and lifecycle errors are what the controller hands back to
//! its caller. Database and configuration plumbing uses `anyhow` instead.

use std::collections::BTreeMap;

use thiserror::Error;

/// A time string that does not match `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time '{input}': expected HH:MM or HH:MM:SS")]
pub struct TimeFormatError {
    pub input: String,
}

impl TimeFormatError {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Client-side field and ordering checks. These block submission and are
/// never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field}: {source}")]
    Format {
        field: &'static str,
        #[source]
        source: TimeFormatError,
    },

    #[error("{context}: end time {end} must be after start time {start}")]
    EndNotAfterStart {
        context: String,
        start: String,
        end: String,
    },

    #[error("{context}: {message}")]
    Invalid { context: String, message: String },
}

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401. The session is no longer valid.
    #[error("authentication required")]
    Unauthorized,

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// Any non-success HTTP status other than 401.
    #[error("request failed with HTTP {status}: {message}")]
    Request { status: u16, message: String },

    /// The backend answered `success: false`.
    #[error("request rejected: {}", format_field_errors(.errors, .message))]
    Rejected {
        message: Option<String>,
        errors: BTreeMap<String, String>,
    },

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A local file meant for upload could not be read.
    #[error("cannot attach {path}: {message}")]
    Attachment { path: String, message: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

fn format_field_errors(errors: &BTreeMap<String, String>, message: &Option<String>) -> String {
    if errors.is_empty() {
        return message
            .clone()
            .unwrap_or_else(|| "no details given".to_string());
    }

    errors
        .iter()
        .map(|(field, reason)| format!("{field}: {reason}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors surfaced by the lifecycle controller. None of them leave a partial
/// transition behind.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The backend rejected the session; local session state was torn down.
    #[error("session expired, please log in again")]
    Unauthorized,

    #[error(transparent)]
    Api(ApiError),

    #[error("event {0} is not loaded")]
    UnknownEvent(String),

    #[error("raffle {raffle} is not part of event {event}")]
    UnknownRaffle { event: String, raffle: String },

    #[error("event {0} cannot end while its raffle is drawing")]
    RaffleInProgress(String),

    #[error("raffle duration: {0}")]
    InvalidDuration(#[from] TimeFormatError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure of the create-event flow. The draft id stays recorded on any
/// failure after the event was created, so the submission can be resumed.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no draft submission to resume")]
    NothingToResume,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<ApiError> for LifecycleError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => LifecycleError::Unauthorized,
            other => LifecycleError::Api(other),
        }
    }
}
