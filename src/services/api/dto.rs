//! Wire shapes of the admin API that are not domain records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::event::{Event, SubEventDraft};
use crate::models::raffle::RaffleDraft;
use crate::models::RawId;

/// Every JSON response is wrapped in this envelope. `data` is present on
/// success, `errors` carries per-field reasons when the backend refuses a
/// request, and plain actions only answer with a `message`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// The payload of a successful response.
    pub fn into_data(self) -> Result<T, ApiError> {
        let message = self.message.clone();
        self.into_result()?
            .ok_or_else(|| ApiError::Decode(message.unwrap_or_else(|| "missing data".into())))
    }

    /// Success with an optional payload, or the rejection.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected {
                message: self.message,
                errors: self.errors,
            });
        }
        Ok(self.data)
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// The list endpoint answers either with a bare array or with `{items}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EventList {
    Items { items: Vec<Event> },
    Bare(Vec<Event>),
}

impl EventList {
    pub fn into_events(self) -> Vec<Event> {
        match self {
            EventList::Items { items } => items,
            EventList::Bare(events) => events,
        }
    }
}

/// Any created record; only its identifier is read back.
#[derive(Debug, Deserialize)]
pub struct Created {
    pub id: RawId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEventRequest<'a> {
    pub name: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
}

impl<'a> From<&'a SubEventDraft> for SubEventRequest<'a> {
    fn from(draft: &'a SubEventDraft) -> Self {
        Self {
            name: draft.name.trim(),
            start_time: draft.start_time.trim(),
            end_time: draft.end_time.trim(),
        }
    }
}

/// Prizes are uploaded separately because they carry files.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleRequest<'a> {
    pub name: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
    pub duration: &'a str,
    pub terms: &'a str,
}

impl<'a> From<&'a RaffleDraft> for RaffleRequest<'a> {
    fn from(draft: &'a RaffleDraft) -> Self {
        Self {
            name: draft.name.trim(),
            start_time: draft.start_time.trim(),
            end_time: draft.end_time.trim(),
            duration: draft.duration.trim(),
            terms: draft.terms.trim(),
        }
    }
}
