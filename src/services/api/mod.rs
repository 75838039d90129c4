//! Admin API access.
//!
//! The lifecycle controller and the draft flow only talk to [`Backend`];
//! [`HttpBackend`] is the production implementation over blocking reqwest.

mod client;
pub mod dto;

pub use client::HttpBackend;

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;
use crate::models::event::{Event, EventDraft, EventFilter, EventId, SubEventDraft, SubEventId};
use crate::models::raffle::{PrizeDraft, PrizeId, RaffleDraft, RaffleId};

/// Which image store `fetch_image` reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Event,
    Prize,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Event => "event",
            ImageKind::Prize => "prize",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "event" | "cover" => Ok(ImageKind::Event),
            "prize" => Ok(ImageKind::Prize),
            other => Err(format!("unknown image kind '{other}', expected event or prize")),
        }
    }
}

/// Operations of the remote admin API.
///
/// Implementations hold the bearer token themselves; a successful `login`
/// attaches it to every later request until `sign_out`.
#[cfg_attr(test, mockall::automock)]
pub trait Backend {
    /// Exchanges credentials for a token and keeps it for later calls.
    fn login(&self, email: &str, password: &str) -> Result<String, ApiError>;

    /// Reuses a token remembered from an earlier run.
    fn set_token(&self, token: Option<String>);

    /// Drops the credentials held by this client.
    fn sign_out(&self);

    fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, ApiError>;

    fn get_event(&self, id: &EventId) -> Result<Event, ApiError>;

    fn create_event(&self, draft: &EventDraft) -> Result<EventId, ApiError>;

    fn update_event(&self, id: &EventId, draft: &EventDraft) -> Result<(), ApiError>;

    fn create_sub_event(
        &self,
        event_id: &EventId,
        draft: &SubEventDraft,
    ) -> Result<SubEventId, ApiError>;

    fn update_sub_event(
        &self,
        event_id: &EventId,
        sub_event_id: &SubEventId,
        draft: &SubEventDraft,
    ) -> Result<(), ApiError>;

    fn delete_sub_event(&self, event_id: &EventId, sub_event_id: &SubEventId)
        -> Result<(), ApiError>;

    fn create_raffle(&self, event_id: &EventId, draft: &RaffleDraft) -> Result<RaffleId, ApiError>;

    fn update_raffle(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        draft: &RaffleDraft,
    ) -> Result<(), ApiError>;

    fn delete_raffle(&self, event_id: &EventId, raffle_id: &RaffleId) -> Result<(), ApiError>;

    fn create_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        draft: &PrizeDraft,
    ) -> Result<PrizeId, ApiError>;

    fn update_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        prize_id: &PrizeId,
        draft: &PrizeDraft,
    ) -> Result<(), ApiError>;

    fn delete_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        prize_id: &PrizeId,
    ) -> Result<(), ApiError>;

    fn start_event(&self, id: &EventId) -> Result<(), ApiError>;

    fn end_event(&self, id: &EventId) -> Result<(), ApiError>;

    fn start_raffle(&self, event_id: &EventId, raffle_id: &RaffleId) -> Result<(), ApiError>;

    /// Raw bytes of an event cover or prize image.
    fn fetch_image(&self, kind: ImageKind, name: &str) -> Result<Vec<u8>, ApiError>;
}
