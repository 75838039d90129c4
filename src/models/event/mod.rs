// Event module
// Event records as served by the admin API, plus the local draft used by the
// create-event flow

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::opaque_id;
use super::raffle::{Raffle, RaffleDraft, RaffleId, RaffleStatus};
use crate::error::ValidationError;
use crate::utils::time::{compare_clocks, parse_clock, wall, ClockTime};

opaque_id!(
    /// Server-assigned event identifier.
    EventId
);

opaque_id!(
    /// Server-assigned sub-event identifier.
    SubEventId
);

/// Explicit lifecycle marker stored by the backend.
///
/// `Planned` is the only marker that leaves the display bucket to the
/// calendar; the others are set by organizer actions and override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "RawEventStatus", into = "String")]
pub enum ServerEventStatus {
    /// Never published.
    #[default]
    Draft,
    /// Published and scheduled, not started by the organizer.
    Planned,
    /// Explicitly started.
    Current,
    /// Explicitly ended.
    Past,
}

impl ServerEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerEventStatus::Draft => "draft",
            ServerEventStatus::Planned => "planned",
            ServerEventStatus::Current => "current",
            ServerEventStatus::Past => "past",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEventStatus {
    Code(i64),
    Name(String),
}

impl TryFrom<RawEventStatus> for ServerEventStatus {
    type Error = String;

    fn try_from(raw: RawEventStatus) -> Result<Self, Self::Error> {
        match raw {
            RawEventStatus::Code(0) => Ok(ServerEventStatus::Draft),
            RawEventStatus::Code(1) => Ok(ServerEventStatus::Planned),
            RawEventStatus::Code(2) => Ok(ServerEventStatus::Current),
            RawEventStatus::Code(3) => Ok(ServerEventStatus::Past),
            RawEventStatus::Code(other) => Err(format!("unknown event status code {other}")),
            RawEventStatus::Name(name) => match name.to_ascii_lowercase().as_str() {
                "draft" | "pending" => Ok(ServerEventStatus::Draft),
                "planned" | "next" => Ok(ServerEventStatus::Planned),
                "current" | "today" | "started" => Ok(ServerEventStatus::Current),
                "past" | "ended" => Ok(ServerEventStatus::Past),
                other => Err(format!("unknown event status '{other}'")),
            },
        }
    }
}

impl From<ServerEventStatus> for String {
    fn from(status: ServerEventStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Coarse lifecycle category shown in the event list. Always derived,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBucket {
    Draft,
    Upcoming,
    Ongoing,
    Past,
}

impl DisplayBucket {
    pub const ALL: [DisplayBucket; 4] = [
        DisplayBucket::Draft,
        DisplayBucket::Upcoming,
        DisplayBucket::Ongoing,
        DisplayBucket::Past,
    ];

    /// Value of the `type` query parameter of the list endpoint.
    pub fn list_query(&self) -> &'static str {
        match self {
            DisplayBucket::Draft => "pending",
            DisplayBucket::Upcoming => "next",
            DisplayBucket::Ongoing => "today",
            DisplayBucket::Past => "past",
        }
    }

    /// Only drafts open the edit flow when selected.
    pub fn allows_edit(&self) -> bool {
        matches!(self, DisplayBucket::Draft)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayBucket::Draft => "draft",
            DisplayBucket::Upcoming => "planned",
            DisplayBucket::Ongoing => "current",
            DisplayBucket::Past => "past",
        }
    }
}

impl fmt::Display for DisplayBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Active tab of the event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    Bucket(DisplayBucket),
}

impl EventFilter {
    pub fn admits(&self, bucket: DisplayBucket) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Bucket(wanted) => *wanted == bucket,
        }
    }

    pub fn list_query(&self) -> Option<&'static str> {
        match self {
            EventFilter::All => None,
            EventFilter::Bucket(bucket) => Some(bucket.list_query()),
        }
    }

    /// Parses a tab name as typed on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        let filter = match name.to_ascii_lowercase().as_str() {
            "all" => EventFilter::All,
            "draft" | "drafts" | "pending" => EventFilter::Bucket(DisplayBucket::Draft),
            "planned" | "upcoming" | "next" => EventFilter::Bucket(DisplayBucket::Upcoming),
            "current" | "ongoing" | "today" => EventFilter::Bucket(DisplayBucket::Ongoing),
            "past" => EventFilter::Bucket(DisplayBucket::Past),
            _ => return None,
        };
        Some(filter)
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventFilter::All => f.write_str("all"),
            EventFilter::Bucket(bucket) => bucket.fmt(f),
        }
    }
}

/// A scheduled activity within an event's program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEvent {
    #[serde(default)]
    pub id: Option<SubEventId>,
    pub name: String,
    #[serde(deserialize_with = "wall::clock")]
    pub start_time: ClockTime,
    #[serde(deserialize_with = "wall::clock")]
    pub end_time: ClockTime,
}

/// An event as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default, deserialize_with = "wall::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wall::optional_clock")]
    pub start_time: Option<ClockTime>,
    #[serde(default, deserialize_with = "wall::optional_clock")]
    pub end_time: Option<ClockTime>,
    #[serde(default)]
    pub short_description: String,
    #[serde(default, alias = "longDescription")]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "cover")]
    pub image: Option<String>,
    #[serde(default, alias = "activities")]
    pub sub_events: Vec<SubEvent>,
    #[serde(default)]
    pub raffles: Vec<Raffle>,
    #[serde(default)]
    pub status: ServerEventStatus,
}

impl Event {
    /// Start of the event on the local timeline, if it has been scheduled.
    pub fn scheduled_start(&self) -> Option<NaiveDateTime> {
        Some(self.start_time?.on(self.date?))
    }

    /// End of the event. Falls back to the start when no end time is known.
    pub fn scheduled_end(&self) -> Option<NaiveDateTime> {
        let date = self.date?;
        match self.end_time {
            Some(end) => Some(end.on(date)),
            None => self.scheduled_start(),
        }
    }

    pub fn raffle(&self, id: &RaffleId) -> Option<&Raffle> {
        self.raffles.iter().find(|raffle| raffle.id.as_ref() == Some(id))
    }

    /// True while any raffle of this event is drawing according to the
    /// backend.
    pub fn has_started_raffle(&self) -> bool {
        self.raffles
            .iter()
            .any(|raffle| raffle.effective_status() == RaffleStatus::Started)
    }
}

/// Local, unvalidated input for the create-event flow.
///
/// Times are kept as typed so that malformed input surfaces as a
/// `ValidationError` instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub short_description: String,
    pub description: String,
    pub address: String,
    pub cover: Option<PathBuf>,
    #[serde(alias = "activities")]
    pub sub_events: Vec<SubEventDraft>,
    pub raffles: Vec<RaffleDraft>,
}

impl EventDraft {
    /// Checks the general info and every nested sub-event, raffle and prize.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("event name", &self.name)?;
        if self.date.is_none() {
            return Err(ValidationError::Missing { field: "event date" });
        }
        self.times()?;
        require("short description", &self.short_description)?;
        require("address", &self.address)?;
        if self.cover.is_none() {
            return Err(ValidationError::Missing {
                field: "cover image",
            });
        }

        for sub_event in &self.sub_events {
            sub_event.validate()?;
        }
        for raffle in &self.raffles {
            raffle.validate()?;
        }
        Ok(())
    }

    /// Parsed start and end, with the end strictly after the start.
    pub fn times(&self) -> Result<(ClockTime, ClockTime), ValidationError> {
        ordered_times(
            format!("event '{}'", self.name.trim()),
            ("start time", &self.start_time),
            ("end time", &self.end_time),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubEventDraft {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
}

impl SubEventDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("sub-event name", &self.name)?;
        self.times()?;
        Ok(())
    }

    pub fn times(&self) -> Result<(ClockTime, ClockTime), ValidationError> {
        ordered_times(
            format!("sub-event '{}'", self.name.trim()),
            ("sub-event start time", &self.start_time),
            ("sub-event end time", &self.end_time),
        )
    }
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(())
}

pub(crate) fn parse_field(field: &'static str, value: &str) -> Result<ClockTime, ValidationError> {
    require(field, value)?;
    parse_clock(value.trim()).map_err(|source| ValidationError::Format { field, source })
}

/// Parses both ends of a time window and requires `end > start`.
pub(crate) fn ordered_times(
    context: String,
    start: (&'static str, &str),
    end: (&'static str, &str),
) -> Result<(ClockTime, ClockTime), ValidationError> {
    let start_time = parse_field(start.0, start.1)?;
    let end_time = parse_field(end.0, end.1)?;

    if compare_clocks(&start_time, &end_time) <= 0 {
        return Err(ValidationError::EndNotAfterStart {
            context,
            start: start_time.to_string(),
            end: end_time.to_string(),
        });
    }

    Ok((start_time, end_time))
}
