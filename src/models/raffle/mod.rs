//! Raffle, prize and winner records.
//!
//! A raffle is a timed prize drawing inside an event. The backend decides
//! when it is over and who won; the client only tracks the countdown.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::event::{ordered_times, parse_field, require};
use super::opaque_id;
use crate::error::ValidationError;
use crate::utils::time::{wall, ClockTime};

opaque_id!(
    /// Server-assigned raffle identifier.
    RaffleId
);

opaque_id!(
    /// Server-assigned prize identifier.
    PrizeId
);

opaque_id!(
    /// Server-assigned winner record identifier.
    WinnerId
);

opaque_id!(
    /// Number or code drawn for a winning ticket.
    DrawCode
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RaffleStatus {
    #[default]
    Waiting,
    Started,
    #[serde(alias = "end", alias = "finished")]
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    #[serde(default)]
    pub id: Option<PrizeId>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default, alias = "name")]
    pub first_name: String,
    #[serde(default, alias = "surname")]
    pub last_name: String,
}

impl Participant {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawWinner")]
pub struct Winner {
    pub id: WinnerId,
    pub number: DrawCode,
    pub prize_id: Option<PrizeId>,
    pub prize_name: Option<String>,
    pub participant: Participant,
}

/// Winner as sent by the backend, with the prize either flattened into
/// `prizeId`/`prizeName` or nested under `prize`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWinner {
    id: WinnerId,
    #[serde(alias = "code", alias = "ticket")]
    number: DrawCode,
    #[serde(default)]
    prize_id: Option<PrizeId>,
    #[serde(default)]
    prize_name: Option<String>,
    #[serde(default)]
    prize: Option<WinnerPrize>,
    #[serde(default, alias = "user")]
    participant: Participant,
}

#[derive(Deserialize)]
struct WinnerPrize {
    #[serde(default)]
    id: Option<PrizeId>,
    #[serde(default)]
    name: Option<String>,
}

impl From<RawWinner> for Winner {
    fn from(raw: RawWinner) -> Self {
        let (nested_id, nested_name) = match raw.prize {
            Some(prize) => (prize.id, prize.name),
            None => (None, None),
        };

        Self {
            id: raw.id,
            number: raw.number,
            prize_id: raw.prize_id.or(nested_id),
            prize_name: raw.prize_name.or(nested_name),
            participant: raw.participant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    #[serde(default)]
    pub id: Option<RaffleId>,
    pub name: String,
    #[serde(default, alias = "start", deserialize_with = "wall::optional_clock")]
    pub start_time: Option<ClockTime>,
    #[serde(default, alias = "end", deserialize_with = "wall::optional_clock")]
    pub end_time: Option<ClockTime>,
    #[serde(default)]
    pub duration: Option<ClockTime>,
    #[serde(default, alias = "rule")]
    pub terms: String,
    #[serde(default)]
    pub prizes: Vec<Prize>,
    #[serde(default, alias = "raffleStatus")]
    pub status: RaffleStatus,
    #[serde(default)]
    pub winners: Option<Vec<Winner>>,
}

impl Raffle {
    pub fn has_winners(&self) -> bool {
        self.winners.as_ref().is_some_and(|winners| !winners.is_empty())
    }

    /// Published winners close a raffle even if its status lags behind.
    pub fn effective_status(&self) -> RaffleStatus {
        if self.status == RaffleStatus::Ended || self.has_winners() {
            RaffleStatus::Ended
        } else {
            self.status
        }
    }

    pub fn prize(&self, id: &PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|prize| prize.id.as_ref() == Some(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrizeDraft {
    pub name: String,
    pub image: Option<PathBuf>,
}

impl PrizeDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("prize name", &self.name)?;
        if self.image.is_none() {
            return Err(ValidationError::Missing {
                field: "prize image",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RaffleDraft {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    #[serde(alias = "rule")]
    pub terms: String,
    pub prizes: Vec<PrizeDraft>,
}

impl RaffleDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("raffle name", &self.name)?;
        self.times()?;
        self.parsed_duration()?;
        for prize in &self.prizes {
            prize.validate()?;
        }
        Ok(())
    }

    pub fn times(&self) -> Result<(ClockTime, ClockTime), ValidationError> {
        ordered_times(
            format!("raffle '{}'", self.name.trim()),
            ("raffle start time", &self.start_time),
            ("raffle end time", &self.end_time),
        )
    }

    /// The drawing length, which must be written as `HH:MM:SS` and be
    /// longer than zero.
    pub fn parsed_duration(&self) -> Result<ClockTime, ValidationError> {
        let duration = parse_field("raffle duration", &self.duration)?;
        let context = format!("raffle '{}'", self.name.trim());
        if !duration.has_seconds() {
            return Err(ValidationError::Invalid {
                context,
                message: "duration must be written as HH:MM:SS".to_string(),
            });
        }
        if duration.total_seconds() == 0 {
            return Err(ValidationError::Invalid {
                context,
                message: "duration must be longer than zero".to_string(),
            });
        }
        Ok(duration)
    }
}
