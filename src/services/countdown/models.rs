use std::fmt;

use crate::models::event::EventId;
use crate::models::raffle::RaffleId;

const KEY_SUFFIX: &str = "endTime";
const RAFFLE_SEPARATOR: char = ':';

/// Identity of a countdown entry: an event, optionally narrowed to a raffle.
///
/// Renders as `"<event_id>endTime"` for an event-wide countdown and as
/// `"<event_id>:<raffle_id>endTime"` for a raffle. The rendering is for logs
/// only; storage keeps the two ids in separate columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountdownKey {
    event_id: EventId,
    raffle_id: Option<RaffleId>,
}

impl CountdownKey {
    pub fn event(event_id: EventId) -> Self {
        Self {
            event_id,
            raffle_id: None,
        }
    }

    pub fn raffle(event_id: EventId, raffle_id: RaffleId) -> Self {
        Self {
            event_id,
            raffle_id: Some(raffle_id),
        }
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn raffle_id(&self) -> Option<&RaffleId> {
        self.raffle_id.as_ref()
    }

    pub fn storage_key(&self) -> String {
        match &self.raffle_id {
            Some(raffle_id) => format!(
                "{}{}{}{}",
                self.event_id, RAFFLE_SEPARATOR, raffle_id, KEY_SUFFIX
            ),
            None => format!("{}{}", self.event_id, KEY_SUFFIX),
        }
    }
}

impl fmt::Display for CountdownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Per-key state of the countdown engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// No deadline tracked.
    Idle,
    /// Ticking; `remaining_ms` is the value computed on the last tick.
    Running { remaining_ms: i64 },
    /// Deadline reached. Stays here until the key is stopped or restarted.
    Expired,
}

/// What happened to a key during a tick, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { key: CountdownKey, remaining_ms: i64 },
    /// Emitted exactly once per started or resumed countdown.
    Expired { key: CountdownKey },
    /// The persisted deadline disappeared (cleared by another process or a
    /// logout), so the timer was dropped without expiring.
    Cancelled { key: CountdownKey },
}

impl CountdownEvent {
    pub fn key(&self) -> &CountdownKey {
        match self {
            CountdownEvent::Tick { key, .. }
            | CountdownEvent::Expired { key }
            | CountdownEvent::Cancelled { key } => key,
        }
    }
}
