use chrono::NaiveDateTime;

use crate::models::event::{DisplayBucket, Event, ServerEventStatus};
use crate::models::raffle::{Raffle, RaffleStatus};

/// Places an event in its display bucket.
///
/// Explicit organizer actions win over the calendar: an ended event is past
/// even before its end time, and a started event is ongoing even before its
/// start. Only planned events are placed by date and time, with both ends of
/// the window inclusive.
pub fn classify(event: &Event, now: NaiveDateTime) -> DisplayBucket {
    match event.status {
        ServerEventStatus::Past => DisplayBucket::Past,
        ServerEventStatus::Current => DisplayBucket::Ongoing,
        ServerEventStatus::Draft => DisplayBucket::Draft,
        ServerEventStatus::Planned => classify_by_time(event, now),
    }
}

fn classify_by_time(event: &Event, now: NaiveDateTime) -> DisplayBucket {
    let (Some(start), Some(end)) = (event.scheduled_start(), event.scheduled_end()) else {
        // Not on the timeline yet.
        return DisplayBucket::Draft;
    };

    if now < start {
        DisplayBucket::Upcoming
    } else if now <= end {
        DisplayBucket::Ongoing
    } else {
        DisplayBucket::Past
    }
}

/// Raffle status as the console should treat it. Published winners end a
/// raffle regardless of the reported status.
pub fn classify_raffle(raffle: &Raffle) -> RaffleStatus {
    raffle.effective_status()
}
