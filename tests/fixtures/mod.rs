// Test fixtures - reusable test data
// An in-process admin backend and sample drafts shared by the integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use event_admin::error::ApiError;
use event_admin::models::event::{
    Event, EventDraft, EventFilter, EventId, ServerEventStatus, SubEvent, SubEventDraft,
    SubEventId,
};
use event_admin::models::raffle::{
    DrawCode, Participant, Prize, PrizeDraft, PrizeId, Raffle, RaffleDraft, RaffleId,
    RaffleStatus, Winner, WinnerId,
};
use event_admin::services::api::{Backend, ImageKind};

/// Sample instants
pub mod dates {
    use super::*;

    pub fn fair_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    /// Fair day at 11:00, inside the event window
    pub fn fair_morning() -> NaiveDateTime {
        fair_day().and_hms_opt(11, 0, 0).unwrap()
    }
}

/// Sample drafts
pub mod drafts {
    use super::*;

    /// One event with one sub-event and a two-second raffle with one prize
    pub fn quick_raffle_fair() -> EventDraft {
        EventDraft {
            name: "Spring Fair".to_string(),
            date: Some(dates::fair_day()),
            start_time: "10:00".to_string(),
            end_time: "18:00".to_string(),
            short_description: "Food and music".to_string(),
            description: "All day on the square".to_string(),
            address: "Main square".to_string(),
            cover: Some(PathBuf::from("cover.png")),
            sub_events: vec![SubEventDraft {
                name: "Opening".to_string(),
                start_time: "10:00".to_string(),
                end_time: "10:30".to_string(),
            }],
            raffles: vec![RaffleDraft {
                name: "Quick draw".to_string(),
                start_time: "11:00:00".to_string(),
                end_time: "11:30:00".to_string(),
                duration: "00:00:02".to_string(),
                terms: "One ticket per guest".to_string(),
                prizes: vec![PrizeDraft {
                    name: "Bike".to_string(),
                    image: Some(PathBuf::from("bike.jpg")),
                }],
            }],
        }
    }
}

/// Admin backend kept in memory.
///
/// Records are stored the way the server would return them. With
/// `draw_on_fetch` set, fetching an event ends its started raffles and
/// publishes a winner, as the server does once a drawing is over.
#[derive(Default)]
pub struct FakeBackend {
    events: RefCell<Vec<Event>>,
    next_id: Cell<u32>,
    token: RefCell<Option<String>>,
    get_event_calls: Cell<usize>,
    list_calls: Cell<usize>,
    draw_on_fetch: Cell<bool>,
    reject_session: Cell<bool>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds `events`, as after a restart.
    pub fn seeded(events: Vec<Event>) -> Self {
        let backend = Self::default();
        backend.next_id.set(100);
        *backend.events.borrow_mut() = events;
        backend
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn get_event_calls(&self) -> usize {
        self.get_event_calls.get()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn set_draw_on_fetch(&self, enabled: bool) {
        self.draw_on_fetch.set(enabled);
    }

    /// Every later call answers 401.
    pub fn expire_session(&self) {
        self.reject_session.set(true);
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn stored(&self, id: &EventId) -> Option<Event> {
        self.events.borrow().iter().find(|event| &event.id == id).cloned()
    }

    fn next_id(&self) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id.to_string()
    }

    fn guard(&self) -> Result<(), ApiError> {
        if self.reject_session.get() {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }

    fn with_event<T>(
        &self,
        id: &EventId,
        change: impl FnOnce(&mut Event) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        self.guard()?;
        let mut events = self.events.borrow_mut();
        let event = events
            .iter_mut()
            .find(|event| &event.id == id)
            .ok_or_else(|| not_found(id.as_str()))?;
        change(event)
    }

    fn with_raffle<T>(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        change: impl FnOnce(&mut Raffle) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        self.with_event(event_id, |event| {
            let raffle = event
                .raffles
                .iter_mut()
                .find(|raffle| raffle.id.as_ref() == Some(raffle_id))
                .ok_or_else(|| not_found(raffle_id.as_str()))?;
            change(raffle)
        })
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Request {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn unsupported() -> ApiError {
    ApiError::Request {
        status: 501,
        message: "not supported by the fake backend".to_string(),
    }
}

fn draw_winner(raffle: &mut Raffle) {
    raffle.status = RaffleStatus::Ended;
    let prize = raffle.prizes.first();
    raffle.winners = Some(vec![Winner {
        id: WinnerId::new("w1"),
        number: DrawCode::new("0042"),
        prize_id: prize.and_then(|prize| prize.id.clone()),
        prize_name: prize.map(|prize| prize.name.clone()),
        participant: Participant {
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
        },
    }]);
}

impl Backend for FakeBackend {
    fn login(&self, _email: &str, _password: &str) -> Result<String, ApiError> {
        let token = format!("token-{}", self.next_id());
        *self.token.borrow_mut() = Some(token.clone());
        self.reject_session.set(false);
        Ok(token)
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.borrow_mut() = token;
    }

    fn sign_out(&self) {
        *self.token.borrow_mut() = None;
    }

    fn list_events(&self, _filter: EventFilter) -> Result<Vec<Event>, ApiError> {
        self.guard()?;
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.events.borrow().clone())
    }

    fn get_event(&self, id: &EventId) -> Result<Event, ApiError> {
        self.get_event_calls.set(self.get_event_calls.get() + 1);
        let draw = self.draw_on_fetch.get();
        self.with_event(id, |event| {
            if draw {
                event
                    .raffles
                    .iter_mut()
                    .filter(|raffle| raffle.status == RaffleStatus::Started)
                    .for_each(draw_winner);
            }
            Ok(event.clone())
        })
    }

    fn create_event(&self, draft: &EventDraft) -> Result<EventId, ApiError> {
        self.guard()?;
        let id = EventId::new(self.next_id());
        self.events.borrow_mut().push(Event {
            id: id.clone(),
            name: draft.name.clone(),
            date: draft.date,
            start_time: draft.start_time.parse().ok(),
            end_time: draft.end_time.parse().ok(),
            short_description: draft.short_description.clone(),
            description: draft.description.clone(),
            address: draft.address.clone(),
            image: Some("cover.png".to_string()),
            sub_events: Vec::new(),
            raffles: Vec::new(),
            status: ServerEventStatus::Draft,
        });
        Ok(id)
    }

    fn update_event(&self, id: &EventId, draft: &EventDraft) -> Result<(), ApiError> {
        self.with_event(id, |event| {
            event.name = draft.name.clone();
            event.date = draft.date;
            Ok(())
        })
    }

    fn create_sub_event(
        &self,
        event_id: &EventId,
        draft: &SubEventDraft,
    ) -> Result<SubEventId, ApiError> {
        let id = SubEventId::new(self.next_id());
        let start_time = draft.start_time.parse().map_err(|_| unsupported())?;
        let end_time = draft.end_time.parse().map_err(|_| unsupported())?;
        self.with_event(event_id, |event| {
            event.sub_events.push(SubEvent {
                id: Some(id.clone()),
                name: draft.name.clone(),
                start_time,
                end_time,
            });
            Ok(id)
        })
    }

    fn update_sub_event(
        &self,
        _event_id: &EventId,
        _sub_event_id: &SubEventId,
        _draft: &SubEventDraft,
    ) -> Result<(), ApiError> {
        Err(unsupported())
    }

    fn delete_sub_event(
        &self,
        event_id: &EventId,
        sub_event_id: &SubEventId,
    ) -> Result<(), ApiError> {
        self.with_event(event_id, |event| {
            event
                .sub_events
                .retain(|sub_event| sub_event.id.as_ref() != Some(sub_event_id));
            Ok(())
        })
    }

    fn create_raffle(&self, event_id: &EventId, draft: &RaffleDraft) -> Result<RaffleId, ApiError> {
        let id = RaffleId::new(self.next_id());
        self.with_event(event_id, |event| {
            event.raffles.push(Raffle {
                id: Some(id.clone()),
                name: draft.name.clone(),
                start_time: draft.start_time.parse().ok(),
                end_time: draft.end_time.parse().ok(),
                duration: draft.duration.parse().ok(),
                terms: draft.terms.clone(),
                prizes: Vec::new(),
                status: RaffleStatus::Waiting,
                winners: None,
            });
            Ok(id)
        })
    }

    fn update_raffle(
        &self,
        _event_id: &EventId,
        _raffle_id: &RaffleId,
        _draft: &RaffleDraft,
    ) -> Result<(), ApiError> {
        Err(unsupported())
    }

    fn delete_raffle(&self, event_id: &EventId, raffle_id: &RaffleId) -> Result<(), ApiError> {
        self.with_event(event_id, |event| {
            event
                .raffles
                .retain(|raffle| raffle.id.as_ref() != Some(raffle_id));
            Ok(())
        })
    }

    fn create_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        draft: &PrizeDraft,
    ) -> Result<PrizeId, ApiError> {
        let id = PrizeId::new(self.next_id());
        self.with_raffle(event_id, raffle_id, |raffle| {
            raffle.prizes.push(Prize {
                id: Some(id.clone()),
                name: draft.name.clone(),
                image: draft
                    .image
                    .as_ref()
                    .map(|path| path.display().to_string()),
            });
            Ok(id)
        })
    }

    fn update_prize(
        &self,
        _event_id: &EventId,
        _raffle_id: &RaffleId,
        _prize_id: &PrizeId,
        _draft: &PrizeDraft,
    ) -> Result<(), ApiError> {
        Err(unsupported())
    }

    fn delete_prize(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        prize_id: &PrizeId,
    ) -> Result<(), ApiError> {
        self.with_raffle(event_id, raffle_id, |raffle| {
            raffle.prizes.retain(|prize| prize.id.as_ref() != Some(prize_id));
            Ok(())
        })
    }

    fn start_event(&self, id: &EventId) -> Result<(), ApiError> {
        self.with_event(id, |event| {
            event.status = ServerEventStatus::Current;
            Ok(())
        })
    }

    fn end_event(&self, id: &EventId) -> Result<(), ApiError> {
        self.with_event(id, |event| {
            event.status = ServerEventStatus::Past;
            Ok(())
        })
    }

    fn start_raffle(&self, event_id: &EventId, raffle_id: &RaffleId) -> Result<(), ApiError> {
        self.with_raffle(event_id, raffle_id, |raffle| {
            if raffle.status != RaffleStatus::Waiting {
                return Err(ApiError::Request {
                    status: 409,
                    message: "raffle already started".to_string(),
                });
            }
            raffle.status = RaffleStatus::Started;
            Ok(())
        })
    }

    fn fetch_image(&self, _kind: ImageKind, name: &str) -> Result<Vec<u8>, ApiError> {
        self.guard()?;
        Ok(name.as_bytes().to_vec())
    }
}
