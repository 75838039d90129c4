//! Create-event flow.
//!
//! A draft is submitted in order: the event itself, then its sub-events,
//! raffles and their prizes. The created event id is recorded in the session
//! before any child is sent, so an interrupted submission can be finished
//! later without creating the event twice.

use crate::error::DraftError;
use crate::models::event::{Event, EventDraft, EventId};
use crate::models::raffle::{RaffleDraft, RaffleId};
use crate::services::api::Backend;
use crate::services::session::SessionService;

/// What a submission sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReceipt {
    pub event_id: EventId,
    pub resumed: bool,
    pub sub_events_created: usize,
    pub raffles_created: usize,
    pub prizes_created: usize,
}

impl DraftReceipt {
    fn new(event_id: EventId, resumed: bool) -> Self {
        Self {
            event_id,
            resumed,
            sub_events_created: 0,
            raffles_created: 0,
            prizes_created: 0,
        }
    }
}

pub struct DraftService<'a, B> {
    backend: &'a B,
    session: &'a SessionService<'a>,
}

impl<'a, B: Backend> DraftService<'a, B> {
    pub fn new(backend: &'a B, session: &'a SessionService<'a>) -> Self {
        Self { backend, session }
    }

    /// Validates and submits a draft. Finishes the recorded submission
    /// instead when one is still in progress.
    pub fn submit(&self, draft: &EventDraft) -> Result<DraftReceipt, DraftError> {
        draft.validate()?;

        if self.session.load()?.current_event_id.is_some() {
            return self.resume_draft(draft);
        }

        let event_id = self.backend.create_event(draft)?;
        self.session.set_current_event(&event_id)?;
        log::info!("Created event {} from draft '{}'", event_id, draft.name.trim());

        let mut receipt = DraftReceipt::new(event_id.clone(), false);
        self.submit_children(&event_id, draft, None, &mut receipt)?;
        self.session.clear_current_event()?;
        Ok(receipt)
    }

    /// Finishes an interrupted submission: updates the recorded event and
    /// creates only the children the backend does not have yet, matched by
    /// name.
    pub fn resume_draft(&self, draft: &EventDraft) -> Result<DraftReceipt, DraftError> {
        draft.validate()?;

        let event_id = self
            .session
            .load()?
            .current_event_id
            .ok_or(DraftError::NothingToResume)?;
        log::info!("Resuming draft submission for event {}", event_id);

        let existing = self.backend.get_event(&event_id)?;
        self.backend.update_event(&event_id, draft)?;

        let mut receipt = DraftReceipt::new(event_id.clone(), true);
        self.submit_children(&event_id, draft, Some(&existing), &mut receipt)?;
        self.session.clear_current_event()?;
        Ok(receipt)
    }

    /// Drops the record of an unfinished submission.
    pub fn discard(&self) -> Result<(), DraftError> {
        self.session.clear_current_event()?;
        Ok(())
    }

    fn submit_children(
        &self,
        event_id: &EventId,
        draft: &EventDraft,
        existing: Option<&Event>,
        receipt: &mut DraftReceipt,
    ) -> Result<(), DraftError> {
        for sub_event in &draft.sub_events {
            let present = existing.is_some_and(|event| {
                event
                    .sub_events
                    .iter()
                    .any(|known| same_name(&known.name, &sub_event.name))
            });
            if present {
                continue;
            }
            self.backend.create_sub_event(event_id, sub_event)?;
            receipt.sub_events_created += 1;
        }

        for raffle in &draft.raffles {
            let known = existing.and_then(|event| {
                event
                    .raffles
                    .iter()
                    .find(|known| same_name(&known.name, &raffle.name))
            });

            match known.and_then(|known| known.id.clone().map(|id| (id, known))) {
                Some((raffle_id, known)) => {
                    let prizes = known.prizes.iter().map(|prize| prize.name.as_str()).collect();
                    self.submit_prizes(event_id, &raffle_id, raffle, prizes, receipt)?;
                }
                None => {
                    let raffle_id = self.backend.create_raffle(event_id, raffle)?;
                    receipt.raffles_created += 1;
                    self.submit_prizes(event_id, &raffle_id, raffle, Vec::new(), receipt)?;
                }
            }
        }

        Ok(())
    }

    fn submit_prizes(
        &self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        raffle: &RaffleDraft,
        known: Vec<&str>,
        receipt: &mut DraftReceipt,
    ) -> Result<(), DraftError> {
        for prize in &raffle.prizes {
            if known.iter().any(|name| same_name(name, &prize.name)) {
                continue;
            }
            self.backend.create_prize(event_id, raffle_id, prize)?;
            receipt.prizes_created += 1;
        }
        Ok(())
    }
}

fn same_name(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
