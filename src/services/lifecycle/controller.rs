use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{ApiError, LifecycleError};
use crate::models::event::{DisplayBucket, Event, EventFilter, EventId};
use crate::models::raffle::{Raffle, RaffleId, RaffleStatus};
use crate::models::settings::LifecycleSettings;
use crate::services::api::Backend;
use crate::services::countdown::{
    CountdownEngine, CountdownEvent, CountdownKey, CountdownState, CountdownStore,
};
use crate::utils::clock::Clock;
use crate::utils::time::{parse_clock, to_millis};

use super::classifier::{classify, classify_raffle};

/// What changed during a [`LifecycleController::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerUpdate {
    /// Remaining time of a running raffle countdown.
    Countdown { key: CountdownKey, remaining_ms: i64 },
    /// The countdown ran out, locally or while the console was not running.
    /// A reconciliation fetch follows.
    Expired { key: CountdownKey },
    /// The event was re-fetched after an expiry.
    Reconciled {
        event_id: EventId,
        bucket: DisplayBucket,
    },
    /// The reconciliation fetch failed; the next refresh retries it.
    ReconcileFailed { event_id: EventId, message: String },
    /// The deadline vanished from the store and the countdown was dropped.
    Cancelled { key: CountdownKey },
}

/// Drives event and raffle transitions against the backend and keeps the
/// raffle countdowns consistent with what the backend reports.
///
/// The cached events are only replaced by successful fetches. Only a raffle
/// the backend reports as started inside an ongoing event can have a
/// countdown, and only one this console started or persisted.
pub struct LifecycleController<B, S, C> {
    backend: B,
    engine: CountdownEngine<S, C>,
    events: Vec<Event>,
    filter: EventFilter,
    pre_roll_ms: u64,
}

/// Result of reconciling one event's raffles.
#[derive(Debug, Default)]
struct Reconciliation {
    /// Keys that should stay tracked.
    keep: Vec<CountdownKey>,
    /// Persisted deadlines found already past.
    expired: Vec<CountdownKey>,
}

impl<B, S, C> LifecycleController<B, S, C>
where
    B: Backend,
    S: CountdownStore,
    C: Clock,
{
    pub fn new(backend: B, store: S, clock: C, settings: &LifecycleSettings) -> Self {
        let engine = CountdownEngine::with_tick_interval(
            store,
            clock,
            Duration::from_millis(settings.tick_interval_ms),
        );

        Self {
            backend,
            engine,
            events: Vec::new(),
            filter: EventFilter::All,
            pre_roll_ms: settings.pre_roll_ms(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn engine(&self) -> &CountdownEngine<S, C> {
        &self.engine
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|event| &event.id == id)
    }

    pub fn filter(&self) -> EventFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
    }

    pub fn bucket(&self, event: &Event) -> DisplayBucket {
        classify(event, self.engine.clock().now_local())
    }

    /// Cached events admitted by the active filter, with their buckets.
    pub fn visible_events(&self) -> Vec<(&Event, DisplayBucket)> {
        let now = self.engine.clock().now_local();
        self.events
            .iter()
            .map(|event| (event, classify(event, now)))
            .filter(|(_, bucket)| self.filter.admits(*bucket))
            .collect()
    }

    /// Live remaining time of a raffle countdown, floored at zero.
    pub fn remaining(&self, event_id: &EventId, raffle_id: &RaffleId) -> Option<i64> {
        self.engine
            .remaining_ms(&CountdownKey::raffle(event_id.clone(), raffle_id.clone()))
    }

    /// Ended raffles of a cached event that have published winners.
    pub fn winners(&self, event_id: &EventId) -> Result<Vec<&Raffle>, LifecycleError> {
        let event = self.cached(event_id)?;
        Ok(event
            .raffles
            .iter()
            .filter(|raffle| classify_raffle(raffle) == RaffleStatus::Ended && raffle.has_winners())
            .collect())
    }

    pub fn next_tick_in(&self) -> Option<Duration> {
        self.engine.next_tick_in()
    }

    /// Fetches every event and reconciles all countdowns against them.
    ///
    /// A persisted deadline that passed while the console was not running is
    /// reconciled here, with one fetch of its event; the returned updates
    /// report those expiries.
    pub fn refresh(&mut self) -> Result<Vec<ControllerUpdate>, LifecycleError> {
        let events = self
            .backend
            .list_events(EventFilter::All)
            .map_err(|err| self.backend_failure(err))?;

        log::debug!("Refreshed {} event(s)", events.len());
        self.events = events;

        let mut keep = BTreeSet::new();
        let mut expired = Vec::new();
        for index in 0..self.events.len() {
            let reconciliation = self.reconcile(index);
            keep.extend(reconciliation.keep);
            expired.extend(reconciliation.expired);
        }

        // Deadlines and slots left behind by events that no longer report a
        // drawing, or are gone altogether.
        let mut tracked: BTreeSet<CountdownKey> = self.engine.store().keys().into_iter().collect();
        tracked.extend(self.engine.tracked_keys());
        for key in tracked.difference(&keep) {
            log::info!("Dropping stale countdown {}", key);
            self.engine.stop(key);
        }

        self.reconcile_expired(expired)
    }

    /// Fetches one event, replaces it in the cache and reconciles its
    /// countdowns. The fetch itself settles any deadline found expired.
    pub fn refresh_event(&mut self, id: &EventId) -> Result<DisplayBucket, LifecycleError> {
        self.fetch_event(id).map(|(bucket, _)| bucket)
    }

    pub fn start_event(&mut self, id: &EventId) -> Result<(), LifecycleError> {
        self.backend
            .start_event(id)
            .map_err(|err| self.backend_failure(err))?;
        log::info!("Event {} started", id);

        self.refresh()?;
        self.filter = EventFilter::Bucket(DisplayBucket::Ongoing);
        Ok(())
    }

    /// Ends an event. Refused while any of its raffles is drawing.
    pub fn end_event(&mut self, id: &EventId) -> Result<(), LifecycleError> {
        let event = self.cached(id)?;
        let drawing = event.has_started_raffle()
            || event.raffles.iter().any(|raffle| {
                raffle.id.as_ref().is_some_and(|raffle_id| {
                    self.engine
                        .is_running(&CountdownKey::raffle(id.clone(), raffle_id.clone()))
                })
            });
        if drawing {
            return Err(LifecycleError::RaffleInProgress(id.to_string()));
        }

        self.backend
            .end_event(id)
            .map_err(|err| self.backend_failure(err))?;
        log::info!("Event {} ended", id);

        self.refresh()?;
        self.filter = EventFilter::Bucket(DisplayBucket::Past);
        Ok(())
    }

    /// Starts a raffle drawing and its countdown of `duration` plus the
    /// pre-roll.
    pub fn start_raffle(
        &mut self,
        event_id: &EventId,
        raffle_id: &RaffleId,
        duration: &str,
    ) -> Result<(), LifecycleError> {
        let event = self.cached(event_id)?;
        if event.raffle(raffle_id).is_none() {
            return Err(LifecycleError::UnknownRaffle {
                event: event_id.to_string(),
                raffle: raffle_id.to_string(),
            });
        }
        let duration = parse_clock(duration.trim())?;

        self.backend
            .start_raffle(event_id, raffle_id)
            .map_err(|err| self.backend_failure(err))?;

        let key = CountdownKey::raffle(event_id.clone(), raffle_id.clone());
        let duration_ms = to_millis(&duration).saturating_add(self.pre_roll_ms);
        self.engine.start(&key, duration_ms);
        log::info!(
            "Raffle {} of event {} started, countdown {} ms",
            raffle_id,
            event_id,
            duration_ms
        );

        self.refresh_event(event_id)?;
        Ok(())
    }

    /// Advances the countdowns and re-fetches every event whose raffle
    /// countdown ran out, at most once per event per poll.
    ///
    /// Only a rejected session is returned as an error; other fetch failures
    /// are reported as [`ControllerUpdate::ReconcileFailed`].
    pub fn poll(&mut self) -> Result<Vec<ControllerUpdate>, LifecycleError> {
        let mut updates = Vec::new();
        let mut expired = Vec::new();

        for event in self.engine.tick() {
            match event {
                CountdownEvent::Tick { key, remaining_ms } => {
                    updates.push(ControllerUpdate::Countdown { key, remaining_ms });
                }
                CountdownEvent::Expired { key } => expired.push(key),
                CountdownEvent::Cancelled { key } => {
                    updates.push(ControllerUpdate::Cancelled { key });
                }
            }
        }

        updates.extend(self.reconcile_expired(expired)?);
        Ok(updates)
    }

    /// Tears down everything tied to the session: timers, persisted
    /// deadlines, cached events and backend credentials.
    pub fn logout(&mut self) {
        self.engine.stop_all();
        self.engine.store_mut().clear_all();
        self.events.clear();
        self.filter = EventFilter::All;
        self.backend.sign_out();
    }

    /// Cancels all timers but keeps persisted deadlines so the next run
    /// resumes them.
    pub fn shutdown(&mut self) {
        self.engine.cancel_all();
    }

    fn fetch_event(
        &mut self,
        id: &EventId,
    ) -> Result<(DisplayBucket, Vec<CountdownKey>), LifecycleError> {
        let event = self
            .backend
            .get_event(id)
            .map_err(|err| self.backend_failure(err))?;

        let index = match self.events.iter().position(|cached| &cached.id == id) {
            Some(index) => {
                self.events[index] = event;
                index
            }
            None => {
                self.events.push(event);
                self.events.len() - 1
            }
        };

        let reconciliation = self.reconcile(index);
        Ok((self.bucket(&self.events[index]), reconciliation.expired))
    }

    /// Reports each expired key and re-fetches its event, once per event.
    ///
    /// Only a rejected session is returned as an error; other fetch failures
    /// become [`ControllerUpdate::ReconcileFailed`].
    fn reconcile_expired(
        &mut self,
        expired: Vec<CountdownKey>,
    ) -> Result<Vec<ControllerUpdate>, LifecycleError> {
        let mut updates = Vec::new();
        let mut fetched = BTreeSet::new();

        for key in expired {
            updates.push(ControllerUpdate::Expired { key: key.clone() });
            let event_id = key.event_id().clone();
            if !fetched.insert(event_id.clone()) {
                continue;
            }

            log::info!("Countdown {} ran out, reconciling event {}", key, event_id);
            match self.fetch_event(&event_id) {
                Ok((bucket, also_expired)) => {
                    updates.extend(
                        also_expired
                            .into_iter()
                            .map(|key| ControllerUpdate::Expired { key }),
                    );
                    updates.push(ControllerUpdate::Reconciled { event_id, bucket });
                }
                Err(LifecycleError::Unauthorized) => return Err(LifecycleError::Unauthorized),
                Err(err) => {
                    log::warn!("Reconciling event {} failed: {}", event_id, err);
                    updates.push(ControllerUpdate::ReconcileFailed {
                        event_id,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(updates)
    }

    fn cached(&self, id: &EventId) -> Result<&Event, LifecycleError> {
        self.event(id)
            .ok_or_else(|| LifecycleError::UnknownEvent(id.to_string()))
    }

    fn backend_failure(&mut self, err: ApiError) -> LifecycleError {
        if err.is_unauthorized() {
            log::warn!("Session rejected by backend, logging out");
            self.logout();
        }
        LifecycleError::from(err)
    }

    /// Brings the countdowns of one cached event in line with its reported
    /// state.
    ///
    /// Only a persisted deadline can put a raffle back on the clock; a raffle
    /// reported as drawing without one is left alone.
    fn reconcile(&mut self, index: usize) -> Reconciliation {
        let now = self.engine.clock().now_local();
        let Self { engine, events, .. } = self;
        let event = &events[index];
        let ongoing = classify(event, now) == DisplayBucket::Ongoing;
        let mut reconciliation = Reconciliation::default();

        for raffle in &event.raffles {
            let Some(raffle_id) = &raffle.id else {
                continue;
            };
            let key = CountdownKey::raffle(event.id.clone(), raffle_id.clone());
            let drawing = ongoing && classify_raffle(raffle) == RaffleStatus::Started;

            if !drawing {
                if engine.state(&key) != CountdownState::Idle
                    || engine.store().get_deadline(&key).is_some()
                {
                    log::info!("Raffle {} is no longer drawing, clearing countdown", key);
                    engine.stop(&key);
                }
                continue;
            }

            reconciliation.keep.push(key.clone());
            match engine.state(&key) {
                // Running, or ran out and waiting for the backend.
                CountdownState::Running { .. } | CountdownState::Expired => {}
                CountdownState::Idle => match engine.resume(&key) {
                    Some(CountdownEvent::Expired { key }) => reconciliation.expired.push(key),
                    Some(_) => {}
                    None => log::debug!("Raffle {} is drawing with no stored deadline", key),
                },
            }
        }

        reconciliation
    }
}
