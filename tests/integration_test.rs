// Integration tests for the event lifecycle
// Drives a draft submission, the event transitions and a raffle countdown
// through the public API against an in-memory backend

mod fixtures;

use event_admin::error::LifecycleError;
use event_admin::models::event::{DisplayBucket, EventFilter, EventId};
use event_admin::models::raffle::RaffleId;
use event_admin::models::settings::LifecycleSettings;
use event_admin::services::api::Backend;
use event_admin::services::countdown::{
    CountdownKey, CountdownRepository, CountdownState, CountdownStore, PersistentCountdownStore,
};
use event_admin::services::database::Database;
use event_admin::services::drafts::DraftService;
use event_admin::services::lifecycle::{ControllerUpdate, LifecycleController};
use event_admin::services::session::SessionService;
use event_admin::utils::clock::{Clock, ManualClock};
use fixtures::{dates, drafts, FakeBackend};

fn setup_test_db() -> Database {
    let db = Database::new(":memory:").unwrap();
    db.initialize_schema().unwrap();
    db
}

/// Submits the sample draft and returns the created event and raffle ids.
fn submit_fair(backend: &FakeBackend, session: &SessionService<'_>) -> (EventId, RaffleId) {
    let receipt = DraftService::new(backend, session)
        .submit(&drafts::quick_raffle_fair())
        .unwrap();
    assert_eq!(receipt.sub_events_created, 1);
    assert_eq!(receipt.raffles_created, 1);
    assert_eq!(receipt.prizes_created, 1);

    let event = backend.stored(&receipt.event_id).unwrap();
    let raffle_id = event.raffles[0].id.clone().unwrap();
    (receipt.event_id, raffle_id)
}

#[test]
fn test_short_raffle_expires_and_reconciles_once() {
    let db = setup_test_db();
    let session = SessionService::new(&db);
    let backend = FakeBackend::new();
    let (event_id, raffle_id) = submit_fair(&backend, &session);
    assert_eq!(session.load().unwrap().current_event_id, None);

    let clock = ManualClock::at(dates::fair_morning());
    let mut controller = LifecycleController::new(
        backend,
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );

    controller.refresh().unwrap();
    controller.start_event(&event_id).unwrap();
    assert_eq!(
        controller.filter(),
        EventFilter::Bucket(DisplayBucket::Ongoing)
    );

    controller
        .start_raffle(&event_id, &raffle_id, "00:00:02")
        .unwrap();
    assert_eq!(controller.remaining(&event_id, &raffle_id), Some(302_000));

    controller.backend().set_draw_on_fetch(true);
    let fetches_before = controller.backend().get_event_calls();

    // Five minutes of pre-roll plus the two-second drawing, one poll a second.
    let mut updates = Vec::new();
    for _ in 0..303 {
        clock.advance_secs(1);
        updates.extend(controller.poll().unwrap());
    }

    let key = CountdownKey::raffle(event_id.clone(), raffle_id.clone());
    assert_eq!(controller.backend().get_event_calls() - fetches_before, 1);
    assert_eq!(
        updates
            .iter()
            .filter(|update| matches!(update, ControllerUpdate::Expired { .. }))
            .count(),
        1
    );
    assert!(updates.contains(&ControllerUpdate::Reconciled {
        event_id: event_id.clone(),
        bucket: DisplayBucket::Ongoing,
    }));
    assert!(updates.contains(&ControllerUpdate::Countdown {
        key: key.clone(),
        remaining_ms: 0,
    }));

    assert_eq!(controller.engine().store().get_deadline(&key), None);
    assert_eq!(CountdownRepository::new(db.connection()).get(&key).unwrap(), None);
    assert_eq!(controller.engine().state(&key), CountdownState::Idle);
    assert_eq!(controller.next_tick_in(), None);

    let winners = controller.winners(&event_id).unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].name, "Quick draw");
}

#[test]
fn test_expired_countdown_is_not_rearmed_while_backend_lags() {
    let db = setup_test_db();
    let session = SessionService::new(&db);
    let backend = FakeBackend::new();
    let (event_id, raffle_id) = submit_fair(&backend, &session);

    let clock = ManualClock::at(dates::fair_morning());
    let mut controller = LifecycleController::new(
        backend,
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );
    controller.refresh().unwrap();
    controller.start_event(&event_id).unwrap();
    controller
        .start_raffle(&event_id, &raffle_id, "00:00:02")
        .unwrap();

    let fetches_before = controller.backend().get_event_calls();
    clock.advance_secs(303);
    controller.poll().unwrap();

    // The backend still reports the drawing; nothing restarts it locally.
    let key = CountdownKey::raffle(event_id.clone(), raffle_id.clone());
    assert_eq!(controller.engine().state(&key), CountdownState::Expired);
    assert_eq!(controller.engine().store().get_deadline(&key), None);

    controller.refresh().unwrap();
    for _ in 0..10 {
        clock.advance_secs(1);
        assert!(controller.poll().unwrap().is_empty());
    }
    assert_eq!(controller.backend().get_event_calls() - fetches_before, 1);
    assert_eq!(controller.engine().state(&key), CountdownState::Expired);

    // Once the winners are out the slot is released.
    controller.backend().set_draw_on_fetch(true);
    controller.refresh_event(&event_id).unwrap();
    assert_eq!(controller.engine().state(&key), CountdownState::Idle);
}

#[test]
fn test_countdown_resumes_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event-admin.db");
    let clock = ManualClock::at(dates::fair_morning());

    let (event_id, raffle_id, events) = {
        let db = Database::open_file(&path).unwrap();
        db.initialize_schema().unwrap();
        let session = SessionService::new(&db);
        let backend = FakeBackend::new();
        let (event_id, raffle_id) = submit_fair(&backend, &session);

        let mut controller = LifecycleController::new(
            backend,
            PersistentCountdownStore::new(&db),
            clock.clone(),
            &LifecycleSettings::default(),
        );
        controller.refresh().unwrap();
        controller.start_event(&event_id).unwrap();
        controller
            .start_raffle(&event_id, &raffle_id, "00:00:02")
            .unwrap();
        controller.shutdown();

        let events = controller.backend().snapshot();
        (event_id, raffle_id, events)
    };

    clock.advance_secs(100);

    let db = Database::open_file(&path).unwrap();
    db.initialize_schema().unwrap();
    let mut controller = LifecycleController::new(
        FakeBackend::seeded(events),
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );
    controller.refresh().unwrap();

    assert_eq!(controller.remaining(&event_id, &raffle_id), Some(202_000));
    assert!(controller
        .engine()
        .is_running(&CountdownKey::raffle(event_id, raffle_id)));
}

#[test]
fn test_countdown_expired_while_closed_is_reconciled_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event-admin.db");
    let clock = ManualClock::at(dates::fair_morning());

    let (event_id, raffle_id, events) = {
        let db = Database::open_file(&path).unwrap();
        db.initialize_schema().unwrap();
        let session = SessionService::new(&db);
        let backend = FakeBackend::new();
        let (event_id, raffle_id) = submit_fair(&backend, &session);

        let mut controller = LifecycleController::new(
            backend,
            PersistentCountdownStore::new(&db),
            clock.clone(),
            &LifecycleSettings::default(),
        );
        controller.refresh().unwrap();
        controller.start_event(&event_id).unwrap();
        controller
            .start_raffle(&event_id, &raffle_id, "00:00:02")
            .unwrap();
        controller.shutdown();

        let events = controller.backend().snapshot();
        (event_id, raffle_id, events)
    };
    let key = CountdownKey::raffle(event_id.clone(), raffle_id.clone());

    // The deadline passes while the console is closed. The backend has not
    // finished the drawing yet.
    clock.advance_secs(400);

    {
        let db = Database::open_file(&path).unwrap();
        db.initialize_schema().unwrap();
        let mut controller = LifecycleController::new(
            FakeBackend::seeded(events.clone()),
            PersistentCountdownStore::new(&db),
            clock.clone(),
            &LifecycleSettings::default(),
        );

        let updates = controller.refresh().unwrap();
        assert_eq!(
            updates,
            vec![
                ControllerUpdate::Expired { key: key.clone() },
                ControllerUpdate::Reconciled {
                    event_id: event_id.clone(),
                    bucket: DisplayBucket::Ongoing,
                },
            ]
        );
        assert_eq!(controller.backend().get_event_calls(), 1);
        assert_eq!(controller.engine().state(&key), CountdownState::Expired);
        assert_eq!(CountdownRepository::new(db.connection()).get(&key).unwrap(), None);
        controller.shutdown();
    }

    // A later run has nothing left to count down or reconcile.
    let db = Database::open_file(&path).unwrap();
    db.initialize_schema().unwrap();
    let mut controller = LifecycleController::new(
        FakeBackend::seeded(events),
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );
    assert!(controller.refresh().unwrap().is_empty());
    assert_eq!(controller.engine().state(&key), CountdownState::Idle);
    assert_eq!(controller.remaining(&event_id, &raffle_id), None);
    assert_eq!(controller.next_tick_in(), None);

    clock.advance_secs(10);
    assert!(controller.poll().unwrap().is_empty());
    assert_eq!(controller.backend().get_event_calls(), 0);
}

#[test]
fn test_ids_containing_colons_resume_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event-admin.db");
    let clock = ManualClock::at(dates::fair_morning());
    let now = clock.now_ms();

    // Two drawings whose ids run together into the same display key.
    let backend = FakeBackend::new();
    let session_db = setup_test_db();
    let session = SessionService::new(&session_db);
    let mut ids = Vec::new();
    for _ in 0..2 {
        let (event_id, raffle_id) = submit_fair(&backend, &session);
        backend.start_event(&event_id).unwrap();
        backend.start_raffle(&event_id, &raffle_id).unwrap();
        ids.push(event_id);
    }
    let mut events = backend.snapshot();
    let renamed = [("ev:7", "1"), ("ev", "7:1")];
    for (event, (event_id, raffle_id)) in events.iter_mut().zip(renamed) {
        assert!(ids.contains(&event.id));
        event.id = EventId::new(event_id);
        event.raffles[0].id = Some(RaffleId::new(raffle_id));
    }
    let first = CountdownKey::raffle(EventId::new("ev:7"), RaffleId::new("1"));
    let second = CountdownKey::raffle(EventId::new("ev"), RaffleId::new("7:1"));

    {
        let db = Database::open_file(&path).unwrap();
        db.initialize_schema().unwrap();
        let mut store = PersistentCountdownStore::new(&db);
        store.set_deadline(&first, now + 60_000);
        store.set_deadline(&second, now + 90_000);
    }

    let db = Database::open_file(&path).unwrap();
    db.initialize_schema().unwrap();
    let mut controller = LifecycleController::new(
        FakeBackend::seeded(events),
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );
    assert!(controller.refresh().unwrap().is_empty());

    assert_eq!(controller.engine().remaining_ms(&first), Some(60_000));
    assert_eq!(controller.engine().remaining_ms(&second), Some(90_000));
    assert_eq!(controller.engine().store().keys().len(), 2);

    clock.advance_secs(30);
    controller.refresh().unwrap();
    assert_eq!(controller.engine().running_keys(), vec![second.clone(), first.clone()]);
    assert_eq!(controller.engine().remaining_ms(&first), Some(30_000));
}

#[test]
fn test_end_event_after_drawing() {
    let db = setup_test_db();
    let session = SessionService::new(&db);
    let backend = FakeBackend::new();
    let (event_id, raffle_id) = submit_fair(&backend, &session);

    let clock = ManualClock::at(dates::fair_morning());
    let mut controller = LifecycleController::new(
        backend,
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );
    controller.refresh().unwrap();
    controller.start_event(&event_id).unwrap();
    controller
        .start_raffle(&event_id, &raffle_id, "00:00:02")
        .unwrap();

    assert!(matches!(
        controller.end_event(&event_id),
        Err(LifecycleError::RaffleInProgress(_))
    ));

    controller.backend().set_draw_on_fetch(true);
    clock.advance_secs(302);
    controller.poll().unwrap();
    controller.end_event(&event_id).unwrap();

    assert_eq!(
        controller.filter(),
        EventFilter::Bucket(DisplayBucket::Past)
    );
    let visible = controller.visible_events();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].0.id, event_id);
    assert_eq!(visible[0].1, DisplayBucket::Past);
}

#[test]
fn test_rejected_session_clears_local_state() {
    let db = setup_test_db();
    let session = SessionService::new(&db);
    session.save_login("tok", "ops@example.com").unwrap();
    let backend = FakeBackend::new();
    let (event_id, raffle_id) = submit_fair(&backend, &session);

    let clock = ManualClock::at(dates::fair_morning());
    let mut controller = LifecycleController::new(
        backend,
        PersistentCountdownStore::new(&db),
        clock.clone(),
        &LifecycleSettings::default(),
    );
    controller.refresh().unwrap();
    controller.start_event(&event_id).unwrap();
    controller
        .start_raffle(&event_id, &raffle_id, "00:00:05")
        .unwrap();

    controller.backend().expire_session();
    clock.advance_secs(305);
    let err = controller.poll().unwrap_err();
    assert!(matches!(err, LifecycleError::Unauthorized));

    assert!(controller.engine().store().keys().is_empty());
    assert!(CountdownRepository::new(db.connection())
        .get_all()
        .unwrap()
        .is_empty());
    assert!(controller.events().is_empty());
    assert_eq!(controller.backend().token(), None);
}
