// Unit tests for the event models
// Backend payload decoding and display bucket placement through the public API

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use test_case::test_case;

use event_admin::models::event::{DisplayBucket, Event, EventFilter, EventId, ServerEventStatus};
use event_admin::models::raffle::RaffleStatus;
use event_admin::services::lifecycle::{classify, classify_raffle};
use event_admin::utils::time::ClockTime;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 5, 10)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn decode(json: &str) -> Event {
    serde_json::from_str(json).unwrap()
}

const FAIR: &str = r#"{
    "id": 17,
    "title": "Spring Fair",
    "date": "2026-05-10",
    "startTime": "10:00",
    "endTime": "18:00",
    "shortDescription": "Food and music",
    "address": "Main square",
    "cover": "fair.png",
    "activities": [
        {"id": 3, "name": "Opening", "startTime": "10:00", "endTime": "10:30"}
    ],
    "raffles": [
        {
            "id": "r1",
            "name": "Main draw",
            "start": "17:00:00",
            "end": "17:30:00",
            "duration": "00:02:00",
            "rule": "One ticket per guest",
            "prizes": [{"id": 8, "name": "Bike", "image": "bike.jpg"}],
            "raffleStatus": "waiting"
        }
    ],
    "status": 1
}"#;

#[test]
fn test_decode_backend_event() {
    let event = decode(FAIR);

    assert_eq!(event.id, EventId::new("17"));
    assert_eq!(event.name, "Spring Fair");
    assert_eq!(event.start_time, Some(ClockTime::hm(10, 0)));
    assert_eq!(event.image.as_deref(), Some("fair.png"));
    assert_eq!(event.sub_events.len(), 1);
    assert_eq!(event.status, ServerEventStatus::Planned);

    let raffle = &event.raffles[0];
    assert_eq!(raffle.duration, Some(ClockTime::hms(0, 2, 0)));
    assert_eq!(raffle.terms, "One ticket per guest");
    assert_eq!(raffle.status, RaffleStatus::Waiting);
    assert_eq!(raffle.prizes[0].name, "Bike");
}

#[test_case("0", ServerEventStatus::Draft ; "code 0")]
#[test_case("3", ServerEventStatus::Past ; "code 3")]
#[test_case("\"pending\"", ServerEventStatus::Draft ; "pending name")]
#[test_case("\"current\"", ServerEventStatus::Current ; "current name")]
#[test_case("\"ENDED\"", ServerEventStatus::Past ; "ended name in capitals")]
fn test_decode_status(raw: &str, expected: ServerEventStatus) {
    let json = format!(r#"{{"id": "1", "name": "Fair", "status": {raw}}}"#);
    assert_eq!(decode(&json).status, expected);
}

#[test]
fn test_decode_rejects_unknown_status() {
    let result = serde_json::from_str::<Event>(r#"{"id": "1", "name": "Fair", "status": 7}"#);
    assert!(result.is_err());
}

#[test_case(9, 59, DisplayBucket::Upcoming ; "before start")]
#[test_case(10, 0, DisplayBucket::Ongoing ; "at start")]
#[test_case(18, 0, DisplayBucket::Ongoing ; "at end")]
#[test_case(18, 1, DisplayBucket::Past ; "after end")]
fn test_planned_event_follows_the_calendar(hour: u32, minute: u32, expected: DisplayBucket) {
    assert_eq!(classify(&decode(FAIR), at(hour, minute)), expected);
}

#[test]
fn test_organizer_actions_override_the_calendar() {
    let mut event = decode(FAIR);

    event.status = ServerEventStatus::Current;
    assert_eq!(classify(&event, at(8, 0)), DisplayBucket::Ongoing);

    event.status = ServerEventStatus::Past;
    assert_eq!(classify(&event, at(12, 0)), DisplayBucket::Past);

    event.status = ServerEventStatus::Draft;
    assert_eq!(classify(&event, at(12, 0)), DisplayBucket::Draft);
}

#[test]
fn test_unscheduled_planned_event_is_a_draft() {
    let event = decode(r#"{"id": "2", "name": "Someday", "status": "planned"}"#);
    assert_eq!(classify(&event, at(12, 0)), DisplayBucket::Draft);
}

#[test]
fn test_published_winners_end_a_raffle() {
    let mut event = decode(FAIR);
    event.raffles[0].status = RaffleStatus::Started;
    assert_eq!(classify_raffle(&event.raffles[0]), RaffleStatus::Started);
    assert!(event.has_started_raffle());

    let winner = r#"{"id": "w1", "code": "0042", "prizeName": "Bike",
                     "user": {"name": "Ana", "surname": "Ruiz"}}"#;
    event.raffles[0].winners = Some(vec![serde_json::from_str(winner).unwrap()]);

    assert_eq!(classify_raffle(&event.raffles[0]), RaffleStatus::Ended);
    assert!(!event.has_started_raffle());
}

#[test]
fn test_iso_payload_places_event_on_the_calendar() {
    let event = decode(
        r#"{
        "id": 21,
        "name": "Harbour Night",
        "date": "2026-05-10T00:00:00.000Z",
        "startTime": "2026-05-10T10:00:00.000Z",
        "endTime": "2026-05-10T18:00:00.000Z",
        "raffles": [{
            "id": 4,
            "name": "Lantern draw",
            "start": "2026-05-10T17:00:00.000Z",
            "end": "2026-05-10T17:30:00.000Z",
            "duration": "00:01:00",
            "raffleStatus": "end",
            "winners": [{"id": 1, "number": 512,
                         "prize": {"id": 8, "name": "Lantern"},
                         "user": {"firstName": "Ana", "lastName": "Ruiz"}}]
        }],
        "status": "planned"
    }"#,
    );

    assert_eq!(event.start_time, Some(ClockTime::hm(10, 0)));
    assert_eq!(classify(&event, at(12, 0)), DisplayBucket::Ongoing);
    assert_eq!(classify(&event, at(18, 1)), DisplayBucket::Past);

    let winner = &event.raffles[0].winners.as_ref().unwrap()[0];
    assert_eq!(winner.prize_name.as_deref(), Some("Lantern"));
    assert_eq!(winner.participant.display_name(), "Ana Ruiz");
}

#[test_case("all", EventFilter::All ; "all")]
#[test_case("Drafts", EventFilter::Bucket(DisplayBucket::Draft) ; "drafts")]
#[test_case("upcoming", EventFilter::Bucket(DisplayBucket::Upcoming) ; "upcoming")]
#[test_case("today", EventFilter::Bucket(DisplayBucket::Ongoing) ; "today")]
#[test_case("past", EventFilter::Bucket(DisplayBucket::Past) ; "past")]
fn test_filter_names(name: &str, expected: EventFilter) {
    assert_eq!(EventFilter::parse(name), Some(expected));
}

#[test]
fn test_filter_admits_only_its_bucket() {
    let filter = EventFilter::Bucket(DisplayBucket::Ongoing);
    for bucket in DisplayBucket::ALL {
        assert_eq!(filter.admits(bucket), bucket == DisplayBucket::Ongoing);
        assert!(EventFilter::All.admits(bucket));
    }
    assert_eq!(EventFilter::parse("tomorrow"), None);
}
