// Property-based tests for clock times
// Ordering, parsing and countdown arithmetic over random inputs

use proptest::prelude::*;

use event_admin::utils::time::{
    compare_clocks, format_remaining, parse_clock, remaining_seconds, to_millis, ClockTime,
};

fn clock_time() -> impl Strategy<Value = ClockTime> {
    (0u8..24, 0u8..60, 0u8..60).prop_map(|(h, m, s)| ClockTime::hms(h, m, s))
}

proptest! {
    /// Property: the comparison is positive exactly when the end comes later
    #[test]
    fn prop_compare_matches_ordering(start in clock_time(), end in clock_time()) {
        let sign = compare_clocks(&start, &end);
        prop_assert_eq!(sign > 0, end.total_seconds() > start.total_seconds());
        prop_assert_eq!(sign == 0, end.total_seconds() == start.total_seconds());
        prop_assert_eq!(compare_clocks(&end, &start), -sign);
    }

    /// Property: a time always equals itself
    #[test]
    fn prop_compare_same_time_is_zero(time in clock_time()) {
        prop_assert_eq!(compare_clocks(&time, &time), 0);
    }

    /// Property: rendering and parsing preserve the written form
    #[test]
    fn prop_parse_accepts_rendered_times(time in clock_time()) {
        let text = time.to_string();
        let parsed = parse_clock(&text).unwrap();
        prop_assert_eq!(parsed, time);
        prop_assert_eq!(parsed.to_string(), text);
    }

    /// Property: out-of-range fields are rejected
    #[test]
    fn prop_parse_rejects_out_of_range(h in 24u8..100, m in 0u8..60) {
        let text = format!("{:02}:{:02}", h, m);
        prop_assert!(parse_clock(&text).is_err());
    }

    /// Property: durations count hours, minutes and seconds
    #[test]
    fn prop_to_millis_counts_every_field(h in 0u8..24, m in 0u8..60, s in 0u8..60) {
        let millis = to_millis(&ClockTime::hms(h, m, s));
        prop_assert_eq!(millis, (u64::from(h) * 3600 + u64::from(m) * 60 + u64::from(s)) * 1000);
    }

    /// Property: remaining time never goes negative and drops partial seconds
    #[test]
    fn prop_remaining_is_floored(ms in -10_000_000i64..10_000_000) {
        let seconds = remaining_seconds(ms);
        if ms <= 0 {
            prop_assert_eq!(seconds, 0);
            prop_assert_eq!(format_remaining(ms), "00:00");
        } else {
            prop_assert!(seconds * 1000 <= ms as u64);
            prop_assert!((seconds + 1) * 1000 > ms as u64);
        }
    }
}
