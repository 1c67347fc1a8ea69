//! Next-run computation for a fixed daily wall-clock time.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Once per calendar day at `time` in `tz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub time: NaiveTime,
    pub tz: Tz,
}

impl DailySchedule {
    pub fn new(time: NaiveTime, tz: Tz) -> Self {
        Self { time, tz }
    }

    /// The first run strictly after `now`.
    ///
    /// When the wall-clock time does not exist that day (DST gap), the run
    /// happens at the first valid instant after the gap. When it exists twice
    /// (DST overlap), the earlier instant is used.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();
        (0..=2)
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .map(|date| self.run_on(date))
            .find(|run| *run > now)
            .unwrap_or_else(|| now + Duration::days(1))
    }

    /// Epoch-millis form of [`Self::next_after`].
    pub fn next_after_ms(&self, now_ms: u64) -> u64 {
        let now = DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default();
        self.next_after(now).timestamp_millis().max(0) as u64
    }

    fn run_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(self.time);
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => self.after_gap(local),
        }
    }

    /// Walk forward minute by minute to the end of a DST gap.
    fn after_gap(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let start = local
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(local);
        (1..=24 * 60)
            .map(|minutes| start + Duration::minutes(minutes))
            .find_map(|candidate| self.tz.from_local_datetime(&candidate).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn daily(time: &str, tz: &str) -> DailySchedule {
        DailySchedule::new(
            NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            tz.parse().unwrap(),
        )
    }

    #[rstest]
    // 12:05 at UTC-8 is 20:05 UTC.
    #[case("2024-06-01T10:00:00Z", "2024-06-01T20:05:00Z")]
    #[case("2024-06-01T20:04:59Z", "2024-06-01T20:05:00Z")]
    // Exactly at the run instant: the next one is tomorrow.
    #[case("2024-06-01T20:05:00Z", "2024-06-02T20:05:00Z")]
    // 23:00 UTC is 15:00 local, already past today's run.
    #[case("2024-06-01T23:00:00Z", "2024-06-02T20:05:00Z")]
    // 05:00 UTC on the 2nd is still the 1st locally.
    #[case("2024-06-02T05:00:00Z", "2024-06-02T20:05:00Z")]
    #[case("2024-12-31T21:00:00Z", "2025-01-01T20:05:00Z")]
    fn fixed_offset_zone(#[case] now: &str, #[case] expected: &str) {
        let schedule = daily("12:05", "Etc/GMT+8");
        assert_eq!(schedule.next_after(utc(now)), utc(expected));
    }

    #[test]
    fn follows_dst_in_named_zone() {
        let schedule = daily("09:00", "Europe/Paris");
        // Winter: CET, UTC+1.
        assert_eq!(
            schedule.next_after(utc("2024-02-01T00:00:00Z")),
            utc("2024-02-01T08:00:00Z")
        );
        // Summer: CEST, UTC+2.
        assert_eq!(
            schedule.next_after(utc("2024-07-01T00:00:00Z")),
            utc("2024-07-01T07:00:00Z")
        );
    }

    #[test]
    fn gap_runs_at_first_valid_instant() {
        // 2024-03-10 02:30 does not exist in Los Angeles; clocks jump to 03:00 PDT.
        let schedule = daily("02:30", "America/Los_Angeles");
        assert_eq!(
            schedule.next_after(utc("2024-03-10T00:00:00Z")),
            utc("2024-03-10T10:00:00Z")
        );
    }

    #[test]
    fn overlap_runs_at_earliest_instant() {
        // 2024-11-03 01:30 happens twice in Los Angeles; first as PDT (UTC-7).
        let schedule = daily("01:30", "America/Los_Angeles");
        assert_eq!(
            schedule.next_after(utc("2024-11-03T07:00:00Z")),
            utc("2024-11-03T08:30:00Z")
        );
    }

    #[test]
    fn consecutive_runs_are_a_day_apart() {
        let schedule = daily("12:05", "Etc/GMT+8");
        let first = schedule.next_after(utc("2024-06-01T00:00:00Z"));
        let second = schedule.next_after(first);
        assert_eq!(second - first, Duration::days(1));
    }

    #[test]
    fn millis_form_matches() {
        let schedule = daily("12:05", "Etc/GMT+8");
        let now = utc("2024-06-01T10:00:00Z");
        assert_eq!(
            schedule.next_after_ms(now.timestamp_millis() as u64),
            utc("2024-06-01T20:05:00Z").timestamp_millis() as u64
        );
    }
}
