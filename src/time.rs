//! Relative time expressions and the clock they are resolved against
//!
//! All parsing happens in the configured IANA zone and yields UTC instants.

use std::sync::{Arc, OnceLock};

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

/// A time expression could not be understood
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable time expression: {0}")]
pub struct Unparseable(pub String);

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Convert a wall-clock time in `zone` to UTC
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant; times
/// inside a DST gap are pushed forward by an hour.
pub fn localize(zone: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let shifted = naive + Duration::hours(1);
            zone.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Midnight at the start of `date` in `zone`
pub fn start_of_day(zone: &Tz, date: NaiveDate) -> DateTime<Utc> {
    localize(zone, date.and_time(NaiveTime::MIN))
}

/// The local calendar date of `instant` in `zone`
pub fn local_date(zone: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(zone).date_naive()
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*([ap]\.?m\.?)?$")
            .expect("clock time regex must compile")
    })
}

fn time_in_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2}(?::\d{2})?\s*[ap]\.?m\b\.?|\d{1,2}:\d{2})")
            .expect("time token regex must compile")
    })
}

fn at_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bat\s+(\d{1,2}(?::\d{2})?(?:\s*[ap]\.?m\b\.?)?)")
            .expect("at-time regex must compile")
    })
}

fn date_in_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(today|tomorrow|(?:next\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b",
        )
        .expect("date token regex must compile")
    })
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bfor\s+(\d+(?:\.\d+)?)\s*(hours?|hrs?|h|minutes?|mins?|m)\b")
            .expect("duration regex must compile")
    })
}

/// Parses relative time and date expressions in one zone
#[derive(Debug, Clone)]
pub struct TimeParser {
    zone: Tz,
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TimeParser {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> &Tz {
        &self.zone
    }

    /// Parse a clock time and place it on today's date
    ///
    /// Accepts `h:mm AM/PM`, `h:mmam`, `h AM`, `hpm`, `HH:mm` and a bare hour.
    /// A bare hour from 1 to 7 is read as afternoon; 8 to 12 stay as written.
    pub fn parse_time(&self, input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, Unparseable> {
        let time = self.parse_time_of_day(input)?;
        Ok(localize(&self.zone, local_date(&self.zone, now).and_time(time)))
    }

    /// Parse a clock time without attaching a date
    pub fn parse_time_of_day(&self, input: &str) -> Result<NaiveTime, Unparseable> {
        let trimmed = input.trim();
        let unparseable = || Unparseable(input.to_string());
        let caps = time_regex().captures(trimmed).ok_or_else(unparseable)?;

        let mut hour: u32 = caps[1].parse().map_err(|_| unparseable())?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().map_err(|_| unparseable())?,
            None => 0,
        };
        let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());

        match meridiem {
            Some(m) => {
                if !(1..=12).contains(&hour) {
                    return Err(unparseable());
                }
                let pm = m.starts_with('p');
                hour = match (pm, hour) {
                    (false, 12) => 0,
                    (true, 12) => 12,
                    (true, h) => h + 12,
                    (false, h) => h,
                };
            }
            None if caps.get(2).is_none() && (1..=7).contains(&hour) => hour += 12,
            None => {}
        }

        NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(unparseable)
    }

    /// Parse a date token
    ///
    /// `today` is now, `tomorrow` is now plus 24 hours, and a weekday name (with
    /// an optional `next` prefix) is midnight of the nearest strictly-future day
    /// with that name, so naming today's weekday means one week out.
    pub fn parse_date(&self, input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, Unparseable> {
        let token = input.trim().to_lowercase();
        let token = token.strip_prefix("next ").map(str::trim).unwrap_or(&token);

        match token {
            "today" => Ok(now),
            "tomorrow" => Ok(now + Duration::hours(24)),
            name => {
                let target = parse_weekday(name).ok_or_else(|| Unparseable(input.to_string()))?;
                let today = local_date(&self.zone, now);
                let current = today.weekday().num_days_from_sunday() as i64;
                let wanted = target.num_days_from_sunday() as i64;
                let mut ahead = (wanted - current).rem_euclid(7);
                if ahead == 0 {
                    ahead = 7;
                }
                Ok(start_of_day(&self.zone, today + Duration::days(ahead)))
            }
        }
    }

    /// Put `time` on the local date of `date`
    pub fn combine(&self, date: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
        localize(&self.zone, local_date(&self.zone, date).and_time(time))
    }

    /// Find a start instant in free text such as "lunch at 2pm next friday"
    ///
    /// A found time without a date lands on today; a date without a time lands
    /// at 09:00. Returns `None` when the text names neither.
    pub fn extract_start(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = self.extract_time_of_day(text);
        let date = date_in_text_regex()
            .captures(text)
            .and_then(|caps| self.parse_date(&caps[1], now).ok());

        match (date, time) {
            (Some(date), Some(time)) => Some(self.combine(date, time)),
            (Some(date), None) => Some(self.combine(date, NaiveTime::from_hms_opt(9, 0, 0)?)),
            (None, Some(time)) => Some(self.combine(now, time)),
            (None, None) => None,
        }
    }

    /// Find a clock time in free text
    ///
    /// `at <time>` is preferred; otherwise the first token with a meridiem or a
    /// colon is used, so bare numbers like "for 1 hour" are never read as times.
    pub fn extract_time_of_day(&self, text: &str) -> Option<NaiveTime> {
        if let Some(caps) = at_time_regex().captures(text) {
            if let Ok(time) = self.parse_time_of_day(&normalize_meridiem(&caps[1])) {
                return Some(time);
            }
        }
        time_in_text_regex()
            .captures_iter(text)
            .find_map(|caps| self.parse_time_of_day(&normalize_meridiem(&caps[1])).ok())
    }
}

/// Longest event or slot the agent will book or search for
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// Find an explicit duration like "for 90 minutes" or "for an hour", in minutes
///
/// The count is reported as written (saturating at `i64::MAX`); callers bound
/// it with [`duration_from_minutes`].
pub fn extract_duration_minutes(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    if lower.contains("for half an hour") {
        return Some(30);
    }
    if lower.contains("for an hour") {
        return Some(60);
    }

    let caps = duration_regex().captures(&lower)?;
    let amount: f64 = caps[1].parse().ok()?;
    let minutes = if caps[2].starts_with('h') {
        amount * 60.0
    } else {
        amount
    };
    let minutes = minutes.round();
    (minutes.is_finite() && minutes >= 1.0).then_some(minutes as i64)
}

/// A duration of `minutes`, or `None` outside `1..=MAX_DURATION_MINUTES`
pub fn duration_from_minutes(minutes: i64) -> Option<Duration> {
    if !(1..=MAX_DURATION_MINUTES).contains(&minutes) {
        return None;
    }
    Duration::try_minutes(minutes)
}

fn normalize_meridiem(raw: &str) -> String {
    raw.replace('.', "")
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    // Tuesday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
    }

    fn hm(dt: DateTime<Utc>) -> (u32, u32) {
        (dt.hour(), dt.minute())
    }

    #[test]
    fn test_time_formats() {
        let parser = TimeParser::default();
        assert_eq!(hm(parser.parse_time("2:30 PM", now()).unwrap()), (14, 30));
        assert_eq!(hm(parser.parse_time("2:30pm", now()).unwrap()), (14, 30));
        assert_eq!(hm(parser.parse_time("9 AM", now()).unwrap()), (9, 0));
        assert_eq!(hm(parser.parse_time("4 PM", now()).unwrap()), (16, 0));
        assert_eq!(hm(parser.parse_time("4PM", now()).unwrap()), (16, 0));
        assert_eq!(hm(parser.parse_time("4pm", now()).unwrap()), (16, 0));
        assert_eq!(hm(parser.parse_time("16:45", now()).unwrap()), (16, 45));
        assert_eq!(hm(parser.parse_time("12am", now()).unwrap()), (0, 0));
        assert_eq!(hm(parser.parse_time("12pm", now()).unwrap()), (12, 0));
    }

    #[test]
    fn test_bare_hour_heuristic() {
        let parser = TimeParser::default();
        assert_eq!(hm(parser.parse_time("3", now()).unwrap()), (15, 0));
        assert_eq!(hm(parser.parse_time("7", now()).unwrap()), (19, 0));
        assert_eq!(hm(parser.parse_time("8", now()).unwrap()), (8, 0));
        assert_eq!(hm(parser.parse_time("10", now()).unwrap()), (10, 0));
        assert_eq!(hm(parser.parse_time("12", now()).unwrap()), (12, 0));
    }

    #[test]
    fn test_time_is_on_today() {
        let parser = TimeParser::default();
        let t = parser.parse_time("3pm", now()).unwrap();
        assert_eq!(t.date_naive(), now().date_naive());
    }

    #[test]
    fn test_unparseable_time() {
        let parser = TimeParser::default();
        assert!(parser.parse_time("noonish", now()).is_err());
        assert!(parser.parse_time("25:00", now()).is_err());
        assert!(parser.parse_time("13pm", now()).is_err());
    }

    #[test]
    fn test_time_in_zone() {
        let parser = TimeParser::new(chrono_tz::America::New_York);
        // 14:00 EDT on 2026-03-10 is 18:00 UTC
        let t = parser.parse_time("2pm", now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_tomorrow_is_plus_24h() {
        let parser = TimeParser::default();
        assert_eq!(
            parser.parse_date("tomorrow", now()).unwrap(),
            now() + Duration::hours(24)
        );
    }

    #[test]
    fn test_same_weekday_is_next_week() {
        let parser = TimeParser::default();
        let d = parser.parse_date("tuesday", now()).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2026, 3, 17, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_other_weekdays_within_a_week() {
        let parser = TimeParser::default();
        for name in ["monday", "wednesday", "thursday", "friday", "saturday", "sunday"] {
            let d = parser.parse_date(name, now()).unwrap();
            assert!(d > now(), "{name}");
            assert!(d <= now() + Duration::days(7), "{name}");
            assert_eq!(d.weekday(), parse_weekday(name).unwrap(), "{name}");
            assert_eq!(hm(d), (0, 0));
        }
        assert_eq!(
            parser.parse_date("next friday", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 13, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_unparseable_date() {
        let parser = TimeParser::default();
        assert!(parser.parse_date("someday", now()).is_err());
    }

    #[test]
    fn test_extract_start() {
        let parser = TimeParser::default();
        assert_eq!(
            parser.extract_start("meeting with john at 2pm tomorrow", now()),
            Some(Utc.with_ymd_and_hms(2026, 3, 11, 14, 0, 0).unwrap())
        );
        assert_eq!(
            parser.extract_start("meeting with john at 2pm today for 1 hour", now()),
            Some(Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap())
        );
        assert_eq!(
            parser.extract_start("lunch next friday", now()),
            Some(Utc.with_ymd_and_hms(2026, 3, 13, 9, 0, 0).unwrap())
        );
        assert_eq!(
            parser.extract_start("standup 10:15", now()),
            Some(Utc.with_ymd_and_hms(2026, 3, 10, 10, 15, 0).unwrap())
        );
        assert_eq!(parser.extract_start("a meeting for 1 hour", now()), None);
    }

    #[test]
    fn test_extract_duration() {
        assert_eq!(extract_duration_minutes("for 1 hour"), Some(60));
        assert_eq!(extract_duration_minutes("for 2 hours"), Some(120));
        assert_eq!(extract_duration_minutes("for 45 minutes"), Some(45));
        assert_eq!(extract_duration_minutes("for 1.5 hrs"), Some(90));
        assert_eq!(extract_duration_minutes("for half an hour"), Some(30));
        assert_eq!(extract_duration_minutes("for an hour"), Some(60));
        assert_eq!(extract_duration_minutes("at 2pm"), None);
    }

    #[test]
    fn test_huge_duration_is_reported_not_built() {
        assert_eq!(
            extract_duration_minutes("for 99999999999 hours"),
            Some(5_999_999_999_940)
        );
        assert_eq!(duration_from_minutes(5_999_999_999_940), None);
        assert_eq!(duration_from_minutes(i64::MAX), None);
        assert_eq!(duration_from_minutes(0), None);
        assert_eq!(
            duration_from_minutes(MAX_DURATION_MINUTES),
            Some(Duration::days(7))
        );
    }
}
