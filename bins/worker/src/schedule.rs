//! When the next daily batch should start.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// First instant strictly after `now` at `hour:00` local time in `tz`.
///
/// A run hour that falls into a DST gap moves forward to the first valid
/// local hour; an ambiguous one uses the earlier instant.
#[must_use]
pub fn next_run(now: DateTime<Utc>, tz: Tz, hour: u32) -> DateTime<Utc> {
    let mut day = local_today(now, tz);
    loop {
        if let Some(candidate) = local_instant(tz, day, hour)
            && candidate > now
        {
            return candidate;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => return now + Duration::days(1),
        }
    }
}

/// Sleep length until `next`, zero if it already passed.
#[must_use]
pub fn delay_until(now: DateTime<Utc>, next: DateTime<Utc>) -> std::time::Duration {
    (next - now).to_std().unwrap_or_default()
}

/// The local calendar date in `tz` at `now`, used as the batch's "today".
#[must_use]
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

fn local_instant(tz: Tz, day: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    let start = day.and_time(NaiveTime::from_hms_opt(hour, 0, 0)?);
    for shift in 0..3 {
        // Past midnight the shifted hour belongs to the next day.
        let naive = start + Duration::hours(shift);
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => return Some(t.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
            LocalResult::None => {}
        }
    }
    None
}
