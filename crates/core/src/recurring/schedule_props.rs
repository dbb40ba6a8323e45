//! Property-based tests for next-occurrence computation.

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;

use super::schedule::Schedule;

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

fn days_in_month(date: NaiveDate) -> u32 {
    (28..=31)
        .rev()
        .find(|d| date.with_day(*d).is_some())
        .unwrap_or(28)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_next_is_strictly_later(date in any_date(), dom in 1u8..=31, dow in 0u8..=6) {
        for schedule in [
            Schedule::Daily,
            Schedule::Weekly { day_of_week: dow },
            Schedule::Monthly { day_of_month: dom },
            Schedule::Yearly { day_of_month: dom },
        ] {
            let next = schedule.next_after(date).unwrap();
            prop_assert!(next > date);
        }
    }

    #[test]
    fn prop_monthly_lands_in_following_month(date in any_date(), dom in 1u8..=31) {
        let next = Schedule::Monthly { day_of_month: dom }.next_after(date).unwrap();
        let months = (next.year() - date.year()) * 12 + next.month() as i32 - date.month() as i32;
        prop_assert_eq!(months, 1);
        prop_assert_eq!(next.day(), u32::from(dom).min(days_in_month(next)));
    }

    #[test]
    fn prop_yearly_keeps_month(date in any_date(), dom in 1u8..=31) {
        let next = Schedule::Yearly { day_of_month: dom }.next_after(date).unwrap();
        prop_assert_eq!(next.year(), date.year() + 1);
        prop_assert_eq!(next.month(), date.month());
        prop_assert_eq!(next.day(), u32::from(dom).min(days_in_month(next)));
    }

    #[test]
    fn prop_weekly_is_seven_days(date in any_date()) {
        let next = Schedule::Weekly { day_of_week: 1 }.next_after(date).unwrap();
        prop_assert_eq!((next - date).num_days(), 7);
    }
}
