//! Repeat intervals and next-occurrence arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::RecurringError;

/// How often a template fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatInterval {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Every calendar month.
    Monthly,
    /// Every calendar year.
    Yearly,
}

impl RepeatInterval {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RepeatInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatInterval {
    type Err = RecurringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(RecurringError::InvalidInterval(s.trim().to_string())),
        }
    }
}

/// A validated repeat interval together with the day field it needs.
///
/// Daily carries no day, weekly carries a day of week (0 = Sunday through
/// 6 = Saturday), monthly and yearly carry the requested day of month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "interval", rename_all = "snake_case")]
pub enum Schedule {
    /// +1 day.
    Daily,
    /// +7 days. The day of week is recorded but does not realign dates.
    Weekly {
        /// 0 = Sunday .. 6 = Saturday.
        day_of_week: u8,
    },
    /// +1 month, clamped to the requested day or the month's last day.
    Monthly {
        /// 1..=31.
        day_of_month: u8,
    },
    /// +1 year, clamped like monthly.
    Yearly {
        /// 1..=31.
        day_of_month: u8,
    },
}

impl Schedule {
    /// Builds a schedule from an interval and its optional day fields.
    ///
    /// # Errors
    ///
    /// Returns `RecurringError::InvalidSchedule` when a required day is
    /// missing, out of range, or a forbidden one is present.
    pub fn from_parts(
        interval: RepeatInterval,
        day_of_month: Option<i32>,
        day_of_week: Option<i32>,
    ) -> Result<Self, RecurringError> {
        match interval {
            RepeatInterval::Daily => {
                if day_of_month.is_some() || day_of_week.is_some() {
                    return Err(RecurringError::InvalidSchedule(
                        "day_of_month and day_of_week must be empty for a daily interval",
                    ));
                }
                Ok(Self::Daily)
            }
            RepeatInterval::Weekly => {
                let day = day_of_week.ok_or(RecurringError::InvalidSchedule(
                    "day_of_week is required for a weekly interval",
                ))?;
                let day = u8::try_from(day).ok().filter(|d| *d <= 6).ok_or(
                    RecurringError::InvalidSchedule("day_of_week must be between 0 and 6"),
                )?;
                if day_of_month.is_some() {
                    return Err(RecurringError::InvalidSchedule(
                        "day_of_month must be empty for a weekly interval",
                    ));
                }
                Ok(Self::Weekly { day_of_week: day })
            }
            RepeatInterval::Monthly | RepeatInterval::Yearly => {
                let day = day_of_month.ok_or(RecurringError::InvalidSchedule(
                    "day_of_month is required for a monthly or yearly interval",
                ))?;
                let day = u8::try_from(day)
                    .ok()
                    .filter(|d| (1..=31).contains(d))
                    .ok_or(RecurringError::InvalidSchedule(
                        "day_of_month must be between 1 and 31",
                    ))?;
                if day_of_week.is_some() {
                    return Err(RecurringError::InvalidSchedule(
                        "day_of_week must be empty for a monthly or yearly interval",
                    ));
                }
                Ok(if interval == RepeatInterval::Monthly {
                    Self::Monthly { day_of_month: day }
                } else {
                    Self::Yearly { day_of_month: day }
                })
            }
        }
    }

    /// The interval without its day field.
    #[must_use]
    pub const fn interval(&self) -> RepeatInterval {
        match self {
            Self::Daily => RepeatInterval::Daily,
            Self::Weekly { .. } => RepeatInterval::Weekly,
            Self::Monthly { .. } => RepeatInterval::Monthly,
            Self::Yearly { .. } => RepeatInterval::Yearly,
        }
    }

    /// Day of month for monthly and yearly schedules.
    #[must_use]
    pub fn day_of_month(&self) -> Option<i32> {
        match self {
            Self::Monthly { day_of_month } | Self::Yearly { day_of_month } => {
                Some(i32::from(*day_of_month))
            }
            _ => None,
        }
    }

    /// Day of week for weekly schedules.
    #[must_use]
    pub fn day_of_week(&self) -> Option<i32> {
        match self {
            Self::Weekly { day_of_week } => Some(i32::from(*day_of_week)),
            _ => None,
        }
    }

    /// The occurrence after `current`, or `None` past the calendar's range.
    #[must_use]
    pub fn next_after(&self, current: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => current.checked_add_days(Days::new(1)),
            Self::Weekly { .. } => current.checked_add_days(Days::new(7)),
            Self::Monthly { day_of_month } => {
                clamp_day(current.checked_add_months(Months::new(1))?, *day_of_month)
            }
            Self::Yearly { day_of_month } => {
                clamp_day(current.checked_add_months(Months::new(12))?, *day_of_month)
            }
        }
    }
}

/// Moves `date` to `day` within its month, or to the month's last day.
fn clamp_day(date: NaiveDate, day: u8) -> Option<NaiveDate> {
    let last = last_day_of_month(date.year(), date.month())?;
    date.with_day(u32::from(day).min(last))
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|d| d.day())
}
