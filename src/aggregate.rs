use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::loader::Row;

/// One line of the weekly summary.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregate {
    /// `None` collects the rows whose `SnapDate` could not be read.
    pub week_ending_date: Option<NaiveDate>,
    pub valid_sum: f64,
    pub valid_ratio: f64,
    pub total_sum: f64,
    pub total_ratio: f64,
}

/// Dated weeks sort ascending, the undated group goes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum WeekKey {
    Dated(NaiveDate),
    Undated,
}

impl From<Option<NaiveDate>> for WeekKey {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(WeekKey::Undated, WeekKey::Dated)
    }
}

impl From<WeekKey> for Option<NaiveDate> {
    fn from(key: WeekKey) -> Self {
        match key {
            WeekKey::Dated(date) => Some(date),
            WeekKey::Undated => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Sums {
    valid: f64,
    total: f64,
}

impl WeeklyAggregate {
    fn from_sums(key: WeekKey, sums: Sums) -> Self {
        let valid_ratio = if sums.total > 0.0 {
            sums.valid / sums.total
        } else {
            0.0
        };
        Self {
            week_ending_date: key.into(),
            valid_sum: sums.valid,
            valid_ratio,
            total_sum: sums.total,
            total_ratio: 1.0,
        }
    }
}

/// Filters `rows` to `category`, then sums `Volume` per week in total and for `valid_flag`.
///
/// Every week present in the category shows up exactly once, with a zero valid sum
/// when none of its rows carry the flag. Both sentinels compare exactly.
pub fn aggregate<'a, I>(rows: I, category: &str, valid_flag: &str) -> Vec<WeeklyAggregate>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut weeks: BTreeMap<WeekKey, Sums> = BTreeMap::new();
    let mut matched = 0usize;

    for row in rows.into_iter().filter(|r| r.segment3 == category) {
        matched += 1;
        let sums = weeks.entry(row.snap_date.into()).or_default();
        sums.total += row.volume;
        if row.segment4 == valid_flag {
            sums.valid += row.volume;
        }
    }

    tracing::info!(category, matched, weeks = weeks.len(), "aggregated weekly volume");

    weeks
        .into_iter()
        .map(|(key, sums)| WeeklyAggregate::from_sums(key, sums))
        .collect()
}
