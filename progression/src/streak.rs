//! Check-in streaks.

use chrono::NaiveDate;

/// Length of the run of consecutive days ending at the most recent date.
///
/// `dates` must be sorted ascending with at most one entry per day, which is
/// what the ledger's (user, date) uniqueness guarantees.
pub fn consecutive_checkins(dates: &[NaiveDate]) -> u32 {
    let Some(mut current) = dates.last().copied() else {
        return 0;
    };

    let mut count = 1;
    for &previous in dates.iter().rev().skip(1) {
        if current.signed_duration_since(previous).num_days() != 1 {
            break;
        }
        count += 1;
        current = previous;
    }
    count
}
