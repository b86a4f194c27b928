use crate::models::DateWindow;
use crate::scrapers::types::{WeekEnd, WindowMode};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::info;

/// Hour of day (UTC) at which the site's window bounds fall
const WINDOW_HOUR: i64 = 4;

/// Compute the active search window for `now`.
///
/// The calendar date is taken in `now`'s own time zone, so passing
/// `Local::now()` yields the local week. Bounds are that date at 04:00 UTC.
pub fn compute_window<Tz: TimeZone>(now: &DateTime<Tz>, mode: WindowMode) -> DateWindow {
    let today = now.date_naive();

    let (start, end) = match mode {
        WindowMode::Week(week_end) => {
            let sunday = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
            let span = match week_end {
                WeekEnd::Saturday => 6,
                WeekEnd::Sunday => 7,
            };
            (sunday, sunday + Duration::days(span))
        }
        WindowMode::Override { days_back, days_ahead } => {
            (today - Duration::days(days_back), today + Duration::days(days_ahead))
        }
    };

    info!("Search window: {} to {}", start, end);
    DateWindow::new(at_window_hour(start), at_window_hour(end))
}

fn at_window_hour(date: NaiveDate) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) + Duration::hours(WINDOW_HOUR)).and_utc()
}
