use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use itertools::Itertools;

use crate::domain::entities::{chapter::Chapter, manga::Manga};

pub const MAX_INTERVAL: i32 = 28;
const DEFAULT_INTERVAL: i32 = 7;
const GRACE_PERIOD: i64 = 1;
const INCREASE_WHEN_OVER: i32 = 10;

/// `(lower, upper)` bounds in milliseconds since epoch, both inclusive
pub type FetchWindow = (i64, i64);

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn to_date(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

/// Manga whose next update falls in this window are due for a library update.
pub fn window(now: DateTime<Utc>) -> FetchWindow {
    let today = start_of_day(now.date_naive());
    let lower = today - Duration::days(GRACE_PERIOD);
    let upper = today + Duration::days(GRACE_PERIOD);

    (lower.timestamp_millis(), upper.timestamp_millis() - 1)
}

/// Median gap in days between the most recent distinct upload days,
/// falling back to fetch days and then to a week.
pub fn calculate_interval(chapters: &[Chapter]) -> i32 {
    let chapter_window = if chapters.len() <= 8 { 3 } else { 10 };

    let upload_dates: Vec<NaiveDate> = chapters
        .iter()
        .filter(|c| c.date_upload > 0)
        .sorted_by(|a, b| b.date_upload.cmp(&a.date_upload))
        .filter_map(|c| to_date(c.date_upload))
        .dedup()
        .take(chapter_window)
        .collect();

    let fetch_dates: Vec<NaiveDate> = chapters
        .iter()
        .sorted_by(|a, b| b.date_fetch.cmp(&a.date_fetch))
        .filter_map(|c| to_date(c.date_fetch))
        .dedup()
        .take(chapter_window)
        .collect();

    let interval = if upload_dates.len() >= 3 {
        median_gap(&upload_dates)
    } else if fetch_dates.len() >= 3 {
        median_gap(&fetch_dates)
    } else {
        DEFAULT_INTERVAL
    };

    interval.clamp(1, MAX_INTERVAL)
}

fn median_gap(dates: &[NaiveDate]) -> i32 {
    let ranges: Vec<i64> = dates
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).num_days())
        .sorted()
        .collect();

    ranges[(ranges.len() - 1) / 2] as i32
}

/// Next time the manga should be checked, in milliseconds since epoch.
pub fn next_update(manga: &Manga, interval: i32, now: DateTime<Utc>, window: FetchWindow) -> i64 {
    if (window.0..=window.1 + 1).contains(&manga.next_update) {
        return manga.next_update;
    }

    let latest = if manga.last_update > 0 {
        manga.last_update
    } else {
        now.timestamp_millis()
    };
    let latest_date = start_of_day(to_date(latest).unwrap_or_else(|| now.date_naive()));
    let time_since_latest = (now - latest_date).num_days() as i32;

    let step = if interval < 0 {
        interval.abs()
    } else {
        increase_interval(interval, time_since_latest)
    };
    let cycle = time_since_latest.div_euclid(step.max(1));

    (latest_date + Duration::days(((cycle + 1) * interval.abs()) as i64)).timestamp_millis()
}

/// Doubles the interval while more than ten checks in a row would have been missed.
fn increase_interval(delta: i32, time_since_latest: i32) -> i32 {
    let mut delta = delta.max(1);
    loop {
        if delta >= MAX_INTERVAL {
            return MAX_INTERVAL;
        }
        let cycle = time_since_latest.div_euclid(delta) + 1;
        if cycle <= INCREASE_WHEN_OVER {
            return delta;
        }
        delta *= 2;
    }
}

/// Returns the `(next_update, fetch_interval)` pair to store for the manga.
///
/// A negative interval was set by the user and is kept as is.
pub fn to_manga_update(
    manga: &Manga,
    chapters: &[Chapter],
    now: DateTime<Utc>,
    fetch_window: FetchWindow,
) -> (i64, i32) {
    let interval = if manga.fetch_interval < 0 {
        manga.fetch_interval
    } else {
        calculate_interval(chapters)
    };

    let current_window = if fetch_window == (0, 0) {
        window(now)
    } else {
        fetch_window
    };

    (
        next_update(manga, interval, now, current_window),
        interval,
    )
}
