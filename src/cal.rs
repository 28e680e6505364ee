use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Minutes in the day-view timeline. Rendered heights are proportional to
/// this (one hour maps to a fixed unit of height; the ratio is the caller's
/// concern).
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// A schedule entry. `end >= start` is enforced where events enter the
/// system (schedules.create); everything in this module assumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub time_label: Option<String>,
}

/// Every whole calendar day the event touches, start day through end day
/// inclusive, ascending. Non-empty for any valid event.
pub fn days_touched(event: &Event) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = event.start.date();
    let last = event.end.date();
    while day <= last {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

/// The events whose day span contains `day`, in input order.
///
/// Linear scan over the full event list. Fine at dashboard scale; bucket
/// events by day first before reusing this against large datasets.
pub fn events_on_day<'a>(events: &'a [Event], day: NaiveDate) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| e.start.date() <= day && day <= e.end.date())
        .collect()
}

/// An event's position on one day's 24-hour timeline, in minutes from that
/// day's 00:00. Clipped to the day: a midnight-spanning event reports only
/// the portion inside `[0, 1440)`, with the clip flags set so the renderer
/// can draw continuation indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSlot {
    pub offset_minutes: i64,
    pub duration_minutes: i64,
    pub clipped_start: bool,
    pub clipped_end: bool,
}

pub fn layout(event: &Event, day: NaiveDate) -> TimelineSlot {
    let day_start = day.and_time(NaiveTime::MIN);
    let raw_start = (event.start - day_start).num_minutes();
    let raw_end = (event.end - day_start).num_minutes();
    let start = raw_start.clamp(0, MINUTES_PER_DAY);
    let end = raw_end.clamp(0, MINUTES_PER_DAY);
    TimelineSlot {
        offset_minutes: start,
        duration_minutes: (end - start).max(0),
        clipped_start: raw_start < 0,
        clipped_end: raw_end > MINUTES_PER_DAY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Month,
    Day,
}

/// The calendar cursor: reference date plus active view. The session owns
/// the single mutable instance; the functions below derive new states and
/// never mutate in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarState {
    pub reference: NaiveDate,
    pub view: ViewMode,
}

impl CalendarState {
    pub fn new(reference: NaiveDate) -> Self {
        Self {
            reference,
            view: ViewMode::Month,
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => 30,
    }
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month; the fallback is unreachable.
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d)
}

fn last_of_month(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), days_in_month(d.year(), d.month())).unwrap_or(d)
}

/// The full Sunday-start weeks covering the month containing `reference`:
/// the Sunday on/before the 1st through the Saturday on/after the last day.
/// Length is always a multiple of 7 and every day of the month appears
/// exactly once.
pub fn visible_days(reference: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(reference);
    let last = last_of_month(reference);
    let start = first - Duration::days(i64::from(first.weekday().num_days_from_sunday()));
    let end = last + Duration::days(i64::from(6 - last.weekday().num_days_from_sunday()));

    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

/// Shifts the reference date by whole months, clamping the day-of-month to
/// the last valid day when the target month is shorter (Jan 31 + 1 month is
/// Feb 28 or 29).
pub fn advance(reference: NaiveDate, delta_months: i32) -> NaiveDate {
    let total = reference.year() * 12 + reference.month0() as i32 + delta_months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = reference.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(reference)
}

/// Clicking a day in the month grid: the cursor moves to that day and the
/// view switches to the day timeline.
pub fn select_day(_state: CalendarState, day: NaiveDate) -> CalendarState {
    CalendarState {
        reference: day,
        view: ViewMode::Day,
    }
}

pub fn set_view(state: CalendarState, view: ViewMode) -> CalendarState {
    CalendarState { view, ..state }
}

/// The event with the minimum start among those starting strictly after
/// `now`. Ties break toward input order.
pub fn next_event<'a>(events: &[&'a Event], now: NaiveDateTime) -> Option<&'a Event> {
    let mut best: Option<&'a Event> = None;
    for e in events {
        if e.start <= now {
            continue;
        }
        match best {
            Some(b) if b.start <= e.start => {}
            _ => best = Some(e),
        }
    }
    best
}

/// One display tag per event per clock tick, replacing ad-hoc overlapping
/// predicates: the next upcoming event is `Upcoming`, everything already
/// over is `Past`, anything containing `now` is `Ongoing`, and the rest
/// (later today but not next) is `Future`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    Past,
    Ongoing,
    Upcoming,
    Future,
}

pub fn classify(event: &Event, now: NaiveDateTime, next_id: Option<&str>) -> EventPhase {
    if next_id == Some(event.id.as_str()) {
        return EventPhase::Upcoming;
    }
    if event.end < now {
        return EventPhase::Past;
    }
    if event.start <= now && now < event.end {
        return EventPhase::Ongoing;
    }
    EventPhase::Future
}
