//! ICS document generation.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use super::timezone::vtimezone;
use crate::calendar::ConfiguredCalendar;
use crate::event::{Event, Occurrence};

/// Media type of a synthesized document
pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

const PRODUCT_ID: &str = "-//calhub//calhub//EN";

/// Render `events` as one VCALENDAR for `calendar`.
///
/// Events keep their input order. Timed events are expressed in the
/// calendar's time zone, for which a VTIMEZONE block is included.
pub fn synthesize(calendar: &ConfiguredCalendar, events: &[Event]) -> String {
    let mut cal = Calendar::new();
    cal.name(&calendar.id);
    cal.timezone(calendar.timezone.name());

    for event in events {
        cal.push(render_event(event, calendar.timezone));
    }
    let cal = cal.done();

    let timezone = vtimezone(calendar.timezone, &timezone_years(events, calendar.timezone));
    strip_ics_bloat(&cal.to_string(), &timezone)
}

fn render_event(event: &Event, tz: Tz) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.id.to_string());
    ics_event.summary(&event.title);
    ics_event.add_property("DTSTAMP", event.modified.format("%Y%m%dT%H%M%SZ").to_string());

    if let Some(ref desc) = event.description {
        ics_event.description(desc);
    }
    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }
    if let Some(url) = event.url.as_deref().filter(|u| is_valid_url(u)) {
        ics_event.add_property("URL", url);
    }

    match event.occurrence {
        Occurrence::Timed { start, end } => {
            ics_event.append_property(zoned_property("DTSTART", start, tz));
            ics_event.append_property(zoned_property("DTEND", end, tz));
        }
        Occurrence::AllDay { start, .. } => {
            ics_event.append_property(date_property("DTSTART", start));
            if let Some(end) = event.occurrence.exclusive_end_date() {
                ics_event.append_property(date_property("DTEND", end));
            }
        }
    }

    ics_event.done()
}

fn zoned_property(name: &str, instant: DateTime<Utc>, tz: Tz) -> Property {
    let local = instant.with_timezone(&tz);
    let mut prop = Property::new(name, local.format("%Y%m%dT%H%M%S").to_string());
    prop.add_parameter("TZID", tz.name());
    prop
}

fn date_property(name: &str, date: chrono::NaiveDate) -> Property {
    let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    prop
}

/// Only absolute URLs survive. The parser strips tabs and line breaks
/// before parsing, so those are rejected up front.
fn is_valid_url(raw: &str) -> bool {
    !raw.chars().any(char::is_control) && url::Url::parse(raw).is_ok()
}

/// Years touched by timed events in the calendar zone, or the current year
fn timezone_years(events: &[Event], tz: Tz) -> BTreeSet<i32> {
    let mut years: BTreeSet<i32> = events
        .iter()
        .filter_map(|event| match event.occurrence {
            Occurrence::Timed { start, end } => Some([start, end]),
            Occurrence::AllDay { .. } => None,
        })
        .flatten()
        .map(|instant| instant.with_timezone(&tz).year())
        .collect();

    if years.is_empty() {
        years.insert(Utc::now().with_timezone(&tz).year());
    }
    years
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with our product id
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Insert the VTIMEZONE block ahead of the first VEVENT
fn strip_ics_bloat(ics: &str, timezone: &str) -> String {
    let mut result = String::with_capacity(ics.len() + timezone.len());
    let mut timezone_written = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODUCT_ID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if !timezone_written && (line == "BEGIN:VEVENT" || line == "END:VCALENDAR") {
            result.push_str(timezone);
            timezone_written = true;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
