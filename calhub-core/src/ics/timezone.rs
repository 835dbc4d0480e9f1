//! VTIMEZONE generation from the tz database.
//!
//! The `icalendar` crate has no time zone component, so the block is written
//! as text and spliced into the calendar during post-processing.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Offset, Utc};
use chrono_tz::{OffsetComponents, Tz};

/// Offset, DST flag and abbreviation in effect at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
struct ZoneState {
    utc_offset: i32,
    daylight: bool,
    name: String,
}

impl ZoneState {
    fn at(tz: Tz, instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&tz);
        let offset = local.offset();
        ZoneState {
            utc_offset: offset.fix().local_minus_utc(),
            daylight: offset.dst_offset() != Duration::zero(),
            name: local.format("%Z").to_string(),
        }
    }
}

/// One STANDARD or DAYLIGHT sub-component
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observance {
    starts: DateTime<Utc>,
    offset_from: i32,
    state: ZoneState,
}

impl Observance {
    fn write(&self, out: &mut String) {
        let kind = if self.state.daylight { "DAYLIGHT" } else { "STANDARD" };
        // DTSTART is local time in the offset being left
        let local_start = self.starts.naive_utc() + Duration::seconds(self.offset_from.into());

        out.push_str(&format!("BEGIN:{kind}\r\n"));
        out.push_str(&format!("DTSTART:{}\r\n", local_start.format("%Y%m%dT%H%M%S")));
        out.push_str(&format!("TZOFFSETFROM:{}\r\n", format_offset(self.offset_from)));
        out.push_str(&format!("TZOFFSETTO:{}\r\n", format_offset(self.state.utc_offset)));
        out.push_str(&format!("TZNAME:{}\r\n", self.state.name));
        out.push_str(&format!("END:{kind}\r\n"));
    }
}

/// Render a VTIMEZONE block for `tz` covering the given years.
///
/// Each year contributes the observance in effect on its January 1st, unless
/// the previous year already ends in that state, and one more for every
/// offset transition within it. Years without events are never scanned.
pub(crate) fn vtimezone(tz: Tz, years: &BTreeSet<i32>) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VTIMEZONE\r\n");
    out.push_str(&format!("TZID:{}\r\n", tz.name()));
    for observance in observances(tz, years) {
        observance.write(&mut out);
    }
    out.push_str("END:VTIMEZONE\r\n");
    out
}

fn observances(tz: Tz, years: &BTreeSet<i32>) -> Vec<Observance> {
    let mut found: Vec<Observance> = Vec::new();
    let mut previous_year = None;

    for &year in years {
        let (Some(mut cursor), Some(end)) = (year_start(year), year_start(year.saturating_add(1)))
        else {
            continue;
        };

        let mut state = ZoneState::at(tz, cursor);
        let continuous = previous_year == Some(year - 1)
            && found.last().is_some_and(|last| last.state == state);
        if !continuous {
            found.push(Observance {
                starts: cursor,
                offset_from: state.utc_offset,
                state: state.clone(),
            });
        }

        let step = Duration::days(1);
        while cursor < end {
            let next = cursor + step;
            let next_state = ZoneState::at(tz, next);
            if next_state != state {
                let starts = find_transition(tz, cursor, next, &state);
                let changed = ZoneState::at(tz, starts);
                found.push(Observance {
                    starts,
                    offset_from: state.utc_offset,
                    state: changed.clone(),
                });
                state = changed;
            }
            cursor = next;
        }
        previous_year = Some(year);
    }

    found
}

/// First second in `(before, after]` whose state differs from `old`
fn find_transition(
    tz: Tz,
    mut before: DateTime<Utc>,
    mut after: DateTime<Utc>,
    old: &ZoneState,
) -> DateTime<Utc> {
    while after - before > Duration::seconds(1) {
        let mid = before + (after - before) / 2;
        if ZoneState::at(tz, mid) == *old {
            before = mid;
        } else {
            after = mid;
        }
    }
    after
}

fn year_start(year: i32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, 1, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// `+HHMM`, or `+HHMMSS` when the offset has seconds
fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let (hours, minutes, secs) = (abs / 3600, (abs % 3600) / 60, abs % 60);
    if secs == 0 {
        format!("{sign}{hours:02}{minutes:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}{secs:02}")
    }
}
