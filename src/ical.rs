use anyhow::{Context, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::{Block, DailySchedule};

pub const PRODID: &str = "-//dayflow//Daily Schedule//EN";
const UID_DOMAIN: &str = "dayflow";
const MAX_LINE_OCTETS: usize = 75;
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant; times skipped by a DST jump are moved forward by the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, _) => Ok(first.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("local time {naive} does not exist")),
    }
}

/// UTC start and end of `block` on `date`. Blocks that cross midnight end on
/// the following day.
pub fn block_instants<Tz: TimeZone>(
    block: &Block,
    date: NaiveDate,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("invalid calendar date")?;
    let start = midnight + Duration::minutes(i64::from(block.start().minutes()));
    let end = start + Duration::minutes(i64::from(block.duration()));
    Ok((resolve_local(tz, start)?, resolve_local(tz, end)?))
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Splits a content line into CRLF-terminated chunks of at most 75 octets,
/// continuation lines starting with a single space.
pub fn fold_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if used + len > budget {
            out.push_str("\r\n ");
            // The leading space counts toward the continuation line.
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += len;
    }
    out.push_str("\r\n");
    out
}

fn description(block: &Block) -> String {
    match block.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!("{}: {}", block.kind, text),
        _ => block.kind.to_string(),
    }
}

/// Renders `schedule` as a `VCALENDAR` for `date` in time zone `tz`.
/// `stamp` becomes every event's `DTSTAMP`.
pub fn export_ics<Tz: TimeZone>(
    schedule: &DailySchedule,
    date: NaiveDate,
    tz: &Tz,
    stamp: DateTime<Utc>,
) -> Result<String> {
    let day = date.format("%Y%m%d").to_string();
    let stamp = stamp.format(UTC_FORMAT).to_string();

    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
    ];

    for (position, block) in schedule.blocks().iter().enumerate() {
        let (start, end) = block_instants(block, date, tz)
            .with_context(|| format!("block {} ({})", block.id, block.title))?;
        lines.extend([
            "BEGIN:VEVENT".to_string(),
            format!("UID:{day}-{}@{UID_DOMAIN}", position + 1),
            format!("DTSTAMP:{stamp}"),
            format!("DTSTART:{}", start.format(UTC_FORMAT)),
            format!("DTEND:{}", end.format(UTC_FORMAT)),
            format!("SUMMARY:{}", escape_text(&block.title)),
            format!("DESCRIPTION:{}", escape_text(&description(block))),
            format!("CATEGORIES:{}", block.kind.as_str().to_uppercase()),
            "END:VEVENT".to_string(),
        ]);
    }

    lines.push("END:VCALENDAR".to_string());
    Ok(lines.iter().map(|line| fold_line(line)).collect())
}
