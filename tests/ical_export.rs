use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

use dayflow::ical::{escape_text, export_ics, fold_line};
use dayflow::model::{Block, BlockId, BlockKind, DailySchedule};
use dayflow::time::time_to_minutes;

fn block(id: u32, title: &str, kind: BlockKind, start: &str, duration: u16) -> Block {
    let start = time_to_minutes(start).expect("test time must parse");
    Block::new(BlockId(id), title, kind, start, duration)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
}

fn stamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 13, 12, 0, 0)
        .single()
        .expect("valid stamp")
}

fn unfold(ics: &str) -> Vec<String> {
    ics.replace("\r\n ", "")
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn exports_one_event_per_block() {
    let schedule = DailySchedule::new(vec![
        block(1, "Standup, daily", BlockKind::Work, "09:00", 15)
            .with_description("team; sync"),
        block(2, "Sleep", BlockKind::Sleep, "23:00", 480),
    ]);

    let ics = export_ics(&schedule, date(), &Utc, stamp()).expect("export succeeds");
    assert!(ics.ends_with("\r\n"));

    assert_eq!(
        unfold(&ics),
        vec![
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//dayflow//Daily Schedule//EN",
            "CALSCALE:GREGORIAN",
            "BEGIN:VEVENT",
            "UID:20260314-1@dayflow",
            "DTSTAMP:20260313T120000Z",
            "DTSTART:20260314T090000Z",
            "DTEND:20260314T091500Z",
            "SUMMARY:Standup\\, daily",
            "DESCRIPTION:work: team\\; sync",
            "CATEGORIES:WORK",
            "END:VEVENT",
            "BEGIN:VEVENT",
            "UID:20260314-2@dayflow",
            "DTSTAMP:20260313T120000Z",
            "DTSTART:20260314T230000Z",
            "DTEND:20260315T070000Z",
            "SUMMARY:Sleep",
            "DESCRIPTION:sleep",
            "CATEGORIES:SLEEP",
            "END:VEVENT",
            "END:VCALENDAR",
        ]
    );
}

#[test]
fn local_times_are_converted_to_utc() {
    let schedule = DailySchedule::new(vec![block(1, "Gym", BlockKind::Exercise, "09:00", 60)]);
    let tz = FixedOffset::east_opt(3600).expect("valid offset");

    let ics = export_ics(&schedule, date(), &tz, stamp()).expect("export succeeds");
    let lines = unfold(&ics);
    assert!(lines.contains(&"DTSTART:20260314T080000Z".to_string()));
    assert!(lines.contains(&"DTEND:20260314T090000Z".to_string()));
}

#[test]
fn empty_schedule_is_an_empty_calendar() {
    let ics = export_ics(&DailySchedule::default(), date(), &Utc, stamp()).expect("export");
    assert!(!ics.contains("BEGIN:VEVENT"));
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
}

#[test]
fn long_lines_are_folded_at_75_octets() {
    let line = format!("SUMMARY:{}", "a".repeat(200));
    let folded = fold_line(&line);

    for physical in folded.split("\r\n").filter(|l| !l.is_empty()) {
        assert!(physical.len() <= 75, "{} octets: {physical:?}", physical.len());
    }
    assert_eq!(folded.replace("\r\n ", ""), format!("{line}\r\n"));
}

#[test]
fn folding_never_splits_a_character() {
    let line = format!("SUMMARY:{}", "é".repeat(60));
    let folded = fold_line(&line);
    for physical in folded.split("\r\n").filter(|l| !l.is_empty()) {
        assert!(physical.len() <= 75);
    }
    assert_eq!(folded.replace("\r\n ", ""), format!("{line}\r\n"));
}

#[test]
fn escapes_text_values() {
    assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    assert_eq!(escape_text("plain"), "plain");
}
