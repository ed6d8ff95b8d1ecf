use pretty_assertions::assert_eq;

use dayflow::extract::{
    classify, estimate_duration, extract_activities, parse_duration, segments, skips_breaks,
    DEFAULT_DURATION,
};
use dayflow::model::{BlockKind, Priority};

fn start_of(text: &str) -> Option<String> {
    extract_activities(text)
        .first()
        .and_then(|a| a.start)
        .map(|m| m.to_string())
}

#[test]
fn splits_on_list_separators() {
    assert_eq!(
        segments("Work on report for 3 hours, gym for 1 hour and lunch at 12:30. Then read"),
        vec![
            "work on report for 3 hours".to_string(),
            "gym for 1 hour".to_string(),
            "lunch at 12:30".to_string(),
            "read".to_string(),
        ]
    );
}

#[test]
fn classifies_by_keyword() {
    assert_eq!(classify("gym session"), BlockKind::Exercise);
    assert_eq!(classify("sleep early"), BlockKind::Sleep);
    assert_eq!(classify("lunch with team"), BlockKind::Meal);
    assert_eq!(classify("coffee"), BlockKind::Break);
    assert_eq!(classify("meditate"), BlockKind::Wellness);
    assert_eq!(classify("read a novel"), BlockKind::Personal);
    assert_eq!(classify("drive to office"), BlockKind::Commute);
    assert_eq!(classify("prepare slides"), BlockKind::Work);
}

#[test]
fn parses_explicit_durations() {
    assert_eq!(parse_duration("gym for 1 hour"), Some(60));
    assert_eq!(parse_duration("study 1.5 hours"), Some(90));
    assert_eq!(parse_duration("call for 45 minutes"), Some(45));
    assert_eq!(parse_duration("workshop 1 hour 30 mins"), Some(90));
    assert_eq!(parse_duration("write 2 to 3 hours"), Some(150));
    assert_eq!(parse_duration("write the report"), None);
}

#[test]
fn estimates_durations_from_keywords() {
    assert_eq!(estimate_duration("sleep"), 480);
    assert_eq!(estimate_duration("lunch"), 60);
    assert_eq!(estimate_duration("quick walk"), 20);
    assert_eq!(estimate_duration("plan the quarter"), DEFAULT_DURATION);
}

#[test]
fn extracts_one_activity_per_segment() {
    let activities = extract_activities("Work on report for 3 hours, gym for 1 hour and lunch at 12:30");
    assert_eq!(activities.len(), 3);

    let kinds: Vec<BlockKind> = activities.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![BlockKind::Work, BlockKind::Exercise, BlockKind::Meal]
    );

    assert_eq!(activities[0].duration, 180);
    assert_eq!(activities[0].priority, Priority::High);
    assert_eq!(activities[0].start, None);

    assert_eq!(activities[1].title, "Gym");
    assert_eq!(activities[1].duration, 60);
    assert_eq!(activities[1].priority, Priority::Medium);

    assert_eq!(activities[2].title, "Lunch");
    assert_eq!(activities[2].duration, 60);
    assert_eq!(activities[2].start.map(|m| m.to_string()), Some("12:30".to_string()));
}

#[test]
fn reads_clock_times() {
    assert_eq!(start_of("dinner at 7pm"), Some("19:00".to_string()));
    assert_eq!(start_of("call at 3"), Some("15:00".to_string()));
    assert_eq!(start_of("run at 6:30am"), Some("06:30".to_string()));
    assert_eq!(start_of("sleep at 11"), Some("23:00".to_string()));
    assert_eq!(start_of("gym for 1 hour"), None);
}

#[test]
fn clock_ranges_set_start_end_and_duration() {
    let work = &extract_activities("work from 9 to 5")[0];
    assert_eq!(work.start.map(|m| m.to_string()), Some("09:00".to_string()));
    assert_eq!(work.end.map(|m| m.to_string()), Some("17:00".to_string()));
    assert_eq!(work.duration, 480);

    let shift = &extract_activities("meetings 9am-12:30pm")[0];
    assert_eq!(shift.start.map(|m| m.to_string()), Some("09:00".to_string()));
    assert_eq!(shift.duration, 210);

    let afternoon = &extract_activities("coding 1-5pm")[0];
    assert_eq!(afternoon.start.map(|m| m.to_string()), Some("13:00".to_string()));
    assert_eq!(afternoon.duration, 240);
}

#[test]
fn priority_keywords_override_defaults() {
    let activities = extract_activities("urgent call with client, maybe read for 30 minutes");
    assert_eq!(activities[0].priority, Priority::High);
    assert_eq!(activities[1].kind, BlockKind::Personal);
    assert_eq!(activities[1].priority, Priority::Low);
    assert_eq!(activities[1].duration, 30);
}

#[test]
fn no_break_requests_are_detected_and_not_scheduled() {
    let text = "Deep work for 5 hours, no breaks";
    assert!(skips_breaks(text));
    assert!(!skips_breaks("Deep work for 5 hours, coffee break"));

    let activities = extract_activities(text);
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].kind, BlockKind::Work);
    assert_eq!(activities[0].duration, 300);
}

#[test]
fn empty_text_yields_nothing() {
    assert!(extract_activities("").is_empty());
    assert!(extract_activities("  ,  ; . ").is_empty());
}
