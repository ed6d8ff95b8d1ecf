use dayflow::llm::{validate_parsed_day, ParsedBlock, ParsedDay, DAY_SCHEDULE_JSON_SCHEMA};
use dayflow::model::{BlockKind, Priority};

fn block(title: &str, start: &str, end: &str, kind: &str) -> ParsedBlock {
    ParsedBlock {
        title: title.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        kind: kind.to_string(),
        priority: None,
        description: None,
    }
}

fn day(blocks: Vec<ParsedBlock>) -> ParsedDay {
    ParsedDay { blocks }
}

#[test]
fn validate_accepts_a_well_formed_day() {
    let parsed = day(vec![
        block("Deep work", "09:00", "11:30", "work"),
        ParsedBlock {
            priority: Some("Low".to_string()),
            ..block("Walk", "12:00", "12:20", "wellness")
        },
        block("Sleep", "23:00", "07:00", "sleep"),
    ]);

    validate_parsed_day(&parsed).expect("should validate");

    let candidates = parsed.to_candidates().expect("should convert");
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[1].kind, BlockKind::Wellness);
    assert_eq!(candidates[1].priority, Some(Priority::Low));
    assert_eq!(candidates[2].requested_duration(), 480);
}

#[test]
fn validate_rejects_empty_day() {
    let err = validate_parsed_day(&day(Vec::new())).unwrap_err();
    assert!(
        err.to_string().contains("at least one block"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn validate_rejects_blank_title() {
    let err = validate_parsed_day(&day(vec![block("  ", "09:00", "10:00", "work")])).unwrap_err();
    assert!(
        err.to_string().contains("title must not be empty"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn validate_rejects_malformed_times() {
    let err = validate_parsed_day(&day(vec![block("Gym", "6pm", "19:00", "exercise")]))
        .unwrap_err();
    assert!(
        err.to_string().contains("invalid startTime"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn validate_rejects_zero_length_blocks() {
    let err = validate_parsed_day(&day(vec![block("Nap", "13:00", "13:00", "sleep")]))
        .unwrap_err();
    assert!(err.to_string().contains("must differ"), "unexpected error: {err:?}");
}

#[test]
fn validate_rejects_unknown_type_and_priority() {
    let err = validate_parsed_day(&day(vec![block("Study", "09:00", "10:00", "learning")]))
        .unwrap_err();
    assert!(
        err.to_string().contains("unknown type"),
        "unexpected error: {err:?}"
    );

    let err = validate_parsed_day(&day(vec![ParsedBlock {
        priority: Some("urgent".to_string()),
        ..block("Study", "09:00", "10:00", "work")
    }]))
    .unwrap_err();
    assert!(
        err.to_string().contains("unknown priority"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn parsed_day_reads_service_json() {
    let json = r#"{"blocks":[{"title":"Lunch","startTime":"12:30","endTime":"13:15","type":"meal","priority":null,"description":"with Sam"}]}"#;
    let parsed: ParsedDay = serde_json::from_str(json).expect("service JSON should parse");
    assert_eq!(parsed.blocks[0].kind, "meal");
    assert_eq!(parsed.blocks[0].description.as_deref(), Some("with Sam"));
    validate_parsed_day(&parsed).expect("should validate");
}

#[test]
fn schema_is_valid_json() {
    let schema: serde_json::Value =
        serde_json::from_str(DAY_SCHEDULE_JSON_SCHEMA).expect("schema should be JSON");
    assert_eq!(schema["required"][0], "blocks");
}
