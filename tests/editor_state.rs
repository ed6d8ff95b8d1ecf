use pretty_assertions::assert_eq;

use dayflow::editor::{
    reduce, EditAction, Editor, EditorConfig, EditorState, Handle, InputEvent, Key,
};
use dayflow::error::{EditRejection, TimeError};
use dayflow::model::{Block, BlockId, BlockKind, DailySchedule};
use dayflow::repair::is_sequential;
use dayflow::time::time_to_minutes;

fn block(id: u32, title: &str, start: &str, duration: u16) -> Block {
    let start = time_to_minutes(start).expect("test time must parse");
    Block::new(BlockId(id), title, BlockKind::Work, start, duration)
}

fn day() -> DailySchedule {
    DailySchedule::new(vec![
        block(1, "Review", "10:00", 45),
        block(2, "Standup", "11:00", 15),
    ])
}

fn apply(schedule: &DailySchedule, action: &EditAction) -> DailySchedule {
    reduce(schedule, action, &EditorConfig::default()).expect("edit should apply")
}

fn times(schedule: &DailySchedule, id: u32) -> (String, String, u16) {
    let block = schedule.block(BlockId(id)).expect("block exists");
    (
        block.start().to_string(),
        block.end().to_string(),
        block.duration(),
    )
}

#[test]
fn drag_snaps_to_five_minute_grid() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());

    // One pixel per minute at the default hour height.
    let down = InputEvent::PointerDown {
        block: BlockId(1),
        handle: Handle::Body,
        y: 610.0,
    };
    assert_eq!(editor.handle(&schedule, &down), None);
    assert!(matches!(editor.state(), EditorState::Dragging { .. }));

    let action = editor
        .handle(&schedule, &InputEvent::PointerMove { y: 617.0 })
        .expect("move yields an edit");
    assert_eq!(
        action,
        EditAction::MoveTo {
            id: BlockId(1),
            start: 607
        }
    );

    let moved = apply(&schedule, &action);
    assert_eq!(times(&moved, 1), ("10:05".to_string(), "10:50".to_string(), 45));

    let action = editor
        .handle(&schedule, &InputEvent::PointerMove { y: 618.0 })
        .expect("move yields an edit");
    assert_eq!(times(&apply(&schedule, &action), 1).0, "10:10");

    assert_eq!(editor.handle(&schedule, &InputEvent::PointerUp), None);
    assert_eq!(editor.state(), &EditorState::Idle);
    assert_eq!(editor.focus(), Some(BlockId(1)));
}

#[test]
fn drag_uses_the_configured_hour_height() {
    let config = EditorConfig {
        hour_height: 120.0,
        ..Default::default()
    };
    let schedule = day();
    let mut editor = Editor::new(config.clone());

    editor.handle(
        &schedule,
        &InputEvent::PointerDown {
            block: BlockId(1),
            handle: Handle::Body,
            y: 1200.0,
        },
    );
    let action = editor
        .handle(&schedule, &InputEvent::PointerMove { y: 1260.0 })
        .expect("move yields an edit");
    let moved = reduce(&schedule, &action, &config).expect("edit should apply");
    assert_eq!(times(&moved, 1).0, "10:30");
}

#[test]
fn resize_from_bottom_edge_snaps_the_end() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());

    editor.handle(
        &schedule,
        &InputEvent::PointerDown {
            block: BlockId(1),
            handle: Handle::BottomEdge,
            y: 645.0,
        },
    );
    let action = editor
        .handle(&schedule, &InputEvent::PointerMove { y: 668.0 })
        .expect("resize yields an edit");
    assert_eq!(
        action,
        EditAction::ResizeTo {
            id: BlockId(1),
            end: 668
        }
    );
    assert_eq!(
        times(&apply(&schedule, &action), 1),
        ("10:00".to_string(), "11:10".to_string(), 70)
    );
}

#[test]
fn moves_and_resizes_are_clamped_to_the_day() {
    let schedule = day();
    let id = BlockId(1);

    let late = apply(&schedule, &EditAction::MoveTo { id, start: 1430 });
    assert_eq!(times(&late, 1), ("23:15".to_string(), "00:00".to_string(), 45));

    let early = apply(&schedule, &EditAction::MoveTo { id, start: -30 });
    assert_eq!(times(&early, 1).0, "00:00");

    let squashed = apply(&schedule, &EditAction::ResizeTo { id, end: 602 });
    assert_eq!(times(&squashed, 1).2, 15);

    let stretched = apply(&schedule, &EditAction::ResizeTo { id, end: 5000 });
    assert_eq!(times(&stretched, 1), ("10:00".to_string(), "00:00".to_string(), 840));
}

fn night() -> DailySchedule {
    let start = time_to_minutes("23:00").expect("test time must parse");
    DailySchedule::new(vec![Block::new(
        BlockId(1),
        "Sleep",
        BlockKind::Sleep,
        start,
        480,
    )])
}

#[test]
fn overnight_block_keeps_its_span_when_edited() {
    let schedule = night();
    let id = BlockId(1);

    let dragged = apply(&schedule, &EditAction::MoveTo { id, start: 1385 });
    assert_eq!(times(&dragged, 1), ("23:05".to_string(), "07:05".to_string(), 480));

    let nudged = apply(&schedule, &EditAction::Nudge { id, delta: 15 });
    assert_eq!(times(&nudged, 1), ("23:15".to_string(), "07:15".to_string(), 480));

    let earlier = apply(&schedule, &EditAction::Nudge { id, delta: -15 });
    assert_eq!(times(&earlier, 1), ("22:45".to_string(), "06:45".to_string(), 480));

    let shorter = apply(&schedule, &EditAction::NudgeEnd { id, delta: -15 });
    assert_eq!(times(&shorter, 1), ("23:00".to_string(), "06:45".to_string(), 465));

    let longer = apply(&schedule, &EditAction::ResizeTo { id, end: 1900 });
    assert_eq!(times(&longer, 1), ("23:00".to_string(), "07:40".to_string(), 520));

    let late = apply(&schedule, &EditAction::MoveTo { id, start: 2000 });
    assert_eq!(times(&late, 1), ("23:55".to_string(), "07:55".to_string(), 480));
}

#[test]
fn dragging_an_overnight_block_moves_it_by_the_pointer_delta() {
    let schedule = night();
    let mut editor = Editor::new(EditorConfig::default());

    editor.handle(
        &schedule,
        &InputEvent::PointerDown {
            block: BlockId(1),
            handle: Handle::Body,
            y: 1390.0,
        },
    );
    let action = editor
        .handle(&schedule, &InputEvent::PointerMove { y: 1395.0 })
        .expect("move yields an edit");
    let moved = apply(&schedule, &action);
    assert_eq!(times(&moved, 1), ("23:05".to_string(), "07:05".to_string(), 480));
    assert!(moved.blocks()[0].crosses_midnight());

    // Dragged fully into the day it becomes an ordinary daytime block.
    let daytime = apply(&schedule, &EditAction::MoveTo { id: BlockId(1), start: 600 });
    assert_eq!(times(&daytime, 1), ("10:00".to_string(), "18:00".to_string(), 480));
}

#[test]
fn keyboard_nudges_focused_block() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());

    editor.handle(&schedule, &InputEvent::Focus { block: BlockId(1) });
    let down = editor
        .handle(
            &schedule,
            &InputEvent::Key {
                key: Key::Down,
                shift: false,
            },
        )
        .expect("nudge");
    let nudged = apply(&schedule, &down);
    assert_eq!(times(&nudged, 1), ("10:15".to_string(), "11:00".to_string(), 45));

    let shrink = editor
        .handle(
            &nudged,
            &InputEvent::Key {
                key: Key::Up,
                shift: true,
            },
        )
        .expect("nudge end");
    assert_eq!(
        shrink,
        EditAction::NudgeEnd {
            id: BlockId(1),
            delta: -15
        }
    );
    assert_eq!(times(&apply(&nudged, &shrink), 1).2, 30);
}

#[test]
fn keys_without_focus_do_nothing() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());
    let up = InputEvent::Key {
        key: Key::Up,
        shift: false,
    };
    assert_eq!(editor.handle(&schedule, &up), None);

    editor.handle(&schedule, &InputEvent::Focus { block: BlockId(1) });
    editor.handle(&schedule, &InputEvent::Blur);
    assert_eq!(editor.handle(&schedule, &up), None);
}

#[test]
fn delete_key_removes_block_and_clears_focus() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());

    editor.handle(&schedule, &InputEvent::Focus { block: BlockId(2) });
    let action = editor
        .handle(
            &schedule,
            &InputEvent::Key {
                key: Key::Backspace,
                shift: false,
            },
        )
        .expect("delete");
    assert_eq!(action, EditAction::Delete { id: BlockId(2) });
    assert_eq!(editor.focus(), None);

    let next = apply(&schedule, &action);
    assert_eq!(next.len(), 1);
    assert!(next.block(BlockId(2)).is_none());
}

#[test]
fn title_edit_commits_on_enter_and_discards_on_escape() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());

    editor.handle(&schedule, &InputEvent::DoubleClick { block: BlockId(1) });
    assert_eq!(
        editor.state(),
        &EditorState::EditingTitle {
            id: BlockId(1),
            draft: "Review".to_string()
        }
    );
    editor.handle(
        &schedule,
        &InputEvent::Text {
            value: "  Code review ".to_string(),
        },
    );
    let action = editor
        .handle(
            &schedule,
            &InputEvent::Key {
                key: Key::Enter,
                shift: false,
            },
        )
        .expect("rename");
    let renamed = apply(&schedule, &action);
    assert_eq!(renamed.block(BlockId(1)).map(|b| b.title.as_str()), Some("Code review"));

    editor.handle(&renamed, &InputEvent::DoubleClick { block: BlockId(1) });
    editor.handle(
        &renamed,
        &InputEvent::Text {
            value: "Scrapped".to_string(),
        },
    );
    let escape = InputEvent::Key {
        key: Key::Escape,
        shift: false,
    };
    assert_eq!(editor.handle(&renamed, &escape), None);
    assert_eq!(editor.state(), &EditorState::Idle);
}

#[test]
fn blank_titles_are_rejected() {
    let result = reduce(
        &day(),
        &EditAction::Rename {
            id: BlockId(1),
            title: "   ".to_string(),
        },
        &EditorConfig::default(),
    );
    assert_eq!(result, Err(EditRejection::EmptyTitle));
}

#[test]
fn direct_time_entry_is_validated() {
    let schedule = day();
    let config = EditorConfig::default();
    let set = |start: &str, end: &str| {
        reduce(
            &schedule,
            &EditAction::SetTimes {
                id: BlockId(1),
                start: start.to_string(),
                end: end.to_string(),
            },
            &config,
        )
    };

    assert_eq!(
        set("11:00", "10:00"),
        Err(EditRejection::EndBeforeStart {
            start: "11:00".to_string(),
            end: "10:00".to_string()
        })
    );
    assert_eq!(
        set("10:00", "10:10"),
        Err(EditRejection::TooShort {
            actual: 10,
            minimum: 15
        })
    );
    assert_eq!(
        set("25:00", "26:00"),
        Err(EditRejection::InvalidTime(TimeError::OutOfRange(1500)))
    );
    assert!(matches!(
        set("00:00", "24:00"),
        Err(EditRejection::OutOfBounds { start: 0, end: 1440 })
    ));

    let late = set("22:00", "24:00").expect("end of day is allowed");
    assert_eq!(times(&late, 1), ("22:00".to_string(), "00:00".to_string(), 120));
}

#[test]
fn edits_to_missing_blocks_are_rejected_without_side_effects() {
    let schedule = day();
    let result = reduce(
        &schedule,
        &EditAction::Delete { id: BlockId(9) },
        &EditorConfig::default(),
    );
    assert_eq!(result, Err(EditRejection::UnknownBlock(BlockId(9))));
    assert_eq!(schedule, day());
}

#[test]
fn repair_action_resolves_overlaps() {
    let overlapping = DailySchedule::new(vec![
        block(1, "A", "09:00", 120),
        block(2, "B", "10:00", 30),
    ]);
    let repaired = apply(&overlapping, &EditAction::Repair);
    assert!(is_sequential(repaired.blocks()));
    assert_eq!(times(&repaired, 2), ("11:00".to_string(), "11:30".to_string(), 30));
}

#[test]
fn pointer_moves_while_idle_are_ignored() {
    let schedule = day();
    let mut editor = Editor::new(EditorConfig::default());
    assert_eq!(
        editor.handle(&schedule, &InputEvent::PointerMove { y: 100.0 }),
        None
    );
    assert_eq!(editor.state(), &EditorState::Idle);

    let missing = InputEvent::PointerDown {
        block: BlockId(42),
        handle: Handle::Body,
        y: 0.0,
    };
    assert_eq!(editor.handle(&schedule, &missing), None);
    assert_eq!(editor.state(), &EditorState::Idle);
}

#[test]
fn actions_deserialize_from_tagged_json() {
    let action: EditAction =
        serde_json::from_str(r#"{"action":"move_to","id":3,"start":605}"#).expect("parse");
    assert_eq!(
        action,
        EditAction::MoveTo {
            id: BlockId(3),
            start: 605
        }
    );

    let input: InputEvent =
        serde_json::from_str(r#"{"input":"pointer_down","block":1,"y":12.5}"#).expect("parse");
    assert_eq!(
        input,
        InputEvent::PointerDown {
            block: BlockId(1),
            handle: Handle::Body,
            y: 12.5
        }
    );
}
