use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dayflow::model::{BlockId, BlockKind, Priority};
use dayflow::repair::{is_sequential, repair, repair_blocks, Candidate, MIN_REPAIRED_DURATION};
use dayflow::time::{time_to_minutes, MinuteOfDay};

fn t(s: &str) -> MinuteOfDay {
    time_to_minutes(s).expect("test time must parse")
}

fn spans(blocks: &[dayflow::model::Block]) -> Vec<(String, String, String)> {
    blocks
        .iter()
        .map(|b| (b.title.clone(), b.start().to_string(), b.end().to_string()))
        .collect()
}

#[test]
fn end_before_start_without_overnight_intent_gets_minimum_duration() {
    let blocks = repair(vec![
        Candidate::new("Broken", BlockKind::Work, t("09:00")).with_end(t("08:00"))
    ]);

    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].duration(), MIN_REPAIRED_DURATION);
    assert_eq!(blocks[0].start().to_string(), "09:00");
    assert_eq!(blocks[0].end().to_string(), "09:15");
}

#[test]
fn equal_starts_keep_input_order_and_push_later_ones_back() {
    let blocks = repair(vec![
        Candidate::new("Long", BlockKind::Work, t("10:00")).with_duration(60),
        Candidate::new("Short", BlockKind::Personal, t("10:00")).with_duration(30),
    ]);

    assert_eq!(
        spans(&blocks),
        vec![
            ("Long".to_string(), "10:00".to_string(), "11:00".to_string()),
            ("Short".to_string(), "11:00".to_string(), "11:30".to_string()),
        ]
    );
    assert_eq!(blocks[0].id, BlockId(1));
    assert_eq!(blocks[1].id, BlockId(2));
}

#[test]
fn overnight_sleep_keeps_its_span() {
    let blocks = repair(vec![
        Candidate::new("Sleep", BlockKind::Sleep, t("23:00")).with_end(t("07:00")),
        Candidate::new("Work", BlockKind::Work, t("09:00")).with_end(t("17:00")),
    ]);

    assert_eq!(blocks[0].title, "Work");
    assert_eq!(blocks[1].title, "Sleep");
    assert_eq!(blocks[1].duration(), 480);
    assert!(blocks[1].crosses_midnight());
    assert_eq!(blocks[1].end().to_string(), "07:00");
}

#[test]
fn explicit_duration_wins_over_end() {
    let blocks = repair(vec![Candidate::new("Gym", BlockKind::Exercise, t("18:00"))
        .with_end(t("18:10"))
        .with_duration(45)]);
    assert_eq!(blocks[0].duration(), 45);
}

#[test]
fn short_and_missing_durations_are_raised_to_the_minimum() {
    let blocks = repair(vec![
        Candidate::new("Coffee", BlockKind::Break, t("10:00")).with_duration(5),
        Candidate::new("Untimed", BlockKind::Personal, t("11:00")),
    ]);
    assert_eq!(blocks[0].duration(), 15);
    assert_eq!(blocks[1].duration(), 15);
}

#[test]
fn candidates_pushed_past_midnight_are_dropped() {
    let blocks = repair(vec![
        Candidate::new("Late shift", BlockKind::Work, t("20:00")).with_duration(240),
        Candidate::new("Reading", BlockKind::Personal, t("21:00")).with_duration(30),
    ]);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].title, "Late shift");
}

#[test]
fn optional_fields_survive_repair() {
    let mut candidate =
        Candidate::new("Deep work", BlockKind::Work, t("09:00")).with_priority(Priority::High);
    candidate.flexible = Some(false);
    candidate.description = Some("quarterly report".to_string());

    let blocks = repair(vec![candidate.with_duration(90)]);
    assert_eq!(blocks[0].priority, Some(Priority::High));
    assert_eq!(blocks[0].flexible, Some(false));
    assert_eq!(blocks[0].description.as_deref(), Some("quarterly report"));
}

fn random_candidates(rng: &mut StdRng, n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            let kind = BlockKind::ALL[rng.gen_range(0..BlockKind::COUNT)];
            let start = MinuteOfDay::wrapping(rng.gen_range(0..1440));
            let candidate = Candidate::new(format!("Task {i}"), kind, start);
            match rng.gen_range(0..3) {
                0 => candidate.with_duration(rng.gen_range(0..300)),
                1 => candidate.with_end(MinuteOfDay::wrapping(rng.gen_range(0..1440))),
                _ => candidate,
            }
        })
        .collect()
}

#[test]
fn random_input_repairs_to_a_sequential_day() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let n = rng.gen_range(0..25);
        let blocks = repair(random_candidates(&mut rng, n));

        assert!(blocks.len() <= n);
        assert!(is_sequential(&blocks), "overlap in {:?}", spans(&blocks));
        for (idx, block) in blocks.iter().enumerate() {
            assert_eq!(block.id, BlockId(idx as u32 + 1));
            assert!(block.duration() >= MIN_REPAIRED_DURATION);
            assert!(block.absolute_start() < 1440);
        }
        for pair in blocks.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }
}

#[test]
fn repair_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..100 {
        let n = rng.gen_range(1..20);
        let once = repair(random_candidates(&mut rng, n));
        let twice = repair_blocks(&once);
        assert_eq!(once, twice);
    }
}
