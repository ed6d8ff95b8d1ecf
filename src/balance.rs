use serde::{Deserialize, Serialize};

use crate::model::{Block, BlockKind};

pub const WORK_HIGH_MINUTES: u32 = 9 * 60;
pub const WORK_LOW_MINUTES: u32 = 6 * 60;
pub const PERSONAL_LOW_MINUTES: u32 = 2 * 60;
pub const SLEEP_MIN_MINUTES: u32 = 7 * 60;
pub const SLEEP_MAX_MINUTES: u32 = 9 * 60;
pub const EXERCISE_LOW_MINUTES: u32 = 30;
pub const WORK_NEEDS_BREAK_MINUTES: u32 = 6 * 60;
pub const MAX_GAP_MINUTES: u32 = 180;
/// Uninterrupted work above this length calls for a break.
pub const LONG_WORK_STRETCH_MINUTES: u32 = 120;
/// Idle time between two work blocks that counts as a pause.
const STRETCH_RESET_GAP_MINUTES: u32 = 10;

const PENALTY_WORK_HIGH: u8 = 15;
const PENALTY_WORK_LOW: u8 = 10;
const PENALTY_PERSONAL_LOW: u8 = 15;
const PENALTY_SLEEP_RANGE: u8 = 20;
const PENALTY_EXERCISE_LOW: u8 = 20;
const PENALTY_NO_MEAL: u8 = 10;
const PENALTY_NO_BREAK: u8 = 10;
const PENALTY_NO_WELLNESS: u8 = 5;
const PENALTY_GAP_OR_OVERLAP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryTotals {
    minutes: [u32; BlockKind::COUNT],
    counts: [u32; BlockKind::COUNT],
}

impl CategoryTotals {
    pub fn minutes(&self, kind: BlockKind) -> u32 {
        self.minutes[kind.index()]
    }

    pub fn count(&self, kind: BlockKind) -> u32 {
        self.counts[kind.index()]
    }

    pub fn contains(&self, kind: BlockKind) -> bool {
        self.count(kind) > 0
    }

    pub fn total(&self) -> u32 {
        self.minutes.iter().sum()
    }

    fn add(&mut self, kind: BlockKind, minutes: u32) {
        self.minutes[kind.index()] += minutes;
        self.counts[kind.index()] += 1;
    }
}

pub fn category_totals(blocks: &[Block]) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for block in blocks {
        totals.add(block.kind, u32::from(block.duration()));
    }
    totals
}

/// Everything the score and the suggestion rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceMetrics {
    pub totals: CategoryTotals,
    pub total_minutes: u32,
    pub work_minutes: u32,
    pub exercise_minutes: u32,
    pub sleep_minutes: u32,
    /// Personal, wellness and exercise time together.
    pub personal_minutes: u32,
    pub longest_work_stretch: u32,
    pub largest_gap: u32,
    pub has_overlap: bool,
}

impl BalanceMetrics {
    pub fn has_meal(&self) -> bool {
        self.totals.contains(BlockKind::Meal)
    }

    pub fn has_break(&self) -> bool {
        self.totals.contains(BlockKind::Break)
    }

    pub fn has_wellness(&self) -> bool {
        self.totals.contains(BlockKind::Wellness)
    }
}

pub fn analyze(blocks: &[Block]) -> BalanceMetrics {
    let totals = category_totals(blocks);

    let mut ordered: Vec<&Block> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.absolute_start());

    let mut largest_gap = 0u32;
    let mut has_overlap = false;
    for pair in ordered.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.absolute_start() < prev.absolute_end() {
            has_overlap = true;
        } else {
            largest_gap = largest_gap.max(next.absolute_start() - prev.absolute_end());
        }
    }

    BalanceMetrics {
        totals,
        total_minutes: totals.total(),
        work_minutes: totals.minutes(BlockKind::Work),
        exercise_minutes: totals.minutes(BlockKind::Exercise),
        sleep_minutes: totals.minutes(BlockKind::Sleep),
        personal_minutes: totals.minutes(BlockKind::Personal)
            + totals.minutes(BlockKind::Wellness)
            + totals.minutes(BlockKind::Exercise),
        longest_work_stretch: longest_work_stretch(&ordered),
        largest_gap,
        has_overlap,
    }
}

fn longest_work_stretch(ordered: &[&Block]) -> u32 {
    let mut longest = 0u32;
    let mut current = 0u32;
    let mut last_work_end: Option<u32> = None;

    for block in ordered {
        if block.kind != BlockKind::Work {
            current = 0;
            last_work_end = None;
            continue;
        }

        let contiguous = last_work_end
            .map(|end| block.absolute_start() < end + STRETCH_RESET_GAP_MINUTES)
            .unwrap_or(false);
        if !contiguous {
            current = 0;
        }
        current += u32::from(block.duration());
        last_work_end = Some(block.absolute_end());
        longest = longest.max(current);
    }

    longest
}

/// Category shares of the scheduled time, in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLifeBalance {
    pub work_percentage: u32,
    pub personal_percentage: u32,
    pub sleep_percentage: u32,
}

fn percentage(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(total) * 100.0).round() as u32
}

pub fn work_life_balance(metrics: &BalanceMetrics) -> WorkLifeBalance {
    WorkLifeBalance {
        work_percentage: percentage(metrics.work_minutes, metrics.total_minutes),
        personal_percentage: percentage(metrics.personal_minutes, metrics.total_minutes),
        sleep_percentage: percentage(metrics.sleep_minutes, metrics.total_minutes),
    }
}

/// Starts at 100 and subtracts a fixed penalty for each rule the day breaks.
pub fn optimization_score(metrics: &BalanceMetrics) -> u8 {
    let mut penalty = 0u32;
    let mut charge = |applies: bool, amount: u8| {
        if applies {
            penalty += u32::from(amount);
        }
    };

    charge(metrics.work_minutes > WORK_HIGH_MINUTES, PENALTY_WORK_HIGH);
    charge(metrics.work_minutes < WORK_LOW_MINUTES, PENALTY_WORK_LOW);
    charge(
        metrics.personal_minutes < PERSONAL_LOW_MINUTES,
        PENALTY_PERSONAL_LOW,
    );
    charge(
        !(SLEEP_MIN_MINUTES..=SLEEP_MAX_MINUTES).contains(&metrics.sleep_minutes),
        PENALTY_SLEEP_RANGE,
    );
    charge(
        metrics.exercise_minutes < EXERCISE_LOW_MINUTES,
        PENALTY_EXERCISE_LOW,
    );
    charge(!metrics.has_meal(), PENALTY_NO_MEAL);
    charge(
        metrics.work_minutes > WORK_NEEDS_BREAK_MINUTES && !metrics.has_break(),
        PENALTY_NO_BREAK,
    );
    charge(!metrics.has_wellness(), PENALTY_NO_WELLNESS);
    charge(
        metrics.largest_gap > MAX_GAP_MINUTES || metrics.has_overlap,
        PENALTY_GAP_OR_OVERLAP,
    );

    100u32.saturating_sub(penalty).min(100) as u8
}
