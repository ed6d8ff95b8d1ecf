use serde::{Deserialize, Serialize};

use crate::model::{Block, BlockId, BlockKind};

/// Energy on a 0..=10 scale for each waking hour; unlisted hours are 5.
const ENERGY_CURVE: [(u16, u8); 15] = [
    (7, 6),
    (8, 7),
    (9, 9),
    (10, 10),
    (11, 9),
    (12, 7),
    (13, 5),
    (14, 6),
    (15, 8),
    (16, 8),
    (17, 7),
    (18, 6),
    (19, 5),
    (20, 4),
    (21, 3),
];
const DEFAULT_ENERGY: u8 = 5;
/// Work starting at or above this energy is well placed.
const PEAK_ENERGY: u8 = 8;

const WORK_POINTS_OPTIMAL: u32 = 10;
const WORK_POINTS_OTHER: u32 = 5;

const IDEAL_WORK_SHARE: f64 = 0.5;
const IDEAL_RECOVERY_SHARE: f64 = 0.3;
const IDEAL_PERSONAL_SHARE: f64 = 0.2;

pub fn energy_level(hour: u16) -> u8 {
    ENERGY_CURVE
        .iter()
        .find(|(h, _)| *h == hour % 24)
        .map(|(_, level)| *level)
        .unwrap_or(DEFAULT_ENERGY)
}

/// Whether `hour` suits an activity of `kind`: work at peak energy, body and
/// mind care in the morning or early evening, personal time in the evening.
pub fn is_optimal_time(kind: BlockKind, hour: u16) -> bool {
    let hour = hour % 24;
    match kind {
        BlockKind::Work => energy_level(hour) >= PEAK_ENERGY,
        BlockKind::Wellness | BlockKind::Exercise => matches!(hour, 7 | 8 | 17 | 18),
        BlockKind::Personal => hour >= 19,
        BlockKind::Break
        | BlockKind::Meal
        | BlockKind::Sleep
        | BlockKind::Commute => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyNote {
    pub block_id: BlockId,
    pub energy: u8,
    pub optimal: bool,
}

/// Energy level and placement verdict at each block's start hour.
pub fn energy_notes(blocks: &[Block]) -> Vec<EnergyNote> {
    blocks
        .iter()
        .map(|block| {
            let hour = block.start().hour();
            EnergyNote {
                block_id: block.id,
                energy: energy_level(hour),
                optimal: is_optimal_time(block.kind, hour),
            }
        })
        .collect()
}

/// Summary of a planned day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total_blocks: usize,
    pub total_minutes: u32,
    pub total_hours: f64,
    pub work_minutes: u32,
    pub work_percentage: f64,
    pub break_minutes: u32,
    /// Wellness and exercise together.
    pub wellness_minutes: u32,
    pub personal_minutes: u32,
    pub productivity_score: u8,
    pub balance_score: u8,
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn minutes_where(blocks: &[Block], pick: impl Fn(BlockKind) -> bool) -> u32 {
    blocks
        .iter()
        .filter(|b| pick(b.kind))
        .map(|b| u32::from(b.duration()))
        .sum()
}

/// Ten points per well-placed work block, five for any other, capped at 100.
pub fn productivity_score(blocks: &[Block]) -> u8 {
    let points: u32 = blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Work)
        .map(|b| {
            if is_optimal_time(b.kind, b.start().hour()) {
                WORK_POINTS_OPTIMAL
            } else {
                WORK_POINTS_OTHER
            }
        })
        .sum();
    points.min(100) as u8
}

/// How close the block counts come to half work, three tenths recovery
/// (breaks, wellness, exercise) and one fifth personal time.
pub fn balance_score(blocks: &[Block]) -> u8 {
    if blocks.is_empty() {
        return 0;
    }
    let total = blocks.len() as f64;
    let share = |pick: fn(BlockKind) -> bool| {
        blocks.iter().filter(|b| pick(b.kind)).count() as f64 / total
    };
    let closeness = |actual: f64, ideal: f64| (100.0 - (actual - ideal).abs() * 200.0).max(0.0);

    let work = closeness(share(|k| k == BlockKind::Work), IDEAL_WORK_SHARE);
    let recovery = closeness(
        share(|k| matches!(k, BlockKind::Break | BlockKind::Wellness | BlockKind::Exercise)),
        IDEAL_RECOVERY_SHARE,
    );
    let personal = closeness(share(|k| k == BlockKind::Personal), IDEAL_PERSONAL_SHARE);

    (work * 0.4 + recovery * 0.4 + personal * 0.2).round() as u8
}

pub fn plan_stats(blocks: &[Block]) -> PlanStats {
    let total_minutes = minutes_where(blocks, |_| true);
    let work_minutes = minutes_where(blocks, |k| k == BlockKind::Work);
    let work_percentage = if total_minutes == 0 {
        0.0
    } else {
        one_decimal(f64::from(work_minutes) / f64::from(total_minutes) * 100.0)
    };

    PlanStats {
        total_blocks: blocks.len(),
        total_minutes,
        total_hours: one_decimal(f64::from(total_minutes) / 60.0),
        work_minutes,
        work_percentage,
        break_minutes: minutes_where(blocks, |k| k == BlockKind::Break),
        wellness_minutes: minutes_where(blocks, |k| {
            matches!(k, BlockKind::Wellness | BlockKind::Exercise)
        }),
        personal_minutes: minutes_where(blocks, |k| k == BlockKind::Personal),
        productivity_score: productivity_score(blocks),
        balance_score: balance_score(blocks),
    }
}
