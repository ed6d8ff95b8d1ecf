use std::fmt;

use serde::{Deserialize, Serialize};

use crate::balance::{self, BalanceMetrics, WorkLifeBalance};
use crate::stats::{self, EnergyNote, PlanStats};
use crate::suggest;
use crate::time::{self, MinuteOfDay, MINUTES_PER_DAY};

/// Longest span a single block may cover. One grid step short of a full day
/// so that `duration == (end - start) mod 1440` stays unambiguous.
pub const MAX_BLOCK_DURATION: u16 = MINUTES_PER_DAY - time::DEFAULT_SNAP_STEP;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Work,
    Exercise,
    Sleep,
    Meal,
    Break,
    Personal,
    Commute,
    Wellness,
}

impl BlockKind {
    pub const COUNT: usize = 8;

    pub const ALL: [BlockKind; Self::COUNT] = [
        BlockKind::Work,
        BlockKind::Exercise,
        BlockKind::Sleep,
        BlockKind::Meal,
        BlockKind::Break,
        BlockKind::Personal,
        BlockKind::Commute,
        BlockKind::Wellness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Work => "work",
            BlockKind::Exercise => "exercise",
            BlockKind::Sleep => "sleep",
            BlockKind::Meal => "meal",
            BlockKind::Break => "break",
            BlockKind::Personal => "personal",
            BlockKind::Commute => "commute",
            BlockKind::Wellness => "wellness",
        }
    }

    /// Render color for the category.
    pub fn color(self) -> &'static str {
        match self {
            BlockKind::Work => "#3b82f6",
            BlockKind::Exercise => "#ef4444",
            BlockKind::Sleep => "#6366f1",
            BlockKind::Meal => "#f59e0b",
            BlockKind::Break => "#10b981",
            BlockKind::Personal => "#ec4899",
            BlockKind::Commute => "#64748b",
            BlockKind::Wellness => "#14b8a6",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            BlockKind::Work => 0,
            BlockKind::Exercise => 1,
            BlockKind::Sleep => 2,
            BlockKind::Meal => 3,
            BlockKind::Break => 4,
            BlockKind::Personal => 5,
            BlockKind::Commute => 6,
            BlockKind::Wellness => 7,
        }
    }

    pub fn parse(raw: &str) -> Option<BlockKind> {
        let raw = raw.trim();
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A single scheduled activity.
///
/// The time fields are private: every constructor and setter keeps
/// `duration == (end - start) mod 1440`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BlockRecord", into = "BlockRecord")]
pub struct Block {
    pub id: BlockId,
    pub title: String,
    start: MinuteOfDay,
    end: MinuteOfDay,
    duration: u16,
    pub kind: BlockKind,
    pub priority: Option<Priority>,
    pub flexible: Option<bool>,
    pub description: Option<String>,
}

impl Block {
    /// Builds a block from a start and duration; the duration is clamped to
    /// `1..=MAX_BLOCK_DURATION`.
    pub fn new(
        id: BlockId,
        title: impl Into<String>,
        kind: BlockKind,
        start: MinuteOfDay,
        duration: u16,
    ) -> Self {
        let duration = duration.clamp(1, MAX_BLOCK_DURATION);
        Self {
            id,
            title: title.into(),
            start,
            end: start.wrapping_add(i64::from(duration)),
            duration,
            kind,
            priority: None,
            flexible: None,
            description: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.flexible = Some(flexible);
        self
    }

    pub fn start(&self) -> MinuteOfDay {
        self.start
    }

    pub fn end(&self) -> MinuteOfDay {
        self.end
    }

    pub fn duration(&self) -> u16 {
        self.duration
    }

    pub fn absolute_start(&self) -> u32 {
        u32::from(self.start.minutes())
    }

    /// End in minutes from the start of the day; exceeds 1440 when the block
    /// crosses midnight.
    pub fn absolute_end(&self) -> u32 {
        self.absolute_start() + u32::from(self.duration)
    }

    pub fn crosses_midnight(&self) -> bool {
        self.absolute_end() > u32::from(MINUTES_PER_DAY)
    }

    /// Moves the block to `start` and sets its duration, recomputing the end.
    pub fn set_span(&mut self, start: MinuteOfDay, duration: u16) {
        let duration = duration.clamp(1, MAX_BLOCK_DURATION);
        self.start = start;
        self.duration = duration;
        self.end = start.wrapping_add(i64::from(duration));
    }

    /// Sets both ends; the duration becomes the forward span between them.
    /// Returns `false` (and leaves the block unchanged) for a zero-length span.
    pub fn set_times(&mut self, start: MinuteOfDay, end: MinuteOfDay) -> bool {
        let span = time::span_minutes(start, end);
        if span == 0 || span > MAX_BLOCK_DURATION {
            return false;
        }
        self.start = start;
        self.end = end;
        self.duration = span;
        true
    }

    pub fn overlaps(&self, other: &Block) -> bool {
        !(self.absolute_end() <= other.absolute_start()
            || self.absolute_start() >= other.absolute_end())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockRecord {
    id: BlockId,
    title: String,
    start_time: MinuteOfDay,
    end_time: MinuteOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<u16>,
    #[serde(rename = "type")]
    kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flexible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TryFrom<BlockRecord> for Block {
    type Error = String;

    fn try_from(record: BlockRecord) -> Result<Self, Self::Error> {
        let span = time::span_minutes(record.start_time, record.end_time);
        if span == 0 {
            return Err(format!(
                "block {} ({}) has zero length",
                record.id.0, record.title
            ));
        }
        if let Some(duration) = record.duration {
            if duration != span {
                return Err(format!(
                    "block {} ({}) declares duration {duration} but spans {span} minutes",
                    record.id.0, record.title
                ));
            }
        }

        let mut block = Block::new(
            record.id,
            record.title,
            record.kind,
            record.start_time,
            span,
        );
        block.priority = record.priority;
        block.flexible = record.flexible;
        block.description = record.description;
        Ok(block)
    }
}

impl From<Block> for BlockRecord {
    fn from(block: Block) -> Self {
        Self {
            id: block.id,
            title: block.title,
            start_time: block.start,
            end_time: block.end,
            duration: Some(block.duration),
            kind: block.kind,
            priority: block.priority,
            flexible: block.flexible,
            description: block.description,
        }
    }
}

/// An ordered day of blocks.
///
/// Only the blocks are stored. Totals, balance ratios, suggestions and the
/// score are derived on demand and emitted alongside the blocks when
/// serialized; incoming aggregate fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ScheduleRecord", into = "ScheduleSnapshot")]
pub struct DailySchedule {
    blocks: Vec<Block>,
}

impl DailySchedule {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub(crate) fn position(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Next unused id (one past the current maximum).
    pub fn next_id(&self) -> BlockId {
        BlockId(self.blocks.iter().map(|b| b.id.0).max().unwrap_or(0) + 1)
    }

    pub fn metrics(&self) -> BalanceMetrics {
        balance::analyze(&self.blocks)
    }

    pub fn total_minutes(&self) -> u32 {
        self.blocks.iter().map(|b| u32::from(b.duration())).sum()
    }

    /// Total scheduled hours, rounded to one decimal.
    pub fn total_hours(&self) -> f64 {
        (f64::from(self.total_minutes()) / 60.0 * 10.0).round() / 10.0
    }

    pub fn work_life_balance(&self) -> WorkLifeBalance {
        balance::work_life_balance(&self.metrics())
    }

    pub fn suggestions(&self) -> Vec<String> {
        suggest::suggestion_messages(&self.metrics())
    }

    pub fn optimization_score(&self) -> u8 {
        balance::optimization_score(&self.metrics())
    }

    pub fn stats(&self) -> PlanStats {
        stats::plan_stats(&self.blocks)
    }

    pub fn energy_notes(&self) -> Vec<EnergyNote> {
        stats::energy_notes(&self.blocks)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleRecord {
    #[serde(default)]
    blocks: Vec<Block>,
}

impl From<ScheduleRecord> for DailySchedule {
    fn from(record: ScheduleRecord) -> Self {
        Self::new(record.blocks)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleSnapshot {
    blocks: Vec<Block>,
    total_hours: f64,
    work_life_balance: WorkLifeBalance,
    suggestions: Vec<String>,
    optimization_score: u8,
    stats: PlanStats,
    energy: Vec<EnergyNote>,
}

impl From<DailySchedule> for ScheduleSnapshot {
    fn from(schedule: DailySchedule) -> Self {
        let metrics = schedule.metrics();
        Self {
            total_hours: schedule.total_hours(),
            work_life_balance: balance::work_life_balance(&metrics),
            suggestions: suggest::suggestion_messages(&metrics),
            optimization_score: balance::optimization_score(&metrics),
            stats: schedule.stats(),
            energy: schedule.energy_notes(),
            blocks: schedule.blocks,
        }
    }
}
