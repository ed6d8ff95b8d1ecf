use tracing::{debug, warn};

use crate::model::{Block, BlockId, BlockKind, Priority, MAX_BLOCK_DURATION};
use crate::time::{self, MinuteOfDay, MINUTES_PER_DAY};

/// Shortest block the repairer will emit.
pub const MIN_REPAIRED_DURATION: u16 = 15;

/// Longest span an end-before-start pair is read as crossing midnight. Longer
/// wrapped spans (e.g. 09:00 to 08:00) are treated as data errors.
pub const MAX_OVERNIGHT_SPAN: u16 = 12 * 60;

/// An activity request that has not been placed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub kind: BlockKind,
    pub priority: Option<Priority>,
    pub flexible: Option<bool>,
    pub description: Option<String>,
    pub start: MinuteOfDay,
    pub end: Option<MinuteOfDay>,
    pub duration: Option<u16>,
}

impl Candidate {
    pub fn new(title: impl Into<String>, kind: BlockKind, start: MinuteOfDay) -> Self {
        Self {
            title: title.into(),
            kind,
            priority: None,
            flexible: None,
            description: None,
            start,
            end: None,
            duration: None,
        }
    }

    pub fn with_end(mut self, end: MinuteOfDay) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_duration(mut self, duration: u16) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Duration implied by the request, before the minimum is applied.
    /// An explicit duration wins over the end time.
    pub fn requested_duration(&self) -> u16 {
        if let Some(duration) = self.duration {
            return duration;
        }
        let Some(end) = self.end else {
            return 0;
        };
        let span = time::span_minutes(self.start, end);
        if end < self.start && span > MAX_OVERNIGHT_SPAN {
            return 0;
        }
        span
    }
}

impl From<Block> for Candidate {
    fn from(block: Block) -> Self {
        Self {
            start: block.start(),
            end: Some(block.end()),
            duration: Some(block.duration()),
            title: block.title,
            kind: block.kind,
            priority: block.priority,
            flexible: block.flexible,
            description: block.description,
        }
    }
}

/// Sorts, de-overlaps and renumbers `candidates`.
///
/// The output is sorted by start, mutually non-overlapping, every block is at
/// least [`MIN_REPAIRED_DURATION`] long and ids run `1..=N`. A candidate pushed
/// past the end of the day is dropped.
pub fn repair(candidates: Vec<Candidate>) -> Vec<Block> {
    let mut sorted = candidates;
    // Stable: equal starts keep their input order.
    sorted.sort_by_key(|c| c.start);

    let mut repaired: Vec<Block> = Vec::with_capacity(sorted.len());
    let mut last_end: u32 = 0;

    for candidate in sorted {
        let requested = candidate.requested_duration();
        let duration = requested.clamp(MIN_REPAIRED_DURATION, MAX_BLOCK_DURATION);
        if duration != requested {
            debug!(
                target: "dayflow::repair",
                title = %candidate.title,
                requested,
                duration,
                "duration clamped"
            );
        }

        let mut start = u32::from(candidate.start.minutes());
        if start < last_end {
            debug!(
                target: "dayflow::repair",
                title = %candidate.title,
                from = %candidate.start,
                to = %time::minutes_to_time(i64::from(last_end)),
                "start pushed past predecessor"
            );
            start = last_end;
        }

        if start >= u32::from(MINUTES_PER_DAY) {
            warn!(
                target: "dayflow::repair",
                title = %candidate.title,
                "no room left in the day; block dropped"
            );
            continue;
        }

        let id = BlockId(repaired.len() as u32 + 1);
        let mut block = Block::new(
            id,
            candidate.title,
            candidate.kind,
            MinuteOfDay::wrapping(i64::from(start)),
            duration,
        );
        block.priority = candidate.priority;
        block.flexible = candidate.flexible;
        block.description = candidate.description;

        last_end = block.absolute_end();
        repaired.push(block);
    }

    repaired
}

/// Repairs an existing block list. Applying it to its own output is a no-op.
pub fn repair_blocks(blocks: &[Block]) -> Vec<Block> {
    repair(blocks.iter().cloned().map(Candidate::from).collect())
}

/// True when consecutive blocks never overlap and starts never decrease.
pub fn is_sequential(blocks: &[Block]) -> bool {
    blocks
        .windows(2)
        .all(|pair| pair[0].absolute_end() <= pair[1].absolute_start())
}
