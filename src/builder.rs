use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::extract::{self, Activity};
use crate::llm::{IntentParser, ParsedDay};
use crate::model::{Block, BlockId, BlockKind, DailySchedule, Priority, MAX_BLOCK_DURATION};
use crate::repair::{self, Candidate, MIN_REPAIRED_DURATION};
use crate::time::{MinuteOfDay, MINUTES_PER_DAY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Where untimed activities start being laid out.
    pub day_start: MinuteOfDay,
    pub lunch_time: MinuteOfDay,
    pub lunch_duration: u16,
    pub sleep_start: MinuteOfDay,
    pub sleep_duration: u16,
    pub meditation_duration: u16,
    /// Work longer than this is split into chunks separated by short breaks.
    pub split_work_over: u16,
    pub work_chunk: u16,
    pub break_duration: u16,
    pub add_recommendations: bool,
    /// Lay untimed activities out by priority, then kind, instead of text order.
    pub order_by_priority: bool,
    /// Insert a short wellness break after long uninterrupted work.
    pub micro_breaks: bool,
    pub micro_break_after: u16,
    pub micro_break_duration: u16,
    pub fill_gaps: bool,
    /// Smallest idle gap that `fill_gaps` turns into free time.
    pub min_gap_fill: u16,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            day_start: MinuteOfDay::wrapping(7 * 60),
            lunch_time: MinuteOfDay::wrapping(12 * 60 + 30),
            lunch_duration: 45,
            sleep_start: MinuteOfDay::wrapping(23 * 60),
            sleep_duration: 8 * 60,
            meditation_duration: 10,
            split_work_over: 120,
            work_chunk: 90,
            break_duration: 10,
            add_recommendations: true,
            order_by_priority: true,
            micro_breaks: true,
            micro_break_after: 120,
            micro_break_duration: MIN_REPAIRED_DURATION,
            fill_gaps: false,
            min_gap_fill: 30,
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.work_chunk >= 15, "work_chunk must be at least 15 minutes");
        ensure!(
            self.split_work_over >= self.work_chunk,
            "split_work_over must be >= work_chunk"
        );
        ensure!(
            self.break_duration >= 5,
            "break_duration must be at least 5 minutes"
        );
        ensure!(
            (MIN_REPAIRED_DURATION..=MAX_BLOCK_DURATION).contains(&self.sleep_duration),
            "sleep_duration must be between {MIN_REPAIRED_DURATION} and {MAX_BLOCK_DURATION}"
        );
        ensure!(
            self.lunch_duration >= MIN_REPAIRED_DURATION,
            "lunch_duration must be at least {MIN_REPAIRED_DURATION}"
        );
        ensure!(
            self.meditation_duration >= 5,
            "meditation_duration must be at least 5 minutes"
        );
        ensure!(
            self.micro_break_after >= 15,
            "micro_break_after must be at least 15 minutes"
        );
        ensure!(
            self.micro_break_duration >= MIN_REPAIRED_DURATION,
            "micro_break_duration must be at least {MIN_REPAIRED_DURATION}"
        );
        ensure!(
            self.min_gap_fill >= MIN_REPAIRED_DURATION,
            "min_gap_fill must be at least {MIN_REPAIRED_DURATION}"
        );
        Ok(())
    }
}

/// Where the activities of a built schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Service,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub schedule: DailySchedule,
    pub source: IntentSource,
}

#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    config: BuilderConfig,
}

/// One block-sized part of an activity; long work yields several.
struct Piece {
    title: String,
    kind: BlockKind,
    priority: Priority,
    duration: u16,
}

impl Piece {
    fn into_candidate(self, at: u32, flexible: bool) -> Candidate {
        let mut candidate = Candidate::new(
            self.title,
            self.kind,
            MinuteOfDay::wrapping(i64::from(at)),
        )
        .with_priority(self.priority);
        candidate.flexible = Some(flexible);
        candidate
    }
}

const DAY: u32 = MINUTES_PER_DAY as u32;

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

/// Body and mind care first, then work and everything else, then breaks,
/// then personal time.
fn kind_rank(kind: BlockKind) -> u8 {
    match kind {
        BlockKind::Wellness | BlockKind::Exercise => 0,
        BlockKind::Work | BlockKind::Meal | BlockKind::Sleep | BlockKind::Commute => 1,
        BlockKind::Break => 2,
        BlockKind::Personal => 3,
    }
}

impl ScheduleBuilder {
    pub fn new(config: BuilderConfig) -> Result<Self, BuildError> {
        config.validate().map_err(BuildError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Asks `parser` for the day and falls back to local extraction if the
    /// service fails or returns something unusable.
    pub async fn build_with<P: IntentParser>(
        &self,
        parser: &P,
        text: &str,
    ) -> Result<BuildOutcome, BuildError> {
        let parsed = parser.parse_day(text).await;
        self.build_from_parsed(text, parsed)
    }

    /// Builds from an already-obtained service result.
    pub fn build_from_parsed(
        &self,
        text: &str,
        parsed: Result<ParsedDay>,
    ) -> Result<BuildOutcome, BuildError> {
        let candidates = parsed.and_then(|day| day.to_candidates());
        match candidates {
            Ok(candidates) => {
                let blocks = self.finish(candidates, false);
                if !blocks.is_empty() {
                    info!(
                        target: "dayflow::builder",
                        blocks = blocks.len(),
                        "schedule built from intent service"
                    );
                    return Ok(BuildOutcome {
                        schedule: DailySchedule::new(blocks),
                        source: IntentSource::Service,
                    });
                }
                warn!(
                    target: "dayflow::builder",
                    "intent service result left no blocks; using local extraction"
                );
            }
            Err(err) => {
                warn!(
                    target: "dayflow::builder",
                    error = %format!("{err:#}"),
                    "intent service unavailable; using local extraction"
                );
            }
        }

        let schedule = self.build_local(text)?;
        Ok(BuildOutcome {
            schedule,
            source: IntentSource::Fallback,
        })
    }

    /// Builds with the local rule-based extractor only.
    pub fn build_local(&self, text: &str) -> Result<DailySchedule, BuildError> {
        let mut activities = extract::extract_activities(text);
        if activities.is_empty() {
            return Err(BuildError::NoSchedule);
        }

        let breaks = !extract::skips_breaks(text);
        if self.config.order_by_priority {
            // Stable, so equal ranks keep their text order.
            activities.sort_by_key(|a| (priority_rank(a.priority), kind_rank(a.kind)));
        }
        if self.config.add_recommendations && breaks {
            self.add_recommendations(&mut activities);
        }

        let candidates = self.place(&activities, breaks);
        let blocks = self.finish(candidates, breaks && self.config.micro_breaks);
        if blocks.is_empty() {
            return Err(BuildError::NoSchedule);
        }

        info!(
            target: "dayflow::builder",
            activities = activities.len(),
            blocks = blocks.len(),
            "schedule built from local extraction"
        );
        Ok(DailySchedule::new(blocks))
    }

    fn finish(&self, candidates: Vec<Candidate>, micro_breaks: bool) -> Vec<Block> {
        let mut blocks = repair::repair(candidates);
        if micro_breaks {
            blocks = self.add_micro_breaks(blocks);
        }
        if self.config.fill_gaps {
            self.fill_gaps(blocks)
        } else {
            blocks
        }
    }

    fn add_recommendations(&self, activities: &mut Vec<Activity>) {
        let has = |kind: BlockKind| activities.iter().any(|a| a.kind == kind);
        let work: u32 = activities
            .iter()
            .filter(|a| a.kind == BlockKind::Work)
            .map(|a| u32::from(a.duration))
            .sum();

        let wants_lunch = work > 4 * 60 && !has(BlockKind::Meal);
        let wants_meditation = activities.len() > 2 && !has(BlockKind::Wellness);
        let wants_sleep = !has(BlockKind::Sleep);

        if wants_meditation {
            debug!(target: "dayflow::builder", "recommending morning meditation");
            activities.insert(
                0,
                Activity {
                    title: "Morning Meditation".to_string(),
                    kind: BlockKind::Wellness,
                    priority: Priority::Low,
                    duration: self.config.meditation_duration,
                    start: None,
                    end: None,
                },
            );
        }
        if wants_lunch {
            debug!(target: "dayflow::builder", "recommending lunch");
            activities.push(Activity {
                title: "Lunch".to_string(),
                kind: BlockKind::Meal,
                priority: Priority::Medium,
                duration: self.config.lunch_duration,
                start: Some(self.config.lunch_time),
                end: None,
            });
        }
        if wants_sleep {
            debug!(target: "dayflow::builder", "recommending sleep");
            activities.push(Activity {
                title: "Sleep".to_string(),
                kind: BlockKind::Sleep,
                priority: Priority::High,
                duration: self.config.sleep_duration,
                start: Some(self.config.sleep_start),
                end: None,
            });
        }
    }

    /// Long work becomes chunks with short breaks between them, unless the
    /// text asked for no breaks. A timed range that runs past midnight stays
    /// in one piece so every part keeps its place after the start.
    fn pieces(&self, activity: &Activity, breaks: bool) -> Vec<Piece> {
        let crosses_midnight = self.anchor(activity).is_some_and(|start| {
            u32::from(start.minutes()) + u32::from(activity.duration) > DAY
        });
        if !breaks
            || crosses_midnight
            || activity.kind != BlockKind::Work
            || activity.duration <= self.config.split_work_over
        {
            return vec![Piece {
                title: activity.title.clone(),
                kind: activity.kind,
                priority: activity.priority,
                duration: activity.duration,
            }];
        }

        let mut pieces = Vec::new();
        let mut remaining = activity.duration;
        let mut part = 1;
        while remaining > 0 {
            let chunk = remaining.min(self.config.work_chunk);
            pieces.push(Piece {
                title: format!("{} (Part {part})", activity.title),
                kind: BlockKind::Work,
                priority: activity.priority,
                duration: chunk,
            });
            remaining -= chunk;
            part += 1;
            if remaining > 0 {
                pieces.push(Piece {
                    title: "Short Break".to_string(),
                    kind: BlockKind::Break,
                    priority: Priority::Low,
                    duration: self.config.break_duration,
                });
            }
        }
        pieces
    }

    /// Fixed start of an activity: its own clock time, or bedtime for sleep.
    fn anchor(&self, activity: &Activity) -> Option<MinuteOfDay> {
        match activity.kind {
            BlockKind::Sleep => activity.start.or(Some(self.config.sleep_start)),
            _ => activity.start,
        }
    }

    /// Turns activities into candidates. Timed activities keep their start;
    /// untimed ones follow each other from `day_start` in the order given,
    /// stepping over the intervals the timed ones occupy.
    fn place(&self, activities: &[Activity], breaks: bool) -> Vec<Candidate> {
        let reserved: Vec<(u32, u32)> = activities
            .iter()
            .filter_map(|a| {
                let start = u32::from(self.anchor(a)?.minutes());
                let span: u32 = self.pieces(a, breaks).iter().map(|p| u32::from(p.duration)).sum();
                Some((start, start + span))
            })
            .collect();

        let mut candidates = Vec::new();
        let mut cursor = u32::from(self.config.day_start.minutes());

        for activity in activities {
            let pieces = self.pieces(activity, breaks);

            if let Some(start) = self.anchor(activity) {
                let split = pieces.len() > 1;
                let mut at = u32::from(start.minutes());
                for piece in pieces {
                    let duration = piece.duration;
                    let candidate = piece.into_candidate(at, false);
                    // A clock range fixes the end only when nothing was split.
                    candidates.push(match activity.end {
                        Some(end) if !split => candidate.with_end(end),
                        _ => candidate.with_duration(duration),
                    });
                    at += u32::from(duration);
                }
                continue;
            }

            for piece in pieces {
                let duration = u32::from(piece.duration);
                while let Some(&(_, end)) = reserved
                    .iter()
                    .find(|&&(start, end)| start < cursor + duration && cursor < end)
                {
                    cursor = end;
                }
                if cursor >= DAY {
                    warn!(
                        target: "dayflow::builder",
                        title = %piece.title,
                        "no room left in the day; activity skipped"
                    );
                    break;
                }
                let candidate = piece.into_candidate(cursor, true);
                candidates.push(candidate.with_duration(duration as u16));
                cursor += duration;
            }
        }

        candidates
    }

    /// After `micro_break_after` minutes of back-to-back work, puts a
    /// "Hydration & Stretch" block before the next activity unless that is
    /// already a break. Later blocks shift as repair requires.
    fn add_micro_breaks(&self, blocks: Vec<Block>) -> Vec<Block> {
        let threshold = u32::from(self.config.micro_break_after);
        let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
        let mut stretch = 0u32;
        let mut added = 0usize;

        let mut iter = blocks.into_iter().peekable();
        while let Some(block) = iter.next() {
            stretch = if block.kind == BlockKind::Work {
                stretch + u32::from(block.duration())
            } else {
                0
            };
            let end = block.absolute_end();
            out.push(block);

            let Some(next) = iter.peek() else {
                continue;
            };
            if stretch >= threshold && next.kind != BlockKind::Break && end < DAY {
                out.push(
                    Block::new(
                        BlockId(0),
                        "Hydration & Stretch",
                        BlockKind::Wellness,
                        MinuteOfDay::wrapping(i64::from(end)),
                        self.config.micro_break_duration,
                    )
                    .with_priority(Priority::Low)
                    .with_flexible(true),
                );
                stretch = 0;
                added += 1;
            }
        }

        if added == 0 {
            return out;
        }
        debug!(target: "dayflow::builder", added, "micro-breaks inserted");
        repair::repair_blocks(&out)
    }

    /// Inserts personal "Free Time" blocks into internal gaps of at least
    /// `min_gap_fill` minutes, then renumbers.
    fn fill_gaps(&self, blocks: Vec<Block>) -> Vec<Block> {
        let mut filled: Vec<Block> = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(prev) = filled.last() {
                let gap = block.absolute_start().saturating_sub(prev.absolute_end());
                if gap >= u32::from(self.config.min_gap_fill) {
                    let start = MinuteOfDay::wrapping(i64::from(prev.absolute_end()));
                    filled.push(
                        Block::new(BlockId(0), "Free Time", BlockKind::Personal, start, gap as u16)
                            .with_priority(Priority::Low)
                            .with_flexible(true),
                    );
                }
            }
            filled.push(block);
        }
        repair::repair_blocks(&filled)
    }
}
