use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EditRejection;
use crate::model::{Block, BlockId, DailySchedule, MAX_BLOCK_DURATION};
use crate::repair;
use crate::time::{self, MinuteOfDay, MINUTES_PER_DAY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub snap_step: u16,
    pub min_duration: u16,
    pub nudge_step: u16,
    /// Must match the layout's hour height so pointer deltas map to minutes.
    pub hour_height: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_step: time::DEFAULT_SNAP_STEP,
            min_duration: 15,
            nudge_step: 15,
            hour_height: 60.0,
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.snap_step >= 1, "snap_step must be at least 1");
        ensure!(
            self.min_duration >= 1 && self.min_duration < MAX_BLOCK_DURATION,
            "min_duration must be between 1 and {MAX_BLOCK_DURATION}"
        );
        ensure!(self.nudge_step >= 1, "nudge_step must be at least 1");
        ensure!(
            self.hour_height.is_finite() && self.hour_height > 0.0,
            "hour_height must be a positive number"
        );
        Ok(())
    }

    fn pixels_per_minute(&self) -> f64 {
        self.hour_height / 60.0
    }
}

/// One explicit edit. Times are candidate values; [`reduce`] snaps and clamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    MoveTo { id: BlockId, start: i64 },
    ResizeTo { id: BlockId, end: i64 },
    Nudge { id: BlockId, delta: i64 },
    NudgeEnd { id: BlockId, delta: i64 },
    SetTimes { id: BlockId, start: String, end: String },
    Rename { id: BlockId, title: String },
    Delete { id: BlockId },
    Insert { block: Block },
    Repair,
}

impl EditAction {
    pub fn target(&self) -> Option<BlockId> {
        match self {
            EditAction::MoveTo { id, .. }
            | EditAction::ResizeTo { id, .. }
            | EditAction::Nudge { id, .. }
            | EditAction::NudgeEnd { id, .. }
            | EditAction::SetTimes { id, .. }
            | EditAction::Rename { id, .. }
            | EditAction::Delete { id } => Some(*id),
            EditAction::Insert { block } => Some(block.id),
            EditAction::Repair => None,
        }
    }
}

const DAY: i64 = MINUTES_PER_DAY as i64;

/// Latest start a move may reach. A block that already runs past midnight
/// keeps its span, so only its start has to stay on the day face.
fn latest_start(duration: u16, overnight: bool, snap_step: u16) -> i64 {
    if overnight {
        (DAY - i64::from(snap_step)).max(0)
    } else {
        DAY - i64::from(duration)
    }
}

fn clamp_start(start: i64, duration: u16, overnight: bool, snap_step: u16) -> i64 {
    start.clamp(0, latest_start(duration, overnight, snap_step))
}

fn clamp_end(start: i64, end: i64, min_duration: u16, overnight: bool) -> i64 {
    let lower = start + i64::from(min_duration);
    let longest = start + i64::from(MAX_BLOCK_DURATION);
    let upper = if overnight { longest } else { DAY.min(longest) };
    end.clamp(lower, upper.max(lower))
}

/// Accepts `24:00` as the end of the day in addition to regular times.
fn parse_end(raw: &str) -> Result<i64, EditRejection> {
    if raw.trim() == "24:00" {
        return Ok(DAY);
    }
    Ok(i64::from(time::time_to_minutes(raw)?.minutes()))
}

/// Applies `action` to a copy of `schedule`.
///
/// Pointer-driven edits are snapped and clamped into the day; direct time
/// entry ([`EditAction::SetTimes`]) is validated and rejected instead.
pub fn reduce(
    schedule: &DailySchedule,
    action: &EditAction,
    config: &EditorConfig,
) -> Result<DailySchedule, EditRejection> {
    let mut next = schedule.clone();

    if let EditAction::Repair = action {
        return Ok(DailySchedule::new(repair::repair_blocks(schedule.blocks())));
    }

    if let EditAction::Insert { block } = action {
        let mut block = block.clone();
        if block.title.trim().is_empty() {
            return Err(EditRejection::EmptyTitle);
        }
        if next.block(block.id).is_some() {
            block.id = next.next_id();
        }
        next.blocks_mut().push(block);
        return Ok(next);
    }

    let id = action.target().ok_or(EditRejection::UnknownBlock(BlockId(0)))?;
    let idx = next
        .position(id)
        .ok_or(EditRejection::UnknownBlock(id))?;

    if let EditAction::Delete { .. } = action {
        next.blocks_mut().remove(idx);
        return Ok(next);
    }

    let block = &mut next.blocks_mut()[idx];
    let start = i64::from(block.start().minutes());
    let end = i64::from(block.absolute_end());
    let duration = block.duration();
    let overnight = block.crosses_midnight();

    match action {
        EditAction::MoveTo { start: candidate, .. } => {
            let snapped = time::snap_to_grid(*candidate, config.snap_step);
            let start = clamp_start(snapped, duration, overnight, config.snap_step);
            block.set_span(MinuteOfDay::wrapping(start), duration);
        }
        EditAction::ResizeTo { end: candidate, .. } => {
            let snapped = time::snap_to_grid(*candidate, config.snap_step);
            let end = clamp_end(start, snapped, config.min_duration, overnight);
            block.set_span(block.start(), (end - start) as u16);
        }
        EditAction::Nudge { delta, .. } => {
            let start = clamp_start(start + delta, duration, overnight, config.snap_step);
            block.set_span(MinuteOfDay::wrapping(start), duration);
        }
        EditAction::NudgeEnd { delta, .. } => {
            let end = clamp_end(start, end + delta, config.min_duration, overnight);
            block.set_span(block.start(), (end - start) as u16);
        }
        EditAction::SetTimes {
            start: raw_start,
            end: raw_end,
            ..
        } => {
            let new_start = i64::from(time::time_to_minutes(raw_start)?.minutes());
            let new_end = parse_end(raw_end)?;
            if new_end < new_start {
                return Err(EditRejection::EndBeforeStart {
                    start: raw_start.clone(),
                    end: raw_end.clone(),
                });
            }
            let span = new_end - new_start;
            if span < i64::from(config.min_duration) {
                return Err(EditRejection::TooShort {
                    actual: span,
                    minimum: config.min_duration,
                });
            }
            if span > i64::from(MAX_BLOCK_DURATION) {
                return Err(EditRejection::OutOfBounds {
                    start: new_start,
                    end: new_end,
                });
            }
            block.set_span(MinuteOfDay::wrapping(new_start), span as u16);
        }
        EditAction::Rename { title, .. } => {
            let title = title.trim();
            if title.is_empty() {
                return Err(EditRejection::EmptyTitle);
            }
            block.title = title.to_string();
        }
        EditAction::Delete { .. } | EditAction::Insert { .. } | EditAction::Repair => {}
    }

    Ok(next)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    Body,
    BottomEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Up,
    Down,
    Delete,
    Backspace,
    Enter,
    Space,
    Escape,
}

/// Raw UI input. `y` is the pointer position in timeline pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown {
        block: BlockId,
        #[serde(default = "default_handle")]
        handle: Handle,
        y: f64,
    },
    PointerMove {
        y: f64,
    },
    PointerUp,
    DoubleClick {
        block: BlockId,
    },
    Focus {
        block: BlockId,
    },
    Key {
        key: Key,
        #[serde(default)]
        shift: bool,
    },
    Text {
        value: String,
    },
    Blur,
}

fn default_handle() -> Handle {
    Handle::Body
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Dragging {
        id: BlockId,
        /// Pointer distance from the block's top edge at pointer-down.
        grab_offset: f64,
        original_start: MinuteOfDay,
    },
    Resizing {
        id: BlockId,
        anchor_y: f64,
        original_end: u32,
    },
    EditingTitle {
        id: BlockId,
        draft: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    config: EditorConfig,
    state: EditorState,
    focus: Option<BlockId>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: EditorState::Idle,
            focus: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn focus(&self) -> Option<BlockId> {
        self.focus
    }

    /// Drops focus and any gesture on a block that no longer exists.
    pub fn forget(&mut self, id: BlockId) {
        if self.focus == Some(id) {
            self.focus = None;
        }
        let active = match &self.state {
            EditorState::Idle => None,
            EditorState::Dragging { id, .. }
            | EditorState::Resizing { id, .. }
            | EditorState::EditingTitle { id, .. } => Some(*id),
        };
        if active == Some(id) {
            self.state = EditorState::Idle;
        }
    }

    /// Resets to idle with nothing focused (e.g. after the schedule is replaced).
    pub fn reset(&mut self) {
        self.state = EditorState::Idle;
        self.focus = None;
    }

    fn minutes_from_pixels(&self, px: f64) -> i64 {
        (px / self.config.pixels_per_minute()).round() as i64
    }

    /// Advances the state machine. Returns the edit the input implies, if any.
    pub fn handle(&mut self, schedule: &DailySchedule, input: &InputEvent) -> Option<EditAction> {
        let state = std::mem::take(&mut self.state);
        let (state, action) = self.transition(schedule, state, input);
        self.state = state;
        action
    }

    fn transition(
        &mut self,
        schedule: &DailySchedule,
        state: EditorState,
        input: &InputEvent,
    ) -> (EditorState, Option<EditAction>) {
        match (state, input) {
            (EditorState::Idle, InputEvent::PointerDown { block, handle, y }) => {
                let Some(target) = schedule.block(*block) else {
                    return (EditorState::Idle, None);
                };
                self.focus = Some(*block);
                let state = match handle {
                    Handle::Body => {
                        let top = f64::from(target.start().minutes())
                            * self.config.pixels_per_minute();
                        EditorState::Dragging {
                            id: *block,
                            grab_offset: y - top,
                            original_start: target.start(),
                        }
                    }
                    Handle::BottomEdge => EditorState::Resizing {
                        id: *block,
                        anchor_y: *y,
                        original_end: target.absolute_end(),
                    },
                };
                (state, None)
            }

            (
                EditorState::Dragging {
                    id,
                    grab_offset,
                    original_start,
                },
                InputEvent::PointerMove { y },
            ) => {
                let candidate = self.minutes_from_pixels(y - grab_offset);
                (
                    EditorState::Dragging {
                        id,
                        grab_offset,
                        original_start,
                    },
                    Some(EditAction::MoveTo {
                        id,
                        start: candidate,
                    }),
                )
            }

            (
                EditorState::Resizing {
                    id,
                    anchor_y,
                    original_end,
                },
                InputEvent::PointerMove { y },
            ) => {
                let delta = self.minutes_from_pixels(y - anchor_y);
                (
                    EditorState::Resizing {
                        id,
                        anchor_y,
                        original_end,
                    },
                    Some(EditAction::ResizeTo {
                        id,
                        end: i64::from(original_end) + delta,
                    }),
                )
            }

            (EditorState::Dragging { .. } | EditorState::Resizing { .. }, InputEvent::PointerUp) => {
                (EditorState::Idle, None)
            }

            (EditorState::Idle, InputEvent::DoubleClick { block }) => {
                self.begin_title_edit(schedule, *block)
            }

            (EditorState::Idle, InputEvent::Focus { block }) => {
                if schedule.block(*block).is_some() {
                    self.focus = Some(*block);
                }
                (EditorState::Idle, None)
            }

            (EditorState::Idle, InputEvent::Blur) => {
                self.focus = None;
                (EditorState::Idle, None)
            }

            (EditorState::Idle, InputEvent::Key { key, shift }) => {
                let Some(id) = self.focus else {
                    return (EditorState::Idle, None);
                };
                let step = i64::from(self.config.nudge_step);
                match (key, shift) {
                    (Key::Up, false) => (EditorState::Idle, Some(EditAction::Nudge { id, delta: -step })),
                    (Key::Down, false) => (EditorState::Idle, Some(EditAction::Nudge { id, delta: step })),
                    (Key::Up, true) => (
                        EditorState::Idle,
                        Some(EditAction::NudgeEnd { id, delta: -step }),
                    ),
                    (Key::Down, true) => (
                        EditorState::Idle,
                        Some(EditAction::NudgeEnd { id, delta: step }),
                    ),
                    (Key::Delete | Key::Backspace, _) => {
                        self.focus = None;
                        (EditorState::Idle, Some(EditAction::Delete { id }))
                    }
                    (Key::Enter | Key::Space, _) => self.begin_title_edit(schedule, id),
                    (Key::Escape, _) => (EditorState::Idle, None),
                }
            }

            (EditorState::EditingTitle { id, .. }, InputEvent::Text { value }) => (
                EditorState::EditingTitle {
                    id,
                    draft: value.clone(),
                },
                None,
            ),

            (
                EditorState::EditingTitle { id, draft },
                InputEvent::Key {
                    key: Key::Enter, ..
                }
                | InputEvent::Blur,
            ) => (EditorState::Idle, Some(EditAction::Rename { id, title: draft })),

            (
                EditorState::EditingTitle { .. },
                InputEvent::Key {
                    key: Key::Escape, ..
                },
            ) => (EditorState::Idle, None),

            (state, input) => {
                debug!(target: "dayflow::editor", ?state, ?input, "input ignored");
                (state, None)
            }
        }
    }

    fn begin_title_edit(
        &mut self,
        schedule: &DailySchedule,
        id: BlockId,
    ) -> (EditorState, Option<EditAction>) {
        match schedule.block(id) {
            Some(block) => {
                self.focus = Some(id);
                (
                    EditorState::EditingTitle {
                        id,
                        draft: block.title.clone(),
                    },
                    None,
                )
            }
            None => (EditorState::Idle, None),
        }
    }
}
