use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::editor::{self, EditAction, Editor, EditorConfig, InputEvent};
use crate::error::{BuildError, EditRejection};
use crate::events::{Debouncer, EventBus, ScheduleEvent};
use crate::layout::{self, LayoutConfig, LayoutEvent};
use crate::model::{Block, BlockId, DailySchedule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last edit before suggestions are recomputed.
    pub debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { debounce_ms: 1000 }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.debounce_ms <= 60_000,
            "debounce_ms must be at most 60000"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One line of an input script: a UI event, or a pause on the virtual clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Wait { wait_ms: u64 },
    Input(InputEvent),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Waited { ms: u64, reanalyzed: bool },
    /// The input only moved the editor between states.
    NoEdit,
    Applied(EditAction),
    /// The edit was valid but left the schedule as it was (e.g. clamped).
    Unchanged(EditAction),
    Rejected(EditRejection),
}

/// What one script step did, with the target block before and after.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    pub at: Duration,
    pub step: Step,
    pub outcome: StepOutcome,
    pub before: Option<Block>,
    pub after: Option<Block>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub applied: usize,
    pub rejected: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct Session {
    schedule: Option<DailySchedule>,
    layout: Vec<LayoutEvent>,
    layout_config: LayoutConfig,
    editor: Editor,
    bus: EventBus,
    debouncer: Debouncer,
    suggestions: Vec<String>,
    last_token: u64,
    pending: Option<RequestToken>,
    now: Duration,
}

impl Session {
    pub fn new(layout: LayoutConfig, editor: EditorConfig, config: &SessionConfig) -> Self {
        Self {
            schedule: None,
            layout: Vec::new(),
            layout_config: layout,
            editor: Editor::new(editor),
            bus: EventBus::new(),
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            suggestions: Vec::new(),
            last_token: 0,
            pending: None,
            now: Duration::ZERO,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<ScheduleEvent> {
        self.bus.subscribe()
    }

    pub fn schedule(&self) -> Option<&DailySchedule> {
        self.schedule.as_ref()
    }

    pub fn into_schedule(self) -> Option<DailySchedule> {
        self.schedule
    }

    pub fn layout(&self) -> &[LayoutEvent] {
        &self.layout
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Suggestions as of the last re-analysis.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reanalysis_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Starts a generation request. Any earlier request still in flight is
    /// superseded and its result will be discarded.
    pub fn begin_request(&mut self) -> RequestToken {
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        if let Some(previous) = self.pending.replace(token) {
            debug!(
                target: "dayflow::session",
                previous = previous.0,
                token = token.0,
                "request superseded"
            );
        }
        self.editor.reset();
        self.bus
            .publish(ScheduleEvent::RequestStarted { token: token.0 });
        token
    }

    /// Installs the result of request `token` if it is still the latest one.
    /// Returns `false` when the result was discarded.
    pub fn complete_request(
        &mut self,
        token: RequestToken,
        result: Result<DailySchedule, BuildError>,
    ) -> bool {
        if self.pending != Some(token) {
            debug!(
                target: "dayflow::session",
                token = token.0,
                "stale request result discarded"
            );
            self.bus
                .publish(ScheduleEvent::RequestDiscarded { token: token.0 });
            return false;
        }
        self.pending = None;

        match result {
            Ok(schedule) => self.load(schedule),
            Err(err) => {
                info!(target: "dayflow::session", error = %err, "schedule generation failed");
                self.bus.publish(ScheduleEvent::BuildFailed {
                    token: token.0,
                    reason: err.to_string(),
                });
            }
        }
        true
    }

    /// Replaces the schedule outright and analyzes it immediately.
    pub fn load(&mut self, schedule: DailySchedule) {
        let blocks = schedule.len();
        self.schedule = Some(schedule);
        self.editor.reset();
        self.bus.publish(ScheduleEvent::ScheduleReplaced { blocks });
        self.relayout();
        self.debouncer.cancel();
        self.reanalyze();
    }

    /// Feeds one UI event through the editor and applies the edit it implies.
    pub fn input(&mut self, event: &InputEvent) -> Result<Option<EditAction>, EditRejection> {
        self.ensure_editable()?;
        let Some(schedule) = self.schedule.as_ref() else {
            return Err(EditRejection::NoSchedule);
        };
        match self.editor.handle(schedule, event) {
            Some(action) => {
                self.apply(action.clone())?;
                Ok(Some(action))
            }
            None => Ok(None),
        }
    }

    /// Applies an explicit edit. Returns whether the schedule changed.
    pub fn apply(&mut self, action: EditAction) -> Result<bool, EditRejection> {
        self.ensure_editable()?;
        let Some(current) = self.schedule.as_ref() else {
            return Err(EditRejection::NoSchedule);
        };

        let next = match editor::reduce(current, &action, self.editor.config()) {
            Ok(next) => next,
            Err(rejection) => {
                debug!(
                    target: "dayflow::session",
                    ?action,
                    reason = %rejection,
                    "edit rejected"
                );
                self.bus.publish(ScheduleEvent::EditRejected {
                    reason: rejection.to_string(),
                });
                return Err(rejection);
            }
        };

        if next == *current {
            return Ok(false);
        }

        let event = match &action {
            EditAction::Delete { id } => {
                self.editor.forget(*id);
                ScheduleEvent::BlockRemoved { id: *id }
            }
            EditAction::Insert { .. } => ScheduleEvent::BlockAdded {
                id: next.blocks().last().map(|b| b.id).unwrap_or(BlockId(0)),
            },
            EditAction::Repair => {
                self.editor.reset();
                ScheduleEvent::BlocksRenumbered { blocks: next.len() }
            }
            other => ScheduleEvent::BlockChanged {
                id: other.target().unwrap_or(BlockId(0)),
            },
        };

        self.schedule = Some(next);
        self.bus.publish(event);
        self.relayout();
        self.debouncer.poke(self.now);
        Ok(true)
    }

    /// Moves the virtual clock to `now` and runs a due re-analysis.
    /// Returns whether suggestions were recomputed.
    pub fn tick(&mut self, now: Duration) -> bool {
        self.now = self.now.max(now);
        if self.debouncer.poll(self.now) {
            self.reanalyze();
            return true;
        }
        false
    }

    pub fn advance(&mut self, by: Duration) -> bool {
        self.tick(self.now + by)
    }

    /// Runs a pending re-analysis without waiting for the quiet period.
    pub fn flush(&mut self) -> bool {
        if self.debouncer.is_pending() {
            self.debouncer.cancel();
            self.reanalyze();
            return true;
        }
        false
    }

    /// Plays `script` against the session on its virtual clock.
    pub fn replay(&mut self, script: &Script) -> (Vec<StepRecord>, ReplaySummary) {
        let started = self.now;
        let mut records = Vec::with_capacity(script.steps.len());
        let mut summary = ReplaySummary {
            steps: script.steps.len(),
            ..Default::default()
        };

        for (index, step) in script.steps.iter().enumerate() {
            let record = self.replay_step(index, step);
            match &record.outcome {
                StepOutcome::Applied(_) => summary.applied += 1,
                StepOutcome::Rejected(_) => summary.rejected += 1,
                _ => {}
            }
            records.push(record);
        }

        self.flush();
        summary.elapsed_ms = (self.now - started).as_millis().try_into().unwrap_or(u64::MAX);
        (records, summary)
    }

    fn replay_step(&mut self, index: usize, step: &Step) -> StepRecord {
        let at = self.now;
        match step {
            Step::Wait { wait_ms } => {
                let reanalyzed = self.advance(Duration::from_millis(*wait_ms));
                StepRecord {
                    index,
                    at,
                    step: step.clone(),
                    outcome: StepOutcome::Waited {
                        ms: *wait_ms,
                        reanalyzed,
                    },
                    before: None,
                    after: None,
                }
            }
            Step::Input(event) => {
                let before_schedule = self.schedule.clone();
                let result = self.input(event);

                let target = match &result {
                    Ok(Some(action)) => action.target(),
                    _ => None,
                };
                let lookup = |schedule: Option<&DailySchedule>| {
                    target.and_then(|id| schedule.and_then(|s| s.block(id)).cloned())
                };
                let before = lookup(before_schedule.as_ref());
                let after = lookup(self.schedule.as_ref());

                let outcome = match result {
                    Ok(None) => StepOutcome::NoEdit,
                    Ok(Some(action)) if before_schedule.as_ref() == self.schedule.as_ref() => {
                        StepOutcome::Unchanged(action)
                    }
                    Ok(Some(action)) => StepOutcome::Applied(action),
                    Err(rejection) => StepOutcome::Rejected(rejection),
                };

                StepRecord {
                    index,
                    at,
                    step: step.clone(),
                    outcome,
                    before,
                    after,
                }
            }
        }
    }

    fn ensure_editable(&mut self) -> Result<(), EditRejection> {
        if self.is_busy() {
            self.bus.publish(ScheduleEvent::EditRejected {
                reason: EditRejection::Busy.to_string(),
            });
            return Err(EditRejection::Busy);
        }
        Ok(())
    }

    fn relayout(&mut self) {
        self.layout = match &self.schedule {
            Some(schedule) => layout::compute_layout(schedule.blocks(), &self.layout_config),
            None => Vec::new(),
        };
        self.bus.publish(ScheduleEvent::LayoutUpdated {
            events: self.layout.len(),
            max_lanes: layout::max_lane_count(&self.layout),
        });
    }

    fn reanalyze(&mut self) {
        let Some(schedule) = &self.schedule else {
            return;
        };
        let metrics = schedule.metrics();
        self.suggestions = crate::suggest::suggestion_messages(&metrics);
        let score = crate::balance::optimization_score(&metrics);
        debug!(target: "dayflow::session", score, "suggestions recomputed");
        self.bus.publish(ScheduleEvent::SuggestionsUpdated {
            suggestions: self.suggestions.clone(),
            score,
        });
    }
}
