use crate::editor::EditAction;
use crate::model::Block;
use crate::session::{Step, StepOutcome, StepRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub step_index: usize,
    pub line: String,
}

fn span(block: &Block) -> String {
    format!("{}-{}", block.start(), block.end())
}

fn label(block: Option<&Block>) -> String {
    match block {
        Some(block) => format!("{} \"{}\"", block.id, escape_for_log(&block.title)),
        None => "block".to_string(),
    }
}

fn describe_edit(action: &EditAction, before: Option<&Block>, after: Option<&Block>) -> String {
    let who = label(before.or(after));
    let times = match (before, after) {
        (Some(b), Some(a)) => format!("{} -> {}", span(b), span(a)),
        (Some(b), None) => span(b),
        (None, Some(a)) => span(a),
        (None, None) => String::new(),
    };

    match action {
        EditAction::MoveTo { .. } => format!("Move {who} {times}"),
        EditAction::ResizeTo { .. } => format!("Resize {who} {times}"),
        EditAction::Nudge { delta, .. } => format!("Nudge {who} {delta:+} min {times}"),
        EditAction::NudgeEnd { delta, .. } => format!("Stretch {who} {delta:+} min {times}"),
        EditAction::SetTimes { .. } => format!("Retime {who} {times}"),
        EditAction::Rename { title, .. } => {
            format!("Rename {who} to \"{}\"", escape_for_log(title))
        }
        EditAction::Delete { .. } => format!("Delete {who} {times}"),
        EditAction::Insert { block } => {
            format!("Insert \"{}\" {}", escape_for_log(&block.title), span(block))
        }
        EditAction::Repair => "Repair schedule".to_string(),
    }
}

/// One console line per step that did something visible. Pointer moves that
/// end up clamped to the same position and pure state changes are skipped.
pub fn describe_step(record: &StepRecord) -> Option<String> {
    match (&record.step, &record.outcome) {
        (_, StepOutcome::Waited { ms, reanalyzed }) => {
            (*reanalyzed).then(|| format!("Reanalyzed after {ms} ms pause"))
        }
        (_, StepOutcome::Applied(action)) => Some(describe_edit(
            action,
            record.before.as_ref(),
            record.after.as_ref(),
        )),
        (Step::Input(input), StepOutcome::Rejected(rejection)) => {
            Some(format!("Rejected {input:?}: {rejection}"))
        }
        _ => None,
    }
}

type Drag = (usize, String, Block);

fn flush_drag(events: &mut Vec<TraceEvent>, drag: &mut Option<Drag>, last: Option<&Block>) {
    if let Some((step_index, verb, first)) = drag.take() {
        let end = last.map(span).unwrap_or_default();
        events.push(TraceEvent {
            step_index,
            line: format!("{verb} {} {} -> {end}", label(Some(&first)), span(&first)),
        });
    }
}

/// Console trace for a replayed session, with consecutive edits of the same
/// kind on the same block (a drag) collapsed into one line.
pub fn session_console_trace(records: &[StepRecord]) -> Vec<TraceEvent> {
    let mut events: Vec<TraceEvent> = Vec::new();
    let mut drag: Option<Drag> = None;

    let mut last_after: Option<Block> = None;
    for record in records {
        let continuous = match &record.outcome {
            StepOutcome::Applied(EditAction::MoveTo { .. }) => Some("Move"),
            StepOutcome::Applied(EditAction::ResizeTo { .. }) => Some("Resize"),
            _ => None,
        };

        if let (Some(verb), Some(before)) = (continuous, record.before.as_ref()) {
            let same = drag
                .as_ref()
                .map(|(_, v, first)| *v == verb && first.id == before.id)
                .unwrap_or(false);
            if !same {
                flush_drag(&mut events, &mut drag, last_after.as_ref());
                drag = Some((record.index, verb.to_string(), before.clone()));
            }
            last_after = record.after.clone();
            continue;
        }

        if let Some(line) = describe_step(record) {
            flush_drag(&mut events, &mut drag, last_after.as_ref());
            events.push(TraceEvent {
                step_index: record.index,
                line,
            });
        }
    }
    flush_drag(&mut events, &mut drag, last_after.as_ref());

    events
}

pub fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";
    const EDIT: &str = "\x1b[34m";
    const REJECT: &str = "\x1b[33m";

    if let Some(rest) = line.strip_prefix("Rejected") {
        eprintln!("{REJECT}Rejected{RESET}{rest}");
    } else if let Some((verb, rest)) = line.split_once(' ') {
        eprintln!("{EDIT}{verb}{RESET} {rest}");
    } else {
        eprintln!("{line}");
    }
}

fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
