use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::model::{BlockKind, Priority};
use crate::time::{MinuteOfDay, MINUTES_PER_DAY};

/// Duration used when neither the text nor the keyword table gives one.
pub const DEFAULT_DURATION: u16 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub title: String,
    pub kind: BlockKind,
    pub priority: Priority,
    pub duration: u16,
    /// Set when the segment names a clock time ("at 7pm", "9:00-17:30").
    pub start: Option<MinuteOfDay>,
    /// Set only for explicit clock ranges.
    pub end: Option<MinuteOfDay>,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("extractor regex must compile"))
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\s*(?:,|;|\.(?:\s+|$)|\band\b|\bthen\b)\s*")
}

fn clock_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(\bfrom\s+)?\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:-|to|until|till)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b",
    )
}

fn clock_at_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"\b(?:at|around|by|@)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b",
    )
}

fn hour_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(\d+(?:\.\d+)?)\s*(?:to|-)\s*(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h)\b",
    )
}

fn hours_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h)\b")
}

fn minutes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+)\s*(?:minutes?|mins?|m)\b")
}

fn unit_follows_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\s*(?:hours?|hrs?|h|minutes?|mins?|m)\b")
}

fn no_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\b(?:no|without|skip(?:ping)?)\s+(?:any\s+)?breaks?\b")
}

fn filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"\b(?:i'd like to|i would like to|want to|need to|have to|planning to|going to|try to|i|will|for|around|about|some|from|at|my|maybe|must|if possible)\b",
    )
}

/// Category keywords, checked in order; the first table entry that matches
/// wins. Anything unmatched is work.
fn kind_table() -> &'static [(BlockKind, Regex)] {
    static TABLE: OnceLock<Vec<(BlockKind, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (BlockKind::Sleep, r"\b(?:sleep|bed|nap)"),
            (BlockKind::Commute, r"\b(?:commut|drive|driving|travel|train|bus|subway)"),
            (BlockKind::Meal, r"\b(?:breakfast|brunch|lunch|dinner|meal|eat|snack|cook)"),
            (BlockKind::Break, r"\b(?:break|rest|pause|coffee)"),
            (
                BlockKind::Exercise,
                r"\b(?:workout|work out|exercis|gym|run|jog|swim|bik|cycl|lift|sport|basketball|football|soccer|tennis)",
            ),
            (BlockKind::Wellness, r"\b(?:meditat|yoga|stretch|walk|mindful|breath|journal)"),
            (
                BlockKind::Personal,
                r"\b(?:read|hobby|hobbies|family|friend|relax|me time|game|gaming|tv|movie|personal|social|shower|chores)",
            ),
        ]
        .into_iter()
        .map(|(kind, pattern)| {
            (
                kind,
                Regex::new(pattern).expect("kind keyword regex must compile"),
            )
        })
        .collect()
    })
}

/// Typical length of an activity named by a keyword, first match wins.
const ESTIMATES: &[(&str, u16)] = &[
    ("sleep", 480),
    ("nap", 20),
    ("commut", 30),
    ("workout", 45),
    ("exercise", 45),
    ("gym", 60),
    ("meditat", 15),
    ("lunch", 60),
    ("breakfast", 30),
    ("dinner", 60),
    ("break", 15),
    ("meeting", 60),
    ("walk", 20),
    ("yoga", 45),
    ("read", 30),
    ("email", 30),
];

const HIGH_PRIORITY: &[&str] = &["important", "must", "critical", "urgent", "deadline", "priority"];
const LOW_PRIORITY: &[&str] = &["maybe", "if possible", "optional", "try to", "would like"];

/// True when the text asks for a day without automatic breaks.
pub fn skips_breaks(text: &str) -> bool {
    no_break_re().is_match(&text.to_lowercase())
}

/// Lower-cased, trimmed, non-empty list segments.
pub fn segments(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    separator_re()
        .split(&lower)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn classify(segment: &str) -> BlockKind {
    kind_table()
        .iter()
        .find(|(_, re)| re.is_match(segment))
        .map(|(kind, _)| *kind)
        .unwrap_or(BlockKind::Work)
}

fn clamp_minutes(minutes: f64) -> u16 {
    minutes
        .round()
        .clamp(0.0, f64::from(MINUTES_PER_DAY - 5)) as u16
}

/// Explicit duration in minutes, or `None` when the segment gives none.
/// An hour range ("2 to 3 hours") resolves to its midpoint.
pub fn parse_duration(segment: &str) -> Option<u16> {
    if let Some(caps) = hour_range_re().captures(segment) {
        let low: f64 = caps[1].parse().ok()?;
        let high: f64 = caps[2].parse().ok()?;
        return Some(clamp_minutes((low + high) / 2.0 * 60.0)).filter(|d| *d > 0);
    }

    let hours = hours_re()
        .captures(segment)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(0.0);
    let minutes = minutes_re()
        .captures(segment)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(clamp_minutes(hours * 60.0 + minutes)).filter(|d| *d > 0)
}

pub fn estimate_duration(segment: &str) -> u16 {
    ESTIMATES
        .iter()
        .find(|(keyword, _)| segment.contains(keyword))
        .map(|(_, minutes)| *minutes)
        .unwrap_or(DEFAULT_DURATION)
}

fn priority_for(segment: &str, kind: BlockKind) -> Priority {
    if HIGH_PRIORITY.iter().any(|kw| segment.contains(kw)) {
        return Priority::High;
    }
    if LOW_PRIORITY.iter().any(|kw| segment.contains(kw)) {
        return Priority::Low;
    }
    match kind {
        BlockKind::Work | BlockKind::Sleep => Priority::High,
        _ => Priority::Medium,
    }
}

/// Minutes since midnight for an `h[:mm][am|pm]` capture.
fn clock(hour: &str, minute: Option<&str>, meridiem: Option<&str>) -> Option<u16> {
    let hour: u16 = hour.parse().ok()?;
    let minute: u16 = minute.map(str::parse::<u16>).transpose().ok()?.unwrap_or(0);
    if minute > 59 {
        return None;
    }
    let hour = match meridiem {
        Some(_) if hour == 0 || hour > 12 => return None,
        Some("am") => hour % 12,
        Some(_) => hour % 12 + 12,
        None if hour > 23 => return None,
        None => hour,
    };
    Some(hour * 60 + minute)
}

struct ClockSpan {
    start: u16,
    end: Option<u16>,
    matched: std::ops::Range<usize>,
}

fn group<'t>(caps: &Captures<'t>, idx: usize) -> Option<&'t str> {
    caps.get(idx).map(|m| m.as_str())
}

fn clock_range(segment: &str) -> Option<ClockSpan> {
    for caps in clock_range_re().captures_iter(segment) {
        let whole = caps.get(0)?;
        let from = caps.get(1).is_some();
        let clock_like = [3, 4, 6, 7].iter().any(|&idx| caps.get(idx).is_some());
        if !(from || clock_like) || unit_follows_re().is_match(&segment[whole.end()..]) {
            continue;
        }

        let (start_mer, end_mer) = (group(&caps, 4), group(&caps, 7));
        let Some(end) = clock(&caps[5], group(&caps, 6), end_mer) else {
            continue;
        };
        let Some(mut start) = clock(&caps[2], group(&caps, 3), start_mer.or(end_mer)) else {
            continue;
        };
        let mut end = end;

        if start_mer.is_none() && end_mer.is_some() && start > end {
            // "9-5pm": the start keeps its own half of the day.
            start = clock(&caps[2], group(&caps, 3), None).unwrap_or(start);
        }
        if end_mer.is_none() && end <= start && end < 12 * 60 && end + 12 * 60 > start {
            // "from 9 to 5" means the afternoon.
            end += 12 * 60;
        }

        return Some(ClockSpan {
            start,
            end: Some(end),
            matched: whole.range(),
        });
    }
    None
}

fn clock_at(segment: &str, kind: BlockKind) -> Option<ClockSpan> {
    for caps in clock_at_re().captures_iter(segment) {
        let whole = caps.get(0)?;
        if unit_follows_re().is_match(&segment[whole.end()..]) {
            continue;
        }
        let bare = caps.get(2).is_none() && caps.get(3).is_none();
        let Some(mut start) = clock(&caps[1], group(&caps, 2), group(&caps, 3)) else {
            continue;
        };
        if bare {
            let hour = start / 60;
            // Bare small hours are read as afternoon, bedtimes as evening.
            if (1..=6).contains(&hour) || (kind == BlockKind::Sleep && (7..=11).contains(&hour)) {
                start += 12 * 60;
            }
        }
        return Some(ClockSpan {
            start,
            end: None,
            matched: whole.range(),
        });
    }
    None
}

fn default_title(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Work => "Work Session",
        BlockKind::Exercise => "Exercise",
        BlockKind::Sleep => "Sleep",
        BlockKind::Meal => "Meal",
        BlockKind::Break => "Break",
        BlockKind::Personal => "Personal Time",
        BlockKind::Commute => "Commute",
        BlockKind::Wellness => "Wellness Activity",
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_for(segment: &str, clock_span: Option<&ClockSpan>, kind: BlockKind) -> String {
    let mut text = segment.to_string();
    if let Some(span) = clock_span {
        text.replace_range(span.matched.clone(), " ");
    }
    for re in [hour_range_re(), hours_re(), minutes_re(), filler_re()] {
        text = re.replace_all(&text, " ").into_owned();
    }
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '\'' || *c == '-')
        .collect();
    let title = title_case(cleaned.trim_matches(|c: char| c == '-' || c.is_whitespace()));
    if title.is_empty() {
        default_title(kind).to_string()
    } else {
        title
    }
}

/// Extracts one activity per segment of `text`, in text order. Segments that
/// only turn breaks off ("no breaks") produce nothing.
pub fn extract_activities(text: &str) -> Vec<Activity> {
    segments(text)
        .into_iter()
        .filter(|segment| !no_break_re().is_match(segment))
        .map(|segment| extract_segment(&segment))
        .collect()
}

fn extract_segment(segment: &str) -> Activity {
    let kind = classify(segment);
    let clock_span = clock_range(segment).or_else(|| clock_at(segment, kind));

    let range_duration = clock_span.as_ref().and_then(|span| {
        span.end.map(|end| {
            (i32::from(end) - i32::from(span.start)).rem_euclid(i32::from(MINUTES_PER_DAY)) as u16
        })
    });

    let remainder = match &clock_span {
        Some(span) => {
            let mut rest = segment.to_string();
            rest.replace_range(span.matched.clone(), " ");
            rest
        }
        None => segment.to_string(),
    };

    let duration = range_duration
        .filter(|d| *d > 0)
        .or_else(|| parse_duration(&remainder))
        .unwrap_or_else(|| estimate_duration(segment));

    Activity {
        title: title_for(segment, clock_span.as_ref(), kind),
        kind,
        priority: priority_for(segment, kind),
        duration,
        start: clock_span
            .as_ref()
            .map(|span| MinuteOfDay::wrapping(i64::from(span.start))),
        end: clock_span
            .as_ref()
            .and_then(|span| span.end)
            .map(|end| MinuteOfDay::wrapping(i64::from(end))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_handles_meridiem() {
        assert_eq!(clock("12", None, Some("am")), Some(0));
        assert_eq!(clock("12", None, Some("pm")), Some(720));
        assert_eq!(clock("7", Some("30"), Some("pm")), Some(19 * 60 + 30));
        assert_eq!(clock("13", None, Some("pm")), None);
    }

    #[test]
    fn every_pattern_compiles() {
        for re in [
            separator_re(),
            clock_range_re(),
            clock_at_re(),
            hour_range_re(),
            hours_re(),
            minutes_re(),
            unit_follows_re(),
            no_break_re(),
            filler_re(),
        ] {
            assert!(!re.as_str().is_empty());
        }
        assert_eq!(kind_table().len(), 7);
    }

    #[test]
    fn hour_counts_are_not_clock_ranges() {
        assert!(clock_range("study 2 to 3 hours").is_none());
        assert!(clock_range("work from 9 to 5").is_some());
    }
}
