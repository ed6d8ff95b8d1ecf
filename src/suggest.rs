use std::fmt;

use serde::{Deserialize, Serialize};

use crate::balance::{
    BalanceMetrics, EXERCISE_LOW_MINUTES, LONG_WORK_STRETCH_MINUTES, PERSONAL_LOW_MINUTES,
    SLEEP_MIN_MINUTES, WORK_HIGH_MINUTES,
};

pub const MAX_SUGGESTIONS: usize = 4;

/// Fixed advisory table, in the order rules are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionRule {
    ReduceWorkHours,
    AddExercise,
    IncreaseSleep,
    AddPersonalTime,
    AddBreaks,
    Balanced,
}

impl SuggestionRule {
    pub fn message(self) -> &'static str {
        match self {
            SuggestionRule::ReduceWorkHours => {
                "Consider reducing work hours to stay under 9 hours a day."
            }
            SuggestionRule::AddExercise => "Add at least 30 minutes of exercise to your day.",
            SuggestionRule::IncreaseSleep => "Increase sleep to at least 7 hours.",
            SuggestionRule::AddPersonalTime => {
                "Add more personal time; aim for at least 2 hours for yourself."
            }
            SuggestionRule::AddBreaks => {
                "Add short breaks between long work sessions to stay focused."
            }
            SuggestionRule::Balanced => "Your schedule looks well balanced. Keep it up!",
        }
    }

    fn fires(self, metrics: &BalanceMetrics) -> bool {
        match self {
            SuggestionRule::ReduceWorkHours => metrics.work_minutes > WORK_HIGH_MINUTES,
            SuggestionRule::AddExercise => metrics.exercise_minutes < EXERCISE_LOW_MINUTES,
            SuggestionRule::IncreaseSleep => metrics.sleep_minutes < SLEEP_MIN_MINUTES,
            SuggestionRule::AddPersonalTime => metrics.personal_minutes < PERSONAL_LOW_MINUTES,
            SuggestionRule::AddBreaks => metrics.longest_work_stretch > LONG_WORK_STRETCH_MINUTES,
            SuggestionRule::Balanced => false,
        }
    }
}

impl fmt::Display for SuggestionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

const RULE_TABLE: [SuggestionRule; 5] = [
    SuggestionRule::ReduceWorkHours,
    SuggestionRule::AddExercise,
    SuggestionRule::IncreaseSleep,
    SuggestionRule::AddPersonalTime,
    SuggestionRule::AddBreaks,
];

/// At most [`MAX_SUGGESTIONS`] rules, or [`SuggestionRule::Balanced`] when none fire.
pub fn suggestions(metrics: &BalanceMetrics) -> Vec<SuggestionRule> {
    let fired: Vec<SuggestionRule> = RULE_TABLE
        .into_iter()
        .filter(|rule| rule.fires(metrics))
        .take(MAX_SUGGESTIONS)
        .collect();

    if fired.is_empty() {
        return vec![SuggestionRule::Balanced];
    }
    fired
}

pub fn suggestion_messages(metrics: &BalanceMetrics) -> Vec<String> {
    suggestions(metrics)
        .into_iter()
        .map(|rule| rule.message().to_string())
        .collect()
}
