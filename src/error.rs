use thiserror::Error;

use crate::model::BlockId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("malformed time {0:?}; expected HH:MM")]
    Malformed(String),

    #[error("time {0} is outside the 24-hour day")]
    OutOfRange(i64),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("could not generate a schedule from that description")]
    NoSchedule,

    #[error("invalid builder configuration: {0}")]
    Config(#[source] anyhow::Error),
}

/// Why an edit was refused. The schedule is left untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditRejection {
    #[error("block {0} does not exist")]
    UnknownBlock(BlockId),

    #[error("invalid time: {0}")]
    InvalidTime(#[from] TimeError),

    #[error("end {end} is before start {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("duration {actual} min is below the {minimum} min minimum")]
    TooShort { actual: i64, minimum: u16 },

    #[error("edit would leave the day ({start}..{end} min)")]
    OutOfBounds { start: i64, end: i64 },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("schedule is being generated; edits are paused")]
    Busy,

    #[error("no schedule is loaded")]
    NoSchedule,
}
