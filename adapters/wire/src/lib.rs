#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! JSON wire format of the board descriptor and the simulation log.
//!
//! Both documents use one-based coordinates. They are converted to the
//! zero-based coordinates of the core crate exactly once, here, through
//! [`OneBased::to_index`]. Entries that cannot be converted are dropped and
//! reported as [`WireIssue`]s; only unreadable documents are fatal.

mod board;
mod simulation;

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use rescue_replay_core::ReplayError;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

pub use board::{parse_board, DecodedBoard};
pub use simulation::{parse_simulation, DecodedSimulation};

/// Fatal failures while loading a wire document.
#[derive(Debug, Error)]
pub enum WireError {
    /// The document could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path of the document.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid JSON of the expected shape.
    #[error("invalid {document} document at `{location}`: {source}")]
    Json {
        /// Name of the document kind.
        document: &'static str,
        /// JSON path of the first offending value.
        location: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Non-fatal problem found while converting a wire document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireIssue {
    /// An event of an unrecognised kind was ignored.
    UnknownType {
        /// Location of the entry inside the document.
        location: String,
        /// Declared kind of the entry.
        kind: String,
    },
    /// An entry was dropped because it could not be converted.
    Rejected {
        /// Location of the entry inside the document.
        location: String,
        /// Reason the entry was dropped.
        error: ReplayError,
    },
}

impl fmt::Display for WireIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType { location, kind } => {
                write!(f, "{location}: unknown event type `{kind}` ignored")
            }
            Self::Rejected { location, error } => write!(f, "{location}: {error}"),
        }
    }
}

/// One-based coordinate component as written by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct OneBased(i64);

impl OneBased {
    /// Wraps a raw one-based value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Converts the value to a zero-based index, or `None` below the origin.
    #[must_use]
    pub fn to_index(self) -> Option<u32> {
        self.0
            .checked_sub(1)
            .and_then(|index| u32::try_from(index).ok())
    }

    /// Raw one-based value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// Reads and parses a board descriptor file.
pub fn read_board(path: &Path) -> Result<DecodedBoard, WireError> {
    parse_board(&read(path)?)
}

/// Reads and parses a simulation log file.
pub fn read_simulation(path: &Path) -> Result<DecodedSimulation, WireError> {
    parse_simulation(&read(path)?)
}

fn read(path: &Path) -> Result<String, WireError> {
    fs::read_to_string(path).map_err(|source| WireError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn deserialize<T: DeserializeOwned>(
    document: &'static str,
    raw: &str,
) -> Result<T, WireError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        WireError::Json {
            document,
            location,
            source: error.into_inner(),
        }
    })
}
