//! Patient models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Room;

/// Rejected registration input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Patient name must not be empty")]
    EmptyName,

    #[error("Unknown room code: {0:?}")]
    UnknownRoom(String),
}

/// A stored status string that names no known [`CallStatus`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown call status: {0:?}")]
pub struct UnknownStatus(pub String);

/// Store-assigned patient identifier. Increases with registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub i64);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a patient is in the call cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    /// Registered, not yet summoned
    Waiting,
    /// Summoned to their room; shown on the display
    Called,
    /// Seen by staff
    Done,
}

impl CallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Waiting => "Waiting",
            CallStatus::Called => "Called",
            CallStatus::Done => "Done",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Waiting" => Ok(CallStatus::Waiting),
            "Called" => Ok(CallStatus::Called),
            "Done" => Ok(CallStatus::Done),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Store-assigned identifier
    pub id: PatientId,
    /// Display name, trimmed
    pub name: String,
    /// Service point the patient is queued for
    pub room: Room,
    /// Registration timestamp (RFC 3339 for records created here)
    pub registered_at: String,
    /// Call status
    pub status: CallStatus,
    /// Call counter; bumped on every call or recall and shown to displays as the token
    pub called_seq: i64,
}

/// Validated registration input, ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub room: Room,
}

impl NewPatient {
    /// Validate raw intake form values.
    pub fn new(name: &str, room: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            room: room.parse()?,
        })
    }
}
