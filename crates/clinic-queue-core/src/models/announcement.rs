//! Display feed records.

use serde::{Deserialize, Serialize};

use super::{Patient, PatientId, Room};

/// The patient currently summoned at a room, as shown on the display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    pub id: PatientId,
    pub name: String,
    pub room: Room,
    /// Changes whenever the display should (re-)announce this patient
    pub token: i64,
}

impl From<&Patient> for Announcement {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name.clone(),
            room: patient.room,
            token: patient.called_seq,
        }
    }
}
