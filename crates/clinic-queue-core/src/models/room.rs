//! Service points a patient can be queued for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// A room code. The wire form is the code string (`"1"`, `"Xray"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    #[serde(rename = "1")]
    Room1,
    #[serde(rename = "2")]
    Room2,
    #[serde(rename = "3")]
    Room3,
    #[serde(rename = "4")]
    Room4,
    #[serde(rename = "5")]
    Room5,
    Extraction,
    Xray,
    #[serde(rename = "ECG")]
    Ecg,
}

impl Room {
    /// Slot order of the announcement feed.
    ///
    /// Display clients index the feed by position, so this order is part of
    /// the external contract and must not be rearranged.
    pub const DISPLAY_ORDER: [Room; 8] = [
        Room::Room1,
        Room::Room2,
        Room::Room3,
        Room::Room4,
        Room::Room5,
        Room::Extraction,
        Room::Xray,
        Room::Ecg,
    ];

    /// Code stored in the database and sent to display clients.
    pub fn code(self) -> &'static str {
        match self {
            Room::Room1 => "1",
            Room::Room2 => "2",
            Room::Room3 => "3",
            Room::Room4 => "4",
            Room::Room5 => "5",
            Room::Extraction => "Extraction",
            Room::Xray => "Xray",
            Room::Ecg => "ECG",
        }
    }

    /// Human-readable label for the registration form.
    pub fn label(self) -> &'static str {
        match self {
            Room::Room1 => "Room 1",
            Room::Room2 => "Room 2",
            Room::Room3 => "Room 3",
            Room::Room4 => "Room 4",
            Room::Room5 => "Room 5",
            Room::Extraction => "Extraction Area",
            Room::Xray => "X-ray Room",
            Room::Ecg => "ECG / Ultrasound",
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Room {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Room::DISPLAY_ORDER
            .into_iter()
            .find(|room| room.code() == s)
            .ok_or_else(|| ValidationError::UnknownRoom(s.to_string()))
    }
}
