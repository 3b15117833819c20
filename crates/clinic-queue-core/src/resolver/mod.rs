//! Room announcement resolver.
//!
//! Given a snapshot of patients, picks the one currently announced in each
//! room: among the room's `Called` patients, the highest `called_seq`, with the
//! highest id breaking ties. Ties cannot arise from a single writer but can
//! when several writers race, and the display must still see one answer.

use crate::models::{Announcement, CallStatus, Patient, Room};

/// Resolves announcements over a fixed patient snapshot.
pub struct Resolver<'a> {
    patients: &'a [Patient],
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a snapshot.
    pub fn new(patients: &'a [Patient]) -> Self {
        Self { patients }
    }

    /// The patient currently announced in `room`, if any.
    pub fn resolve(&self, room: Room) -> Option<Announcement> {
        self.patients
            .iter()
            .filter(|p| p.room == room && p.status == CallStatus::Called)
            .max_by_key(|p| (p.called_seq, p.id))
            .map(Announcement::from)
    }

    /// One slot per room, in the order given. Never drops a slot.
    pub fn resolve_all(&self, rooms: &[Room]) -> Vec<Option<Announcement>> {
        rooms.iter().map(|&room| self.resolve(room)).collect()
    }
}
