//! Call-state machine for a single patient.
//!
//! ```text
//!            call / recall            complete
//! Waiting ─────────────────▶ Called ───────────▶ Done
//!                             ▲  │                │
//!                             │  └ recall ┐       │
//!                             │ ◀─────────┘       │
//!                             └──── call / recall ┘
//! ```
//!
//! No state is absorbing: a `Done` patient can be summoned again. `Call` and
//! `Recall` accept any starting status and always bump the token, so the
//! display re-announces even when the status does not change.

use std::fmt;

use thiserror::Error;

use crate::models::{CallStatus, Patient, PatientId};

/// The token counter cannot advance any further.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Call token exhausted for patient {0}")]
pub struct TokenExhausted(pub PatientId);

/// An admin action that changes a patient's call state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAction {
    /// Summon the patient
    Call,
    /// Re-trigger the announcement for the patient
    Recall,
    /// Mark the patient as seen
    Complete,
}

impl fmt::Display for CallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallAction::Call => "call",
            CallAction::Recall => "recall",
            CallAction::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// What an applied action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: CallAction,
    pub from: CallStatus,
    pub to: CallStatus,
    /// `called_seq` after the action
    pub token: i64,
}

impl CallAction {
    /// Apply this action to `patient` in place.
    ///
    /// On error the patient is left untouched.
    pub fn apply(self, patient: &mut Patient) -> Result<Transition, TokenExhausted> {
        let from = patient.status;

        match self {
            CallAction::Call | CallAction::Recall => {
                let token = patient
                    .called_seq
                    .checked_add(1)
                    .ok_or(TokenExhausted(patient.id))?;
                // Recall on a Called patient leaves the status as it is;
                // every other case lands in Called.
                patient.status = CallStatus::Called;
                patient.called_seq = token;
            }
            CallAction::Complete => {
                patient.status = CallStatus::Done;
            }
        }

        Ok(Transition {
            action: self,
            from,
            to: patient.status,
            token: patient.called_seq,
        })
    }
}
