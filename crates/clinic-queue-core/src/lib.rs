//! Clinic Queue Core Library
//!
//! Call queue for a walk-in clinic: patients register into a room, staff
//! call them, and a public display polls for who is currently summoned in
//! each room.
//!
//! # Architecture
//!
//! ```text
//!  intake form ──register──┐            ┌──── admin actions (call / recall /
//!                          ▼            ▼      complete / remove)
//!                    ┌──────────────────────┐
//!                    │     QueueService     │
//!                    └───┬─────────────┬────┘
//!          writer (BEGIN │             │ read pool (WAL snapshot)
//!          IMMEDIATE)    ▼             ▼
//!                    ┌──────────────────────┐
//!                    │   SQLite `patient`   │
//!                    └──────────────────────┘
//!                                      │
//!                              Resolver (per room)
//!                                      │
//!                                      ▼
//!                display poll: [Room1 .. Room5, Extraction, Xray, ECG]
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite store, schema upgrades, read pool
//! - [`models`]: Domain types (Patient, Room, Announcement)
//! - [`call_state`]: Call / Recall / Complete transitions
//! - [`resolver`]: Per-room "currently announced" selection
//! - [`config`]: Environment configuration

pub mod call_state;
pub mod config;
pub mod db;
pub mod models;
pub mod resolver;

// Re-export commonly used types
pub use call_state::{CallAction, Transition};
pub use config::QueueConfig;
pub use db::{Database, PatientQuery, SortOrder};
pub use models::{Announcement, CallStatus, NewPatient, Patient, PatientId, Room, ValidationError};
pub use resolver::Resolver;

use std::sync::Mutex;

use db::{DbError, ReadPool};
use tracing::{debug, info, warn};

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Invalid registration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Patient not found: {0}")]
    NotFound(PatientId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

impl From<DbError> for QueueError {
    fn from(e: DbError) -> Self {
        QueueError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for QueueError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        QueueError::Storage(format!("Lock poisoned: {}", e))
    }
}

/// Map a store error for a lookup of `id`, keeping NotFound distinct.
fn lookup_error(id: PatientId, e: DbError) -> QueueError {
    match e {
        DbError::NotFound(_) => {
            warn!(patient_id = %id, "patient not found");
            QueueError::NotFound(id)
        }
        other => other.into(),
    }
}

// =========================================================================
// Queue Service
// =========================================================================

/// Process-wide handle to the queue.
///
/// Construct once at startup; the schema is upgraded before the handle is
/// returned. All mutations go through one writer connection, each as a
/// single-patient transaction. Announcement polls on a file-backed store use
/// separate read-only connections and never wait on the writer lock.
pub struct QueueService {
    writer: Mutex<Database>,
    readers: Option<ReadPool>,
}

impl QueueService {
    /// Open (creating and upgrading if needed) the store named by `config`.
    pub fn open(config: &QueueConfig) -> QueueResult<Self> {
        let writer = Database::open_with_busy_timeout(&config.database_path, config.busy_timeout)?;
        info!(
            path = %config.database_path.display(),
            schema_version = writer.schema_version()?,
            "queue store opened"
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Some(db::read_pool(
                &config.database_path,
                config.busy_timeout,
                config.read_pool_size,
            )?),
        })
    }

    /// Create a service over an in-memory store (for testing).
    pub fn open_in_memory() -> QueueResult<Self> {
        Ok(Self {
            writer: Mutex::new(Database::open_in_memory()?),
            readers: None,
        })
    }

    /// `(code, label)` pairs for the registration form, in display order.
    pub fn rooms(&self) -> Vec<(&'static str, &'static str)> {
        Room::DISPLAY_ORDER
            .iter()
            .map(|room| (room.code(), room.label()))
            .collect()
    }

    // =========================================================================
    // Registration + Lookup
    // =========================================================================

    /// Register a patient from raw intake values.
    ///
    /// Nothing is written if validation fails.
    pub fn register(&self, name: &str, room: &str) -> QueueResult<Patient> {
        let new = NewPatient::new(name, room)?;
        let db = self.writer.lock()?;
        let patient = db.create_patient(&new)?;
        info!(
            patient_id = %patient.id,
            room = %patient.room,
            "patient registered"
        );
        Ok(patient)
    }

    /// Every patient, newest registration first.
    pub fn list_for_admin(&self) -> QueueResult<Vec<Patient>> {
        let db = self.writer.lock()?;
        Ok(db.list_patients(&PatientQuery::all())?)
    }

    /// Get a patient by ID.
    pub fn get(&self, id: PatientId) -> QueueResult<Patient> {
        let db = self.writer.lock()?;
        db.get_patient(id).map_err(|e| lookup_error(id, e))
    }

    // =========================================================================
    // Admin Actions
    // =========================================================================

    /// Summon a patient. Works from any status and always bumps the token.
    pub fn call(&self, id: PatientId) -> QueueResult<Patient> {
        self.apply(id, CallAction::Call)
    }

    /// Re-trigger the announcement for a patient. Always bumps the token.
    pub fn recall(&self, id: PatientId) -> QueueResult<Patient> {
        self.apply(id, CallAction::Recall)
    }

    /// Mark a patient as seen. Leaves the token alone.
    pub fn complete(&self, id: PatientId) -> QueueResult<Patient> {
        self.apply(id, CallAction::Complete)
    }

    /// Delete a patient record for good.
    pub fn remove(&self, id: PatientId) -> QueueResult<()> {
        let db = self.writer.lock()?;
        db.delete_patient(id).map_err(|e| lookup_error(id, e))?;
        info!(patient_id = %id, "patient removed");
        Ok(())
    }

    fn apply(&self, id: PatientId, action: CallAction) -> QueueResult<Patient> {
        let mut db = self.writer.lock()?;
        let (patient, transition) = db
            .modify_patient(id, |patient| {
                action
                    .apply(patient)
                    .map_err(|e| DbError::Constraint(e.to_string()))
            })
            .map_err(|e| lookup_error(id, e))?;

        info!(
            patient_id = %patient.id,
            room = %patient.room,
            action = %transition.action,
            from = %transition.from,
            to = %transition.to,
            token = transition.token,
            "call state changed"
        );
        Ok(patient)
    }

    // =========================================================================
    // Display Feed
    // =========================================================================

    /// One slot per room in [`Room::DISPLAY_ORDER`].
    ///
    /// Reads a point-in-time snapshot; a poll racing a write sees either the
    /// state before it or after it.
    pub fn current_announcements(&self) -> QueueResult<Vec<Option<Announcement>>> {
        let query = PatientQuery::all().status(CallStatus::Called);
        let called = match &self.readers {
            Some(pool) => {
                let conn = pool.get().map_err(DbError::from)?;
                db::list_patients_on(&conn, &query)?
            }
            None => self.writer.lock()?.list_patients(&query)?,
        };

        let slots = Resolver::new(&called).resolve_all(&Room::DISPLAY_ORDER);
        debug!(
            called = called.len(),
            announced = slots.iter().flatten().count(),
            "announcement snapshot"
        );
        Ok(slots)
    }

    /// The display feed as a JSON array, `null` for empty rooms.
    pub fn announcement_feed_json(&self) -> QueueResult<String> {
        Ok(serde_json::to_string(&self.current_announcements()?)?)
    }
}
