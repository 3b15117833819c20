//! Patient record operations.

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{Database, DbError, DbResult};
use crate::models::{CallStatus, NewPatient, Patient, PatientId, Room};

const SELECT_PATIENT: &str =
    "SELECT id, name, room, time_registered, status, called_seq FROM patient";

/// Listing order, by identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    IdAscending,
    /// Newest registration first
    #[default]
    IdDescending,
}

/// Typed listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatientQuery {
    pub room: Option<Room>,
    pub status: Option<CallStatus>,
    pub order: SortOrder,
}

impl PatientQuery {
    /// Every patient, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn room(mut self, room: Room) -> Self {
        self.room = Some(room);
        self
    }

    pub fn status(mut self, status: CallStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

impl Database {
    /// Insert a validated registration and return the stored record.
    pub fn create_patient(&self, new: &NewPatient) -> DbResult<Patient> {
        let registered_at = chrono::Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO patient (name, room, time_registered, status, called_seq)
            VALUES (?1, ?2, ?3, ?4, 0)
            "#,
            params![
                new.name,
                new.room.code(),
                registered_at,
                CallStatus::Waiting.as_str(),
            ],
        )?;

        Ok(Patient {
            id: PatientId(self.conn.last_insert_rowid()),
            name: new.name.clone(),
            room: new.room,
            registered_at,
            status: CallStatus::Waiting,
            called_seq: 0,
        })
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: PatientId) -> DbResult<Patient> {
        get_patient_on(&self.conn, id)
    }

    /// Replace the mutable fields of a stored patient.
    ///
    /// `room` and `registered_at` are fixed at registration and are not
    /// written. A `called_seq` lower than the stored one is rejected.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<()> {
        update_patient_on(&self.conn, patient)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: PatientId) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patient WHERE id = ?", [id.0])?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("patient {id}")));
        }
        Ok(())
    }

    /// List patients matching `query`.
    pub fn list_patients(&self, query: &PatientQuery) -> DbResult<Vec<Patient>> {
        list_patients_on(&self.conn, query)
    }

    /// Read-modify-write one patient atomically.
    ///
    /// Runs in a `BEGIN IMMEDIATE` transaction, so the write lock is held from
    /// the read onwards and concurrent writers (other connections or other
    /// processes) cannot interleave. If `f` fails nothing is written.
    pub fn modify_patient<F, T>(&mut self, id: PatientId, f: F) -> DbResult<(Patient, T)>
    where
        F: FnOnce(&mut Patient) -> DbResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut patient = get_patient_on(&tx, id)?;
        let output = f(&mut patient)?;
        update_patient_on(&tx, &patient)?;
        tx.commit()?;
        Ok((patient, output))
    }
}

// Inner functions take &Connection so they work on both the plain
// connection and a transaction.

/// List patients matching `query` on any connection, pooled readers included.
pub fn list_patients_on(conn: &Connection, query: &PatientQuery) -> DbResult<Vec<Patient>> {
    let order = match query.order {
        SortOrder::IdAscending => "ASC",
        SortOrder::IdDescending => "DESC",
    };
    let sql = format!(
        "{SELECT_PATIENT} WHERE (?1 IS NULL OR room = ?1) AND (?2 IS NULL OR status = ?2) ORDER BY id {order}"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![
            query.room.map(Room::code),
            query.status.map(CallStatus::as_str),
        ],
        PatientRow::from_row,
    )?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(row?.try_into()?);
    }
    Ok(patients)
}

fn get_patient_on(conn: &Connection, id: PatientId) -> DbResult<Patient> {
    conn.query_row(
        &format!("{SELECT_PATIENT} WHERE id = ?"),
        [id.0],
        PatientRow::from_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("patient {id}")))?
    .try_into()
}

fn update_patient_on(conn: &Connection, patient: &Patient) -> DbResult<()> {
    let rows_affected = conn.execute(
        r#"
        UPDATE patient SET
            name = ?2,
            status = ?3,
            called_seq = ?4
        WHERE id = ?1 AND called_seq <= ?4
        "#,
        params![
            patient.id.0,
            patient.name,
            patient.status.as_str(),
            patient.called_seq,
        ],
    )?;

    if rows_affected == 0 {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM patient WHERE id = ?)",
            [patient.id.0],
            |row| row.get(0),
        )?;
        return Err(if exists {
            DbError::Constraint(format!("called_seq of patient {} may not decrease", patient.id))
        } else {
            DbError::NotFound(format!("patient {}", patient.id))
        });
    }
    Ok(())
}

/// Raw column values; legacy stores may hold NULLs.
struct PatientRow {
    id: i64,
    name: String,
    room: String,
    registered_at: Option<String>,
    status: Option<String>,
    called_seq: Option<i64>,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            room: row.get(2)?,
            registered_at: row.get(3)?,
            status: row.get(4)?,
            called_seq: row.get(5)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let room = row.room.parse::<Room>().map_err(|e| {
            DbError::Constraint(format!("patient {}: {e}", row.id))
        })?;
        let status = match row.status {
            Some(s) => s
                .parse::<CallStatus>()
                .map_err(|e| DbError::Constraint(format!("patient {}: {e}", row.id)))?,
            None => CallStatus::Waiting,
        };

        Ok(Patient {
            id: PatientId(row.id),
            name: row.name,
            room,
            registered_at: row.registered_at.unwrap_or_default(),
            status,
            called_seq: row.called_seq.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn register(db: &Database, name: &str, room: &str) -> Patient {
        db.create_patient(&NewPatient::new(name, room).unwrap()).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup_db();

        let created = register(&db, "Alice", "2");
        assert_eq!(created.status, CallStatus::Waiting);
        assert_eq!(created.called_seq, 0);
        assert!(!created.registered_at.is_empty());

        let retrieved = db.get_patient(created.id).unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_ids_increase() {
        let db = setup_db();
        let a = register(&db, "Alice", "1");
        let b = register(&db, "Bob", "1");
        assert!(b.id > a.id);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let db = setup_db();
        let a = register(&db, "Alice", "1");
        db.delete_patient(a.id).unwrap();
        let b = register(&db, "Bob", "1");
        assert!(b.id > a.id);
    }

    #[test]
    fn test_get_missing() {
        let db = setup_db();
        assert!(matches!(
            db.get_patient(PatientId(42)),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_patient() {
        let db = setup_db();
        let mut patient = register(&db, "Alice", "3");

        patient.status = CallStatus::Called;
        patient.called_seq = 5;
        db.update_patient(&patient).unwrap();

        assert_eq!(db.get_patient(patient.id).unwrap(), patient);
    }

    #[test]
    fn test_update_does_not_move_room() {
        let db = setup_db();
        let mut patient = register(&db, "Alice", "3");

        patient.room = Room::Xray;
        db.update_patient(&patient).unwrap();

        assert_eq!(db.get_patient(patient.id).unwrap().room, Room::Room3);
    }

    #[test]
    fn test_update_rejects_lower_token() {
        let db = setup_db();
        let mut patient = register(&db, "Alice", "3");
        patient.called_seq = 3;
        db.update_patient(&patient).unwrap();

        patient.called_seq = 2;
        assert!(matches!(
            db.update_patient(&patient),
            Err(DbError::Constraint(_))
        ));
        assert_eq!(db.get_patient(patient.id).unwrap().called_seq, 3);
    }

    #[test]
    fn test_update_deleted_patient() {
        let db = setup_db();
        let patient = register(&db, "Alice", "3");
        db.delete_patient(patient.id).unwrap();

        assert!(matches!(
            db.update_patient(&patient),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_twice() {
        let db = setup_db();
        let patient = register(&db, "Alice", "3");

        db.delete_patient(patient.id).unwrap();
        assert!(matches!(
            db.delete_patient(patient.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_order_and_filters() {
        let db = setup_db();
        let a = register(&db, "Alice", "1");
        let b = register(&db, "Bob", "Xray");
        let c = register(&db, "Cara", "1");

        let mut called = c.clone();
        called.status = CallStatus::Called;
        called.called_seq = 1;
        db.update_patient(&called).unwrap();

        let ids: Vec<_> = db
            .list_patients(&PatientQuery::all())
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let ids: Vec<_> = db
            .list_patients(&PatientQuery::all().order(SortOrder::IdAscending))
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);

        let room1 = db.list_patients(&PatientQuery::all().room(Room::Room1)).unwrap();
        assert_eq!(room1.len(), 2);

        let room1_called = db
            .list_patients(&PatientQuery::all().room(Room::Room1).status(CallStatus::Called))
            .unwrap();
        assert_eq!(room1_called, vec![called]);
    }

    #[test]
    fn test_modify_patient_commits() {
        let mut db = setup_db();
        let patient = register(&db, "Alice", "4");

        let (updated, old_seq) = db
            .modify_patient(patient.id, |p| {
                let old = p.called_seq;
                p.called_seq += 1;
                p.status = CallStatus::Called;
                Ok(old)
            })
            .unwrap();

        assert_eq!(old_seq, 0);
        assert_eq!(updated.called_seq, 1);
        assert_eq!(db.get_patient(patient.id).unwrap(), updated);
    }

    #[test]
    fn test_modify_patient_rolls_back_on_error() {
        let mut db = setup_db();
        let patient = register(&db, "Alice", "4");

        let result: DbResult<(Patient, ())> = db.modify_patient(patient.id, |p| {
            p.status = CallStatus::Done;
            Err(DbError::Constraint("nope".into()))
        });
        assert!(result.is_err());
        assert_eq!(db.get_patient(patient.id).unwrap().status, CallStatus::Waiting);
    }

    #[test]
    fn test_modify_missing_patient_skips_closure() {
        let mut db = setup_db();
        let mut ran = false;

        let result = db.modify_patient(PatientId(9), |_| {
            ran = true;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::NotFound(_))));
        assert!(!ran);
    }

    #[test]
    fn test_unknown_room_in_store_is_reported() {
        let db = setup_db();
        db.conn()
            .execute(
                "INSERT INTO patient (name, room, status, called_seq) VALUES ('Dan', 'Lab', 'Waiting', 0)",
                [],
            )
            .unwrap();

        assert!(matches!(
            db.list_patients(&PatientQuery::all()),
            Err(DbError::Constraint(_))
        ));
    }
}
