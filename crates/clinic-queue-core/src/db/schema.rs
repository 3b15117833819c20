//! Versioned schema upgrades.
//!
//! The applied version lives in SQLite's `user_version` pragma. Each step runs
//! in its own transaction together with the version bump, so a crash mid-way
//! leaves the store at the last completed version and the next start resumes
//! from there. Stores written by the legacy web front end start at version 0
//! with the `patient` table already present; every step tolerates that.

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

use super::{DbError, DbResult};

/// Version a freshly opened store ends up at.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// One schema upgrade step.
struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create patient table",
        apply: create_patient_table,
    },
    Migration {
        version: 2,
        description: "add called_seq column",
        apply: add_called_seq,
    },
    Migration {
        version: 3,
        description: "default legacy NULL columns",
        apply: fill_legacy_nulls,
    },
];

fn create_patient_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS patient (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name VARCHAR(80) NOT NULL,
            room VARCHAR(20) NOT NULL,
            time_registered DATETIME,
            status VARCHAR(20) DEFAULT 'Waiting'
        );

        CREATE INDEX IF NOT EXISTS idx_patient_room_status ON patient(room, status);
        "#,
    )
}

fn add_called_seq(conn: &Connection) -> rusqlite::Result<()> {
    if !has_column(conn, "patient", "called_seq")? {
        conn.execute_batch(
            "ALTER TABLE patient ADD COLUMN called_seq INTEGER NOT NULL DEFAULT 0;",
        )?;
    }
    Ok(())
}

fn fill_legacy_nulls(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        UPDATE patient SET status = 'Waiting' WHERE status IS NULL;
        UPDATE patient SET called_seq = 0 WHERE called_seq IS NULL;
        UPDATE patient SET time_registered = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            WHERE time_registered IS NULL;
        "#,
    )
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Applied schema version.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Apply every pending upgrade step. Returns the resulting version.
///
/// Safe to call on every start; a store already at
/// [`CURRENT_SCHEMA_VERSION`] is left untouched.
pub fn migrate(conn: &mut Connection) -> DbResult<u32> {
    for migration in MIGRATIONS {
        if schema_version(conn)? >= migration.version {
            continue;
        }

        // Concurrent openers queue on the IMMEDIATE lock. Another opener may
        // have applied this step while we waited, so check again under it.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if schema_version(&tx)? >= migration.version {
            continue;
        }

        debug!(
            version = migration.version,
            description = migration.description,
            "applying schema upgrade"
        );
        (migration.apply)(&tx).map_err(|e| DbError::Migration {
            version: migration.version,
            message: e.to_string(),
        })?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            "schema upgraded"
        );
    }

    schema_version(conn)
}
