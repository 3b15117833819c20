//! Read-only connection pool for snapshot queries.
//!
//! Display clients poll far more often than staff write. Polls check out a
//! read-only connection from this pool instead of waiting on the writer, and
//! WAL mode lets them read the last committed state while a write is running.

use std::path::Path;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

use super::DbResult;

/// Default number of pooled read-only connections.
pub const DEFAULT_READ_POOL_SIZE: u32 = 4;

/// Pool of read-only connections to one database file.
pub type ReadPool = r2d2::Pool<SqliteConnectionManager>;

/// Build a read-only pool over an existing, already upgraded database file.
pub fn read_pool<P: AsRef<Path>>(
    path: P,
    busy_timeout: Duration,
    max_size: u32,
) -> DbResult<ReadPool> {
    let manager = SqliteConnectionManager::file(path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .with_init(move |conn| conn.busy_timeout(busy_timeout));

    Ok(r2d2::Pool::builder().max_size(max_size).build(manager)?)
}
