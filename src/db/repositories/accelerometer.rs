use rusqlite::{params, Connection};

use crate::db::{AccelerometerSample, Database, DbCommand, StorageError};

impl Database {
    /// Queues one sample for writing and returns immediately.
    ///
    /// The only error is a worker that has already exited; failures of the
    /// write itself are handled on the worker according to its
    /// [`WriteFailurePolicy`](crate::db::WriteFailurePolicy).
    pub fn insert_accelerometer(&self, x: f64, y: f64, z: f64) -> Result<(), StorageError> {
        self.send(DbCommand::Insert { x, y, z })
    }
}

pub(in crate::db) fn write_sample(
    conn: &Connection,
    sample: &AccelerometerSample,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO accelerometer (x, y, z, timestamp) VALUES (?1, ?2, ?3, ?4)",
    )?;
    stmt.execute(params![sample.x, sample.y, sample.z, sample.timestamp])?;
    Ok(())
}
