use log::debug;
use rusqlite::Connection;

use super::StorageError;

/// Creates the accelerometer table and its timestamp index if they are missing.
/// Existing rows are never touched.
pub fn ensure_schema(conn: &mut Connection) -> Result<(), StorageError> {
    let tx = conn.transaction().map_err(StorageError::Schema)?;

    tx.execute_batch(include_str!("schemas/accelerometer.sql"))
        .map_err(StorageError::Schema)?;

    tx.commit().map_err(StorageError::Schema)?;
    debug!("accelerometer schema ready");
    Ok(())
}
