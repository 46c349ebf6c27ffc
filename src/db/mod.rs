use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::{oneshot, watch};

mod error;
pub mod helpers;
pub mod models;
mod repositories;
mod schema;
mod writer;

pub use error::{StorageError, WriteFailurePolicy};
pub use models::AccelerometerSample;

use schema::ensure_schema;
use writer::Writer;

/// Latest unrecoverable writer fault, if any.
pub type FaultReceiver = watch::Receiver<Option<Arc<StorageError>>>;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Insert { x: f64, y: f64, z: f64 },
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            // Queued writes ahead of the shutdown command still run.
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// Write-only handle to the accelerometer store.
///
/// All statements run on one dedicated thread in the order they were
/// enqueued. Cloning the handle shares the same worker.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
    faults: FaultReceiver,
}

impl Database {
    /// Opens `<dir>/<name>.sqlite3`.
    pub fn open(dir: &Path, name: &str, policy: WriteFailurePolicy) -> Result<Self, StorageError> {
        Self::new(dir.join(format!("{name}.sqlite3")), policy)
    }

    pub fn new(db_path: PathBuf, policy: WriteFailurePolicy) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), StorageError>>();
        let (fault_tx, fault_rx) = watch::channel(None);
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("motion-collector-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(source) => {
                        let _ = ready_tx.send(Err(StorageError::Open {
                            path: path_for_thread.clone(),
                            source,
                        }));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    warn!("Failed to enable WAL mode: {err}");
                }

                let init_result = ensure_schema(&mut conn);
                let init_failed = init_result.is_err();
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }
                if init_failed {
                    return;
                }

                let mut writer = Writer::new(conn, policy, fault_tx);
                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Insert { x, y, z } => writer.insert(x, y, z),
                        DbCommand::Execute(task) => task(writer.connection()),
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .map_err(StorageError::Spawn)?;

        ready_rx
            .recv()
            .map_err(|_| StorageError::WorkerUnavailable)??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
            faults: fault_rx,
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Subscribes to writer faults. Only [`WriteFailurePolicy::Halt`] publishes.
    pub fn faults(&self) -> FaultReceiver {
        self.faults.clone()
    }

    pub fn fault(&self) -> Option<Arc<StorageError>> {
        self.faults.borrow().clone()
    }

    /// Resolves once every write enqueued before this call has executed.
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.execute(|_| Ok(())).await
    }

    fn send(&self, command: DbCommand) -> Result<(), StorageError> {
        self.inner
            .sender
            .send(command)
            .map_err(|_| StorageError::WorkerUnavailable)
    }

    pub(crate) async fn execute<F, T>(&self, task: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn).map_err(StorageError::Statement);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        })))?;

        reply_rx
            .await
            .map_err(|_| StorageError::WorkerUnavailable)?
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    use super::{AccelerometerSample, Database};

    /// Reads every row back in insertion order through a separate connection.
    pub fn stored_samples(db: &Database) -> Vec<AccelerometerSample> {
        let conn = Connection::open(db.path()).unwrap();
        let mut stmt = conn
            .prepare("SELECT x, y, z, timestamp FROM accelerometer ORDER BY id ASC")
            .unwrap();
        let rows = stmt
            .query_map([], |row| {
                Ok(AccelerometerSample {
                    x: row.get(0)?,
                    y: row.get(1)?,
                    z: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })
            .unwrap();
        rows.map(|row| row.unwrap()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::stored_samples;
    use super::*;

    #[test]
    fn open_derives_file_name_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let db = Database::open(&nested, "motion", WriteFailurePolicy::Halt).unwrap();

        assert_eq!(db.path(), nested.join("motion.sqlite3"));
        assert!(db.path().exists());
    }

    #[test]
    fn unopenable_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the database file should be cannot be opened as SQLite.
        let blocked = dir.path().join("blocked.sqlite3");
        std::fs::create_dir_all(&blocked).unwrap();

        let result = Database::new(blocked, WriteFailurePolicy::Halt);
        assert!(matches!(
            result,
            Err(StorageError::Open { .. }) | Err(StorageError::Schema(_))
        ));
    }

    #[tokio::test]
    async fn reopening_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();

        {
            let db = Database::open(dir.path(), "motion", WriteFailurePolicy::Halt).unwrap();
            db.insert_accelerometer(0.1, 0.2, 0.3).unwrap();
            db.insert_accelerometer(0.4, 0.5, 0.6).unwrap();
            db.flush().await.unwrap();
        }

        let db = Database::open(dir.path(), "motion", WriteFailurePolicy::Halt).unwrap();
        let rows = stored_samples(&db);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[1].x, rows[1].y, rows[1].z), (0.4, 0.5, 0.6));
    }

    #[test]
    fn dropping_the_handle_drains_queued_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let db = Database::open(dir.path(), "motion", WriteFailurePolicy::Halt).unwrap();
            for i in 0..50 {
                db.insert_accelerometer(f64::from(i), 0.0, 0.0).unwrap();
            }
            db.path().to_path_buf()
        };

        let conn = Connection::open(path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM accelerometer", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 50);
    }
}
