use std::{io, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the persistence writer.
///
/// Every variant is unrecoverable for the collector: the store is either
/// available for the lifetime of the process or the process does not run.
/// Deciding to terminate is left to the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create database directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn database worker thread")]
    Spawn(#[source] io::Error),

    #[error("failed to open SQLite database at {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create accelerometer schema")]
    Schema(#[source] rusqlite::Error),

    #[error("failed to insert accelerometer sample")]
    Insert(#[source] rusqlite::Error),

    #[error("database statement failed")]
    Statement(#[source] rusqlite::Error),

    #[error("database worker is no longer running")]
    WorkerUnavailable,
}

/// What the writer does when a single insert fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WriteFailurePolicy {
    /// Record the fault, stop writing, and let the owner terminate.
    #[default]
    Halt,
    /// Log the failed insert and keep accepting samples.
    LogAndDrop,
}
