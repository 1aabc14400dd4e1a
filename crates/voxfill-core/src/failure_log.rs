//! Hourly failure log files.

use std::error::Error as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};

use crate::error::AppError;
use crate::models::RecordRef;
use crate::ports::FailureLog;

const SEPARATOR: &str = "------------------";

/// Appends failures to `<dir>/bulk_error_log-YYYY-MM-DDTHH.log`.
pub struct FileFailureLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileFailureLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the bucket file for the given instant.
    pub fn bucket_path(&self, at: DateTime<Local>) -> PathBuf {
        bucket_path(&self.dir, at)
    }
}

fn bucket_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("bulk_error_log-{}.log", at.format("%Y-%m-%dT%H")))
}

/// One log entry: the record, the error and its source chain.
fn format_entry(record: &RecordRef, error: &AppError) -> String {
    let mut entry = format!("Record {}\n{}\n", record, error);
    let mut source = error.source();
    while let Some(cause) = source {
        entry.push_str(&format!("Caused by: {}\n", cause));
        source = cause.source();
    }
    entry.push_str(SEPARATOR);
    entry.push('\n');
    entry
}

impl FailureLog for FileFailureLog {
    fn record(&self, record: &RecordRef, error: &AppError) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        std::fs::create_dir_all(&self.dir)?;
        let path = bucket_path(&self.dir, Local::now());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(format_entry(record, error).as_bytes())?;
        Ok(())
    }
}
