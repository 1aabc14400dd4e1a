//! Collaborators the batch talks to.
//!
//! The core never reaches into the collection, the media folder, the network
//! or the terminal directly; each of those sits behind one of these traits so
//! the executor can run against SQLite and Forvo in the CLI and against
//! in-memory fakes in tests.

use std::future::Future;
use std::path::Path;

use crate::error::AppError;
use crate::models::{AudioArtifact, GroupId, Pronunciation, Record, RecordRef, TemplateId};
use crate::resolution::FieldRole;

/// Host collection that owns the records.
pub trait RecordStore: Send + Sync + 'static {
    /// Writes the record's current field values back to the collection.
    fn persist(&self, record: &Record) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Host media folder that sound references point into.
pub trait MediaStore: Send + Sync + 'static {
    /// Registers a local file and returns the name to reference it by.
    fn add_file(&self, path: &Path) -> Result<String, AppError>;
}

/// Remote pronunciation providers, primary and locale-specific fallback.
pub trait PronunciationSource: Send + Sync + 'static {
    /// The single locale routed through [`fetch_fallback`](Self::fetch_fallback).
    fn fallback_locale(&self) -> Option<&str>;

    /// All candidates from the primary provider.
    ///
    /// Fails with `AppError::NoResults` when the provider has none.
    fn fetch_primary(
        &self,
        query: &str,
        locale: &str,
    ) -> impl Future<Output = Result<Vec<Pronunciation>, AppError>> + Send;

    /// One candidate from the fallback provider, already downloaded.
    fn fetch_fallback(
        &self,
        query: &str,
        locale: &str,
    ) -> impl Future<Output = Result<Pronunciation, AppError>> + Send;

    /// Downloads (if needed) and registers the audio with the media store.
    fn materialize(
        &self,
        pronunciation: &Pronunciation,
    ) -> impl Future<Output = Result<AudioArtifact, AppError>> + Send;

    /// Discards temporary downloads that were never materialized.
    fn cleanup(&self);
}

/// Asks the user for a missing mapping. `None` means the user declined.
pub trait ResolutionPrompt {
    fn select_field(
        &mut self,
        template: TemplateId,
        role: FieldRole,
        available: &[String],
    ) -> Option<String>;

    fn select_language(&mut self, group: GroupId) -> Option<String>;
}

/// Append-only side channel for per-record failures.
pub trait FailureLog: Send + Sync + 'static {
    fn record(&self, record: &RecordRef, error: &AppError) -> Result<(), AppError>;
}
