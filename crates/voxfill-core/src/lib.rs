//! voxfill Core - domain types, scoped configuration and the batch orchestrator.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod failure_log;
pub mod models;
pub mod ports;
pub mod resolution;
pub mod review;
pub mod selection;

pub use config::{
    BatchConfig, ConfigEntry, ConfigKey, ConfigScope, ConfigValue, HttpConfig, ScopedConfigStore,
};
pub use context::RuntimeContext;
pub use error::AppError;
pub use executor::{
    BatchControl, BatchEvent, BatchExecutor, BatchHandle, BatchOptions, BatchRun, BatchRunState,
};
pub use failure_log::FileFailureLog;
pub use models::{
    AudioArtifact, AudioSource, FailedItem, Field, GroupId, Pronunciation, Record, RecordId,
    RecordOutcome, RecordRef, TemplateId,
};
pub use ports::{FailureLog, MediaStore, PronunciationSource, RecordStore, ResolutionPrompt};
pub use resolution::{ConfigResolutionFlow, FieldRole};
pub use review::{ReviewAggregator, ReviewReport};
pub use selection::select_best;
