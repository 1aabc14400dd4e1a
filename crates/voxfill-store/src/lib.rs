//! voxfill Store - the local flashcard collection and its media folder.
//!
//! - [`repository`] - SQLite collection implementing `RecordStore`
//! - [`media`] - media directory implementing `MediaStore`

pub mod media;
pub mod repository;

pub use media::DirMediaStore;
pub use repository::CollectionRepository;
