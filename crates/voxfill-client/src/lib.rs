//! voxfill Client - HTTP clients for the pronunciation providers.
//!
//! - [`forvo`] - Forvo, the primary provider, ranked by votes
//! - [`japanesepod`] - Jisho reading lookup plus JapanesePod101 audio, the
//!   fallback for Japanese
//! - [`provider`] - both behind the core's `PronunciationSource` port

pub mod forvo;
mod http;
pub mod japanesepod;
pub mod provider;

pub use forvo::ForvoClient;
pub use japanesepod::JapanesePodClient;
pub use provider::ProviderClient;
