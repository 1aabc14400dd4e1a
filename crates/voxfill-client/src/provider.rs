//! [`PronunciationSource`] backed by Forvo with the JapanesePod101 fallback.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use voxfill_core::config::HttpConfig;
use voxfill_core::context::RuntimeContext;
use voxfill_core::error::AppError;
use voxfill_core::models::{AudioArtifact, AudioSource, Pronunciation};
use voxfill_core::ports::{MediaStore, PronunciationSource};

use crate::forvo::{ForvoClient, FORVO_API_BASE};
use crate::http;
use crate::japanesepod::{self, JapanesePodClient};

/// Routes lookups to the right provider and hands finished downloads to the
/// media store.
///
/// Every temp file this client writes is tracked until it has been added to
/// the media store, so [`cleanup`](PronunciationSource::cleanup) can remove
/// whatever a failed or cancelled record left behind.
pub struct ProviderClient<M> {
    forvo: ForvoClient,
    japanese: JapanesePodClient,
    media: Arc<M>,
    temp_dir: PathBuf,
    pending: Mutex<HashSet<PathBuf>>,
}

impl<M: MediaStore> ProviderClient<M> {
    pub fn new(ctx: &RuntimeContext, api_key: &str, media: Arc<M>) -> Result<Self, AppError> {
        let config = HttpConfig::default();
        Ok(Self::with_clients(
            ForvoClient::with_base_url(FORVO_API_BASE, api_key, &config)?,
            JapanesePodClient::new(&ctx.temp_dir, &config)?,
            media,
            &ctx.temp_dir,
        ))
    }

    pub fn with_clients(
        forvo: ForvoClient,
        japanese: JapanesePodClient,
        media: Arc<M>,
        temp_dir: &Path,
    ) -> Self {
        Self {
            forvo,
            japanese,
            media,
            temp_dir: temp_dir.to_path_buf(),
            pending: Mutex::new(HashSet::new()),
        }
    }

    fn track(&self, path: &Path) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(path.to_path_buf());
        }
    }

    fn untrack(&self, path: &Path) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(path);
        }
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or_default()
    }

    /// Registers a local download and removes the temp copy.
    fn register(&self, path: &Path) -> Result<AudioArtifact, AppError> {
        self.track(path);
        let file_name = self.media.add_file(path)?;
        if let Err(e) = std::fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %e, "Could not remove temp file");
        } else {
            self.untrack(path);
        }
        Ok(AudioArtifact { file_name })
    }
}

impl<M: MediaStore> PronunciationSource for ProviderClient<M> {
    fn fallback_locale(&self) -> Option<&str> {
        Some(japanesepod::LOCALE)
    }

    async fn fetch_primary(
        &self,
        query: &str,
        locale: &str,
    ) -> Result<Vec<Pronunciation>, AppError> {
        self.forvo.fetch_pronunciations(query, locale).await
    }

    async fn fetch_fallback(&self, query: &str, locale: &str) -> Result<Pronunciation, AppError> {
        if locale != japanesepod::LOCALE {
            return Err(AppError::NoResults(format!("{} ({})", query, locale)));
        }
        let pronunciation = self.japanese.fetch(query).await?;
        if let AudioSource::Downloaded(path) = &pronunciation.audio {
            self.track(path);
        }
        Ok(pronunciation)
    }

    async fn materialize(&self, pronunciation: &Pronunciation) -> Result<AudioArtifact, AppError> {
        match &pronunciation.audio {
            AudioSource::Downloaded(path) => self.register(path),
            AudioSource::Remote(url) => {
                let audio = self.forvo.download(url).await?;
                tokio::fs::create_dir_all(&self.temp_dir).await?;
                let path = self
                    .temp_dir
                    .join(http::temp_file_name(&pronunciation.locale, &pronunciation.query));
                self.track(&path);
                tokio::fs::write(&path, &audio).await?;
                self.register(&path)
            }
        }
    }

    fn cleanup(&self) {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        for path in pending.drain() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed leftover temp file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp file")
                }
            }
        }
    }
}
