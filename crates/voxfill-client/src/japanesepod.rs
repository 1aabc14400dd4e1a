use reqwest::{Client, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use voxfill_core::config::HttpConfig;
use voxfill_core::error::AppError;
use voxfill_core::models::{AudioSource, Pronunciation};

use crate::http;

/// Word search endpoint used to find the kana reading.
pub const JISHO_SEARCH_URL: &str = "https://jisho.org/api/v1/search/words";

/// Audio endpoint keyed by (kanji, kana).
pub const JAPANESEPOD_AUDIO_URL: &str =
    "http://assets.languagepod101.com/dictionary/japanese/audiomp3.php";

/// MD5 of the clip JapanesePod101 serves when it has no recording.
pub const PLACEHOLDER_MD5: &str = "7e2c2f954ef6051373ba916f000168dc";

/// The only locale this provider serves.
pub const LOCALE: &str = "ja";

/// Attribution used for fallback pronunciations.
pub const ATTRIBUTION: &str = "JapanesePod101";

#[derive(Deserialize, Debug)]
struct JishoResponse {
    #[serde(default)]
    data: Vec<JishoEntry>,
}

#[derive(Deserialize, Debug)]
struct JishoEntry {
    #[serde(default)]
    japanese: Vec<JishoForm>,
}

#[derive(Deserialize, Debug)]
struct JishoForm {
    reading: Option<String>,
}

/// Two-step fallback provider for Japanese: Jisho reading lookup, then
/// the JapanesePod101 clip for (word, reading).
///
/// Every failure, including the placeholder clip, is reported as
/// `AppError::NoResults` so callers can fall through to the primary provider.
#[derive(Clone)]
pub struct JapanesePodClient {
    client: Client,
    search_url: Url,
    audio_url: Url,
    temp_dir: PathBuf,
    timeout: Duration,
    placeholder_md5: String,
}

impl JapanesePodClient {
    /// Creates a client saving clips into `temp_dir`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(temp_dir: &Path, config: &HttpConfig) -> Result<Self, AppError> {
        Self::with_endpoints(JISHO_SEARCH_URL, JAPANESEPOD_AUDIO_URL, temp_dir, config)
    }

    pub fn with_endpoints(
        search_url: &str,
        audio_url: &str,
        temp_dir: &Path,
        config: &HttpConfig,
    ) -> Result<Self, AppError> {
        let parse = |s: &str| Url::parse(s).map_err(|_| AppError::InvalidUrl(s.to_string()));
        Ok(Self {
            client: http::build_client(config)?,
            search_url: parse(search_url)?,
            audio_url: parse(audio_url)?,
            temp_dir: temp_dir.to_path_buf(),
            timeout: config.timeout,
            placeholder_md5: PLACEHOLDER_MD5.to_string(),
        })
    }

    /// Replaces the MD5 of the "not found" clip.
    pub fn with_placeholder_md5(mut self, md5: &str) -> Self {
        self.placeholder_md5 = md5.to_ascii_lowercase();
        self
    }

    fn is_placeholder(&self, audio: &[u8]) -> bool {
        format!("{:x}", md5::compute(audio)) == self.placeholder_md5
    }

    pub fn search_url(&self, word: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("keyword", word);
        url
    }

    pub fn audio_url(&self, kanji: &str, kana: &str) -> Url {
        let mut url = self.audio_url.clone();
        url.query_pairs_mut()
            .append_pair("kanji", kanji)
            .append_pair("kana", kana);
        url
    }

    /// Reading of the best Jisho match for `word`.
    pub async fn lookup_reading(&self, word: &str) -> Result<String, AppError> {
        let resp = http::get(&self.client, &self.search_url(word), self.timeout).await?;
        let body: JishoResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;
        first_reading(body).ok_or_else(|| AppError::NoResults(word.to_string()))
    }

    /// Looks up the reading, downloads the clip and saves it to the temp dir.
    ///
    /// # Errors
    ///
    /// Always `AppError::NoResults`, wrapping the underlying cause.
    pub async fn fetch(&self, word: &str) -> Result<Pronunciation, AppError> {
        self.try_fetch(word)
            .await
            .map_err(|e| match e {
                AppError::NoResults(_) => e,
                other => AppError::NoResults(format!("{} ({})", word, other)),
            })
    }

    async fn try_fetch(&self, word: &str) -> Result<Pronunciation, AppError> {
        let kana = self.lookup_reading(word).await?;
        let audio = http::download(&self.client, &self.audio_url(word, &kana), self.timeout).await?;

        if self.is_placeholder(&audio) {
            return Err(AppError::NoResults(format!("{} (placeholder audio)", word)));
        }

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let path = self.temp_dir.join(http::temp_file_name(LOCALE, word));
        tokio::fs::write(&path, &audio).await?;
        tracing::debug!(word, kana = %kana, path = %path.display(), "Fallback clip saved");

        Ok(Pronunciation {
            query: word.to_string(),
            locale: LOCALE.to_string(),
            user: ATTRIBUTION.to_string(),
            votes: 0,
            audio: AudioSource::Downloaded(path),
        })
    }
}

fn first_reading(body: JishoResponse) -> Option<String> {
    body.data
        .into_iter()
        .next()?
        .japanese
        .into_iter()
        .next()?
        .reading
        .filter(|r| !r.is_empty())
}
