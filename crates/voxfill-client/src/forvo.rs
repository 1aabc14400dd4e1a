use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use voxfill_core::config::HttpConfig;
use voxfill_core::error::AppError;
use voxfill_core::models::{AudioSource, Pronunciation};

use crate::http;

/// Public Forvo API endpoint.
pub const FORVO_API_BASE: &str = "https://apifree.forvo.com/";

/// Response of the `word-pronunciations` action.
///
/// Forvo API reference: <https://api.forvo.com/documentation/word-pronunciations/>
///
/// ```json
/// {
///     "attributes": { "total": 2 },
///     "items": [ { "username": "...", "num_votes": 3, "pathmp3": "https://..." } ]
/// }
/// ```
#[derive(Deserialize, Debug)]
pub struct ForvoResponse {
    #[serde(default)]
    pub items: Vec<ForvoItem>,
}

/// One pronunciation as listed by Forvo. Only the fields the ranking and the
/// download need are kept.
#[derive(Deserialize, Debug, Clone)]
pub struct ForvoItem {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub num_votes: u32,
    pub pathmp3: Option<String>,
}

/// HTTP client for Forvo, the primary vote-ranked provider.
///
/// # Examples
///
/// ```no_run
/// use voxfill_client::ForvoClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ForvoClient::new("your-api-key")?;
/// let candidates = client.fetch_pronunciations("Hund", "de").await?;
/// println!("Found {} pronunciations", candidates.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ForvoClient {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl ForvoClient {
    /// Creates a client for the public Forvo API.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::with_base_url(FORVO_API_BASE, api_key, &HttpConfig::default())
    }

    /// Creates a client for a Forvo-compatible endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if `base_url_str` does not parse.
    pub fn with_base_url(
        base_url_str: &str,
        api_key: &str,
        config: &HttpConfig,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url_str)
            .map_err(|_| AppError::InvalidUrl(format!("Invalid Forvo URL: {}", base_url_str)))?;

        Ok(Self {
            client: http::build_client(config)?,
            base_url,
            api_key: api_key.to_string(),
            timeout: config.timeout,
        })
    }

    /// Builds the `word-pronunciations` request URL. The word is
    /// percent-encoded as a path segment.
    pub fn pronunciations_url(&self, word: &str, language: &str) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "key",
                self.api_key.as_str(),
                "format",
                "json",
                "action",
                "word-pronunciations",
                "word",
                word,
                "language",
                language,
            ]);
        Ok(url)
    }

    /// Fetches all pronunciations of `word` in `language`, in Forvo's order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoResults` if Forvo lists no usable pronunciation,
    /// `AppError::NetworkError`/`AppError::Timeout` on transport failure and
    /// `AppError::ClientError` on a non-success status.
    pub async fn fetch_pronunciations(
        &self,
        word: &str,
        language: &str,
    ) -> Result<Vec<Pronunciation>, AppError> {
        let url = self.pronunciations_url(word, language)?;
        let resp = http::get(&self.client, &url, self.timeout).await?;

        let body: ForvoResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        let candidates = Self::into_pronunciations(body, word, language);
        if candidates.is_empty() {
            return Err(AppError::NoResults(word.to_string()));
        }

        tracing::debug!(word, language, count = candidates.len(), "Forvo candidates");
        Ok(candidates)
    }

    /// Downloads an audio file listed by Forvo.
    pub async fn download(&self, url: &Url) -> Result<Vec<u8>, AppError> {
        http::download(&self.client, url, self.timeout).await
    }

    /// Converts a Forvo response into candidates, dropping items without a
    /// valid MP3 link.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxfill_client::forvo::{ForvoClient, ForvoResponse};
    ///
    /// let body: ForvoResponse = serde_json::from_str(r#"{
    ///     "items": [{"username": "anna", "num_votes": 4, "pathmp3": "https://x.forvo.com/a.mp3"}]
    /// }"#).unwrap();
    ///
    /// let candidates = ForvoClient::into_pronunciations(body, "Hund", "de");
    /// assert_eq!(candidates[0].user, "anna");
    /// assert_eq!(candidates[0].votes, 4);
    /// ```
    pub fn into_pronunciations(
        body: ForvoResponse,
        word: &str,
        language: &str,
    ) -> Vec<Pronunciation> {
        body.items
            .into_iter()
            .filter_map(|item| {
                let link = item.pathmp3.as_deref()?;
                let url = match Url::parse(link) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::debug!(link, error = %e, "Skipping item with bad audio link");
                        return None;
                    }
                };
                Some(Pronunciation {
                    query: word.to_string(),
                    locale: language.to_string(),
                    user: item.username,
                    votes: item.num_votes,
                    audio: AudioSource::Remote(url),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_invalid_url() {
        let result = ForvoClient::with_base_url("not a url", "k", &HttpConfig::default());
        assert!(
            matches!(result, Err(AppError::InvalidUrl(msg)) if msg.contains("Invalid Forvo URL"))
        );
    }

    #[test]
    fn test_pronunciations_url() {
        let client = ForvoClient::new("abc123").unwrap();
        let url = client.pronunciations_url("Hund", "de").unwrap();
        assert_eq!(
            url.as_str(),
            "https://apifree.forvo.com/key/abc123/format/json\
             /action/word-pronunciations/word/Hund/language/de"
        );
    }

    #[test]
    fn test_pronunciations_url_encodes_word() {
        let client = ForvoClient::new("abc123").unwrap();
        let url = client.pronunciations_url("guten Tag/", "de").unwrap();
        assert!(url.as_str().contains("/word/guten%20Tag%2F/language/de"));
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "attributes": {"total": 3},
            "items": [
                {"id": 1, "username": "a", "num_votes": 2,
                 "pathmp3": "https://audio.forvo.com/1.mp3"},
                {"id": 2, "username": "b", "num_votes": 0, "pathmp3": null},
                {"id": 3, "username": "c", "pathmp3": "https://audio.forvo.com/3.mp3"}
            ]
        }"#;

        let body: ForvoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.items.len(), 3);

        let candidates = ForvoClient::into_pronunciations(body, "Hund", "de");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].user, "c");
        assert_eq!(candidates[1].votes, 0);
        assert_eq!(candidates[0].locale, "de");
    }

    #[test]
    fn test_empty_response() {
        let body: ForvoResponse = serde_json::from_str(r#"{"attributes": {"total": 0}}"#).unwrap();
        assert!(ForvoClient::into_pronunciations(body, "xyz", "de").is_empty());
    }

    #[test]
    fn test_bad_audio_link_dropped() {
        let body: ForvoResponse = serde_json::from_str(
            r#"{"items": [{"username": "a", "num_votes": 1, "pathmp3": "::not a url"}]}"#,
        )
        .unwrap();
        assert!(ForvoClient::into_pronunciations(body, "Hund", "de").is_empty());
    }
}
