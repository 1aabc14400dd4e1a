use thiserror::Error;

/// Application-wide error types.
///
/// Every failure a batch can run into is expressed as one of these variants.
/// Per-record failures (`FieldNotFound`, `NoResults`, transport and I/O
/// errors) are caught at the record boundary and end up in a
/// [`FailedItem`](crate::models::FailedItem); only [`AppError::UserDeclined`]
/// stops a batch before it starts.
///
/// # Error Conversion
///
/// Some errors convert from their source types using the `#[from]` attribute:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
/// - `std::io::Error` → `AppError::Io`
///
/// # Examples
///
/// ```no_run
/// use voxfill_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::FieldNotFound("Audio".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// A configured field does not exist on the record.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// No usable pronunciation from any provider path.
    #[error("No results for: {0}")]
    NoResults(String),

    /// Network or connection error.
    ///
    /// This error occurs when a request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// HTTP request reached the provider but was rejected.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// Local file operation failed (temp download, media store, failure log).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Collection database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration file could not be read, parsed or written.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The record was never processed because the batch was cancelled.
    #[error("Download cancelled")]
    Cancelled,

    /// The user declined to provide a required mapping during resolution.
    #[error("Cancelled by user: {0}")]
    UserDeclined(String),

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::FieldNotFound(field) => {
                format!(
                    "Field '{}' does not exist on this note.\n   \
                     Create it or change the mapping with: voxfill config set",
                    field
                )
            }
            AppError::NoResults(query) => {
                format!("No pronunciation found for '{}'.", query)
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   \
                     The server may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::ClientError(msg) => {
                if msg.contains("401") || msg.contains("403") {
                    "Forvo rejected the request.\n   Check your FORVO_API_KEY environment variable."
                        .to_string()
                } else if msg.contains("429") {
                    "Too many requests. Forvo may be rate limiting this address.\n   \
                     Spread your downloads over a few days."
                        .to_string()
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::DatabaseError(e) => {
                if e.to_string().contains("unable to open") {
                    "Cannot open the collection file. Check the --collection path.".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::Cancelled => "Not downloaded because the batch was cancelled.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Returns true if a later attempt at the same record could succeed.
    ///
    /// Nothing is retried automatically; the review report uses this to hint
    /// which records are worth passing back to `voxfill fetch --ids`.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxfill_core::error::AppError;
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::FieldNotFound("Audio".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::ClientError(_)
                | AppError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::FieldNotFound("Word".to_string());
        assert_eq!(err.to_string(), "Field not found: Word");
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(AppError::Cancelled.to_string(), "Download cancelled");
    }

    #[test]
    fn test_user_message_auth() {
        let err = AppError::ClientError("HTTP 401 from https://apifree.forvo.com".to_string());
        assert!(err.user_message().contains("FORVO_API_KEY"));
    }

    #[test]
    fn test_user_message_rate_limit() {
        let err = AppError::ClientError("HTTP 429".to_string());
        assert!(err.user_message().contains("Too many requests"));
    }

    #[test]
    fn test_error_from_serde() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{ invalid json }");
        let app_err: AppError = result.unwrap_err().into();
        assert!(matches!(app_err, AppError::SerializationError(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let app_err: AppError = io.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_is_retryable() {
        assert!(AppError::NetworkError("timeout".to_string()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(AppError::Cancelled.is_retryable());
        assert!(!AppError::NoResults("猫".to_string()).is_retryable());
        assert!(!AppError::UserDeclined("no field".to_string()).is_retryable());
    }
}
