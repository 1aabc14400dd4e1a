//! Terminal output for the fetch and config commands.

use voxfill_core::config::ConfigEntry;
use voxfill_core::models::RecordId;
use voxfill_core::review::ReviewReport;

/// Requests per record: one lookup and one download.
const REQUESTS_PER_RECORD: usize = 2;

pub fn large_batch_warning(count: usize) -> String {
    format!(
        "It has been reported that Forvo bans IPs that are downloading too many audios. \
         You have selected {} cards, resulting in {} requests to the server. \
         Please consider spreading your downloads over a few days \
         to avoid getting IP-banned by Forvo.\n\
         You are responsible for what you download with this tool. \
         Do you really want to continue? [y/N] ",
        count,
        count * REQUESTS_PER_RECORD
    )
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ids as accepted by `fetch --ids`.
pub fn format_retry_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn progress_line(current: usize, total: usize) -> String {
    format!("[{}/{}]", current, total)
}

/// Final summary: headline, one line per failure and the retry hint.
pub fn render_report(report: &ReviewReport) -> String {
    let mut out = format!(
        "{}\n{} succeeded, {} skipped, {} failed\n",
        report.headline(),
        report.succeeded(),
        report.skipped(),
        report.failed().len()
    );

    if !report.failed().is_empty() {
        out.push('\n');
        for item in report.failed() {
            out.push_str(&format!("  {}: {}\n", item.record, item.reason.user_message()));
        }
        out.push_str(&format!(
            "\nRetry with: voxfill fetch --ids {}\n",
            format_retry_ids(&report.retry_ids())
        ));
    }
    out
}

pub fn render_config(entries: &[ConfigEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{} [{}] = {}\n", entry.name(), entry.scope(), entry.value));
        if !entry.description.is_empty() {
            out.push_str(&format!("    {}\n", entry.description));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxfill_core::config::{ConfigScope, ConfigValue};
    use voxfill_core::error::AppError;
    use voxfill_core::models::{FailedItem, GroupId, RecordRef};

    fn failed(id: i64, reason: AppError) -> FailedItem {
        FailedItem::new(
            RecordRef {
                id: RecordId(id),
                label: format!("word{}", id),
            },
            reason,
        )
    }

    #[test]
    fn test_large_batch_warning_counts_requests() {
        let text = large_batch_warning(400);
        assert!(text.contains("400 cards"));
        assert!(text.contains("800 requests"));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_format_retry_ids() {
        assert_eq!(format_retry_ids(&[RecordId(3), RecordId(10)]), "3,10");
        assert_eq!(format_retry_ids(&[]), "");
    }

    #[test]
    fn test_render_all_succeeded() {
        let report = ReviewReport::AllSucceeded {
            succeeded: 4,
            skipped: 0,
        };
        let text = render_report(&report);
        assert!(text.starts_with("All downloads finished successfully!"));
        assert!(!text.contains("Retry with"));
    }

    #[test]
    fn test_render_failures() {
        let report = ReviewReport::SomeFailed {
            succeeded: 1,
            skipped: 0,
            failed: vec![
                failed(7, AppError::NoResults("word7".into())),
                failed(9, AppError::FieldNotFound("Audio".into())),
            ],
        };
        let text = render_report(&report);
        assert!(text.contains("2 downloads failed."));
        assert!(text.contains("#7 (word7)"));
        assert!(text.contains("Retry with: voxfill fetch --ids 7,9"));
    }

    #[test]
    fn test_render_config() {
        let entries = vec![
            ConfigEntry::new("appendAudio", ConfigScope::Global, ConfigValue::Bool(false))
                .with_description("Append instead of replace"),
            ConfigEntry::new(
                "language",
                ConfigScope::Group(GroupId(2)),
                ConfigValue::Text("ja".into()),
            ),
        ];
        let text = render_config(&entries);
        assert!(text.contains("appendAudio [global] = false\n    Append instead of replace\n"));
        assert!(text.contains("language [deck 2] = ja\n"));
    }
}
