//! Fills configuration gaps before a batch starts.
//!
//! Order is fixed: every missing search field, then every missing audio
//! field, then every deck without a language. Each answer is stored right
//! away, scoped to its note type or deck, so nobody is asked twice for the
//! same one.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::{
    ConfigEntry, ConfigScope, ConfigValue, ScopedConfigStore, AUDIO_FIELD, LANGUAGE, SEARCH_FIELD,
};
use crate::error::AppError;
use crate::models::{GroupId, Record, TemplateId};
use crate::ports::ResolutionPrompt;

/// Which template mapping is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Search,
    Audio,
}

impl FieldRole {
    pub fn config_name(self) -> &'static str {
        match self {
            FieldRole::Search => SEARCH_FIELD,
            FieldRole::Audio => AUDIO_FIELD,
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Search => write!(f, "search field"),
            FieldRole::Audio => write!(f, "audio field"),
        }
    }
}

pub struct ConfigResolutionFlow {
    config: Arc<ScopedConfigStore>,
}

impl ConfigResolutionFlow {
    pub fn new(config: Arc<ScopedConfigStore>) -> Self {
        Self { config }
    }

    /// Templates in `records` without a mapping for `role`, in first-seen order.
    pub fn missing_templates(&self, records: &[Record], role: FieldRole) -> Vec<TemplateId> {
        let mut seen = HashSet::new();
        records
            .iter()
            .map(|r| r.template_id)
            .filter(|t| seen.insert(*t))
            .filter(|t| {
                self.config
                    .get(role.config_name(), ConfigScope::Template(*t))
                    .is_none()
            })
            .collect()
    }

    /// Groups in `records` without a language, in first-seen order.
    pub fn missing_groups(&self, records: &[Record]) -> Vec<GroupId> {
        let mut seen = HashSet::new();
        records
            .iter()
            .map(|r| r.group_id)
            .filter(|g| seen.insert(*g))
            .filter(|g| self.config.get(LANGUAGE, ConfigScope::Group(*g)).is_none())
            .collect()
    }

    /// Asks for every missing mapping, one at a time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UserDeclined` as soon as the prompt returns `None`;
    /// answers given before that are kept.
    pub fn resolve<P: ResolutionPrompt + ?Sized>(
        &self,
        records: &[Record],
        prompt: &mut P,
    ) -> Result<(), AppError> {
        for role in [FieldRole::Search, FieldRole::Audio] {
            for template in self.missing_templates(records, role) {
                let available = records
                    .iter()
                    .find(|r| r.template_id == template)
                    .map(Record::field_names)
                    .unwrap_or_default();

                let chosen = prompt
                    .select_field(template, role, &available)
                    .ok_or_else(|| {
                        AppError::UserDeclined(format!(
                            "no {} selected for note type {}",
                            role, template
                        ))
                    })?;

                tracing::info!(
                    template = %template,
                    role = %role,
                    field = %chosen,
                    "Field mapping selected"
                );
                self.config.set(ConfigEntry::new(
                    role.config_name(),
                    ConfigScope::Template(template),
                    ConfigValue::Text(chosen),
                ));
            }
        }

        for group in self.missing_groups(records) {
            let language = prompt.select_language(group).ok_or_else(|| {
                AppError::UserDeclined(format!("no language selected for deck {}", group))
            })?;

            tracing::info!(group = %group, language = %language, "Deck language selected");
            self.config.set(ConfigEntry::new(
                LANGUAGE,
                ConfigScope::Group(group),
                ConfigValue::Text(language),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, RecordId};

    #[derive(Default)]
    struct ScriptedPrompt {
        field_calls: Vec<(TemplateId, FieldRole)>,
        language_calls: Vec<GroupId>,
        decline_role: Option<FieldRole>,
        decline_language: bool,
    }

    impl ResolutionPrompt for ScriptedPrompt {
        fn select_field(
            &mut self,
            template: TemplateId,
            role: FieldRole,
            available: &[String],
        ) -> Option<String> {
            self.field_calls.push((template, role));
            if self.decline_role == Some(role) {
                return None;
            }
            match role {
                FieldRole::Search => available.first().cloned(),
                FieldRole::Audio => available.last().cloned(),
            }
        }

        fn select_language(&mut self, group: GroupId) -> Option<String> {
            self.language_calls.push(group);
            (!self.decline_language).then(|| "de".to_string())
        }
    }

    fn record(id: i64, group: i64, template: i64) -> Record {
        Record::new(
            RecordId(id),
            GroupId(group),
            TemplateId(template),
            vec![
                Field {
                    name: "Word".into(),
                    value: format!("w{}", id),
                },
                Field {
                    name: "Audio".into(),
                    value: String::new(),
                },
            ],
        )
    }

    #[test]
    fn test_asks_once_per_distinct_template() {
        let config = Arc::new(ScopedConfigStore::new());
        for t in [1, 2, 3] {
            config.set(ConfigEntry::new(
                SEARCH_FIELD,
                ConfigScope::Template(TemplateId(t)),
                ConfigValue::Text("Word".into()),
            ));
        }
        let records: Vec<Record> = (0..9).map(|i| record(i, 1, 1 + i % 3)).collect();
        let mut prompt = ScriptedPrompt::default();

        ConfigResolutionFlow::new(config.clone())
            .resolve(&records, &mut prompt)
            .unwrap();

        let audio_asks: Vec<_> = prompt
            .field_calls
            .iter()
            .filter(|(_, role)| *role == FieldRole::Audio)
            .collect();
        assert_eq!(audio_asks.len(), 3);
        assert_eq!(
            config
                .get_text(AUDIO_FIELD, ConfigScope::Template(TemplateId(2)))
                .as_deref(),
            Some("Audio")
        );
    }

    #[test]
    fn test_fixed_order() {
        let config = Arc::new(ScopedConfigStore::new());
        let records = vec![record(1, 10, 100), record(2, 20, 200), record(3, 10, 100)];
        let mut prompt = ScriptedPrompt::default();

        ConfigResolutionFlow::new(config.clone())
            .resolve(&records, &mut prompt)
            .unwrap();

        assert_eq!(
            prompt.field_calls,
            vec![
                (TemplateId(100), FieldRole::Search),
                (TemplateId(200), FieldRole::Search),
                (TemplateId(100), FieldRole::Audio),
                (TemplateId(200), FieldRole::Audio),
            ]
        );
        assert_eq!(prompt.language_calls, vec![GroupId(10), GroupId(20)]);
        assert_eq!(
            config
                .get_text(LANGUAGE, ConfigScope::Group(GroupId(20)))
                .as_deref(),
            Some("de")
        );
    }

    #[test]
    fn test_nothing_missing_asks_nothing() {
        let config = Arc::new(ScopedConfigStore::new());
        let records = vec![record(1, 10, 100)];
        let mut prompt = ScriptedPrompt::default();
        let flow = ConfigResolutionFlow::new(config);
        flow.resolve(&records, &mut prompt).unwrap();

        let mut second = ScriptedPrompt::default();
        flow.resolve(&records, &mut second).unwrap();
        assert!(second.field_calls.is_empty());
        assert!(second.language_calls.is_empty());
    }

    #[test]
    fn test_decline_audio_aborts_before_languages() {
        let config = Arc::new(ScopedConfigStore::new());
        let records = vec![record(1, 10, 100), record(2, 20, 200)];
        let mut prompt = ScriptedPrompt {
            decline_role: Some(FieldRole::Audio),
            ..Default::default()
        };

        let result = ConfigResolutionFlow::new(config).resolve(&records, &mut prompt);

        assert!(matches!(result, Err(AppError::UserDeclined(_))));
        // stops at the first declined audio field
        assert_eq!(prompt.field_calls.len(), 3);
        assert!(prompt.language_calls.is_empty());
    }

    #[test]
    fn test_decline_language() {
        let config = Arc::new(ScopedConfigStore::new());
        let records = vec![record(1, 10, 100)];
        let mut prompt = ScriptedPrompt {
            decline_language: true,
            ..Default::default()
        };

        let result = ConfigResolutionFlow::new(config).resolve(&records, &mut prompt);
        assert!(matches!(result, Err(AppError::UserDeclined(msg)) if msg.contains("language")));
    }
}
