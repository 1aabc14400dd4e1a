use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable identity of a record in the collection.
    RecordId
);
id_type!(
    /// Group (deck) a record belongs to; carries the configured locale.
    GroupId
);
id_type!(
    /// Template (note type) that defines a record's field names.
    TemplateId
);

/// One named field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// A flashcard-like item whose audio field receives the downloaded reference.
///
/// Records are owned by the collection; the batch only reads and writes
/// field values and hands the record back to
/// [`RecordStore::persist`](crate::ports::RecordStore::persist).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub group_id: GroupId,
    pub template_id: TemplateId,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(
        id: RecordId,
        group_id: GroupId,
        template_id: TemplateId,
        fields: Vec<Field>,
    ) -> Self {
        Self {
            id,
            group_id,
            template_id,
            fields,
        }
    }

    /// Returns the value of the named field, if the template has it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Overwrites the named field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::FieldNotFound` if the record has no such field;
    /// fields are never created here.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), AppError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| AppError::FieldNotFound(name.to_string()))?;
        field.value = value.into();
        Ok(())
    }

    /// Names of all fields, in template order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Content of the first field, used to identify the record in logs.
    pub fn first_field(&self) -> &str {
        self.fields.first().map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn to_ref(&self) -> RecordRef {
        RecordRef {
            id: self.id,
            label: self.first_field().to_string(),
        }
    }
}

/// Lightweight handle identifying a record in reports and failure logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub id: RecordId,
    pub label: String,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id, self.label)
    }
}

/// Where a candidate's audio currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Not downloaded yet.
    Remote(Url),
    /// Already fetched into the temp directory.
    Downloaded(PathBuf),
}

/// One provider-returned audio option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pronunciation {
    pub query: String,
    pub locale: String,
    /// Attribution label (the uploading user, or the provider name).
    pub user: String,
    pub votes: u32,
    pub audio: AudioSource,
}

/// Audio registered in the host media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub file_name: String,
}

impl AudioArtifact {
    /// Formatted reference placed into the audio field.
    pub fn reference(&self) -> String {
        format!("[sound:{}]", self.file_name)
    }
}

/// A record that could not be completed, together with the reason.
#[derive(Debug)]
pub struct FailedItem {
    pub record: RecordRef,
    pub reason: AppError,
}

impl FailedItem {
    pub fn new(record: RecordRef, reason: AppError) -> Self {
        Self { record, reason }
    }
}

/// Final disposition of one processed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Succeeded,
    Skipped,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new(
            RecordId(1),
            GroupId(10),
            TemplateId(100),
            vec![
                Field {
                    name: "Word".into(),
                    value: "猫".into(),
                },
                Field {
                    name: "Audio".into(),
                    value: String::new(),
                },
            ],
        )
    }

    #[test]
    fn test_field_lookup() {
        let r = record();
        assert_eq!(r.field("Word"), Some("猫"));
        assert_eq!(r.field("Missing"), None);
        assert_eq!(r.field("Audio"), Some(""));
        assert_eq!(r.first_field(), "猫");
    }

    #[test]
    fn test_set_field_unknown_name() {
        let mut r = record();
        let err = r.set_field("Sound", "x").unwrap_err();
        assert!(matches!(err, AppError::FieldNotFound(name) if name == "Sound"));
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut r = record();
        r.set_field("Audio", "[sound:a.mp3]").unwrap();
        assert_eq!(r.field("Audio"), Some("[sound:a.mp3]"));
    }

    #[test]
    fn test_artifact_reference() {
        let artifact = AudioArtifact {
            file_name: "pronunciation_ja_猫.mp3".into(),
        };
        assert_eq!(artifact.reference(), "[sound:pronunciation_ja_猫.mp3]");
    }

    #[test]
    fn test_record_ref_display() {
        assert_eq!(record().to_ref().to_string(), "#1 (猫)");
    }
}
