//! Answers for missing field and language mappings.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::io::Write;

use voxfill_core::models::{GroupId, TemplateId};
use voxfill_core::ports::ResolutionPrompt;
use voxfill_core::resolution::FieldRole;

/// Blocking line input shared by every interactive question of a session.
pub trait LineSource {
    /// Next line without its terminator, `None` once input is exhausted.
    fn read_line(&mut self) -> Option<String>;
}

impl<T: LineSource + ?Sized> LineSource for &mut T {
    fn read_line(&mut self) -> Option<String> {
        (**self).read_line()
    }
}

/// Asks on a terminal. An empty answer or end of input declines.
///
/// Decks and note types are shown by name when one was registered with
/// [`with_names`](Self::with_names), otherwise by id.
pub struct TerminalPrompt<S, W> {
    input: S,
    output: W,
    group_names: HashMap<GroupId, String>,
    template_names: HashMap<TemplateId, String>,
}

impl<S: LineSource, W: Write> TerminalPrompt<S, W> {
    pub fn new(input: S, output: W) -> Self {
        Self {
            input,
            output,
            group_names: HashMap::new(),
            template_names: HashMap::new(),
        }
    }

    pub fn with_names(
        mut self,
        group_names: HashMap<GroupId, String>,
        template_names: HashMap<TemplateId, String>,
    ) -> Self {
        self.group_names = group_names;
        self.template_names = template_names;
        self
    }

    fn read_answer(&mut self) -> Option<String> {
        let line = self.input.read_line()?;
        let answer = line.trim();
        (!answer.is_empty()).then(|| answer.to_string())
    }
}

fn label<K: Hash + Eq + Display>(names: &HashMap<K, String>, id: K) -> String {
    match names.get(&id) {
        Some(name) => format!("'{}'", name),
        None => format!("#{}", id),
    }
}

impl<S: LineSource, W: Write> ResolutionPrompt for TerminalPrompt<S, W> {
    fn select_field(
        &mut self,
        template: TemplateId,
        role: FieldRole,
        available: &[String],
    ) -> Option<String> {
        let note_type = label(&self.template_names, template);
        let _ = writeln!(self.output, "Select the {} for note type {}:", role, note_type);
        for (i, name) in available.iter().enumerate() {
            let _ = writeln!(self.output, "  {}) {}", i + 1, name);
        }

        loop {
            let _ = write!(self.output, "Number or name (empty to abort): ");
            let _ = self.output.flush();
            let answer = self.read_answer()?;

            if let Ok(n) = answer.parse::<usize>() {
                if let Some(name) = n.checked_sub(1).and_then(|i| available.get(i)) {
                    return Some(name.clone());
                }
            } else if available.contains(&answer) {
                return Some(answer);
            }
            let _ = writeln!(self.output, "'{}' is not one of the fields above.", answer);
        }
    }

    fn select_language(&mut self, group: GroupId) -> Option<String> {
        let deck = label(&self.group_names, group);
        let _ = write!(
            self.output,
            "Language code for deck {} (e.g. de, ja; empty to abort): ",
            deck
        );
        let _ = self.output.flush();
        self.read_answer()
    }
}

/// Non-interactive answers taken from command-line flags.
#[derive(Debug, Default)]
pub struct FixedPrompt {
    pub search_field: Option<String>,
    pub audio_field: Option<String>,
    pub language: Option<String>,
}

impl ResolutionPrompt for FixedPrompt {
    fn select_field(
        &mut self,
        template: TemplateId,
        role: FieldRole,
        available: &[String],
    ) -> Option<String> {
        let wanted = match role {
            FieldRole::Search => self.search_field.as_ref(),
            FieldRole::Audio => self.audio_field.as_ref(),
        }?;
        if available.contains(wanted) {
            Some(wanted.clone())
        } else {
            tracing::warn!(template = %template, field = %wanted, "Note type has no such field");
            None
        }
    }

    fn select_language(&mut self, _group: GroupId) -> Option<String> {
        self.language.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    impl LineSource for VecDeque<String> {
        fn read_line(&mut self) -> Option<String> {
            self.pop_front()
        }
    }

    fn fields() -> Vec<String> {
        vec!["Front".into(), "Back".into(), "Audio".into()]
    }

    fn prompt(input: &str) -> TerminalPrompt<VecDeque<String>, Vec<u8>> {
        TerminalPrompt::new(input.lines().map(String::from).collect(), Vec::new())
    }

    #[test]
    fn test_select_by_number_and_name() {
        let mut p = prompt("3\nFront\n");
        assert_eq!(
            p.select_field(TemplateId(1), FieldRole::Audio, &fields()),
            Some("Audio".into())
        );
        assert_eq!(
            p.select_field(TemplateId(1), FieldRole::Search, &fields()),
            Some("Front".into())
        );
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("  2) Back"));
    }

    #[test]
    fn test_invalid_answer_asks_again() {
        let mut p = prompt("0\nBack2\n2\n");
        assert_eq!(
            p.select_field(TemplateId(1), FieldRole::Search, &fields()),
            Some("Back".into())
        );
    }

    #[test]
    fn test_empty_or_eof_declines() {
        let mut p = prompt("\n");
        assert_eq!(p.select_field(TemplateId(1), FieldRole::Search, &fields()), None);
        assert_eq!(p.select_language(GroupId(1)), None);
    }

    #[test]
    fn test_shows_names_when_known() {
        let mut p = prompt("1\nja\n").with_names(
            HashMap::from([(GroupId(20), "Japanese::Vocab".to_string())]),
            HashMap::from([(TemplateId(3), "Basic".to_string())]),
        );
        p.select_field(TemplateId(3), FieldRole::Search, &fields());
        p.select_language(GroupId(20));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("note type 'Basic':"));
        assert!(shown.contains("deck 'Japanese::Vocab'"));
        assert!(!shown.contains("#3"));
    }

    #[test]
    fn test_falls_back_to_ids() {
        let mut p = prompt("1\nja\n");
        p.select_field(TemplateId(3), FieldRole::Search, &fields());
        p.select_language(GroupId(20));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("note type #3:"));
        assert!(shown.contains("deck #20"));
    }

    #[test]
    fn test_language() {
        let mut p = prompt("  ja \n");
        assert_eq!(p.select_language(GroupId(2)), Some("ja".into()));
    }

    #[test]
    fn test_fixed_prompt() {
        let mut p = FixedPrompt {
            search_field: Some("Front".into()),
            audio_field: Some("Sound".into()),
            language: None,
        };
        assert_eq!(
            p.select_field(TemplateId(1), FieldRole::Search, &fields()),
            Some("Front".into())
        );
        assert_eq!(p.select_field(TemplateId(1), FieldRole::Audio, &fields()), None);
        assert_eq!(p.select_language(GroupId(1)), None);
    }
}
