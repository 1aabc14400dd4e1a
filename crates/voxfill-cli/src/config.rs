use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use voxfill_core::config::{
    ConfigEntry, ConfigScope, ConfigValue, ScopedConfigStore, APPEND_AUDIO, SKIP_EXISTING,
};
use voxfill_core::models::{GroupId, TemplateId};

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "voxfill")]
#[command(
    author,
    version,
    about = "Bulk-add pronunciation audio from Forvo to flashcards"
)]
#[command(after_help = "Examples:
  voxfill fetch --collection cards.sqlite --group German
  voxfill fetch --collection cards.sqlite --ids 12,15,31 --append true
  voxfill config show
  voxfill config set language de --group 3")]
pub struct Config {
    /// Root directory for config, logs and temp files (default: platform config dir)
    #[arg(long, env = "VOXFILL_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download pronunciations into the audio field of many records
    Fetch(FetchArgs),
    /// Inspect or change stored options
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Forvo API key
    #[arg(long, env = "FORVO_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Path to the SQLite collection
    #[arg(short, long, env = "VOXFILL_COLLECTION", value_name = "PATH")]
    pub collection: PathBuf,

    /// Process every record of this group (deck), by name
    #[arg(short, long, value_name = "NAME", required_unless_present = "ids")]
    pub group: Option<String>,

    /// Process these record ids
    #[arg(long, value_name = "ID,...", value_delimiter = ',', conflicts_with = "group")]
    pub ids: Vec<i64>,

    /// Skip records whose audio field already has content (persisted)
    #[arg(long, value_name = "BOOL")]
    pub skip_existing: Option<bool>,

    /// Append to the audio field instead of overwriting it (persisted)
    #[arg(long, value_name = "BOOL")]
    pub append: Option<bool>,

    /// Do not ask before large batches
    #[arg(short, long)]
    pub yes: bool,

    /// Never prompt; missing mappings come from the flags below
    #[arg(long)]
    pub no_input: bool,

    /// Search field for note types without a mapping (with --no-input)
    #[arg(long, value_name = "FIELD", requires = "no_input")]
    pub search_field: Option<String>,

    /// Audio field for note types without a mapping (with --no-input)
    #[arg(long, value_name = "FIELD", requires = "no_input")]
    pub audio_field: Option<String>,

    /// Language code for decks without one (with --no-input)
    #[arg(long, value_name = "CODE", requires = "no_input")]
    pub language: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// List all stored options
    Show,
    /// Set one option, globally or for a group or template
    #[command(after_help = "Examples:
  voxfill config set appendAudio true
  voxfill config set language ja --group 4
  voxfill config set audioField Audio --template 1")]
    Set {
        name: String,
        value: String,
        /// Scope the option to this group (deck) id
        #[arg(long, value_name = "ID", conflicts_with = "template")]
        group: Option<i64>,
        /// Scope the option to this template (note type) id
        #[arg(long, value_name = "ID")]
        template: Option<i64>,
    },
}

impl FetchArgs {
    /// Writes `--skip-existing`/`--append` into the global scope so the
    /// choice sticks for later runs. Returns true if anything changed.
    pub fn apply_overrides(&self, store: &ScopedConfigStore) -> bool {
        let mut changed = false;
        for (name, value) in [(SKIP_EXISTING, self.skip_existing), (APPEND_AUDIO, self.append)] {
            let Some(value) = value else { continue };
            if store.get_bool(name, ConfigScope::Global) == Some(value) {
                continue;
            }
            let description = store
                .get(name, ConfigScope::Global)
                .map(|e| e.description)
                .unwrap_or_default();
            store.set(
                ConfigEntry::new(name, ConfigScope::Global, ConfigValue::Bool(value))
                    .with_description(description),
            );
            changed = true;
        }
        changed
    }
}

/// Scope selected by `config set --group/--template`.
pub fn scope_for(group: Option<i64>, template: Option<i64>) -> ConfigScope {
    match (group, template) {
        (Some(g), _) => ConfigScope::Group(GroupId(g)),
        (None, Some(t)) => ConfigScope::Template(TemplateId(t)),
        (None, None) => ConfigScope::Global,
    }
}
