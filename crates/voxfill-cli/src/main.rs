use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use voxfill_cli::config::scope_for;
use voxfill_cli::render::{is_yes, large_batch_warning, progress_line, render_config, render_report};
use voxfill_cli::{
    Command, Config, ConfigCommand, Console, FetchArgs, FixedPrompt, TerminalPrompt,
};
use voxfill_client::ProviderClient;
use voxfill_core::config::{BatchConfig, ConfigEntry, ConfigValue, ScopedConfigStore};
use voxfill_core::{
    AppError, BatchControl, BatchEvent, BatchExecutor, BatchOptions, BatchRunState,
    ConfigResolutionFlow, FileFailureLog, GroupId, Record, RecordId, ReviewAggregator,
    RuntimeContext, TemplateId,
};
use voxfill_store::{CollectionRepository, DirMediaStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::parse();

    let ctx = match &config.home {
        Some(root) => RuntimeContext::with_root(root),
        None => RuntimeContext::from_platform_dirs()?,
    };

    // Setup logging (stderr to keep stdout clean for the report)
    let level = if ctx.debug_mode || config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    ctx.ensure_dirs().context("Failed to create voxfill directories")?;
    let store = Arc::new(
        ScopedConfigStore::load(&ctx.config_path()).context("Failed to load config")?,
    );

    match config.command {
        Command::Fetch(args) => fetch(&ctx, store, args).await?,
        Command::Config(command) => config_command(&ctx, &store, command)?,
    }

    Ok(())
}

/// Resolve records and mappings, run the batch, print the report
async fn fetch(
    ctx: &RuntimeContext,
    config: Arc<ScopedConfigStore>,
    args: FetchArgs,
) -> anyhow::Result<()> {
    let repo = Arc::new(
        CollectionRepository::connect(&args.collection)
            .await
            .context("Failed to open collection")?,
    );

    let records = match &args.group {
        Some(name) => {
            let group = repo
                .group_by_name(name)
                .await?
                .with_context(|| format!("No deck named '{}'", name))?;
            repo.records_in_group(group).await?
        }
        None => {
            let ids: Vec<RecordId> = args.ids.iter().copied().map(RecordId).collect();
            repo.records_by_ids(&ids).await?
        }
    };

    if records.is_empty() {
        info!("No records selected, nothing to do");
        return Ok(());
    }

    let mut console = Console::stdin();
    let batch = BatchConfig::default();
    if records.len() > batch.large_batch_threshold && !args.yes {
        if args.no_input {
            bail!(
                "{} records selected; pass --yes to confirm a batch this large",
                records.len()
            );
        }
        let question = large_batch_warning(records.len());
        if !confirm(&question, &mut console).await? {
            info!("Aborted by user");
            return Ok(());
        }
    }

    if args.apply_overrides(&config) {
        config.save(&ctx.config_path())?;
    }

    let flow = ConfigResolutionFlow::new(config.clone());
    let resolved = if args.no_input {
        let mut prompt = FixedPrompt {
            search_field: args.search_field.clone(),
            audio_field: args.audio_field.clone(),
            language: args.language.clone(),
        };
        flow.resolve(&records, &mut prompt)
    } else {
        let (groups, templates) = names_for(&repo, &records).await?;
        let mut prompt =
            TerminalPrompt::new(&mut console, std::io::stderr()).with_names(groups, templates);
        flow.resolve(&records, &mut prompt)
    };
    config.save(&ctx.config_path())?;
    match resolved {
        Err(AppError::UserDeclined(reason)) => {
            warn!("Nothing downloaded: {}", reason);
            return Ok(());
        }
        other => other?,
    }

    let media_dir = media_dir_for(&args.collection);
    let media = Arc::new(DirMediaStore::new(&media_dir)?);
    let source = Arc::new(ProviderClient::new(ctx, &args.api_key, media)?);
    let failure_log = Arc::new(FileFailureLog::new(&ctx.log_dir));
    let options = BatchOptions::from_config(&config, &batch);

    info!(
        records = records.len(),
        skip_existing = options.skip_existing,
        append = options.append,
        media = %media_dir.display(),
        "Starting bulk download"
    );
    if !args.no_input {
        eprintln!("Type p + Enter to pause or resume, c + Enter to cancel.");
    }

    let executor = BatchExecutor::new(repo, source, failure_log, config, options);
    let mut handle = executor.start(records.clone());
    let control = handle.control();

    let listen = !args.no_input;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(BatchEvent::Progress { current, total }) => {
                    eprintln!("{}", progress_line(current, total));
                }
                Some(BatchEvent::Log(line)) => eprintln!("{}", line),
                None => break,
            },
            line = console.next_line(), if listen && console.is_open() => {
                if let Some(line) = line {
                    handle_control_input(&control, line.trim());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, finishing the current card");
                control.cancel();
            }
        }
    }

    let run = handle.finish().await?;
    let report = ReviewAggregator::aggregate(&records, run);
    print!("{}", render_report(&report));

    Ok(())
}

fn handle_control_input(control: &BatchControl, input: &str) {
    match input {
        "p" | "pause" | "r" | "resume" => match control.toggle_pause() {
            BatchRunState::Paused => {
                eprintln!("Paused after the current card. Type p to resume.")
            }
            BatchRunState::Running => eprintln!("Resumed."),
            _ => {}
        },
        "c" | "cancel" => {
            eprintln!("Cancelling after the current card...");
            control.cancel();
        }
        "" => {}
        other => eprintln!("Unknown command '{}'. Use p or c.", other),
    }
}

async fn confirm<R>(question: &str, console: &mut Console<R>) -> anyhow::Result<bool>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", question)?;
    stderr.flush()?;

    Ok(console.next_line().await.is_some_and(|answer| is_yes(&answer)))
}

/// Deck and note type names for the records' ids, for the mapping prompts.
async fn names_for(
    repo: &CollectionRepository,
    records: &[Record],
) -> anyhow::Result<(HashMap<GroupId, String>, HashMap<TemplateId, String>)> {
    let mut groups = HashMap::new();
    let mut templates = HashMap::new();
    for record in records {
        if !groups.contains_key(&record.group_id) {
            if let Some(name) = repo.group_name(record.group_id).await? {
                groups.insert(record.group_id, name);
            }
        }
        if !templates.contains_key(&record.template_id) {
            if let Some(name) = repo.template_name(record.template_id).await? {
                templates.insert(record.template_id, name);
            }
        }
    }
    Ok((groups, templates))
}

/// Media folder next to the collection: `cards.sqlite` -> `cards.media`.
fn media_dir_for(collection: &std::path::Path) -> PathBuf {
    collection.with_extension("media")
}

fn config_command(
    ctx: &RuntimeContext,
    store: &ScopedConfigStore,
    command: ConfigCommand,
) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", render_config(&store.snapshot()));
        }
        ConfigCommand::Set {
            name,
            value,
            group,
            template,
        } => {
            let scope = scope_for(group, template);
            let description = store
                .get(&name, scope)
                .map(|e| e.description)
                .unwrap_or_default();
            store.set(
                ConfigEntry::new(&name, scope, ConfigValue::parse(&value))
                    .with_description(description),
            );
            store.save(&ctx.config_path())?;
            info!(name = %name, scope = %scope, value = %value, "Option saved");
        }
    }
    Ok(())
}
