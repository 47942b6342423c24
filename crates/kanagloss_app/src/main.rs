//! `kanagloss`: annotate katakana loanwords in a saved HTML page.
mod cli;
mod settings_cmd;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kanagloss_core::Settings;
use kanagloss_engine::{
    load_settings, parse_html, render_html, save_settings, AtomicFileWriter, EngineConfig,
    EngineHandle, JsonFileStore,
};
use kanagloss_logging::{gloss_info, gloss_warn, LogDestination};

use crate::cli::{AnnotateArgs, Cli, Command, SettingsAction};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(&cli.command, Command::Annotate(args) if args.debug);
    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    kanagloss_logging::initialize(destination, verbose);

    let store = JsonFileStore::new(&cli.settings);
    match cli.command {
        Command::Annotate(args) => annotate(args, store).await,
        Command::Settings { action } => settings(action, &store).await,
    }
}

async fn annotate(args: AnnotateArgs, store: JsonFileStore) -> Result<()> {
    let mut settings = load_settings(&store).await;
    if args.debug {
        settings.debug = true;
    }

    let html = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("reading {}", args.input.display()))?;
    let doc = parse_html(&html, &args.url).context("building document")?;
    gloss_info!(
        "Loaded {} ({} nodes) as {}",
        args.input.display(),
        doc.node_count(),
        args.url
    );

    let handle = EngineHandle::spawn(doc, EngineConfig::new(settings).with_store(Arc::new(store)));
    let timeout = Duration::from_millis(args.timeout_ms);
    match tokio::time::timeout(timeout, handle.settled()).await {
        Ok(settled) => settled?,
        Err(_) => gloss_warn!(
            "Translations still outstanding after {} ms, writing what is done",
            args.timeout_ms
        ),
    }

    let status = handle.status().await?;
    let doc = handle.shutdown().await?;
    let (writer, filename) = AtomicFileWriter::for_path(&args.output)?;
    let written = writer.write(&filename, &render_html(&doc))?;

    println!("{status}");
    println!("wrote {}", written.display());
    Ok(())
}

async fn settings(action: SettingsAction, store: &JsonFileStore) -> Result<()> {
    let settings = match action {
        SettingsAction::Show => load_settings(store).await,
        SettingsAction::Set(args) => {
            let exclusions = match args.exclude.as_deref() {
                Some(raw) => Some(settings_cmd::read_exclusions(raw, Path::new("."))?),
                None => None,
            };
            let current = load_settings(store).await;
            let updated = settings_cmd::apply_overrides(&current, &args, exclusions);
            save_settings(store, &updated).await;
            gloss_info!("Stored settings in {}", store.path().display());
            updated
        }
        SettingsAction::Reset => {
            let defaults = Settings::default();
            save_settings(store, &defaults).await;
            gloss_info!("Stored default settings in {}", store.path().display());
            defaults
        }
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
