use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_SETTINGS_FILE: &str = "kanagloss.json";
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

#[derive(Parser, Debug)]
#[command(name = "kanagloss")]
#[command(about = "Gloss katakana loanwords in HTML pages with their English source words")]
#[command(version)]
pub struct Cli {
    /// Settings file (created on first save)
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Also write the log to ./kanagloss.log
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Annotate a saved page and write the result
    Annotate(AnnotateArgs),
    /// Inspect or reset the stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// HTML file to read
    pub input: PathBuf,

    /// Address the page was saved from; exclusion patterns match against it
    #[arg(long)]
    pub url: String,

    /// Where to write the annotated page
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Verbose logging for this run, regardless of the stored setting
    #[arg(long)]
    pub debug: bool,

    /// Give up waiting for translations after this long
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the effective settings as JSON
    Show,
    /// Store the built-in defaults
    Reset,
    /// Change stored settings; omitted options keep their current value
    Set(SetArgs),
}

#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// Turn annotation on or off
    #[arg(long, value_name = "BOOL")]
    pub enabled: Option<bool>,

    /// Translation backend
    #[arg(long, value_parser = ["google", "deepl", "custom"])]
    pub backend: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub deepl_api_key: Option<String>,

    /// JSON endpoint used by the custom backend
    #[arg(long, value_name = "URL")]
    pub custom_endpoint: Option<String>,

    /// Quiet time before a batch of page changes is scanned
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    pub debounce_ms: Option<i64>,

    /// Most tokens sent in one translation request
    #[arg(long, allow_negative_numbers = true)]
    pub chunk_size: Option<i64>,

    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    pub cache_ttl_ms: Option<i64>,

    /// Verbose logging
    #[arg(long, value_name = "BOOL")]
    pub debug: Option<bool>,

    /// URL patterns to skip, one per line, `*` as wildcard. `@FILE` reads
    /// them from a file; an empty value clears the list.
    #[arg(long, value_name = "TEXT|@FILE")]
    pub exclude: Option<String>,
}
