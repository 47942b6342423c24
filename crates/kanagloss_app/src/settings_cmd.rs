//! `kanagloss settings set`: operator edits merged into the stored settings.

use std::path::Path;

use anyhow::{Context, Result};
use kanagloss_core::settings::parse_pattern_lines;
use kanagloss_core::Settings;
use serde_json::{json, Value};

use crate::cli::SetArgs;

/// Resolve `--exclude`: `@FILE` is read from disk, anything else is the
/// pattern text itself.
pub fn read_exclusions(raw: &str, base_dir: &Path) -> Result<Vec<String>> {
    let text = match raw.strip_prefix('@') {
        Some(file) => {
            let path = base_dir.join(file);
            std::fs::read_to_string(&path)
                .with_context(|| format!("reading exclusion patterns from {}", path.display()))?
        }
        None => raw.to_string(),
    };
    Ok(parse_pattern_lines(&text))
}

/// Overlay the given options on `current` and sanitize the result, so
/// out-of-range numbers are clamped exactly as stored settings are.
pub fn apply_overrides(
    current: &Settings,
    args: &SetArgs,
    exclusions: Option<Vec<String>>,
) -> Settings {
    let mut value = serde_json::to_value(current).unwrap_or_else(|_| json!({}));
    let Some(fields) = value.as_object_mut() else {
        return current.clone();
    };
    let mut set = |key: &str, field: Option<Value>| {
        if let Some(field) = field {
            fields.insert(key.to_string(), field);
        }
    };
    set("enabled", args.enabled.map(Value::from));
    set("backend", args.backend.clone().map(Value::from));
    set("deeplApiKey", args.deepl_api_key.clone().map(Value::from));
    set("customEndpoint", args.custom_endpoint.clone().map(Value::from));
    set("requestDebounceMs", args.debounce_ms.map(Value::from));
    set("chunkSize", args.chunk_size.map(Value::from));
    set("cacheTtlMs", args.cache_ttl_ms.map(Value::from));
    set("debug", args.debug.map(Value::from));
    set("exclusionPatterns", exclusions.map(Value::from));
    Settings::sanitize(&value)
}

#[cfg(test)]
mod tests {
    use kanagloss_core::{Backend, Settings};
    use kanagloss_engine::{load_settings, save_settings, JsonFileStore};
    use tempfile::TempDir;

    use super::{apply_overrides, read_exclusions};
    use crate::cli::SetArgs;

    #[test]
    fn omitted_options_keep_current_values() {
        let current = Settings {
            backend: Backend::Custom,
            custom_endpoint: "https://gloss.test/api".to_string(),
            ..Settings::default()
        };
        let args = SetArgs {
            debug: Some(true),
            ..SetArgs::default()
        };
        let updated = apply_overrides(&current, &args, None);
        assert_eq!(updated.backend, Backend::Custom);
        assert_eq!(updated.custom_endpoint, "https://gloss.test/api");
        assert!(updated.debug);
    }

    #[test]
    fn numbers_are_clamped_and_strings_trimmed() {
        let args = SetArgs {
            chunk_size: Some(10_000),
            debounce_ms: Some(-5),
            deepl_api_key: Some("  key  ".to_string()),
            ..SetArgs::default()
        };
        let updated = apply_overrides(&Settings::default(), &args, None);
        assert_eq!(updated.chunk_size, 500);
        assert_eq!(updated.request_debounce_ms, 50);
        assert_eq!(updated.deepl_api_key, "key");
    }

    #[test]
    fn exclusions_come_from_text_or_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("patterns.txt"),
            "https://mail.test/*\n\n  *://*/admin/*  \n",
        )
        .unwrap();

        assert_eq!(
            read_exclusions("@patterns.txt", dir.path()).unwrap(),
            vec!["https://mail.test/*", "*://*/admin/*"]
        );
        assert_eq!(
            read_exclusions("https://a.test/*\nhttps://b.test/*", dir.path()).unwrap(),
            vec!["https://a.test/*", "https://b.test/*"]
        );
        assert!(read_exclusions("", dir.path()).unwrap().is_empty());
        assert!(read_exclusions("@missing.txt", dir.path()).is_err());
    }

    #[tokio::test]
    async fn set_round_trips_through_the_store() {
        kanagloss_logging::initialize_for_tests();
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));

        let args = SetArgs {
            enabled: Some(false),
            backend: Some("deepl".to_string()),
            cache_ttl_ms: Some(1),
            ..SetArgs::default()
        };
        let exclusions = read_exclusions("https://mail.test/*", dir.path()).unwrap();
        let updated = apply_overrides(&load_settings(&store).await, &args, Some(exclusions));
        save_settings(&store, &updated).await;

        let stored = load_settings(&store).await;
        assert_eq!(stored, updated);
        assert!(!stored.enabled);
        assert_eq!(stored.backend, Backend::Deepl);
        assert_eq!(stored.cache_ttl_ms, 60_000);
        assert_eq!(stored.exclusion_patterns, vec!["https://mail.test/*"]);
    }
}
