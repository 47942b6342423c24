//! Operator settings: defaults, sanitizing of untrusted input, and the
//! compiled URL exclusion list.

use std::fmt;
use std::time::Duration;

use kanagloss_logging::gloss_warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEBOUNCE_MS_RANGE: (i64, i64) = (50, 3_000);
pub const CHUNK_SIZE_RANGE: (i64, i64) = (1, 500);
pub const CACHE_TTL_MS_RANGE: (i64, i64) = (60 * 1_000, 30 * 24 * 60 * 60 * 1_000);

const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_CHUNK_SIZE: usize = 120;
const DEFAULT_CACHE_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1_000;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Google,
    Deepl,
    Custom,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Google => "google",
            Backend::Deepl => "deepl",
            Backend::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "google" => Some(Backend::Google),
            "deepl" => Some(Backend::Deepl),
            "custom" => Some(Backend::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a translator adapter needs to be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub backend: Backend,
    pub deepl_api_key: String,
    pub custom_endpoint: String,
}

/// Immutable settings snapshot. Replace wholesale, never patch in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub backend: Backend,
    pub custom_endpoint: String,
    pub deepl_api_key: String,
    pub exclusion_patterns: Vec<String>,
    pub request_debounce_ms: u64,
    pub chunk_size: usize,
    pub cache_ttl_ms: u64,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: Backend::Google,
            custom_endpoint: String::new(),
            deepl_api_key: String::new(),
            exclusion_patterns: Vec::new(),
            request_debounce_ms: DEFAULT_DEBOUNCE_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            debug: false,
        }
    }
}

impl Settings {
    /// Parse and sanitize a stored settings blob.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::sanitize(&value))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Build settings from untyped input, field by field.
    ///
    /// A field of the wrong type falls back to its default; numbers are
    /// rounded and clamped; strings are trimmed.
    pub fn sanitize(raw: &Value) -> Self {
        let defaults = Self::default();
        let empty = serde_json::Map::new();
        let input = raw.as_object().unwrap_or(&empty);

        let enabled = input
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.enabled);
        let backend = input
            .get("backend")
            .and_then(Value::as_str)
            .and_then(Backend::from_name)
            .unwrap_or(defaults.backend);
        let custom_endpoint = trimmed_string(input.get("customEndpoint"))
            .unwrap_or(defaults.custom_endpoint);
        let deepl_api_key =
            trimmed_string(input.get("deeplApiKey")).unwrap_or(defaults.deepl_api_key);
        let exclusion_patterns = match input.get("exclusionPatterns").and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            None => defaults.exclusion_patterns,
        };
        let request_debounce_ms = clamp_integer(
            input.get("requestDebounceMs"),
            defaults.request_debounce_ms as i64,
            DEBOUNCE_MS_RANGE,
        ) as u64;
        let chunk_size = clamp_integer(
            input.get("chunkSize"),
            defaults.chunk_size as i64,
            CHUNK_SIZE_RANGE,
        ) as usize;
        let cache_ttl_ms = clamp_integer(
            input.get("cacheTtlMs"),
            defaults.cache_ttl_ms as i64,
            CACHE_TTL_MS_RANGE,
        ) as u64;
        let debug = input
            .get("debug")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.debug);

        Self {
            enabled,
            backend,
            custom_endpoint,
            deepl_api_key,
            exclusion_patterns,
            request_debounce_ms,
            chunk_size,
            cache_ttl_ms,
            debug,
        }
    }

    /// Re-run sanitizing over an already typed value, e.g. one built by the
    /// operator surface.
    pub fn sanitized(&self) -> Self {
        match serde_json::to_value(self) {
            Ok(value) => Self::sanitize(&value),
            Err(_) => Self::default(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.request_debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            backend: self.backend,
            deepl_api_key: self.deepl_api_key.clone(),
            custom_endpoint: self.custom_endpoint.clone(),
        }
    }
}

/// Split the newline-delimited pattern text of the operator surface.
pub fn parse_pattern_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn trimmed_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(|s| s.trim().to_string())
}

/// Coerce like a loose numeric conversion: `null` and blank strings are 0,
/// booleans are 0 or 1, numeric strings parse. A missing field or anything
/// else that is not a finite number takes `fallback`.
fn clamp_integer(value: Option<&Value>, fallback: i64, (min, max): (i64, i64)) -> i64 {
    let parsed = match value {
        Some(Value::Null) => Some(0.0),
        Some(Value::Bool(flag)) => Some(if *flag { 1.0 } else { 0.0 }),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) if text.trim().is_empty() => Some(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .map(|n| n.round() as i64)
    .unwrap_or(fallback);
    parsed.clamp(min, max)
}

/// URL glob patterns compiled to anchored regular expressions.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    patterns: Vec<Regex>,
}

impl ExclusionList {
    /// Compile every pattern; one that fails to compile is logged and skipped.
    pub fn compile(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match glob_to_regex(pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    gloss_warn!("Invalid exclusion pattern {:?}: {}", pattern, err);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(url))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{glob_to_regex, parse_pattern_lines, Backend, ExclusionList, Settings};

    #[test]
    fn glob_star_matches_any_run_and_is_anchored() {
        let regex = glob_to_regex("https://*.example.com/*").unwrap();
        assert!(regex.is_match("https://www.example.com/page"));
        assert!(!regex.is_match("xhttps://www.example.com/page"));
        assert!(!regex.is_match("https://www.example.org/page"));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        let regex = glob_to_regex("https://a.com/?q=(1)").unwrap();
        assert!(regex.is_match("https://a.com/?q=(1)"));
        assert!(!regex.is_match("https://abcom/q=1"));
    }

    #[test]
    fn oversized_pattern_is_skipped_not_fatal() {
        let huge = "a".repeat(2_000_000);
        let list = ExclusionList::compile(&[huge, "*://blocked.example/*".to_string()]);
        assert_eq!(list.len(), 1);
        assert!(list.matches("https://blocked.example/x"));
    }

    #[test]
    fn sanitize_falls_back_per_field() {
        let settings = Settings::sanitize(&json!({
            "enabled": "yes",
            "backend": "bing",
            "customEndpoint": "  https://x.test/api  ",
            "chunkSize": 9999,
            "requestDebounceMs": "12",
            "cacheTtlMs": [60000],
            "debug": true,
        }));
        assert!(settings.enabled);
        assert_eq!(settings.backend, Backend::Google);
        assert_eq!(settings.custom_endpoint, "https://x.test/api");
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.request_debounce_ms, 50);
        assert_eq!(settings.cache_ttl_ms, Settings::default().cache_ttl_ms);
        assert!(settings.debug);
    }

    #[test]
    fn sanitize_coerces_null_blank_and_booleans_before_clamping() {
        let settings = Settings::sanitize(&json!({
            "requestDebounceMs": null,
            "cacheTtlMs": "",
            "chunkSize": true,
        }));
        assert_eq!(settings.request_debounce_ms, 50);
        assert_eq!(settings.cache_ttl_ms, 60_000);
        assert_eq!(settings.chunk_size, 1);

        let missing = Settings::sanitize(&json!({ "chunkSize": "many" }));
        assert_eq!(missing.request_debounce_ms, Settings::default().request_debounce_ms);
        assert_eq!(missing.chunk_size, Settings::default().chunk_size);
    }

    #[test]
    fn sanitize_rounds_fractional_numbers() {
        let settings = Settings::sanitize(&json!({ "chunkSize": 10.6 }));
        assert_eq!(settings.chunk_size, 11);
    }

    #[test]
    fn non_object_input_yields_defaults() {
        assert_eq!(Settings::sanitize(&json!([1, 2])), Settings::default());
    }

    #[test]
    fn pattern_lines_drop_blanks() {
        assert_eq!(
            parse_pattern_lines(" a \n\n   \nb\n"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn json_round_trip_uses_camel_case_keys() {
        let json = Settings::default().to_json();
        assert!(json.contains("\"requestDebounceMs\":300"));
        assert!(json.contains("\"backend\":\"google\""));
        assert_eq!(Settings::from_json(&json).unwrap(), Settings::default());
    }
}
