//! The translate capability and its three HTTP adapters.
mod custom;
mod deepl;
mod google;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kanagloss_core::{Backend, BackendSettings};
use thiserror::Error;

pub use custom::{parse_custom_response, CustomTranslator};
pub use deepl::{parse_deepl_response, DeeplTranslator};
pub use google::{parse_google_response, GoogleTranslator};

/// Token to translation. Tokens the backend had nothing for are absent.
pub type TranslationMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("no API key configured for {0}")]
    MissingCredential(Backend),
    #[error("no endpoint configured for the custom backend")]
    MissingEndpoint,
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate `tokens` as one batch. An `Err` rejects the whole batch.
    async fn translate(
        &self,
        tokens: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationMap, TranslateError>;
}

/// Builds the translator for a backend selection.
pub type TranslatorFactory =
    Arc<dyn Fn(&BackendSettings) -> Result<Arc<dyn Translator>, TranslateError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub google_endpoint: String,
    pub deepl_endpoint: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            google_endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            deepl_endpoint: "https://api-free.deepl.com/v2/translate".to_string(),
        }
    }
}

pub fn http_translator_factory(http: HttpSettings) -> TranslatorFactory {
    Arc::new(
        move |backend: &BackendSettings| -> Result<Arc<dyn Translator>, TranslateError> {
            let client = build_client(&http)?;
            let translator: Arc<dyn Translator> = match backend.backend {
                Backend::Google => Arc::new(GoogleTranslator::new(client, &http.google_endpoint)),
                Backend::Deepl => Arc::new(DeeplTranslator::new(
                    client,
                    &http.deepl_endpoint,
                    &backend.deepl_api_key,
                )),
                Backend::Custom => {
                    Arc::new(CustomTranslator::new(client, &backend.custom_endpoint))
                }
            };
            Ok(translator)
        },
    )
}

pub(crate) fn build_client(http: &HttpSettings) -> Result<reqwest::Client, TranslateError> {
    reqwest::Client::builder()
        .connect_timeout(http.connect_timeout)
        .timeout(http.request_timeout)
        .build()
        .map_err(|err| TranslateError::Network(err.to_string()))
}

/// Send a prepared request and return the body of a 2xx response.
pub(crate) async fn send_for_text(request: reqwest::RequestBuilder) -> Result<String, TranslateError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TranslateError::HttpStatus(status.as_u16()));
    }
    response.text().await.map_err(map_reqwest_error)
}

fn map_reqwest_error(err: reqwest::Error) -> TranslateError {
    if err.is_timeout() {
        return TranslateError::Timeout;
    }
    TranslateError::Network(err.to_string())
}

pub(crate) fn malformed(err: serde_json::Error) -> TranslateError {
    TranslateError::MalformedResponse(err.to_string())
}
