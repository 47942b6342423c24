use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{malformed, send_for_text, TranslateError, TranslationMap, Translator};

/// Operator supplied JSON endpoint.
#[derive(Debug, Clone)]
pub struct CustomTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl CustomTranslator {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim().to_string(),
        }
    }
}

/// Accepted response bodies, tried top to bottom.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CustomResponse {
    /// `{"translations": {"トークン": "token"}}`
    Keyed {
        translations: HashMap<String, Value>,
    },
    /// `{"translations": [{"phrase": "トークン", "translation": "token"}]}`
    Records { translations: Vec<Value> },
    /// `{"トークン": "token"}`
    Flat(HashMap<String, Value>),
}

#[async_trait::async_trait]
impl Translator for CustomTranslator {
    async fn translate(
        &self,
        tokens: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationMap, TranslateError> {
        if self.endpoint.is_empty() {
            return Err(TranslateError::MissingEndpoint);
        }
        let payload = json!({
            "sourceLang": source_lang,
            "targetLang": target_lang,
            "phrases": tokens,
        });
        let request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string());
        let body = send_for_text(request).await?;
        parse_custom_response(&body)
    }
}

pub fn parse_custom_response(body: &str) -> Result<TranslationMap, TranslateError> {
    let parsed: CustomResponse = serde_json::from_str(body).map_err(malformed)?;
    let pairs: Vec<(String, Value)> = match parsed {
        CustomResponse::Keyed { translations } | CustomResponse::Flat(translations) => {
            translations.into_iter().collect()
        }
        CustomResponse::Records { translations } => translations
            .into_iter()
            .filter_map(|record| {
                let phrase = record.get("phrase")?.as_str()?.trim().to_string();
                let translation = record.get("translation")?.clone();
                Some((phrase, translation))
            })
            .collect(),
    };
    Ok(pairs
        .into_iter()
        .filter_map(|(token, value)| {
            let token = token.trim();
            let value = value.as_str()?.trim();
            (!token.is_empty() && !value.is_empty()).then(|| (token.to_string(), value.to_string()))
        })
        .collect())
}
