use kanagloss_core::Backend;
use serde::Deserialize;
use serde_json::Value;

use super::{malformed, send_for_text, TranslateError, TranslationMap, Translator};

#[derive(Debug, Clone)]
pub struct DeeplTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl DeeplTranslator {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.trim().to_string(),
        }
    }
}

/// Items stay untyped so one bad entry costs only its own position.
#[derive(Debug, Deserialize)]
struct DeeplResponse {
    #[serde(default)]
    translations: Vec<Value>,
}

#[async_trait::async_trait]
impl Translator for DeeplTranslator {
    async fn translate(
        &self,
        tokens: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationMap, TranslateError> {
        if self.api_key.is_empty() {
            return Err(TranslateError::MissingCredential(Backend::Deepl));
        }

        // The serializer is not Send and must be gone before the await.
        let form = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("auth_key", &self.api_key);
            form.append_pair("source_lang", &source_lang.to_uppercase());
            form.append_pair("target_lang", &target_lang.to_uppercase());
            for token in tokens {
                form.append_pair("text", token);
            }
            form.finish()
        };

        let request = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form);
        let body = send_for_text(request).await?;
        parse_deepl_response(&body, tokens)
    }
}

/// Translations come back in request order and are matched by position.
/// Extra entries on either side are ignored.
pub fn parse_deepl_response(
    body: &str,
    tokens: &[String],
) -> Result<TranslationMap, TranslateError> {
    let parsed: DeeplResponse = serde_json::from_str(body).map_err(malformed)?;
    Ok(tokens
        .iter()
        .zip(parsed.translations)
        .filter_map(|(token, item)| {
            let text = item.get("text")?.as_str()?.trim();
            (!text.is_empty()).then(|| (token.clone(), text.to_string()))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::parse_deepl_response;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zips_by_position() {
        let map = parse_deepl_response(
            r#"{"translations":[{"text":" London "},{"text":"Madrid"}]}"#,
            &tokens(&["ロンドン", "マドリード"]),
        )
        .unwrap();
        assert_eq!(map["ロンドン"], "London");
        assert_eq!(map["マドリード"], "Madrid");
    }

    #[test]
    fn shorter_response_maps_only_the_overlap() {
        let map = parse_deepl_response(
            r#"{"translations":[{"text":"London"}]}"#,
            &tokens(&["ロンドン", "マドリード"]),
        )
        .unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn longer_response_ignores_the_excess() {
        let map = parse_deepl_response(
            r#"{"translations":[{"text":"London"},{"text":"Paris"}]}"#,
            &tokens(&["ロンドン"]),
        )
        .unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn null_item_skips_only_its_position() {
        let map = parse_deepl_response(
            r#"{"translations":[null,{"text":"Madrid"}]}"#,
            &tokens(&["ロンドン", "マドリード"]),
        )
        .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["マドリード"], "Madrid");
    }

    #[test]
    fn non_string_or_blank_text_is_skipped() {
        let map = parse_deepl_response(
            r#"{"translations":[{"text":5},{"text":"Madrid"},{"text":"  "}]}"#,
            &tokens(&["ロンドン", "マドリード", "パリ"]),
        )
        .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["マドリード"], "Madrid");
    }

    #[test]
    fn missing_translations_field_is_empty() {
        assert!(parse_deepl_response("{}", &tokens(&["ロンドン"])).unwrap().is_empty());
    }
}
