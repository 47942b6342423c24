use serde_json::Value;

use super::{malformed, send_for_text, TranslateError, TranslationMap, Translator};

/// Public web endpoint taking every token in one newline separated query.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        tokens: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationMap, TranslateError> {
        let joined = tokens.join("\n");
        let url = url::Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("dt", "t"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("q", joined.trim_end()),
            ],
        )
        .map_err(|err| TranslateError::Network(err.to_string()))?;

        let body = send_for_text(self.client.get(url)).await?;
        parse_google_response(&body)
    }
}

/// The first element is a list of `[translated, original, ...]` segments.
/// Segments with a blank side are skipped; a repeated original keeps the
/// last translation.
pub fn parse_google_response(body: &str) -> Result<TranslationMap, TranslateError> {
    let parsed: Value = serde_json::from_str(body).map_err(malformed)?;
    let mut map = TranslationMap::new();
    let Some(segments) = parsed.get(0).and_then(Value::as_array) else {
        return Ok(map);
    };
    for segment in segments {
        let translated = segment.get(0).and_then(Value::as_str).map(str::trim);
        let original = segment.get(1).and_then(Value::as_str).map(str::trim);
        if let (Some(translated), Some(original)) = (translated, original) {
            if !translated.is_empty() && !original.is_empty() {
                map.insert(original.to_string(), translated.to_string());
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::parse_google_response;

    #[test]
    fn inverts_pairs_to_original_keys() {
        let map = parse_google_response(r#"[[["London","ロンドン"],["Madrid","マドリード"]]]"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["ロンドン"], "London");
        assert_eq!(map["マドリード"], "Madrid");
    }

    #[test]
    fn trims_segments_and_skips_blank_sides() {
        let map = parse_google_response(
            r#"[[["London\n","ロンドン\n"],["","マドリード"],["Tea",""],null,["Coffee","コーヒー",null,null,10]],null,"ja"]"#,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["ロンドン"], "London");
        assert_eq!(map["コーヒー"], "Coffee");
    }

    #[test]
    fn last_duplicate_wins() {
        let map = parse_google_response(r#"[[["Test","テスト"],["Exam","テスト"]]]"#).unwrap();
        assert_eq!(map["テスト"], "Exam");
    }

    #[test]
    fn unexpected_shape_is_empty_but_garbage_is_an_error() {
        assert!(parse_google_response(r#"{"a":1}"#).unwrap().is_empty());
        assert!(parse_google_response("<html>").is_err());
    }
}
