use std::time::Duration;

use kanagloss_core::{Backend, BackendSettings};
use kanagloss_engine::{http_translator_factory, HttpSettings, TranslateError, Translator};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn http_for(server: &MockServer) -> HttpSettings {
    HttpSettings {
        google_endpoint: format!("{}/translate_a/single", server.uri()),
        deepl_endpoint: format!("{}/v2/translate", server.uri()),
        ..HttpSettings::default()
    }
}

fn translator(
    http: HttpSettings,
    backend: Backend,
    deepl_api_key: &str,
    custom_endpoint: &str,
) -> std::sync::Arc<dyn Translator> {
    let factory = http_translator_factory(http);
    factory(&BackendSettings {
        backend,
        deepl_api_key: deepl_api_key.to_string(),
        custom_endpoint: custom_endpoint.to_string(),
    })
    .expect("translator")
}

#[tokio::test]
async fn google_sends_one_newline_joined_query() {
    kanagloss_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("client", "gtx"))
        .and(query_param("dt", "t"))
        .and(query_param("sl", "ja"))
        .and(query_param("tl", "en"))
        .and(query_param("q", "ロンドン\nマドリード"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[[["London\n","ロンドン\n",null,null,10],["Madrid","マドリード",null,null,10]],null,"ja"]"#,
            "application/json; charset=utf-8",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let google = translator(http_for(&server), Backend::Google, "", "");
    let map = google
        .translate(&tokens(&["ロンドン", "マドリード"]), "ja", "en")
        .await
        .expect("translate ok");

    assert_eq!(map.len(), 2);
    assert_eq!(map["ロンドン"], "London");
    assert_eq!(map["マドリード"], "Madrid");
}

#[tokio::test]
async fn google_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let google = translator(http_for(&server), Backend::Google, "", "");
    let err = google
        .translate(&tokens(&["テスト"]), "ja", "en")
        .await
        .unwrap_err();
    assert_eq!(err, TranslateError::HttpStatus(500));
}

#[tokio::test]
async fn google_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("[]", "application/json")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let http = HttpSettings {
        request_timeout: Duration::from_millis(200),
        ..http_for(&server)
    };
    let google = translator(http, Backend::Google, "", "");
    let err = google
        .translate(&tokens(&["テスト"]), "ja", "en")
        .await
        .unwrap_err();
    assert_eq!(err, TranslateError::Timeout);
}

#[tokio::test]
async fn deepl_posts_form_and_zips_by_position() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/translate"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("auth_key=secret-key"))
        .and(body_string_contains("source_lang=JA"))
        .and(body_string_contains("target_lang=EN"))
        .and(body_string_contains("text=%E3%83%86%E3%82%B9%E3%83%88"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "translations": [
                {"detected_source_language": "JA", "text": "test"},
                {"detected_source_language": "JA", "text": "data"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let deepl = translator(http_for(&server), Backend::Deepl, " secret-key ", "");
    let map = deepl
        .translate(&tokens(&["テスト", "データ"]), "ja", "en")
        .await
        .expect("translate ok");

    assert_eq!(map["テスト"], "test");
    assert_eq!(map["データ"], "data");
}

#[tokio::test]
async fn deepl_without_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let deepl = translator(http_for(&server), Backend::Deepl, "   ", "");
    let err = deepl
        .translate(&tokens(&["テスト"]), "ja", "en")
        .await
        .unwrap_err();
    assert_eq!(err, TranslateError::MissingCredential(Backend::Deepl));
}

#[tokio::test]
async fn custom_posts_json_and_accepts_record_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gloss"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "sourceLang": "ja",
            "targetLang": "en",
            "phrases": ["テスト", "データ"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "translations": [
                {"phrase": "テスト", "translation": "test"},
                {"phrase": "データ", "translation": "  "}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/gloss", server.uri());
    let custom = translator(http_for(&server), Backend::Custom, "", &endpoint);
    let map = custom
        .translate(&tokens(&["テスト", "データ"]), "ja", "en")
        .await
        .expect("translate ok");

    assert_eq!(map.len(), 1);
    assert_eq!(map["テスト"], "test");
}

#[tokio::test]
async fn custom_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&server)
        .await;

    let endpoint = format!("{}/gloss", server.uri());
    let custom = translator(http_for(&server), Backend::Custom, "", &endpoint);
    let err = custom
        .translate(&tokens(&["テスト"]), "ja", "en")
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::MalformedResponse(_)));
}

#[tokio::test]
async fn custom_without_endpoint_is_rejected() {
    let custom = translator(HttpSettings::default(), Backend::Custom, "", "");
    let err = custom
        .translate(&tokens(&["テスト"]), "ja", "en")
        .await
        .unwrap_err();
    assert_eq!(err, TranslateError::MissingEndpoint);
}
