use kanagloss_core::annotate::{scan_root, write_gloss};
use kanagloss_core::SessionId;
use kanagloss_engine::{parse_html, render_html, GLOSS_STYLESHEET};

const PAGE: &str = r#"<!DOCTYPE html><html><head><title>テストのページ</title></head><body class="article"><p>これはテストです</p><script>if (a < b && c) {}</script><img src="x.png" alt="a&quot;b"></body></html>"#;

#[test]
fn parse_keeps_head_body_and_attributes() {
    let doc = parse_html(PAGE, "https://news.test/a").unwrap();

    assert_eq!(doc.url(), "https://news.test/a");
    assert_eq!(doc.title(), "テストのページ");
    assert_eq!(doc.attribute(doc.body(), "class"), Some("article"));

    let tags: Vec<_> = doc
        .children(doc.body())
        .iter()
        .filter_map(|&child| doc.tag(child))
        .collect();
    assert_eq!(tags, vec!["p", "script", "img"]);
    assert!(!doc.is_observing());
}

#[test]
fn render_writes_raw_script_void_elements_and_style_sheet() {
    let doc = parse_html(PAGE, "https://news.test/a").unwrap();
    let html = render_html(&doc);

    assert!(html.starts_with("<!DOCTYPE html>\n<html><head><title>"));
    assert!(html.contains("<script>if (a < b && c) {}</script>"));
    assert!(html.contains(r#"<img src="x.png" alt="a&quot;b"></body>"#));
    assert!(html.contains(GLOSS_STYLESHEET));
    assert!(html.contains("</style></head>"));
}

#[test]
fn annotated_document_renders_ruby_markup() {
    let mut doc = parse_html(PAGE, "https://news.test/a").unwrap();
    let body = doc.body();
    let found = scan_root(&mut doc, body, SessionId(1)).unwrap();
    assert_eq!(found.len(), 1);
    assert!(write_gloss(&mut doc, found[0].holder, "test", SessionId(1)));

    let html = render_html(&doc);
    assert!(html.contains(
        r#"<p>これは<ruby class="kanagloss-ruby">テスト<rt class="kanagloss-rt" data-kg-session="1" data-gloss="test"></rt></ruby>です</p>"#
    ));
}
