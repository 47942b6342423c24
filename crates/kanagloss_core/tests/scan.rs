use std::time::Instant;

use kanagloss_core::annotate::scan_root;
use kanagloss_core::{
    update, Document, EngineState, MutationRecord, Msg, Settings, RT_CLASS, RUBY_CLASS,
};

#[test]
fn mixed_script_text_is_split_around_katakana_runs() {
    kanagloss_logging::initialize_for_tests();
    let now = Instant::now();
    let mut doc = Document::new("https://blog.example.jp/post/1");
    let p = doc.create_element("p");
    let t = doc.create_text("これはテストonlyのデータ");
    doc.append_child(p, t).unwrap();
    doc.append_child(doc.body(), p).unwrap();

    let (state, _) = update(EngineState::new(Settings::default()), &mut doc, Msg::Start, now);
    let (_state, _) = update(state, &mut doc, Msg::ScanTimerFired, now);

    let children = doc.children(p).to_vec();
    assert_eq!(children.len(), 4);
    assert_eq!(doc.text(children[0]), Some("これは"));
    assert_eq!(doc.tag(children[1]), Some("ruby"));
    assert_eq!(doc.text(children[2]), Some("onlyの"));
    assert_eq!(doc.tag(children[3]), Some("ruby"));

    let ruby = children[1];
    assert!(doc.element(ruby).unwrap().has_class(RUBY_CLASS));
    let parts = doc.children(ruby).to_vec();
    assert_eq!(doc.text(parts[0]), Some("テスト"));
    assert!(doc.element(parts[1]).unwrap().has_class(RT_CLASS));
    assert_eq!(doc.text_content(parts[1]), "");
    // Readers of the paragraph still see the original words.
    assert_eq!(doc.text_content(p), "これはテストonlyのデータ");
}

#[test]
fn scanning_twice_adds_nothing() {
    kanagloss_logging::initialize_for_tests();
    let now = Instant::now();
    let mut doc = Document::new("https://blog.example.jp/");
    let p = doc.create_element("p");
    let t = doc.create_text("ニュースとスポーツ");
    doc.append_child(p, t).unwrap();
    doc.append_child(doc.body(), p).unwrap();

    let (state, _) = update(EngineState::new(Settings::default()), &mut doc, Msg::Start, now);
    let (state, _) = update(state, &mut doc, Msg::ScanTimerFired, now);
    let after_first = doc.node_count();
    let queued = state.queue().queued_len();

    let (state, _) = update(
        state,
        &mut doc,
        Msg::DocumentMutated(vec![MutationRecord::ChildAdded(p)]),
        now,
    );
    let (state, _) = update(state, &mut doc, Msg::ScanTimerFired, now);
    assert_eq!(doc.node_count(), after_first);
    assert_eq!(state.queue().queued_len(), queued);

    let body = doc.body();
    let again = scan_root(&mut doc, body, state.session()).unwrap();
    assert!(again.is_empty());
}

#[test]
fn text_changed_by_host_is_rescanned() {
    kanagloss_logging::initialize_for_tests();
    let now = Instant::now();
    let mut doc = Document::new("https://blog.example.jp/");
    let p = doc.create_element("p");
    let t = doc.create_text("まだない");
    doc.append_child(p, t).unwrap();
    doc.append_child(doc.body(), p).unwrap();

    let (state, _) = update(EngineState::new(Settings::default()), &mut doc, Msg::Start, now);
    let (state, _) = update(state, &mut doc, Msg::ScanTimerFired, now);
    assert_eq!(state.queue().queued_len(), 0);

    doc.set_text(t, "ゲームが来た").unwrap();
    let records = doc.take_mutations();
    assert_eq!(records, vec![MutationRecord::TextChanged(t)]);
    let (state, _) = update(state, &mut doc, Msg::DocumentMutated(records), now);
    let (state, _) = update(state, &mut doc, Msg::ScanTimerFired, now);
    assert!(state.queue().is_in_flight("ゲーム"));
}

#[test]
fn subtree_removed_before_scan_is_dropped_quietly() {
    kanagloss_logging::initialize_for_tests();
    let now = Instant::now();
    let mut doc = Document::new("https://blog.example.jp/");
    let (state, _) = update(EngineState::new(Settings::default()), &mut doc, Msg::Start, now);
    let (state, _) = update(state, &mut doc, Msg::ScanTimerFired, now);

    let div = doc.create_element("div");
    let t = doc.create_text("トースト");
    doc.append_child(div, t).unwrap();
    doc.append_child(doc.body(), div).unwrap();
    let records = doc.take_mutations();
    doc.remove(div).unwrap();

    let (state, _) = update(state, &mut doc, Msg::DocumentMutated(records), now);
    let (state, effects) = update(state, &mut doc, Msg::ScanTimerFired, now);
    assert!(effects.is_empty());
    assert!(state.pending().is_empty());
    assert_eq!(state.queue().queued_len(), 0);
}
