//! Finding eligible text under a subtree, wrapping tokens in gloss markup and
//! taking that markup out again.

use indexmap::IndexSet;

use crate::dom::{Document, DocumentError, NodeId};
use crate::matcher::find_token;
use crate::session::SessionId;

pub const RUBY_CLASS: &str = "kanagloss-ruby";
pub const RT_CLASS: &str = "kanagloss-rt";
pub const SESSION_ATTR: &str = "data-kg-session";
pub const GLOSS_ATTR: &str = "data-gloss";

const EXCLUDED_TAGS: &[&str] = &[
    "ruby", "rt", "rp", "script", "style", "select", "textarea", "input", "code", "pre",
];

pub fn is_excluded_tag(tag: &str) -> bool {
    EXCLUDED_TAGS.contains(&tag)
}

/// A freshly created gloss holder and the token it is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub token: String,
    pub holder: NodeId,
}

/// Annotate every eligible text run under `root`.
///
/// A root that left the document since it was queued is skipped, as is one
/// sitting inside an excluded or editable element.
pub fn scan_root(
    doc: &mut Document,
    root: NodeId,
    session: SessionId,
) -> Result<Vec<Annotation>, DocumentError> {
    if !doc.is_attached(root) {
        return Ok(Vec::new());
    }
    let boundary = if doc.is_text(root) {
        doc.parent(root)
    } else {
        Some(root)
    };
    match boundary {
        Some(element) if !is_skipped_within(doc, element) => {}
        _ => return Ok(Vec::new()),
    }

    let mut annotations = Vec::new();
    for text in eligible_text_nodes(doc, root) {
        annotate_text(doc, text, session, &mut annotations)?;
    }
    Ok(annotations)
}

/// True when `element` or one of its ancestors is excluded or editable.
fn is_skipped_within(doc: &Document, element: NodeId) -> bool {
    if doc.is_editable(element) {
        return true;
    }
    let mut current = Some(element);
    while let Some(id) = current {
        if doc.tag(id).is_some_and(is_excluded_tag) {
            return true;
        }
        current = doc.parent(id);
    }
    false
}

fn eligible_text_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if doc.is_text(node) {
            out.push(node);
            continue;
        }
        if node != root
            && (doc.tag(node).is_some_and(is_excluded_tag) || doc.is_editable(node))
        {
            continue;
        }
        stack.extend(doc.children(node).iter().rev().copied());
    }
    out
}

fn annotate_text(
    doc: &mut Document,
    node: NodeId,
    session: SessionId,
    annotations: &mut Vec<Annotation>,
) -> Result<(), DocumentError> {
    let mut cursor = node;
    loop {
        let Some(text) = doc.text(cursor) else {
            return Ok(());
        };
        let Some(found) = find_token(text) else {
            return Ok(());
        };
        let (start, len) = (found.start, found.end - found.start);
        let token = found.token.to_string();

        // Splitting at 0 would leave an empty text node in front.
        let matched = if start == 0 {
            cursor
        } else {
            doc.split_text(cursor, start)?
        };
        let rest = doc.split_text(matched, len)?;

        let (ruby, holder) = build_annotation(doc, &token, session)?;
        doc.insert_quiet(ruby, matched)?;
        doc.remove(matched)?;
        annotations.push(Annotation { token, holder });

        if doc.text(rest).is_some_and(str::is_empty) {
            doc.remove(rest)?;
            return Ok(());
        }
        cursor = rest;
    }
}

/// `<ruby class=..>token<rt class=.. data-kg-session=N></rt></ruby>`, detached.
fn build_annotation(
    doc: &mut Document,
    token: &str,
    session: SessionId,
) -> Result<(NodeId, NodeId), DocumentError> {
    let ruby = doc.create_element("ruby");
    doc.set_attribute(ruby, "class", RUBY_CLASS)?;
    let base = doc.create_text(token);
    doc.append_quiet(ruby, base)?;
    let holder = doc.create_element("rt");
    doc.set_attribute(holder, "class", RT_CLASS)?;
    doc.set_attribute(holder, SESSION_ATTR, &session.to_string())?;
    doc.append_quiet(ruby, holder)?;
    Ok((ruby, holder))
}

/// Write `translation` into `holder` if it is still attached and belongs to
/// `session`. Returns whether the write happened.
pub fn write_gloss(doc: &mut Document, holder: NodeId, translation: &str, session: SessionId) -> bool {
    if !doc.is_attached(holder) || doc.tag(holder) != Some("rt") {
        return false;
    }
    let stamp = session.to_string();
    if doc.attribute(holder, SESSION_ATTR) != Some(stamp.as_str()) {
        return false;
    }
    doc.set_attribute(holder, GLOSS_ATTR, translation).is_ok()
}

pub fn is_annotation(doc: &Document, node: NodeId) -> bool {
    doc.tag(node) == Some("ruby")
        && doc
            .element(node)
            .is_some_and(|element| element.has_class(RUBY_CLASS))
}

/// Replace every annotation under `root` with its base text and merge the
/// text runs around it. Returns how many annotations were removed.
pub fn revert_annotations(doc: &mut Document, root: NodeId) -> Result<usize, DocumentError> {
    let rubies: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&node| is_annotation(doc, node))
        .collect();

    let mut parents = IndexSet::new();
    let mut reverted = 0;
    for ruby in rubies {
        // Nested inside an annotation already replaced.
        if !doc.contains(ruby) {
            continue;
        }
        let Some(parent) = doc.parent(ruby) else {
            continue;
        };
        let base = annotation_base_text(doc, ruby);
        doc.replace_with_text(ruby, &base)?;
        parents.insert(parent);
        reverted += 1;
    }
    for parent in parents {
        if doc.contains(parent) {
            doc.normalize(parent)?;
        }
    }
    Ok(reverted)
}

/// Text of a ruby element without its annotation parts.
pub(crate) fn annotation_base_text(doc: &Document, ruby: NodeId) -> String {
    doc.children(ruby)
        .iter()
        .filter(|&&child| !matches!(doc.tag(child), Some("rt") | Some("rp")))
        .map(|&child| match doc.text(child) {
            Some(text) => text.to_string(),
            None => doc.text_content(child),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{revert_annotations, scan_root, write_gloss, GLOSS_ATTR};
    use crate::dom::Document;
    use crate::session::SessionId;

    fn page(text: &str) -> (Document, crate::dom::NodeId) {
        let mut doc = Document::new("https://a.test/");
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t).unwrap();
        doc.append_child(doc.body(), p).unwrap();
        (doc, p)
    }

    #[test]
    fn token_at_start_leaves_no_empty_text_before_it() {
        let (mut doc, p) = page("テストです");
        let found = scan_root(&mut doc, p, SessionId(1)).unwrap();
        assert_eq!(found.len(), 1);
        let first = doc.children(p)[0];
        assert_eq!(doc.tag(first), Some("ruby"));
        assert_eq!(doc.children(p).len(), 2);
    }

    #[test]
    fn token_at_end_leaves_no_empty_text_after_it() {
        let (mut doc, p) = page("これはテスト");
        scan_root(&mut doc, p, SessionId(1)).unwrap();
        assert_eq!(doc.children(p).len(), 2);
        assert_eq!(doc.text_content(p), "これはテスト");
    }

    #[test]
    fn several_tokens_in_one_run() {
        let (mut doc, p) = page("ロンドンとマドリード");
        let found = scan_root(&mut doc, p, SessionId(1)).unwrap();
        let tokens: Vec<_> = found.iter().map(|a| a.token.as_str()).collect();
        assert_eq!(tokens, vec!["ロンドン", "マドリード"]);
    }

    #[test]
    fn code_and_editable_regions_are_left_alone() {
        let mut doc = Document::new("https://a.test/");
        let code = doc.create_element("code");
        let t = doc.create_text("テスト");
        doc.append_child(code, t).unwrap();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        let inner = doc.create_element("span");
        let t2 = doc.create_text("データ");
        doc.append_child(inner, t2).unwrap();
        doc.append_child(editor, inner).unwrap();
        doc.append_child(doc.body(), code).unwrap();
        doc.append_child(doc.body(), editor).unwrap();

        let body = doc.body();
        assert!(scan_root(&mut doc, body, SessionId(1)).unwrap().is_empty());
        assert!(scan_root(&mut doc, t2, SessionId(1)).unwrap().is_empty());
    }

    #[test]
    fn detached_root_is_skipped() {
        let mut doc = Document::new("https://a.test/");
        let t = doc.create_text("テスト");
        assert!(scan_root(&mut doc, t, SessionId(1)).unwrap().is_empty());
    }

    #[test]
    fn gloss_only_lands_for_matching_session() {
        let (mut doc, p) = page("テスト");
        let found = scan_root(&mut doc, p, SessionId(4)).unwrap();
        let holder = found[0].holder;
        assert!(!write_gloss(&mut doc, holder, "test", SessionId(5)));
        assert_eq!(doc.attribute(holder, GLOSS_ATTR), None);
        assert!(write_gloss(&mut doc, holder, "test", SessionId(4)));
        assert_eq!(doc.attribute(holder, GLOSS_ATTR), Some("test"));
    }

    #[test]
    fn revert_restores_single_text_run_and_frees_markup() {
        let (mut doc, p) = page("これはテストonlyのデータ");
        let before = doc.node_count();
        let found = scan_root(&mut doc, p, SessionId(1)).unwrap();
        assert_eq!(found.len(), 2);
        let body = doc.body();
        assert_eq!(revert_annotations(&mut doc, body).unwrap(), 2);
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "これはテストonlyのデータ");
        assert_eq!(doc.node_count(), before);
        assert!(!doc.contains(found[0].holder));
    }
}
