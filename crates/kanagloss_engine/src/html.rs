//! Static HTML in and out of the engine's document model.

use ego_tree::NodeRef;
use kanagloss_core::{Document, DocumentError, NodeId, NodeKind};
use scraper::{Html, Node};

/// Rules that make the glosses visible. The gloss lives in an attribute, so
/// the page text itself never contains it.
pub const GLOSS_STYLESHEET: &str = "ruby.kanagloss-ruby { ruby-position: over; }\n\
rt.kanagloss-rt::before { content: attr(data-gloss); }\n";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse a full page into a document located at `url`. Comments and the
/// doctype are dropped; `head` and `body` content and the body's attributes
/// are kept.
pub fn parse_html(html: &str, url: &str) -> Result<Document, DocumentError> {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new(url);

    for section in parsed.root_element().children() {
        let Node::Element(element) = section.value() else {
            continue;
        };
        match element.name() {
            "head" => {
                let head = doc.head();
                copy_children(section, &mut doc, head)?;
            }
            "body" => {
                let body = doc.body();
                for (name, value) in element.attrs() {
                    doc.set_attribute(body, name, value)?;
                }
                copy_children(section, &mut doc, body)?;
            }
            _ => {}
        }
    }
    Ok(doc)
}

fn copy_children(
    source: NodeRef<'_, Node>,
    doc: &mut Document,
    parent: NodeId,
) -> Result<(), DocumentError> {
    for child in source.children() {
        match child.value() {
            Node::Element(element) => {
                let node = doc.create_element(element.name());
                for (name, value) in element.attrs() {
                    doc.set_attribute(node, name, value)?;
                }
                doc.append_child(parent, node)?;
                copy_children(child, doc, node)?;
            }
            Node::Text(text) => {
                let node = doc.create_text(&text.text);
                doc.append_child(parent, node)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Serialize the document with the gloss style sheet appended to `head`.
pub fn render_html(doc: &Document) -> String {
    let mut out = String::from("<!DOCTYPE html>\n");
    render_node(doc, doc.root(), false, &mut out);
    out.push('\n');
    out
}

fn render_node(doc: &Document, node: NodeId, raw_text: bool, out: &mut String) {
    match doc.kind(node) {
        Some(NodeKind::Text(text)) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        Some(NodeKind::Element(element)) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
            for &child in doc.children(node) {
                render_node(doc, child, raw, out);
            }
            if node == doc.head() {
                out.push_str("<style>\n");
                out.push_str(GLOSS_STYLESHEET);
                out.push_str("</style>");
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
        None => {}
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
