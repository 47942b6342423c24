//! Page context snapshots and the decision of whether the page has changed
//! enough to throw away the current session.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::annotate::{annotation_base_text, is_annotation, is_excluded_tag};
use crate::dom::{Document, NodeId};

/// Below this many tokens on either side the content-drift trigger is off.
pub const MIN_FINGERPRINT_TOKENS: usize = 8;
/// Jaccard similarity under which the page counts as a different page.
pub const SHIFT_SIMILARITY_THRESHOLD: f64 = 0.18;

const MAX_FRAGMENTS: usize = 7;
const MAX_TOKENS: usize = 120;
const MIN_FRAGMENT_CHARS: usize = 4;

static TOKEN_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9\x{3040}-\x{30FF}\x{4E00}-\x{9FFF}]+").expect("separator compiles")
});

/// Structural hints for the main content container, tried in order.
#[derive(Debug, Clone, Copy)]
enum ContainerHint {
    Id(&'static str),
    IdInside {
        ancestor_tag: &'static str,
        id: &'static str,
    },
    Tag(&'static str),
    Role(&'static str),
}

const CONTAINER_HINTS: &[ContainerHint] = &[
    ContainerHint::Id("page-manager"),
    ContainerHint::IdInside {
        ancestor_tag: "ytd-app",
        id: "content",
    },
    ContainerHint::Tag("main"),
    ContainerHint::Role("main"),
    ContainerHint::Id("main"),
    ContainerHint::Id("app"),
    ContainerHint::Id("root"),
    ContainerHint::Tag("body"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftReason {
    UrlChange,
    ContainerReplaced,
    FingerprintShift,
}

impl fmt::Display for ShiftReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShiftReason::UrlChange => "url-change",
            ShiftReason::ContainerReplaced => "container-replaced",
            ShiftReason::FingerprintShift => "fingerprint-shift",
        })
    }
}

/// What the page looked like at one point. Compared, never rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub url: String,
    /// Identity of the main container; 0 when none could be resolved.
    pub container: u64,
    pub tokens: Vec<String>,
}

/// Small stable numbers for container nodes, held without owning the nodes.
/// Entries for nodes that left the document are evicted on each snapshot.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    ids: HashMap<NodeId, u64>,
    next_id: u64,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identify(&mut self, node: NodeId) -> u64 {
        if let Some(&id) = self.ids.get(&node) {
            return id;
        }
        self.next_id += 1;
        self.ids.insert(node, self.next_id);
        self.next_id
    }

    pub fn evict_detached(&mut self, doc: &Document) {
        self.ids.retain(|&node, _| doc.is_attached(node));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub fn snapshot(doc: &Document, identities: &mut IdentityTable) -> ContextSnapshot {
    identities.evict_detached(doc);
    let container = resolve_main_container(doc);
    ContextSnapshot {
        url: doc.url().to_string(),
        container: identities.identify(container),
        tokens: tokenize(&collect_fingerprint_text(doc, container)),
    }
}

/// First trigger that fires, in priority order.
pub fn compare(previous: &ContextSnapshot, current: &ContextSnapshot) -> Option<ShiftReason> {
    if previous.url != current.url {
        return Some(ShiftReason::UrlChange);
    }
    if previous.container != 0 && current.container != 0 && previous.container != current.container
    {
        return Some(ShiftReason::ContainerReplaced);
    }
    if previous.tokens.len() < MIN_FINGERPRINT_TOKENS
        || current.tokens.len() < MIN_FINGERPRINT_TOKENS
    {
        return None;
    }
    if jaccard_similarity(&previous.tokens, &current.tokens) < SHIFT_SIMILARITY_THRESHOLD {
        return Some(ShiftReason::FingerprintShift);
    }
    None
}

/// |A ∩ B| / |A ∪ B| over distinct tokens; 1 when either side is empty.
pub fn jaccard_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = set_b.iter().filter(|token| set_a.contains(*token)).count();
    let union = set_a.len() + set_b.len() - intersection;
    if union == 0 {
        return 1.0;
    }
    intersection as f64 / union as f64
}

pub fn resolve_main_container(doc: &Document) -> NodeId {
    let nodes = doc.descendants(doc.root());
    CONTAINER_HINTS
        .iter()
        .find_map(|hint| nodes.iter().copied().find(|&node| hint_matches(doc, node, *hint)))
        .unwrap_or_else(|| doc.body())
}

fn hint_matches(doc: &Document, node: NodeId, hint: ContainerHint) -> bool {
    match hint {
        ContainerHint::Id(id) => doc.attribute(node, "id") == Some(id),
        ContainerHint::IdInside { ancestor_tag, id } => {
            doc.attribute(node, "id") == Some(id) && has_ancestor_tag(doc, node, ancestor_tag)
        }
        ContainerHint::Tag(tag) => doc.tag(node) == Some(tag),
        ContainerHint::Role(role) => doc.attribute(node, "role") == Some(role),
    }
}

fn has_ancestor_tag(doc: &Document, node: NodeId, tag: &str) -> bool {
    let mut current = doc.parent(node);
    while let Some(id) = current {
        if doc.tag(id) == Some(tag) {
            return true;
        }
        current = doc.parent(id);
    }
    false
}

/// Title, first heading, then prose text runs in document order.
fn collect_fingerprint_text(doc: &Document, container: NodeId) -> String {
    let mut fragments = vec![doc.title()];

    let heading = doc.descendants(container).into_iter().find(|&node| {
        matches!(doc.tag(node), Some("h1") | Some("h2"))
            || doc.attribute(node, "role") == Some("heading")
    });
    if let Some(heading) = heading {
        let text = doc.text_content(heading);
        if !text.is_empty() {
            fragments.push(text);
        }
    }

    collect_text_runs(doc, container, &mut fragments);
    fragments.join(" ")
}

/// Push the inline text runs under `element` in document order. Gloss
/// annotations count as the text they wrap, so annotating a page leaves its
/// runs exactly as they were.
fn collect_text_runs(doc: &Document, element: NodeId, fragments: &mut Vec<String>) {
    let mut run = String::new();
    for &child in doc.children(element) {
        if fragments.len() >= MAX_FRAGMENTS {
            return;
        }
        if let Some(text) = doc.text(child) {
            run.push_str(text);
        } else if is_annotation(doc, child) {
            run.push_str(&annotation_base_text(doc, child));
        } else {
            push_run(&mut run, fragments);
            if !doc.tag(child).is_some_and(is_excluded_tag) {
                collect_text_runs(doc, child, fragments);
            }
        }
    }
    push_run(&mut run, fragments);
}

fn push_run(run: &mut String, fragments: &mut Vec<String>) {
    let text = std::mem::take(run);
    if fragments.len() < MAX_FRAGMENTS && normalize_text(&text).chars().count() >= MIN_FRAGMENT_CHARS
    {
        fragments.push(text);
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return Vec::new();
    }
    TOKEN_SEPARATOR
        .split(&normalized)
        .filter(|token| token.chars().count() > 1)
        .take(MAX_TOKENS)
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{jaccard_similarity, normalize_text, tokenize};

    fn words(text: &str) -> Vec<String> {
        text.split(' ').map(ToOwned::to_owned).collect()
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a = words("a1 b2 c3");
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        assert_eq!(jaccard_similarity(&words("a1 b2"), &words("c3 d4")), 0.0);
    }

    #[test]
    fn jaccard_counts_distinct_tokens() {
        let a = words("a1 a1 b2");
        let b = words("b2 c3");
        assert!((jaccard_similarity(&a, &b) - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn jaccard_with_empty_side_is_vacuous_match() {
        assert_eq!(jaccard_similarity(&[], &words("a1")), 1.0);
    }

    #[test]
    fn tokenize_lowercases_and_drops_single_characters() {
        assert_eq!(
            tokenize("Hello, World! a テスト 東京 x1"),
            vec!["hello", "world", "テスト", "東京", "x1"]
        );
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  A \n\t B  "), "a b");
    }
}
