//! In-process document tree standing in for the host page.
//!
//! Nodes live in a slab arena and are addressed by generational handles, so a
//! handle kept past the removal of its node (a queued gloss holder, a pending
//! scan root) resolves to nothing instead of to whatever reuses the slot.
//! Removing a subtree frees all of its nodes.

use slab::Slab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// A change reported to the engine while observation is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationRecord {
    /// A subtree was inserted; the id is its root.
    ChildAdded(NodeId),
    /// The content of a text node changed.
    TextChanged(NodeId),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("node {0:?} no longer exists")]
    StaleNode(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("node {0:?} is not an element")]
    NotElement(NodeId),
    #[error("offset {offset} is not a char boundary in node {node:?}")]
    BadOffset { node: NodeId, offset: usize },
    #[error("node {0:?} cannot be inserted into its own subtree")]
    Cycle(NodeId),
    #[error("node {0:?} is not a child of the given parent")]
    NotAChild(NodeId),
    #[error("the document element cannot be removed")]
    RootRemoval,
}

#[derive(Debug, Clone)]
struct NodeSlot {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Slab<NodeSlot>,
    next_generation: u32,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    url: String,
    observing: bool,
    records: Vec<MutationRecord>,
}

impl Document {
    /// An empty `html > (head, body)` document at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut doc = Self {
            nodes: Slab::new(),
            next_generation: 0,
            root: NodeId {
                index: 0,
                generation: 0,
            },
            head: NodeId {
                index: 0,
                generation: 0,
            },
            body: NodeId {
                index: 0,
                generation: 0,
            },
            url: url.into(),
            observing: false,
            records: Vec::new(),
        };
        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(root, head, None);
        doc.link(root, body, None);
        doc.root = root;
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the location without touching the tree (history navigation).
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of live nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ---- observation -------------------------------------------------------

    pub fn observe(&mut self, on: bool) {
        self.observing = on;
        if !on {
            self.records.clear();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Drain the mutation records collected since the last call.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    // ---- creation ----------------------------------------------------------

    /// A detached element; attach it with [`Document::append_child`].
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.allocate(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.allocate(NodeKind::Text(text.to_string()))
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = self.next_generation;
        let index = self.nodes.insert(NodeSlot {
            generation,
            parent: None,
            children: Vec::new(),
            kind,
        });
        NodeId {
            index: index as u32,
            generation,
        }
    }

    // ---- host mutations (observed) ----------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        self.move_into(parent, child, None)?;
        self.record(MutationRecord::ChildAdded(child));
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DocumentError> {
        self.move_into(parent, child, Some(reference))?;
        self.record(MutationRecord::ChildAdded(child));
        Ok(())
    }

    /// Detach `node` and free its whole subtree.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DocumentError> {
        if node == self.root {
            return Err(DocumentError::RootRemoval);
        }
        self.slot(node)?;
        self.unlink(node);
        self.free_subtree(node);
        Ok(())
    }

    /// Free every child of `parent`, as a page swapping its content does.
    pub fn clear_children(&mut self, parent: NodeId) -> Result<(), DocumentError> {
        let children = std::mem::take(&mut self.slot_mut(parent)?.children);
        for child in children {
            self.free_subtree(child);
        }
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        self.replace_text(node, text)?;
        if self.is_attached(node) {
            self.record(MutationRecord::TextChanged(node));
        }
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        let element = self.element_mut(node)?;
        match element.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element
                .attributes
                .push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Set `head > title`, creating the element when missing.
    pub fn set_title(&mut self, title: &str) -> Result<(), DocumentError> {
        let existing = self
            .children(self.head)
            .iter()
            .copied()
            .find(|&child| self.tag(child) == Some("title"));
        let title_node = match existing {
            Some(node) => node,
            None => {
                let node = self.create_element("title");
                self.append_child(self.head, node)?;
                node
            }
        };
        for child in self.children(title_node).to_vec() {
            self.remove(child)?;
        }
        let text = self.create_text(title);
        self.append_child(title_node, text)
    }

    // ---- engine-side edits (never observed) --------------------------------

    /// Split a text node at `offset`; the node keeps the head and the returned
    /// sibling, inserted right after it, holds the tail.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId, DocumentError> {
        let text = self.text(node).ok_or(DocumentError::NotText(node))?;
        if !text.is_char_boundary(offset) {
            return Err(DocumentError::BadOffset { node, offset });
        }
        let tail = text[offset..].to_string();
        let head = text[..offset].to_string();
        self.replace_text(node, &head)?;
        let sibling = self.create_text(&tail);
        if let Some(parent) = self.parent(node) {
            let position = self.position_in(parent, node)? + 1;
            self.link(parent, sibling, Some(position));
        }
        Ok(sibling)
    }

    /// Insert a detached node before `reference` without reporting it.
    pub fn insert_quiet(&mut self, child: NodeId, reference: NodeId) -> Result<(), DocumentError> {
        let parent = self
            .parent(reference)
            .ok_or(DocumentError::NotAChild(reference))?;
        self.move_into(parent, child, Some(reference))
    }

    /// Append a detached node without reporting it.
    pub fn append_quiet(&mut self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        self.move_into(parent, child, None)
    }

    /// Replace `node` (and free its subtree) with a new text node.
    pub fn replace_with_text(&mut self, node: NodeId, text: &str) -> Result<NodeId, DocumentError> {
        let parent = self.parent(node).ok_or(DocumentError::NotAChild(node))?;
        let position = self.position_in(parent, node)?;
        let replacement = self.create_text(text);
        self.unlink(node);
        self.free_subtree(node);
        self.link(parent, replacement, Some(position));
        Ok(replacement)
    }

    /// Merge adjacent text children of `parent` and drop empty ones.
    pub fn normalize(&mut self, parent: NodeId) -> Result<(), DocumentError> {
        let children = self.slot(parent)?.children.clone();
        let mut kept = Vec::with_capacity(children.len());
        let mut run: Option<NodeId> = None;
        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                run = None;
                kept.push(child);
                continue;
            };
            match run {
                Some(first) => {
                    if let Ok(NodeSlot {
                        kind: NodeKind::Text(existing),
                        ..
                    }) = self.slot_mut(first)
                    {
                        existing.push_str(&text);
                    }
                    self.free_subtree(child);
                }
                None if text.is_empty() => self.free_subtree(child),
                None => {
                    run = Some(child);
                    kept.push(child);
                }
            }
        }
        self.slot_mut(parent)?.children = kept;
        Ok(())
    }

    // ---- queries -----------------------------------------------------------

    pub fn contains(&self, node: NodeId) -> bool {
        self.slot(node).is_ok()
    }

    /// True when `node` is alive and reachable from the document element.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.slot(current).ok().and_then(|slot| slot.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.slot(node).ok().map(|slot| &slot.kind)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|element| element.attribute(name))
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        self.text(node).is_some()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).ok().and_then(|slot| slot.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.slot(node)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    /// `node` and all its descendants in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Editable through `contenteditable` on the element or an ancestor.
    /// An explicit `"false"` ends the inheritance.
    pub fn is_editable(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(value) = self.attribute(id, "contenteditable") {
                return !value.trim().eq_ignore_ascii_case("false");
            }
            current = self.parent(id);
        }
        false
    }

    /// Text of `head > title`, empty when there is none.
    pub fn title(&self) -> String {
        self.children(self.head)
            .iter()
            .find(|&&child| self.tag(child) == Some("title"))
            .map(|&title| self.text_content(title))
            .unwrap_or_default()
    }

    // ---- internals ---------------------------------------------------------

    fn record(&mut self, record: MutationRecord) {
        if !self.observing {
            return;
        }
        let node = match record {
            MutationRecord::ChildAdded(node) | MutationRecord::TextChanged(node) => node,
        };
        if self.is_attached(node) {
            self.records.push(record);
        }
    }

    fn slot(&self, node: NodeId) -> Result<&NodeSlot, DocumentError> {
        self.nodes
            .get(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .ok_or(DocumentError::StaleNode(node))
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut NodeSlot, DocumentError> {
        self.nodes
            .get_mut(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .ok_or(DocumentError::StaleNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut ElementData, DocumentError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(DocumentError::NotElement(node)),
        }
    }

    fn replace_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Text(existing) => {
                *existing = text.to_string();
                Ok(())
            }
            NodeKind::Element(_) => Err(DocumentError::NotText(node)),
        }
    }

    fn position_in(&self, parent: NodeId, child: NodeId) -> Result<usize, DocumentError> {
        self.slot(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(DocumentError::NotAChild(child))
    }

    fn move_into(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DocumentError> {
        self.element_mut(parent)?;
        self.slot(child)?;
        if child == self.root || self.is_ancestor_or_self(child, parent) {
            return Err(DocumentError::Cycle(child));
        }
        self.unlink(child);
        let position = match reference {
            Some(reference) => Some(self.position_in(parent, reference)?),
            None => None,
        };
        self.link(parent, child, position);
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn link(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) {
        if let Ok(slot) = self.slot_mut(parent) {
            match position {
                Some(index) if index <= slot.children.len() => slot.children.insert(index, child),
                _ => slot.children.push(child),
            }
        }
        if let Ok(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
    }

    fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Ok(slot) = self.slot_mut(parent) {
            slot.children.retain(|&c| c != node);
        }
        if let Ok(slot) = self.slot_mut(node) {
            slot.parent = None;
        }
    }

    fn free_subtree(&mut self, node: NodeId) {
        for id in self.descendants(node) {
            self.nodes.remove(id.index as usize);
        }
    }
}
