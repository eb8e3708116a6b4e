//! An in-memory render tree.
//!
//! Nodes live in an arena owned by a shared [`MemoryDom`] handle and are
//! addressed by [`NodeId`]. Slots of removed nodes are not reused.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};
use weft_core::Result;
use weft_reactive::Event;

use crate::dom::{Dom, Listener, NodeKind};
use crate::markup::{escape_attribute, escape_text, is_void, parse_markup, Markup};

/// Handle to a node of a [`MemoryDom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

struct NodeData {
    kind: NodeKind,
    tag: String,
    text: String,
    attributes: IndexMap<String, String>,
    value: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    listeners: Vec<(String, Listener)>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            text: String::new(),
            attributes: IndexMap::new(),
            value: String::new(),
            children: Vec::new(),
            parent: None,
            listeners: Vec::new(),
        }
    }
}

struct Tree {
    nodes: Vec<NodeData>,
    document: NodeId,
}

impl Tree {
    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != child);
        }
    }

    /// Moves `child` into `parent` at `index` (or the end). Fragments move
    /// their children instead.
    fn insert(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        let moved = if self.node(child).kind == NodeKind::Fragment {
            std::mem::take(&mut self.node_mut(child).children)
        } else {
            self.detach(child);
            vec![child]
        };
        let mut at = index.unwrap_or(self.node(parent).children.len());
        for id in moved {
            self.node_mut(id).parent = Some(parent);
            self.node_mut(parent).children.insert(at, id);
            at += 1;
        }
    }

    fn build(&mut self, markup: &[Markup], parent: NodeId) {
        for node in markup {
            let id = match node {
                Markup::Text(text) => {
                    let mut data = NodeData::new(NodeKind::Text);
                    data.text = text.clone();
                    self.push(data)
                }
                Markup::Element {
                    tag,
                    attributes,
                    children,
                } => {
                    let mut data = NodeData::new(NodeKind::Element);
                    data.tag = tag.clone();
                    data.attributes = attributes.iter().cloned().collect();
                    if let Some(value) = data.attributes.get("value") {
                        data.value = value.clone();
                    }
                    let id = self.push(data);
                    self.build(children, id);
                    id
                }
            };
            self.insert(parent, id, None);
        }
    }

    fn clear_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.node_mut(id).children) {
            self.node_mut(child).parent = None;
        }
    }

    fn clone_deep(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id);
        let mut data = NodeData::new(source.kind);
        data.tag = source.tag.clone();
        data.text = source.text.clone();
        data.attributes = source.attributes.clone();
        data.value = source.value.clone();
        let children = source.children.clone();
        let copy = self.push(data);
        for child in children {
            let child_copy = self.clone_deep(child);
            self.insert(copy, child_copy, None);
        }
        copy
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text => out.push_str(&node.text),
            _ => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text => out.push_str(&escape_text(&node.text)),
            NodeKind::Fragment => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&node.tag);
                for (name, value) in &node.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(&node.tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(&node.tag);
                out.push('>');
            }
        }
    }

    fn collect_matching(&self, id: NodeId, selector: &str, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.kind == NodeKind::Element && matches_selector(node, selector) {
            out.push(id);
        }
        for child in &node.children {
            self.collect_matching(*child, selector, out);
        }
    }
}

fn matches_selector(node: &NodeData, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        node.attributes.get("id").is_some_and(|v| v == id)
    } else if let Some(class) = selector.strip_prefix('.') {
        node.attributes
            .get("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class))
    } else {
        node.tag.eq_ignore_ascii_case(selector)
    }
}

/// A shared in-memory render tree.
///
/// Cloning the handle shares the tree.
#[derive(Clone)]
pub struct MemoryDom {
    tree: Rc<RefCell<Tree>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Creates an empty tree with a document node.
    pub fn new() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            document: NodeId(0),
        };
        tree.document = tree.push(NodeData::new(NodeKind::Fragment));
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    /// Creates a tree whose document holds the parsed `html`.
    pub fn parse(html: &str) -> Result<Self> {
        let dom = Self::new();
        let markup = parse_markup(html)?;
        {
            let mut tree = dom.tree.borrow_mut();
            let document = tree.document;
            tree.build(&markup, document);
        }
        Ok(dom)
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        self.tree.borrow().document
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = tag.to_ascii_lowercase();
        self.tree.borrow_mut().push(data)
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.text = text.to_string();
        self.tree.borrow_mut().push(data)
    }

    /// Delivers `event` to the listeners of `node` registered for its kind.
    ///
    /// Input and change events carrying a value update the node's value
    /// first, the way a user typing into a control would.
    pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
        let listeners: Vec<Listener> = {
            let mut tree = self.tree.borrow_mut();
            let data = tree.node_mut(node);
            if let (Some(value), "input" | "change") = (&event.value, event.kind.as_str()) {
                data.value = value.clone();
            }
            data.listeners
                .iter()
                .filter(|(kind, _)| *kind == event.kind)
                .map(|(_, l)| Rc::clone(l))
                .collect()
        };
        debug!(node = node.0, event = %event.kind, listeners = listeners.len(), "dispatch");
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Serializes a node and its descendants.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.tree.borrow().write_html(node, &mut out);
        out
    }

    /// Serializes the children of a node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let tree = self.tree.borrow();
        let mut out = String::new();
        for child in &tree.node(node).children {
            tree.write_html(*child, &mut out);
        }
        out
    }

    /// All elements matching `#id`, `.class` or a tag name, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let tree = self.tree.borrow();
        let mut out = Vec::new();
        tree.collect_matching(tree.document, selector, &mut out);
        out
    }

    /// Number of listeners registered on `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.tree.borrow().node(node).listeners.len()
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn kind(&self, node: &NodeId) -> NodeKind {
        self.tree.borrow().node(*node).kind
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        let tree = self.tree.borrow();
        let data = tree.node(*node);
        (data.kind == NodeKind::Element).then(|| data.tag.clone())
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.tree.borrow().node(*node).children.clone()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.tree.borrow().node(*node).parent
    }

    fn create_fragment(&self) -> NodeId {
        self.tree
            .borrow_mut()
            .push(NodeData::new(NodeKind::Fragment))
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        self.tree.borrow_mut().insert(*parent, *child, None);
    }

    fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: &NodeId) {
        let mut tree = self.tree.borrow_mut();
        // Detach first so the reference index accounts for a move within
        // the same parent.
        if tree.node(*child).kind != NodeKind::Fragment {
            tree.detach(*child);
        }
        let index = tree
            .node(*parent)
            .children
            .iter()
            .position(|c| c == reference);
        tree.insert(*parent, *child, index);
    }

    fn remove_child(&self, parent: &NodeId, child: &NodeId) {
        let mut tree = self.tree.borrow_mut();
        if tree.node(*child).parent == Some(*parent) {
            tree.detach(*child);
        }
    }

    fn clone_node(&self, node: &NodeId) -> NodeId {
        self.tree.borrow_mut().clone_deep(*node)
    }

    fn text(&self, node: &NodeId) -> String {
        let mut out = String::new();
        self.tree.borrow().text_content(*node, &mut out);
        out
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        let mut tree = self.tree.borrow_mut();
        if tree.node(*node).kind == NodeKind::Text {
            tree.node_mut(*node).text = text.to_string();
            return;
        }
        tree.clear_children(*node);
        if !text.is_empty() {
            let mut data = NodeData::new(NodeKind::Text);
            data.text = text.to_string();
            let id = tree.push(data);
            tree.insert(*node, id, None);
        }
    }

    fn set_inner_html(&self, node: &NodeId, html: &str) {
        match parse_markup(html) {
            Ok(markup) => {
                let mut tree = self.tree.borrow_mut();
                tree.clear_children(*node);
                tree.build(&markup, *node);
            }
            Err(err) => {
                warn!(error = %err, "invalid markup, rendering as text");
                self.set_text(node, html);
            }
        }
    }

    fn attributes(&self, node: &NodeId) -> Vec<(String, String)> {
        self.tree
            .borrow()
            .node(*node)
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn get_attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.tree.borrow().node(*node).attributes.get(name).cloned()
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        self.tree
            .borrow_mut()
            .node_mut(*node)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) {
        self.tree
            .borrow_mut()
            .node_mut(*node)
            .attributes
            .shift_remove(name);
    }

    fn value(&self, node: &NodeId) -> String {
        self.tree.borrow().node(*node).value.clone()
    }

    fn set_value(&self, node: &NodeId, value: &str) {
        self.tree.borrow_mut().node_mut(*node).value = value.to_string();
    }

    fn add_event_listener(&self, node: &NodeId, kind: &str, listener: Listener) {
        self.tree
            .borrow_mut()
            .node_mut(*node)
            .listeners
            .push((kind.to_string(), listener));
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.borrow();
        f.debug_struct("MemoryDom")
            .field("nodes", &tree.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_parse_and_serialize() {
        let html = r#"<div id="app"><p class="a b">x &amp; y</p><input value="v"></div>"#;
        let dom = MemoryDom::parse(html).unwrap();
        assert_eq!(dom.inner_html(dom.document()), html);
        let input = dom.query_selector("input").unwrap();
        assert_eq!(dom.value(&input), "v");
        assert!(dom.query_selector(".b").is_some());
        assert!(dom.query_selector("#app").is_some());
        assert!(dom.query_selector("#nope").is_none());
    }

    #[test]
    fn test_fragment_moves_children() {
        let dom = MemoryDom::parse("<ul><li>1</li><li>2</li></ul>").unwrap();
        let ul = dom.query_selector("ul").unwrap();
        let fragment = dom.create_fragment();
        for child in dom.children(&ul) {
            dom.append_child(&fragment, &child);
        }
        assert!(dom.children(&ul).is_empty());
        assert_eq!(dom.children(&fragment).len(), 2);

        dom.append_child(&ul, &fragment);
        assert!(dom.children(&fragment).is_empty());
        assert_eq!(dom.to_html(ul), "<ul><li>1</li><li>2</li></ul>");
    }

    #[test]
    fn test_insert_before_and_remove() {
        let dom = MemoryDom::parse("<ul><li>a</li><li>c</li></ul>").unwrap();
        let ul = dom.query_selector("ul").unwrap();
        let items = dom.children(&ul);
        let b = dom.clone_node(&items[0]);
        dom.set_text(&b, "b");
        dom.insert_before(&ul, &b, &items[1]);
        assert_eq!(dom.to_html(ul), "<ul><li>a</li><li>b</li><li>c</li></ul>");

        dom.remove_child(&ul, &items[0]);
        assert_eq!(dom.to_html(ul), "<ul><li>b</li><li>c</li></ul>");
        assert_eq!(dom.parent(&items[0]), None);
    }

    #[test]
    fn test_clone_is_deep_and_detached() {
        let dom = MemoryDom::parse("<p title=\"t\"><b>x</b></p>").unwrap();
        let p = dom.query_selector("p").unwrap();
        let copy = dom.clone_node(&p);
        assert_ne!(copy, p);
        assert_eq!(dom.parent(&copy), None);
        assert_eq!(dom.to_html(copy), dom.to_html(p));

        let b = dom.children(&copy)[0];
        dom.set_text(&b, "y");
        assert_eq!(dom.text(&p), "x");
    }

    #[test]
    fn test_inner_html() {
        let dom = MemoryDom::parse("<div></div>").unwrap();
        let div = dom.query_selector("div").unwrap();
        dom.set_inner_html(&div, "<em>hi</em>");
        assert_eq!(dom.to_html(div), "<div><em>hi</em></div>");
        dom.set_inner_html(&div, "<em>broken");
        assert_eq!(dom.text(&div), "<em>broken");
    }

    #[test]
    fn test_dispatch() {
        let dom = MemoryDom::parse("<input>").unwrap();
        let input = dom.query_selector("input").unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        dom.add_event_listener(&input, "input", Rc::new(move |_| h.set(h.get() + 1)));

        assert_eq!(dom.dispatch(input, &Event::with_value("input", "typed")), 1);
        assert_eq!(dom.value(&input), "typed");
        assert_eq!(dom.dispatch(input, &Event::new("click")), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(dom.listener_count(input), 1);
    }
}
