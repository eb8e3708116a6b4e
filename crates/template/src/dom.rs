//! The render-tree interface the compiler drives.
//!
//! Any tree with elements, text nodes, attributes and event listeners can be
//! compiled by implementing [`Dom`]. [`MemoryDom`](crate::MemoryDom) is the
//! in-process implementation.

use std::fmt;
use std::rc::Rc;

use weft_reactive::Event;

/// An event listener attached to a node.
pub type Listener = Rc<dyn Fn(&Event)>;

/// The kind of a render-tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    /// A detached container whose children move when it is appended.
    Fragment,
}

/// Operations on a render tree.
///
/// Handles are cheap to clone and compare; the `Dom` value itself is a
/// shared handle to the tree.
pub trait Dom: Clone + 'static {
    type Node: Clone + PartialEq + fmt::Debug + 'static;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    /// Lowercase tag name of an element.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn create_fragment(&self) -> Self::Node;

    /// Appends `child` to `parent`, detaching it from its previous parent.
    /// Appending a fragment moves the fragment's children instead.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Inserts `child` into `parent` right before `reference`.
    fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: &Self::Node);

    fn remove_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Deep copy, without event listeners.
    fn clone_node(&self, node: &Self::Node) -> Self::Node;

    /// Text content: a text node's data, or the concatenated text of an
    /// element's descendants.
    fn text(&self, node: &Self::Node) -> String;

    /// Sets a text node's data, or replaces an element's children with a
    /// single text node.
    fn set_text(&self, node: &Self::Node, text: &str);

    /// Replaces an element's children with parsed markup.
    fn set_inner_html(&self, node: &Self::Node, html: &str);

    /// Attributes in document order.
    fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;

    fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&self, node: &Self::Node, name: &str);

    /// The current value of a form control.
    fn value(&self, node: &Self::Node) -> String;

    fn set_value(&self, node: &Self::Node, value: &str);

    fn add_event_listener(&self, node: &Self::Node, kind: &str, listener: Listener);

    /// Finds the first element matching `#id` or a tag name.
    fn query_selector(&self, selector: &str) -> Option<Self::Node>;
}
