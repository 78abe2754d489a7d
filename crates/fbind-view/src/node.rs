#![forbid(unsafe_code)]

//! Headless node tree that mounted bindings render into.
//!
//! # Design
//! A [`NodeRef`] is a shared handle (`Rc<RefCell<NodeData>>`), so a binding
//! callback can hold the node it re-renders while the caller keeps the tree.
//! Nodes own their children; nothing points back up, so a tree never forms
//! a reference cycle.
//!
//! # Invariants
//! - Text nodes have no children and no attributes.
//! - `render_html` never borrows a node mutably, so it is safe to call from
//!   inside a binding callback on a different node.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Tags rendered without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

/// Contents of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Text {
        text: String,
    },
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        /// Live value for form controls; rendered as the `value` attribute.
        value: Option<String>,
        children: Vec<NodeRef>,
    },
}

/// Shared handle to a node.
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<NodeData>>);

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        *self.0.borrow() == *other.0.borrow()
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0.borrow(), f)
    }
}

/// Create a text node.
#[must_use]
pub fn text(content: impl Into<String>) -> NodeRef {
    NodeRef::new(NodeData::Text {
        text: content.into(),
    })
}

/// Create an empty element.
#[must_use]
pub fn element(tag: impl Into<String>) -> NodeRef {
    NodeRef::new(NodeData::Element {
        tag: tag.into(),
        attrs: Vec::new(),
        value: None,
        children: Vec::new(),
    })
}

impl NodeRef {
    #[must_use]
    pub fn new(data: NodeData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    /// Builder: set an attribute. Ignored on text nodes.
    #[must_use]
    pub fn attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder: append a child. Ignored on text nodes.
    #[must_use]
    pub fn child(self, child: NodeRef) -> Self {
        if let NodeData::Element { children, .. } = &mut *self.0.borrow_mut() {
            children.push(child);
        }
        self
    }

    /// Whether both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(&*self.0.borrow(), NodeData::Text { .. })
    }

    /// Text content of a text node.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match &*self.0.borrow() {
            NodeData::Text { text } => Some(text.clone()),
            NodeData::Element { .. } => None,
        }
    }

    /// Replace the content of a text node. No-op on elements.
    pub fn set_text(&self, content: impl Into<String>) {
        if let NodeData::Text { text } = &mut *self.0.borrow_mut() {
            *text = content.into();
        }
    }

    /// Tag name of an element.
    #[must_use]
    pub fn tag(&self) -> Option<String> {
        match &*self.0.borrow() {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text { .. } => None,
        }
    }

    /// Look up an attribute by exact name.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.find_attr(|key| key == name)
    }

    /// Value of the first attribute, in insertion order, whose name matches.
    pub fn find_attr(&self, mut matches: impl FnMut(&str) -> bool) -> Option<String> {
        match &*self.0.borrow() {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| matches(key))
                .map(|(_, value)| value.clone()),
            NodeData::Text { .. } => None,
        }
    }

    /// Set or replace an attribute.
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        if let NodeData::Element { attrs, .. } = &mut *self.0.borrow_mut() {
            let name = name.into();
            let value = value.into();
            match attrs.iter_mut().find(|(key, _)| *key == name) {
                Some(slot) => slot.1 = value,
                None => attrs.push((name, value)),
            }
        }
    }

    /// Live value of a form control.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        match &*self.0.borrow() {
            NodeData::Element { value, .. } => value.clone(),
            NodeData::Text { .. } => None,
        }
    }

    pub fn set_value(&self, new_value: impl Into<String>) {
        if let NodeData::Element { value, .. } = &mut *self.0.borrow_mut() {
            *value = Some(new_value.into());
        }
    }

    /// Child handles, cloned so the caller can recurse without holding a
    /// borrow on this node.
    #[must_use]
    pub fn children(&self) -> Vec<NodeRef> {
        match &*self.0.borrow() {
            NodeData::Element { children, .. } => children.clone(),
            NodeData::Text { .. } => Vec::new(),
        }
    }

    /// Depth-first search for the first element with `tag`.
    #[must_use]
    pub fn find_tag(&self, wanted: &str) -> Option<NodeRef> {
        if self
            .tag()
            .is_some_and(|tag| tag.eq_ignore_ascii_case(wanted))
        {
            return Some(self.clone());
        }
        self.children()
            .iter()
            .find_map(|child| child.find_tag(wanted))
    }

    /// Serialise the subtree as HTML.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match &*self.0.borrow() {
            NodeData::Text { text } => escape_into(text, false, out),
            NodeData::Element {
                tag,
                attrs,
                value,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, attr_value) in attrs {
                    if name == "value" && value.is_some() {
                        continue;
                    }
                    push_attr(out, name, attr_value);
                }
                if let Some(value) = value {
                    push_attr(out, "value", value);
                }
                out.push('>');
                if VOID_TAGS.iter().any(|v| tag.eq_ignore_ascii_case(v)) {
                    return;
                }
                for child in children {
                    child.render_into(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(value, true, out);
    out.push('"');
}

fn escape_into(raw: &str, in_attr: bool, out: &mut String) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
