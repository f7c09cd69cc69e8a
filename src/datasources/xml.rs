// XML datasource implementation using roxmltree
use crate::error::GxPathError;
use gxpath_xpath1::engine::format_number;
use gxpath_xpath1::{Evaluation, Expr, NodeNavigator, NodeType};
use roxmltree::Node;
use std::collections::HashMap;
use std::ptr;

/// Wrapper around `roxmltree::Document` that hands out XPath cursors.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, GxPathError> {
        let doc = roxmltree::Document::parse(text)?;
        Ok(Self { doc })
    }

    pub fn document(&self) -> &roxmltree::Document<'input> {
        &self.doc
    }

    /// A cursor on the document node.
    pub fn navigator(&self) -> XmlNavigator<'_, 'input> {
        XmlNavigator::new(self.doc.root())
    }

    /// Maps namespace URIs to the prefixes the document declares for them.
    ///
    /// The first declaration in document order wins. Unknown URIs map to
    /// themselves, and a default namespace maps to the empty prefix.
    pub fn prefix_resolver(&self) -> impl Fn(&str) -> String + Send + Sync + 'static {
        let mut prefixes: HashMap<String, String> = HashMap::new();
        for node in self.doc.descendants().filter(|n| n.is_element()) {
            for ns in node.namespaces() {
                prefixes
                    .entry(ns.uri().to_string())
                    .or_insert_with(|| ns.name().unwrap_or("").to_string());
            }
        }
        log::trace!("Collected {} namespace prefixes", prefixes.len());
        move |uri: &str| prefixes.get(uri).cloned().unwrap_or_else(|| uri.to_string())
    }

    /// Compiles `expression` and collects every node it selects from the document node,
    /// resolving prefixes against the document's own declarations.
    pub fn select_nodes(&self, expression: &str) -> Result<Vec<XmlNavigator<'_, 'input>>, GxPathError> {
        let expr = Expr::compile(expression)?;
        let nodes: Vec<_> = expr
            .select_with_ns(&self.navigator(), self.prefix_resolver())
            .collect();
        log::debug!("'{}' selected {} nodes", expr, nodes.len());
        Ok(nodes)
    }

    /// Evaluates `expression` from the document node and converts the result to a string.
    /// A node-set yields the string value of its first node.
    pub fn evaluate_string(&self, expression: &str) -> Result<String, GxPathError> {
        let expr = Expr::compile(expression)?;
        let value = match expr.evaluate_with_ns(&self.navigator(), self.prefix_resolver()) {
            Evaluation::Boolean(b) => b.to_string(),
            Evaluation::Number(n) => format_number(n),
            Evaluation::String(s) => s,
            Evaluation::NodeSet(mut nodes) => nodes.next().map(|n| n.value()).unwrap_or_default(),
        };
        Ok(value)
    }
}

/// A cursor over a roxmltree document.
///
/// roxmltree keeps attributes as data on their element rather than as tree
/// nodes, so an attribute position is the owning element plus an index.
#[derive(Debug, Clone, Copy)]
pub struct XmlNavigator<'a, 'input> {
    root: Node<'a, 'input>,
    node: Node<'a, 'input>,
    attribute: Option<usize>,
}

impl<'a, 'input> XmlNavigator<'a, 'input> {
    /// A cursor positioned on `node`, rooted at its document node.
    pub fn new(node: Node<'a, 'input>) -> Self {
        Self {
            root: node.document().root(),
            node,
            attribute: None,
        }
    }

    /// The current node, or the owning element when on an attribute.
    pub fn node(&self) -> Node<'a, 'input> {
        self.node
    }

    pub fn attribute(&self) -> Option<roxmltree::Attribute<'a, 'input>> {
        self.attribute.and_then(|index| self.node.attributes().nth(index))
    }
}

impl PartialEq for XmlNavigator<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        // roxmltree compares nodes by document and id.
        self.node == other.node && self.attribute == other.attribute
    }
}

impl NodeNavigator for XmlNavigator<'_, '_> {
    fn node_type(&self) -> NodeType {
        if self.attribute.is_some() {
            return NodeType::Attribute;
        }
        match self.node.node_type() {
            roxmltree::NodeType::Root => NodeType::Root,
            roxmltree::NodeType::Element => NodeType::Element,
            roxmltree::NodeType::Text => NodeType::Text,
            roxmltree::NodeType::Comment => NodeType::Comment,
            roxmltree::NodeType::PI => NodeType::ProcessingInstruction,
        }
    }

    fn local_name(&self) -> &str {
        if let Some(attr) = self.attribute() {
            return attr.name();
        }
        if let Some(pi) = self.node.pi() {
            return pi.target;
        }
        if self.node.is_element() {
            self.node.tag_name().name()
        } else {
            ""
        }
    }

    fn namespace_uri(&self) -> &str {
        match self.attribute() {
            Some(attr) => attr.namespace().unwrap_or(""),
            None if self.node.is_element() => self.node.tag_name().namespace().unwrap_or(""),
            None => "",
        }
    }

    fn value(&self) -> String {
        if let Some(attr) = self.attribute() {
            return attr.value().to_string();
        }
        match self.node.node_type() {
            roxmltree::NodeType::Root | roxmltree::NodeType::Element => self
                .node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            roxmltree::NodeType::Text | roxmltree::NodeType::Comment => {
                self.node.text().unwrap_or("").to_string()
            }
            roxmltree::NodeType::PI => self
                .node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or("")
                .to_string(),
        }
    }

    fn move_to_root(&mut self) {
        self.node = self.root;
        self.attribute = None;
    }

    fn move_to_parent(&mut self) -> bool {
        if self.attribute.take().is_some() {
            return true;
        }
        match self.node.parent() {
            Some(parent) => {
                self.node = parent;
                true
            }
            None => false,
        }
    }

    fn move_to_next_attribute(&mut self) -> bool {
        if !self.node.is_element() {
            return false;
        }
        let next = self.attribute.map_or(0, |index| index + 1);
        if next < self.node.attributes().len() {
            self.attribute = Some(next);
            true
        } else {
            false
        }
    }

    fn move_to_child(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        self.move_node(self.node.first_child())
    }

    fn move_to_first(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        let first = self.node.parent().and_then(|p| p.first_child());
        match first {
            Some(first) if first != self.node => self.move_node(Some(first)),
            _ => false,
        }
    }

    fn move_to_next(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        self.move_node(self.node.next_sibling())
    }

    fn move_to_previous(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        self.move_node(self.node.prev_sibling())
    }

    fn move_to(&mut self, other: &Self) -> bool {
        if !ptr::eq(self.node.document(), other.node.document()) {
            return false;
        }
        *self = *other;
        true
    }
}

impl<'a, 'input> XmlNavigator<'a, 'input> {
    fn move_node(&mut self, target: Option<Node<'a, 'input>>) -> bool {
        match target {
            Some(node) => {
                self.node = node;
                true
            }
            None => false,
        }
    }
}
