//! Defines the cursor abstraction the engine walks.
//!
//! The engine never owns tree nodes. It borrows a caller-provided cursor,
//! clones it whenever a traversal has to branch, and moves the clones around
//! through the methods of [`NodeNavigator`].
use std::fmt;


/// The kind of node a cursor is positioned on, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The document node (or whatever the tree treats as its root).
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A mutable cursor over a read-only tree.
///
/// Implementors own their tree's memory; the engine only moves cursors around.
///
/// - `Clone` is the contract's *copy*: a clone is positioned on the same node
///   but moves independently of the original.
/// - `PartialEq` means "positioned on the same node". It is the node identity
///   used to keep node-sets duplicate free.
///
/// Attributes are reached with [`move_to_next_attribute`](Self::move_to_next_attribute):
/// on an element it moves to the first attribute, on an attribute to the next one.
/// From an attribute, [`move_to_parent`](Self::move_to_parent) returns to the
/// owning element, and child or sibling moves fail.
///
/// Every `move_*` method that returns `bool` leaves the cursor where it was when
/// it returns `false`.
pub trait NodeNavigator: Clone + PartialEq + fmt::Debug {
    /// The kind of the current node.
    fn node_type(&self) -> NodeType;

    /// The local name of the current node, or `""` for nodes without a name.
    /// For a processing instruction this is its target.
    fn local_name(&self) -> &str;

    /// The namespace URI of the current node, or `""` when it has none.
    fn namespace_uri(&self) -> &str;

    /// The string value of the current node.
    /// - text and comment nodes: their content;
    /// - attributes: the attribute value;
    /// - elements and the root: whatever text the tree considers the node's content.
    fn value(&self) -> String;

    /// Moves to the root of the tree the cursor was created for.
    fn move_to_root(&mut self);

    /// Moves to the parent node. For an attribute, that is its owning element.
    fn move_to_parent(&mut self) -> bool;

    /// Moves to the first attribute of an element, or to the next attribute
    /// when already positioned on one.
    fn move_to_next_attribute(&mut self) -> bool;

    /// Moves to the first child node.
    fn move_to_child(&mut self) -> bool;

    /// Moves to the first sibling. Returns `false` when already on the first one.
    fn move_to_first(&mut self) -> bool;

    /// Moves to the next sibling node.
    fn move_to_next(&mut self) -> bool;

    /// Moves to the previous sibling node.
    fn move_to_previous(&mut self) -> bool;

    /// Moves to the position of `other`. Fails (and does nothing) when `other`
    /// belongs to a different tree.
    fn move_to(&mut self, other: &Self) -> bool;
}

/// One component of a node's position relative to the top of its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PathSegment {
    // Attributes sort before child nodes of the same element.
    Attribute(usize),
    Child(usize),
}

/// A sortable document-order position, computed purely through the cursor contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentPosition(Vec<PathSegment>);

impl DocumentPosition {
    /// Computes the position of the node `nav` is currently on.
    pub fn of<N: NodeNavigator>(nav: &N) -> Self {
        let mut segments = Vec::new();
        let mut cursor = nav.clone();
        loop {
            let segment = if cursor.node_type() == NodeType::Attribute {
                let mut owner = cursor.clone();
                if !owner.move_to_parent() {
                    break;
                }
                let mut index = 0;
                let mut attribute = owner.clone();
                while attribute.move_to_next_attribute() && attribute != cursor {
                    index += 1;
                }
                PathSegment::Attribute(index)
            } else {
                let mut index = 0;
                let mut sibling = cursor.clone();
                while sibling.move_to_previous() {
                    index += 1;
                }
                PathSegment::Child(index)
            };
            if !cursor.move_to_parent() {
                break;
            }
            segments.push(segment);
        }
        segments.reverse();
        DocumentPosition(segments)
    }
}

/// Sorts nodes into document order and removes duplicate positions.
pub fn sort_document_order<N: NodeNavigator>(nodes: &mut Vec<N>) {
    if nodes.len() < 2 {
        return;
    }
    nodes.sort_by_cached_key(DocumentPosition::of);
    nodes.dedup_by(|a, b| a == b);
}
