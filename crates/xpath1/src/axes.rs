//! Lazy traversal along each XPath axis.
//!
//! An [`AxisIter`] owns a clone of the origin cursor and moves it one node per
//! call to `next`, so an axis is never materialized unless the caller collects
//! it. Forward axes yield document order; reverse axes (`ancestor`,
//! `ancestor-or-self`, `preceding`, `preceding-sibling`) yield nearest first.

use super::ast::{Axis, NodeTest, NodeTypeTest};
use super::engine::NamespaceResolver;
use crate::datasource::{NodeNavigator, NodeType};

#[derive(Debug, Clone)]
enum AxisState {
    Done,
    Once { emitted: bool },
    Children { started: bool },
    Attributes,
    /// `depth` counts levels below the origin.
    Descendants { depth: usize, include_self: bool },
    Ancestors { include_self: bool },
    FollowingSiblings,
    PrecedingSiblings,
    Following { skip_children: bool },
    /// `depth` counts levels below the origin's ancestor chain; at zero the
    /// cursor's parent is an ancestor, which `preceding` excludes.
    Preceding { depth: usize },
}

/// A resumable iterator over one axis of one origin node.
#[derive(Debug, Clone)]
pub struct AxisIter<N> {
    cursor: N,
    state: AxisState,
}

impl<N: NodeNavigator> AxisIter<N> {
    pub fn new(axis: Axis, origin: &N) -> Self {
        let mut cursor = origin.clone();
        let node_type = origin.node_type();
        let is_attribute = node_type == NodeType::Attribute;

        let state = match axis {
            Axis::SelfAxis => AxisState::Once { emitted: false },
            Axis::Parent => {
                if cursor.move_to_parent() {
                    AxisState::Once { emitted: false }
                } else {
                    AxisState::Done
                }
            }
            Axis::Child => AxisState::Children { started: false },
            Axis::Attribute if node_type == NodeType::Element => AxisState::Attributes,
            Axis::Attribute => AxisState::Done,
            Axis::Descendant => AxisState::Descendants {
                depth: 0,
                include_self: false,
            },
            Axis::DescendantOrSelf => AxisState::Descendants {
                depth: 0,
                include_self: true,
            },
            Axis::Ancestor => AxisState::Ancestors {
                include_self: false,
            },
            Axis::AncestorOrSelf => AxisState::Ancestors { include_self: true },
            Axis::FollowingSibling | Axis::PrecedingSibling if is_attribute => AxisState::Done,
            Axis::FollowingSibling => AxisState::FollowingSiblings,
            Axis::PrecedingSibling => AxisState::PrecedingSiblings,
            // Everything inside the owner element follows its attributes.
            Axis::Following if is_attribute => {
                if cursor.move_to_parent() {
                    AxisState::Following {
                        skip_children: false,
                    }
                } else {
                    AxisState::Done
                }
            }
            Axis::Following => AxisState::Following {
                skip_children: true,
            },
            Axis::Preceding => {
                if is_attribute && !cursor.move_to_parent() {
                    AxisState::Done
                } else {
                    AxisState::Preceding { depth: 0 }
                }
            }
        };
        Self { cursor, state }
    }

    fn advance(&mut self) -> Option<N> {
        let cursor = &mut self.cursor;
        let moved = match &mut self.state {
            AxisState::Done => false,
            AxisState::Once { emitted } => !std::mem::replace(emitted, true),
            AxisState::Children { started } => {
                if *started {
                    cursor.move_to_next()
                } else {
                    *started = true;
                    cursor.move_to_child()
                }
            }
            AxisState::Attributes => cursor.move_to_next_attribute(),
            AxisState::Descendants {
                depth,
                include_self,
            } => {
                if std::mem::replace(include_self, false) {
                    true
                } else if cursor.move_to_child() {
                    *depth += 1;
                    true
                } else {
                    loop {
                        if *depth == 0 {
                            break false;
                        }
                        if cursor.move_to_next() {
                            break true;
                        }
                        cursor.move_to_parent();
                        *depth -= 1;
                    }
                }
            }
            AxisState::Ancestors { include_self } => {
                std::mem::replace(include_self, false) || cursor.move_to_parent()
            }
            AxisState::FollowingSiblings => cursor.move_to_next(),
            AxisState::PrecedingSiblings => cursor.move_to_previous(),
            AxisState::Following { skip_children } => {
                if !std::mem::replace(skip_children, false) && cursor.move_to_child() {
                    true
                } else {
                    loop {
                        if cursor.move_to_next() {
                            break true;
                        }
                        if !cursor.move_to_parent() {
                            break false;
                        }
                    }
                }
            }
            AxisState::Preceding { depth } => loop {
                if cursor.move_to_previous() {
                    // Reverse document order reaches a subtree's last descendant first.
                    while cursor.move_to_child() {
                        *depth += 1;
                        while cursor.move_to_next() {}
                    }
                    break true;
                }
                if !cursor.move_to_parent() {
                    break false;
                }
                if *depth > 0 {
                    *depth -= 1;
                    break true;
                }
            },
        };

        if moved {
            Some(self.cursor.clone())
        } else {
            self.state = AxisState::Done;
            None
        }
    }
}

impl<N: NodeNavigator> Iterator for AxisIter<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        self.advance()
    }
}

/// Checks a node found on `axis` against a node test.
///
/// Name tests and `*` only match the axis's principal node kind: attributes
/// on the attribute axis, elements everywhere else. A prefixed name matches
/// when the resolver maps the node's namespace URI to that prefix; an
/// unprefixed name matches on the local name alone.
pub fn matches<N: NodeNavigator>(
    node: &N,
    test: &NodeTest,
    axis: Axis,
    resolver: &NamespaceResolver,
) -> bool {
    let node_type = node.node_type();
    let principal = if axis == Axis::Attribute {
        NodeType::Attribute
    } else {
        NodeType::Element
    };
    match test {
        NodeTest::Wildcard => node_type == principal,
        NodeTest::Name(name) => {
            node_type == principal
                && node.local_name() == name.local_part
                && name
                    .prefix
                    .as_deref()
                    .is_none_or(|prefix| resolver(node.namespace_uri()) == prefix)
        }
        NodeTest::PrefixWildcard(prefix) => {
            node_type == principal && resolver(node.namespace_uri()) == *prefix
        }
        NodeTest::NodeType(NodeTypeTest::Node) => true,
        NodeTest::NodeType(NodeTypeTest::Text) => node_type == NodeType::Text,
        NodeTest::NodeType(NodeTypeTest::Comment) => node_type == NodeType::Comment,
        NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(target)) => {
            node_type == NodeType::ProcessingInstruction
                && target.as_deref().is_none_or(|t| node.local_name() == t)
        }
    }
}
