//! Per-selection runtime state derived from an immutable plan.
//!
//! [`Query::build`] turns a node-set [`Expression`] into a tree of resumable
//! queries. Each call to [`Query::select`] pulls exactly one more node, so
//! callers that stop early never pay for the rest of the node-set.
//!
//! While building, every intermediate sequence is classified by what is known
//! statically about its order. Only sequences that may come out of document
//! order (or contain duplicates) are buffered and sorted; everything else
//! streams straight from the axis iterators.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step};
use super::axes::{self, AxisIter};
use super::engine::{self, EvaluationContext};
use crate::datasource::{NodeNavigator, sort_document_order};
use std::collections::VecDeque;

/// What is statically known about the order of a node sequence, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Arrangement {
    /// At most one node.
    Singleton,
    /// Document order, no duplicates, and no node contains another.
    Disjoint,
    /// Document order without duplicates.
    Sorted,
    /// Anything else.
    Unsorted,
}

impl Arrangement {
    /// The arrangement of the nodes reached by stepping along `axis` from
    /// every node of a sequence arranged as `self`.
    pub fn after(self, axis: Axis) -> Self {
        use Arrangement::*;
        match (self, axis) {
            (Singleton, Axis::SelfAxis | Axis::Parent) => Singleton,
            (
                Singleton,
                Axis::Child | Axis::Attribute | Axis::FollowingSibling | Axis::PrecedingSibling,
            ) => Disjoint,
            (Singleton, _) => Sorted,
            (Disjoint, Axis::Child | Axis::Attribute | Axis::SelfAxis) => Disjoint,
            (Disjoint, Axis::Descendant | Axis::DescendantOrSelf) => Sorted,
            (Sorted, Axis::Attribute) => Disjoint,
            (Sorted, Axis::SelfAxis) => Sorted,
            _ => Unsorted,
        }
    }

    /// The arrangement once the sequence has been sorted if it needed to be.
    fn sorted(self) -> Self {
        self.min(Arrangement::Sorted)
    }
}

#[derive(Debug, Clone)]
pub enum Query<N> {
    /// Yields the context node once.
    Context { done: bool },
    /// Yields the root of the context node's tree once.
    Root { done: bool },
    Step(Box<StepQuery<N>>),
    Filter(Box<FilterQuery<N>>),
    /// Both branches of a union, one after the other. Always wrapped in `Sorted`.
    Concat {
        left: Box<Query<N>>,
        right: Box<Query<N>>,
    },
    Sorted(Box<SortedQuery<N>>),
    /// A scalar plan used for selection: yields the context node once if the
    /// plan converts to `true`.
    Guard { condition: Expression, done: bool },
}

impl<N: NodeNavigator> Query<N> {
    /// Builds fresh query state for a node-set expression. The result yields
    /// nodes in document order without duplicates.
    pub fn build(expr: &Expression) -> Self {
        let (query, arrangement) = Self::plan(expr);
        query.sorted_if(arrangement)
    }

    fn sorted_if(self, arrangement: Arrangement) -> Self {
        if arrangement == Arrangement::Unsorted {
            Query::Sorted(Box::new(SortedQuery {
                input: self,
                buffer: None,
            }))
        } else {
            self
        }
    }

    fn plan(expr: &Expression) -> (Self, Arrangement) {
        match expr {
            Expression::LocationPath(path) => Self::plan_path(path),
            Expression::Filter {
                primary,
                predicates,
            } => {
                let (input, arrangement) = Self::plan(primary);
                let query = Query::Filter(Box::new(FilterQuery {
                    input: input.sorted_if(arrangement),
                    predicates: predicates.clone(),
                    buffer: None,
                }));
                (query, arrangement.sorted())
            }
            Expression::BinaryOp {
                left,
                op: BinaryOperator::Union,
                right,
            } => {
                let query = Query::Concat {
                    left: Box::new(Self::build(left)),
                    right: Box::new(Self::build(right)),
                };
                (query, Arrangement::Unsorted)
            }
            other => {
                log::debug!("Selecting with scalar expression {:?} as a context filter", other);
                let query = Query::Guard {
                    condition: other.clone(),
                    done: false,
                };
                (query, Arrangement::Singleton)
            }
        }
    }

    fn plan_path(path: &LocationPath) -> (Self, Arrangement) {
        let (mut query, mut arrangement) = match &path.start_point {
            Some(start) => {
                let (query, arrangement) = Self::plan(start);
                (query.sorted_if(arrangement), arrangement.sorted())
            }
            None if path.is_absolute => (Query::Root { done: false }, Arrangement::Singleton),
            None => (Query::Context { done: false }, Arrangement::Singleton),
        };

        for step in fold_descendant_steps(&path.steps) {
            // Every step consumes a sorted, duplicate-free input.
            query = query.sorted_if(arrangement);
            arrangement = arrangement.sorted().after(step.axis);
            query = Query::Step(Box::new(StepQuery::new(query, step)));
        }
        (query, arrangement)
    }

    /// Pulls the next node, or `None` once the query is exhausted.
    pub fn select(&mut self, e_ctx: &EvaluationContext<'_, N>) -> Option<N> {
        match self {
            Query::Context { done } => {
                if std::mem::replace(done, true) {
                    None
                } else {
                    Some(e_ctx.context_node.clone())
                }
            }
            Query::Root { done } => {
                if std::mem::replace(done, true) {
                    None
                } else {
                    let mut root = e_ctx.context_node.clone();
                    root.move_to_root();
                    Some(root)
                }
            }
            Query::Step(step) => step.select(e_ctx),
            Query::Filter(filter) => filter.select(e_ctx),
            Query::Concat { left, right } => left.select(e_ctx).or_else(|| right.select(e_ctx)),
            Query::Sorted(sorted) => sorted.select(e_ctx),
            Query::Guard { condition, done } => {
                if std::mem::replace(done, true) || !engine::evaluate_boolean(condition, e_ctx) {
                    None
                } else {
                    Some(e_ctx.context_node.clone())
                }
            }
        }
    }
}

fn is_bare_descendant_or_self(step: &Step) -> bool {
    step.axis == Axis::DescendantOrSelf
        && step.node_test == NodeTest::NodeType(NodeTypeTest::Node)
        && step.predicates.is_empty()
}

/// Rewrites `descendant-or-self::node()/child::x` (what `//x` abbreviates)
/// into `descendant::x`. Only valid while the child step has no predicates,
/// since positions would otherwise count per parent.
fn fold_descendant_steps(steps: &[Step]) -> Vec<Step> {
    let mut folded: Vec<Step> = Vec::with_capacity(steps.len());
    for step in steps {
        if let Some(previous) = folded.last_mut() {
            if is_bare_descendant_or_self(previous)
                && step.axis == Axis::Child
                && step.predicates.is_empty()
            {
                previous.axis = Axis::Descendant;
                previous.node_test = step.node_test.clone();
                continue;
            }
        }
        folded.push(step.clone());
    }
    folded
}

/// One location step applied to every node its input yields.
#[derive(Debug, Clone)]
pub struct StepQuery<N> {
    input: Query<N>,
    axis: Axis,
    node_test: NodeTest,
    predicates: Vec<Expression>,
    /// Set while streaming a forward axis that has no predicates.
    streaming: Option<AxisIter<N>>,
    /// Matches for the current origin, when they had to be collected first.
    buffer: VecDeque<N>,
}

impl<N: NodeNavigator> StepQuery<N> {
    fn new(input: Query<N>, step: Step) -> Self {
        Self {
            input,
            axis: step.axis,
            node_test: step.node_test,
            predicates: step.predicates,
            streaming: None,
            buffer: VecDeque::new(),
        }
    }

    fn select(&mut self, e_ctx: &EvaluationContext<'_, N>) -> Option<N> {
        loop {
            if let Some(iter) = &mut self.streaming {
                let (test, axis) = (&self.node_test, self.axis);
                if let Some(node) = iter.find(|n| axes::matches(n, test, axis, e_ctx.resolver)) {
                    return Some(node);
                }
                self.streaming = None;
            }
            if let Some(node) = self.buffer.pop_front() {
                return Some(node);
            }

            let origin = self.input.select(e_ctx)?;
            if self.predicates.is_empty() && !self.axis.is_reverse() {
                self.streaming = Some(AxisIter::new(self.axis, &origin));
                continue;
            }

            // Predicates see candidates in proximity order (nearest first on
            // reverse axes); the result goes back to document order.
            let candidates: Vec<N> = AxisIter::new(self.axis, &origin)
                .filter(|n| axes::matches(n, &self.node_test, self.axis, e_ctx.resolver))
                .collect();
            let mut selected = engine::apply_predicates(candidates, &self.predicates, e_ctx);
            if self.axis.is_reverse() {
                selected.reverse();
            }
            self.buffer = selected.into();
        }
    }
}

/// Predicates applied to a whole node-set, as in `(//a)[1]`.
#[derive(Debug, Clone)]
pub struct FilterQuery<N> {
    input: Query<N>,
    predicates: Vec<Expression>,
    buffer: Option<VecDeque<N>>,
}

impl<N: NodeNavigator> FilterQuery<N> {
    fn select(&mut self, e_ctx: &EvaluationContext<'_, N>) -> Option<N> {
        if self.buffer.is_none() {
            let mut nodes = Vec::new();
            while let Some(node) = self.input.select(e_ctx) {
                nodes.push(node);
            }
            let selected = engine::apply_predicates(nodes, &self.predicates, e_ctx);
            self.buffer = Some(selected.into());
        }
        self.buffer.as_mut()?.pop_front()
    }
}

/// Drains its input on the first pull, then yields it in document order.
#[derive(Debug, Clone)]
pub struct SortedQuery<N> {
    input: Query<N>,
    buffer: Option<VecDeque<N>>,
}

impl<N: NodeNavigator> SortedQuery<N> {
    fn select(&mut self, e_ctx: &EvaluationContext<'_, N>) -> Option<N> {
        if self.buffer.is_none() {
            let mut nodes = Vec::new();
            while let Some(node) = self.input.select(e_ctx) {
                nodes.push(node);
            }
            let before = nodes.len();
            sort_document_order(&mut nodes);
            log::trace!("Sorted {} nodes ({} duplicates removed)", nodes.len(), before - nodes.len());
            self.buffer = Some(nodes.into());
        }
        self.buffer.as_mut()?.pop_front()
    }
}
