use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use super::{KnowledgeGraph, NodeKey};

impl KnowledgeGraph {
    /// Breadth-first walk over outgoing edges starting at `start`.
    ///
    /// Nodes come back in FIFO discovery order, each at most once. Edges that
    /// point at keys without a node are still visited (as leaves). An unknown
    /// start yields an empty walk.
    pub fn traverse_breadth_first(&self, start: NodeKey) -> Vec<NodeKey> {
        if !self.contains(start) {
            return Vec::new();
        }
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for next in self.edges_from(current).map(|edge| edge.to) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// Depth-first pre-order walk using an explicit stack.
    ///
    /// Produces the same order as the recursive formulation (neighbors in
    /// adjacency order) without depending on call-stack depth.
    pub fn traverse_depth_first(&self, start: NodeKey) -> Vec<NodeKey> {
        if !self.contains(start) {
            return Vec::new();
        }
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            let pending: Vec<NodeKey> = self
                .edges_from(current)
                .map(|edge| edge.to)
                .filter(|next| !visited.contains(next))
                .collect();
            stack.extend(pending.into_iter().rev());
        }
        order
    }
}
