//! Dependency graph module.
//!
//! Provides the `DerivationGraph` type, which represents dependencies
//! between derived combat values as a directed acyclic graph (DAG). Used by
//! the [`DerivationPlan`](crate::derive::DerivationPlan) to order its rules.

use crate::derive::Derived;
use crate::error::GearError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// A directed acyclic graph of derived-value dependencies.
///
/// If value A depends on value B, then B must be computed before A.
///
/// # Examples
///
/// ```rust
/// use zzgear::derive::Derived;
/// use zzgear::graph::DerivationGraph;
///
/// let mut graph = DerivationGraph::new();
/// graph.add_edge(Derived::WeaponskillAccuracy, Derived::MainAccuracy);
///
/// let order = graph.topological_sort().unwrap();
/// let acc = order.iter().position(|d| *d == Derived::MainAccuracy).unwrap();
/// let ws = order.iter().position(|d| *d == Derived::WeaponskillAccuracy).unwrap();
/// assert!(acc < ws);
/// ```
#[derive(Debug, Default)]
pub struct DerivationGraph {
    graph: DiGraph<Derived, ()>,
    node_map: HashMap<Derived, NodeIndex>,
}

impl DerivationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it doesn't exist, returning its index.
    pub fn add_node(&mut self, value: Derived) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&value) {
            idx
        } else {
            let idx = self.graph.add_node(value);
            self.node_map.insert(value, idx);
            idx
        }
    }

    /// `from` depends on `to` (`to` must be computed before `from`).
    pub fn add_edge(&mut self, from: Derived, to: Derived) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        self.graph.add_edge(to_idx, from_idx, ());
    }

    pub fn contains_node(&self, value: Derived) -> bool {
        self.node_map.contains_key(&value)
    }

    /// Detect cycles with a depth-first search.
    ///
    /// Returns `GearError::RuleCycle` with the closed cycle path, in
    /// computation order, when one exists.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzgear::derive::Derived;
    /// use zzgear::graph::DerivationGraph;
    ///
    /// let mut graph = DerivationGraph::new();
    /// graph.add_edge(Derived::CritRate, Derived::MainAccuracy);
    /// assert!(graph.detect_cycles().is_ok());
    ///
    /// graph.add_edge(Derived::MainAccuracy, Derived::CritRate);
    /// assert!(graph.detect_cycles().is_err());
    /// ```
    pub fn detect_cycles(&self) -> Result<(), GearError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node_idx in self.graph.node_indices() {
            if !visited.contains(&node_idx) {
                let mut path = Vec::new();
                if let Some(cycle) =
                    self.dfs_cycle_detect(node_idx, &mut visited, &mut rec_stack, &mut path)
                {
                    return Err(cycle);
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle_detect(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        rec_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<Derived>,
    ) -> Option<GearError> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(self.graph[node]);

        for neighbor in self
            .graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
        {
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_cycle_detect(neighbor, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&neighbor) {
                let closing = self.graph[neighbor];
                let start = path.iter().position(|d| *d == closing).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(closing);
                return Some(GearError::RuleCycle { path: cycle });
            }
        }

        rec_stack.remove(&node);
        path.pop();
        None
    }

    /// Computation order: dependencies first.
    pub fn topological_sort(&self) -> Result<Vec<Derived>, GearError> {
        self.detect_cycles()?;
        toposort(&self.graph, None)
            .map(|indices| indices.into_iter().map(|idx| self.graph[idx]).collect())
            .map_err(|cycle| GearError::RuleCycle {
                path: vec![self.graph[cycle.node_id()]],
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_path_is_closed() {
        let mut graph = DerivationGraph::new();
        graph.add_edge(Derived::MainAccuracy, Derived::WeaponskillAccuracy);
        graph.add_edge(Derived::WeaponskillAccuracy, Derived::MainAccuracy);

        match graph.detect_cycles() {
            Err(GearError::RuleCycle { path }) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_independent_nodes_sorted() {
        let mut graph = DerivationGraph::new();
        graph.add_node(Derived::MainAttack);
        graph.add_node(Derived::CritRate);
        assert!(graph.contains_node(Derived::CritRate));
        assert_eq!(graph.topological_sort().unwrap().len(), 2);
    }
}
