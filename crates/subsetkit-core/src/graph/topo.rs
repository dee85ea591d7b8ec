use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{Result, SubsetError};
use crate::graph::cycle::find_cycles;
use crate::graph::dag::DependencyGraph;

/// Result of topological sorting: table names in a safe copy order
/// (parents before children).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyOrder {
    /// Tables in the order they should be copied.
    pub tables: Vec<String>,
    /// The same tables grouped by extraction round. Tables within a round
    /// don't depend on each other.
    pub rounds: Vec<Vec<String>>,
}

impl CopyOrder {
    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t == table)
    }

    /// Append tables that take no part in the graph as one final round.
    pub fn push_isolated(&mut self, tables: &[&str]) {
        let round: Vec<String> = tables
            .iter()
            .filter(|t| self.position(t).is_none())
            .map(|t| t.to_string())
            .collect();
        if round.is_empty() {
            return;
        }
        self.tables.extend(round.iter().cloned());
        self.rounds.push(round);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Compute a copy order with Kahn's algorithm.
///
/// Each round takes every table whose parents have all been emitted,
/// removes it, and decrements its children's unsatisfied parent count.
/// Works on a private copy of the node map, so `graph` is unchanged and the
/// call can be repeated.
///
/// Fails with `CyclicDependency` when tables remain but none qualifies.
pub fn topological_sort(graph: &DependencyGraph) -> Result<CopyOrder> {
    let mut remaining = graph.nodes.clone();
    let mut order = CopyOrder::default();

    loop {
        let ready: Vec<String> = remaining
            .values()
            .filter(|node| node.unsatisfied_parent_count == 0)
            .map(|node| node.name.clone())
            .collect();

        if ready.is_empty() {
            break;
        }

        for name in &ready {
            if let Some(node) = remaining.remove(name) {
                for child in &node.children {
                    if let Some(child_node) = remaining.get_mut(child) {
                        child_node.unsatisfied_parent_count =
                            child_node.unsatisfied_parent_count.saturating_sub(1);
                    }
                }
            }
        }

        order.tables.extend(ready.iter().cloned());
        order.rounds.push(ready);
    }

    if !remaining.is_empty() {
        let stuck: BTreeSet<String> = remaining.into_keys().collect();
        let cycles = find_cycles(graph, &stuck);
        return Err(SubsetError::CyclicDependency {
            remaining: stuck.into_iter().collect(),
            cycles,
        });
    }

    Ok(order)
}
