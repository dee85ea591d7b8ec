use std::collections::BTreeSet;

use petgraph::algo::tarjan_scc;

use crate::graph::dag::DependencyGraph;

/// Find the cycles among `among` (usually the tables the sorter could not
/// place).
///
/// Uses Tarjan's strongly connected components on the subgraph induced by
/// `among`. Only components with more than one table are cycles; a table
/// that is merely downstream of a cycle forms a singleton component and is
/// left out. Each cycle is sorted, and cycles are sorted by their first
/// table.
pub fn find_cycles(graph: &DependencyGraph, among: &BTreeSet<String>) -> Vec<Vec<String>> {
    let (mut pg, _) = graph.to_petgraph();
    pg.retain_nodes(|g, idx| among.contains(&g[idx]));

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&pg)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut names: Vec<String> = scc.iter().map(|&idx| pg[idx].clone()).collect();
            names.sort();
            names
        })
        .collect();

    cycles.sort();
    cycles
}
