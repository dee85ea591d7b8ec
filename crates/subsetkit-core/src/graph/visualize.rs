use std::collections::BTreeSet;

use crate::graph::dag::DependencyGraph;

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Render the dependency graph. Edges point from child to parent and are
/// labelled with the child's referencing columns. Tables in `highlighted`
/// (typically the members of a cycle) are drawn in red.
pub fn visualize(
    graph: &DependencyGraph,
    highlighted: &BTreeSet<String>,
    format: GraphFormat,
) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph, highlighted),
        GraphFormat::Dot => generate_dot(graph, highlighted),
    }
}

fn edge_label(links: &[crate::graph::dag::ColumnLink]) -> String {
    links
        .iter()
        .map(|l| l.child_column.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn generate_mermaid(graph: &DependencyGraph, highlighted: &BTreeSet<String>) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.nodes() {
        output.push_str(&format!("    {}[{}]\n", node.name, node.name));
    }

    output.push('\n');

    for node in graph.nodes() {
        for (parent, links) in &node.parents {
            output.push_str(&format!(
                "    {} -->|{}| {}\n",
                node.name,
                edge_label(links),
                parent
            ));
        }
    }

    if !highlighted.is_empty() {
        output.push_str("\n    classDef cycle stroke:#d00,stroke-width:2px\n");
        for name in highlighted {
            output.push_str(&format!("    class {} cycle\n", name));
        }
    }

    output
}

fn generate_dot(graph: &DependencyGraph, highlighted: &BTreeSet<String>) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    for name in highlighted {
        output.push_str(&format!("    \"{}\" [color=red];\n", name));
    }

    for node in graph.nodes() {
        for (parent, links) in &node.parents {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                node.name,
                parent,
                edge_label(links)
            ));
        }
    }

    output.push_str("}\n");
    output
}
