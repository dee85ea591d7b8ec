use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::catalog::{Catalog, ForeignKeyEdge};

/// Column pair of a foreign key from a child table to one of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLink {
    /// Referencing column in the child table.
    pub child_column: String,
    /// Referenced column in the parent table.
    pub parent_column: String,
}

/// A table with its relationships.
#[derive(Debug, Clone)]
pub struct TableNode {
    pub name: String,
    /// Parent table name to the links pointing at it.
    pub parents: BTreeMap<String, Vec<ColumnLink>>,
    pub children: BTreeSet<String>,
    /// Parents not yet emitted by the sorter. Starts at `parents.len()`.
    pub unsatisfied_parent_count: usize,
}

impl TableNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parents: BTreeMap::new(),
            children: BTreeSet::new(),
            unsatisfied_parent_count: 0,
        }
    }

    fn is_isolated(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty()
    }
}

/// Tables connected by foreign keys, keyed by table name.
///
/// Tables with neither parents nor children are not part of the graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(crate) nodes: BTreeMap<String, TableNode>,
}

impl DependencyGraph {
    /// Build the graph from a list of edges.
    ///
    /// Each edge adds a link to the child's parent entry (counting each
    /// distinct parent table once) and adds the child to the parent's
    /// children.
    pub fn build(edges: &[ForeignKeyEdge]) -> Self {
        let mut nodes: BTreeMap<String, TableNode> = BTreeMap::new();

        for edge in edges {
            let child = nodes
                .entry(edge.child_table.clone())
                .or_insert_with(|| TableNode::new(&edge.child_table));

            let link = ColumnLink {
                child_column: edge.child_column.clone(),
                parent_column: edge.parent_column.clone(),
            };
            match child.parents.get_mut(&edge.parent_table) {
                Some(links) => {
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
                None => {
                    child.parents.insert(edge.parent_table.clone(), vec![link]);
                    child.unsatisfied_parent_count += 1;
                }
            }

            nodes
                .entry(edge.parent_table.clone())
                .or_insert_with(|| TableNode::new(&edge.parent_table))
                .children
                .insert(edge.child_table.clone());
        }

        nodes.retain(|_, node| !node.is_isolated());

        Self { nodes }
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::build(catalog.edges())
    }

    pub fn node(&self, table_name: &str) -> Option<&TableNode> {
        self.nodes.get(table_name)
    }

    pub fn contains(&self, table_name: &str) -> bool {
        self.nodes.contains_key(table_name)
    }

    /// All tables in the graph, sorted by name.
    pub fn table_names(&self) -> Vec<&str> {
        self.nodes.keys().map(|s| s.as_str()).collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TableNode> {
        self.nodes.values()
    }

    /// Get the number of tables.
    pub fn table_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of column links across all tables.
    pub fn edge_count(&self) -> usize {
        self.nodes
            .values()
            .flat_map(|n| n.parents.values())
            .map(|links| links.len())
            .sum()
    }

    /// Tables from `tables` that have no relationships, in the given order.
    pub fn isolated<'a>(&self, tables: &'a [String]) -> Vec<&'a str> {
        tables
            .iter()
            .filter(|t| !self.contains(t))
            .map(|t| t.as_str())
            .collect()
    }

    /// Export as a petgraph graph. Edges point from child to parent, one
    /// per parent table, weighted by the links.
    pub fn to_petgraph(&self) -> (DiGraph<String, Vec<ColumnLink>>, HashMap<String, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        for name in self.nodes.keys() {
            indices.insert(name.clone(), graph.add_node(name.clone()));
        }

        for node in self.nodes.values() {
            for (parent, links) in &node.parents {
                if let (Some(&from), Some(&to)) = (indices.get(&node.name), indices.get(parent)) {
                    graph.add_edge(from, to, links.clone());
                }
            }
        }

        (graph, indices)
    }
}
