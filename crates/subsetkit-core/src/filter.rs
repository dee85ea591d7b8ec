//! # Condition Builder
//!
//! Builds the WHERE clause used when a table is copied into the working
//! schema. Three independent clause families are ANDed together:
//!
//! 1. **Parent existence**: one per foreign-key link:
//!    `("fk" IS NULL OR "fk" IN (SELECT "pk" FROM "work"."parent"))`.
//!    Parents are copied first, so no surviving row can reference a parent
//!    row that was filtered out. NULL foreign keys always pass.
//! 2. **Sample membership**: for sampled tables:
//!    `"id" IN (SELECT "id" FROM "work"."sample_<table>")`.
//! 3. **User condition**: row window (`"id" >= max(id) - N`, clamped at
//!    zero) ANDed with the raw predicate.
//!
//! The builder does no I/O. When a table has a row window, the caller reads
//! the table's current maximum key and passes it in.

use crate::graph::dag::DependencyGraph;
use crate::job::JobSpec;
use crate::sql::{qualified, quote_ident};

/// Composes filters for tables of one job.
pub struct ConditionBuilder<'a> {
    graph: &'a DependencyGraph,
    job: &'a JobSpec,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(graph: &'a DependencyGraph, job: &'a JobSpec) -> Self {
        Self { graph, job }
    }

    /// Parent-existence clauses, in parent-name then link order.
    pub fn parent_clauses(&self, table: &str) -> Vec<String> {
        let Some(node) = self.graph.node(table) else {
            return Vec::new();
        };

        node.parents
            .iter()
            .flat_map(|(parent, links)| {
                let parent_copy = qualified(&self.job.working_schema, parent);
                links.iter().map(move |link| {
                    let column = quote_ident(&link.child_column);
                    format!(
                        "({col} IS NULL OR {col} IN (SELECT {pcol} FROM {parent}))",
                        col = column,
                        pcol = quote_ident(&link.parent_column),
                        parent = parent_copy,
                    )
                })
            })
            .collect()
    }

    /// Sample-membership clause, if the table is sampled.
    pub fn sample_clause(&self, table: &str) -> Option<String> {
        self.job.sample_for(table)?;
        let pk = quote_ident(self.job.primary_key_for(table));
        Some(format!(
            "{pk} IN (SELECT {pk} FROM {keyset})",
            pk = pk,
            keyset = qualified(&self.job.working_schema, &self.job.keyset_table(table)),
        ))
    }

    /// Whether `condition_clause` needs the table's maximum key.
    pub fn needs_max_key(&self, table: &str) -> bool {
        self.job
            .condition_for(table)
            .is_some_and(|c| c.row_window.is_some())
    }

    /// The user-declared condition for `table`, or `None` when the table has
    /// no condition or the condition declares neither a window nor a
    /// predicate.
    ///
    /// `max_key` is the current maximum primary key; `None` means the table
    /// is empty.
    pub fn condition_clause(&self, table: &str, max_key: Option<i64>) -> Option<String> {
        let condition = self.job.condition_for(table)?;
        let mut parts = Vec::new();

        if let Some(window) = condition.row_window {
            let window = i64::try_from(window).unwrap_or(i64::MAX);
            let min_key = max_key.unwrap_or(0).saturating_sub(window).max(0);
            parts.push(format!(
                "{} >= {}",
                quote_ident(self.job.primary_key_for(table)),
                min_key
            ));
        }

        if let Some(predicate) = &condition.predicate {
            parts.push(format!("({})", predicate));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" AND "))
        }
    }

    /// Full filter for copying `table`, or `None` to copy every row.
    pub fn build_where(&self, table: &str, max_key: Option<i64>) -> Option<String> {
        let mut clauses = self.parent_clauses(table);
        clauses.extend(self.sample_clause(table));
        clauses.extend(self.condition_clause(table, max_key));

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }
}

/// Render an optional filter as a ` WHERE ...` suffix.
pub fn where_sql(filter: Option<&str>) -> String {
    match filter {
        Some(f) => format!(" WHERE {}", f),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ForeignKeyEdge;
    use crate::config::SubsetConfig;

    fn job(toml: &str) -> JobSpec {
        let config: SubsetConfig = toml::from_str(toml).unwrap();
        JobSpec::from_config(&config).unwrap()
    }

    fn graph() -> DependencyGraph {
        DependencyGraph::build(&[
            ForeignKeyEdge::new("orders", "member_id", "members", "id"),
            ForeignKeyEdge::new("orders", "product_id", "products", "id"),
        ])
    }

    const JOB: &str = r#"
[job]
working_schema = "work"

[[samples]]
table = "members"
size = 100

[[conditions]]
table = "orders"
last = 500
condition = "status <> 'void'"

[[conditions]]
table = "products"
"#;

    #[test]
    fn test_parent_clauses_allow_nulls() {
        let job = job(JOB);
        let graph = graph();
        let builder = ConditionBuilder::new(&graph, &job);

        assert_eq!(
            builder.parent_clauses("orders"),
            vec![
                "(\"member_id\" IS NULL OR \"member_id\" IN (SELECT \"id\" FROM \"work\".\"members\"))",
                "(\"product_id\" IS NULL OR \"product_id\" IN (SELECT \"id\" FROM \"work\".\"products\"))",
            ]
        );
        assert!(builder.parent_clauses("members").is_empty());
        assert!(builder.parent_clauses("not_in_graph").is_empty());
    }

    #[test]
    fn test_sample_clause() {
        let job = job(JOB);
        let graph = graph();
        let builder = ConditionBuilder::new(&graph, &job);

        assert_eq!(
            builder.sample_clause("members").as_deref(),
            Some("\"id\" IN (SELECT \"id\" FROM \"work\".\"sample_members\")")
        );
        assert!(builder.sample_clause("orders").is_none());
    }

    #[test]
    fn test_row_window_is_clamped_at_zero() {
        let job = job(JOB);
        let graph = graph();
        let builder = ConditionBuilder::new(&graph, &job);

        assert!(builder.needs_max_key("orders"));
        assert_eq!(
            builder.condition_clause("orders", Some(10_000)).as_deref(),
            Some("\"id\" >= 9500 AND (status <> 'void')")
        );
        assert_eq!(
            builder.condition_clause("orders", Some(200)).as_deref(),
            Some("\"id\" >= 0 AND (status <> 'void')")
        );
        assert_eq!(
            builder.condition_clause("orders", None).as_deref(),
            Some("\"id\" >= 0 AND (status <> 'void')")
        );
    }

    #[test]
    fn test_condition_without_window_or_predicate_is_empty() {
        let job = job(JOB);
        let graph = graph();
        let builder = ConditionBuilder::new(&graph, &job);

        assert!(!builder.needs_max_key("products"));
        assert!(builder.condition_clause("products", Some(5)).is_none());
        assert!(builder.condition_clause("members", Some(5)).is_none());
    }

    #[test]
    fn test_build_where_combines_all_families() {
        let job = job(
            r#"
[job]
working_schema = "work"

[[samples]]
table = "orders"
size = 10

[[conditions]]
table = "orders"
condition = "total > 0"
"#,
        );
        let graph = graph();
        let builder = ConditionBuilder::new(&graph, &job);

        let filter = builder.build_where("orders", None).unwrap();
        assert_eq!(filter.matches(" AND ").count(), 3);
        assert!(filter.contains("\"work\".\"members\""));
        assert!(filter.contains("\"work\".\"sample_orders\""));
        assert!(filter.ends_with("(total > 0)"));
    }

    #[test]
    fn test_build_where_empty_for_unfiltered_table() {
        let job = job("");
        let graph = graph();
        let builder = ConditionBuilder::new(&graph, &job);

        assert!(builder.build_where("members", None).is_none());
        assert_eq!(where_sql(None), "");
        assert_eq!(where_sql(Some("a = 1")), " WHERE a = 1");
    }
}
