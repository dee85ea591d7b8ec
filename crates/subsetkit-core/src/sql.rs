//! Small helpers for composing PostgreSQL statements.
//!
//! Identifiers are always double-quoted. User-supplied expressions
//! (predicates, anonymization replacements) are opaque fragments and are
//! never passed through here.

/// Quote a single identifier, doubling any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified, quoted table name.
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Comma-separated list of quoted column names.
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a SQL string for error messages.
pub fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.chars().count() <= max_len {
        sql.to_string()
    } else {
        let head: String = sql.chars().take(max_len).collect();
        format!("{}...", head)
    }
}

/// Sanitize a database URL for error messages (hide password).
pub fn sanitize_url(db_url: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(db_url) {
        if parsed.password().is_some() {
            let _ = parsed.set_password(Some("****"));
        }
        return parsed.to_string();
    }
    db_url.to_string()
}
