//! Database query tool — read-only SQL against Postgres.
//!
//! Only SELECT statements are executed; anything else is refused with an
//! error result before touching the database. Results are rendered as an
//! aligned text table for the model to read.

use async_trait::async_trait;
use mindloop_core::error::ToolError;
use mindloop_core::tool::{Tool, ToolResult};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row};
use tracing::{info, warn};

pub const NAME: &str = "database_query";

pub struct DatabaseQueryTool {
    pool: PgPool,
}

impl DatabaseQueryTool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Only SELECT queries are allowed through.
fn ensure_select(sql: &str) -> Result<(), String> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err("Error: empty SQL statement.".into());
    }
    if !trimmed.to_uppercase().starts_with("SELECT") {
        return Err(format!(
            "Error: only SELECT queries are supported. Provided SQL: {sql}"
        ));
    }
    Ok(())
}

/// Decode a cell to text through a typed fallback chain. Postgres types map
/// to distinct Rust types in sqlx, so each likely column type is tried in
/// turn; NULL comes back as `None` for any of them.
fn cell_text(row: &PgRow, idx: usize) -> String {
    macro_rules! try_as {
        ($ty:ty) => {
            if let Ok(value) = row.try_get::<Option<$ty>, _>(idx) {
                return match value {
                    Some(v) => v.to_string(),
                    None => "NULL".into(),
                };
            }
        };
    }

    try_as!(String);
    try_as!(i64);
    try_as!(i32);
    try_as!(i16);
    try_as!(f64);
    try_as!(f32);
    try_as!(bool);
    try_as!(chrono::NaiveDate);
    try_as!(chrono::NaiveDateTime);
    try_as!(chrono::DateTime<chrono::Utc>);

    "<unsupported type>".into()
}

/// Render rows as an aligned table with a header and separator line.
fn format_rows(rows: &[PgRow]) -> String {
    let Some(first) = rows.first() else {
        return "Query returned no rows.".into();
    };

    let column_names: Vec<String> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    if column_names.is_empty() {
        return "Query returned no columns.".into();
    }

    let mut widths: Vec<usize> = column_names.iter().map(|n| n.len()).collect();
    let mut data: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(column_names.len());
        for idx in 0..column_names.len() {
            let text = cell_text(row, idx);
            widths[idx] = widths[idx].max(text.len());
            cells.push(text);
        }
        data.push(cells);
    }

    let mut out = String::new();
    out.push_str("| ");
    for (name, &width) in column_names.iter().zip(&widths) {
        out.push_str(&format!("{name:<width$} | "));
    }
    out.push('\n');

    out.push('|');
    for &width in &widths {
        out.push_str(&"-".repeat(width + 2));
        out.push('|');
    }
    out.push('\n');

    for cells in &data {
        out.push_str("| ");
        for (cell, &width) in cells.iter().zip(&widths) {
            out.push_str(&format!("{cell:<width$} | "));
        }
        out.push('\n');
    }

    out
}

#[async_trait]
impl Tool for DatabaseQueryTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Run a SQL query against the Postgres database and return the rows as a text \
         table. Only SELECT statements are supported."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "The SELECT statement to run"
                }
            },
            "required": ["sql"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let sql = arguments["sql"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'sql' argument".into()))?;

        if let Err(reason) = ensure_select(sql) {
            warn!(sql = %sql, "Refused non-SELECT query");
            return Ok(ToolResult {
                call_id: String::new(),
                success: false,
                output: reason,
            });
        }

        match sqlx::query(sql).fetch_all(&self.pool).await {
            Ok(rows) => {
                info!(rows = rows.len(), "Executed SELECT query");
                Ok(ToolResult {
                    call_id: String::new(),
                    success: true,
                    output: format!("Query result:\n{}", format_rows(&rows)),
                })
            }
            Err(e) => Ok(ToolResult {
                call_id: String::new(),
                success: false,
                output: format!("Error: query failed - {e}\nSQL: {sql}"),
            }),
        }
    }
}
