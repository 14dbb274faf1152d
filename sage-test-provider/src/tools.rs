//! Canned tools fixturing the generate/execute/format workers' tool
//! set for end-to-end tests (§8 Scenarios A–C).
//!
//! Models one fixed database: an `orders` table with columns `id`,
//! `amount`, `customer_id`, `shipped_at`, matching Scenario A's
//! `orders(amount)` and Scenario C's "generated SQL references a
//! non-existent column".

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sage_tool::{ToolDyn, ToolError, ToolRegistry};
use serde_json::{json, Value};

const KNOWN_COLUMNS: [&str; 4] = ["id", "amount", "customer_id", "shipped_at"];

/// A tool implemented by a plain closure, for canned/fixture tools
/// that have no real backing service to call out to.
struct ClosureTool<F> {
    name: String,
    description: String,
    input_schema: Value,
    f: F,
}

impl<F> ToolDyn for ClosureTool<F>
where
    F: Fn(Value) -> Result<Value, ToolError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    fn call(&self, input: Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
        let result = (self.f)(input);
        Box::pin(async move { result })
    }
}

fn closure_tool(
    name: &str,
    description: &str,
    input_schema: Value,
    f: impl Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
) -> Arc<dyn ToolDyn> {
    Arc::new(ClosureTool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
        f,
    })
}

/// Build a registry with the full canned tool set: schema discovery
/// (`list_tables`, `search_relevant_schema`, `describe_table`), query
/// execution (`run_query`), and knowledge search
/// (`search_business_knowledge`).
pub fn build_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(closure_tool(
        "list_tables",
        "List tables available in the target database.",
        json!({ "type": "object", "properties": {} }),
        |_input| Ok(json!(["orders"])),
    ));

    registry.register(closure_tool(
        "search_relevant_schema",
        "Search the schema knowledge base for tables/columns relevant to a question.",
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"],
        }),
        |_input| {
            Ok(json!(
                "Table `orders` tracks customer purchases: id (int), \
                 amount (numeric, in cents), customer_id (int), \
                 shipped_at (timestamp, null until shipped)."
            ))
        },
    ));

    registry.register(closure_tool(
        "describe_table",
        "Describe a table's columns and types.",
        json!({
            "type": "object",
            "properties": { "table_name": { "type": "string" } },
            "required": ["table_name"],
        }),
        |input| {
            let table = input.get("table_name").and_then(Value::as_str).unwrap_or("");
            if table != "orders" {
                return Err(ToolError::InvalidInput(format!("unknown table: {table}")));
            }
            Ok(json!({
                "table": "orders",
                "columns": [
                    { "name": "id", "type": "integer" },
                    { "name": "amount", "type": "numeric" },
                    { "name": "customer_id", "type": "integer" },
                    { "name": "shipped_at", "type": "timestamp" },
                ],
            }))
        },
    ));

    registry.register(closure_tool(
        "run_query",
        "Execute a read-only SQL query against the target database.",
        json!({
            "type": "object",
            "properties": { "sql": { "type": "string" } },
            "required": ["sql"],
        }),
        |input| {
            let sql = input.get("sql").and_then(Value::as_str).unwrap_or("");
            run_canned_query(sql)
        },
    ));

    registry.register(closure_tool(
        "search_business_knowledge",
        "Search business/domain knowledge relevant to formatting a result for an executive audience.",
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"],
        }),
        |_input| {
            Ok(json!(
                "Orders are the company's primary revenue signal; \
                 shipped orders count as recognized revenue."
            ))
        },
    ));

    registry
}

/// Evaluate a SQL string against the fixed `orders` schema.
///
/// Returns an error (which the agent loop surfaces as a failed tool
/// call, and the execute worker's prompt instructs the model to report
/// as `STATUS: FAILED`) when the query references a column that isn't
/// one of [`KNOWN_COLUMNS`] — this is what drives Scenario C.
fn run_canned_query(sql: &str) -> Result<Value, ToolError> {
    let lowered = sql.to_lowercase();
    if !lowered.contains("orders") {
        return Err(ToolError::ExecutionFailed(format!(
            "relation does not exist: query does not reference `orders`: {sql}"
        )));
    }

    for word in lowered.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if word.is_empty() || is_sql_keyword(word) || word == "orders" {
            continue;
        }
        if KNOWN_COLUMNS.contains(&word) {
            continue;
        }
        // Anything else alphanumeric that isn't a known keyword/column
        // is treated as a hallucinated column reference.
        if looks_like_column_reference(&lowered, word) {
            return Err(ToolError::ExecutionFailed(format!(
                "column \"{word}\" does not exist"
            )));
        }
    }

    if lowered.contains("count(*)") || lowered.contains("count(") {
        return Ok(json!("count\n-----\n128"));
    }
    if lowered.contains("sum(amount)") {
        return Ok(json!("total_amount\n-------------\n489213"));
    }
    Ok(json!(
        "id | amount | customer_id | shipped_at\n\
         ---+--------+-------------+-----------\n\
         1  | 4200   | 101         | 2026-07-20"
    ))
}

fn is_sql_keyword(word: &str) -> bool {
    matches!(
        word,
        "select" | "from" | "where" | "group" | "by" | "order" | "limit" | "as" | "and" | "or"
            | "sum" | "count" | "avg" | "min" | "max" | "asc" | "desc" | "join" | "on"
    )
}

/// Heuristic: a bare word is a column reference if it follows `select`,
/// `by`, or sits right after `sum(`/`(` — good enough for a test
/// fixture, not a SQL parser.
fn looks_like_column_reference(sql: &str, word: &str) -> bool {
    sql.contains(&format!("({word})")) || sql.contains(&format!(".{word}")) || sql.contains(&format!(" {word} "))
}
