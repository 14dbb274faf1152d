//! Response parsing and OutOfScope classification (§4.2).

/// The generate worker's relevance verdict for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The model produced SQL it believes answers the question.
    Relevant,
    /// The model could not answer the question from the tables it
    /// could discover.
    OutOfScope,
}

/// The generate worker's parsed verdict on one model response.
#[derive(Debug, Clone)]
pub struct ParsedGeneration {
    /// Relevant or out of scope.
    pub decision: Decision,
    /// The model's stated reasoning.
    pub reasoning: String,
    /// The generated SQL, fence- and semicolon-stripped. `None` when
    /// out of scope or when no SQL was produced.
    pub sql: Option<String>,
}

const OUT_OF_SCOPE_KEYWORDS: &[&str] = &[
    "out of scope",
    "cannot answer",
    "not related",
    "does not exist",
];

/// Parse a model's final response text into a [`ParsedGeneration`],
/// applying the three-tier OutOfScope classification verbatim: the
/// `DECISION` tag, then SQL absence, then the keyword fallback (only
/// when no SQL was produced either).
pub fn parse_response(text: &str) -> ParsedGeneration {
    let (decision_tag, reasoning_tag, sql_tag) = extract_tagged(text);

    let sql = sql_tag
        .map(|raw| clean_sql(&raw))
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"));

    let decision_says_out_of_scope = decision_tag
        .as_deref()
        .map(|d| {
            let upper = d.to_ascii_uppercase();
            upper.contains("OUT_OF_SCOPE") || upper.contains("IRRELEVANT")
        })
        .unwrap_or(false);

    let no_sql_produced = sql.is_none();

    let keyword_hit = {
        let lower = text.to_ascii_lowercase();
        OUT_OF_SCOPE_KEYWORDS.iter().any(|kw| lower.contains(kw))
    };

    let is_out_of_scope = decision_says_out_of_scope || no_sql_produced || (keyword_hit && no_sql_produced);

    ParsedGeneration {
        decision: if is_out_of_scope {
            Decision::OutOfScope
        } else {
            Decision::Relevant
        },
        reasoning: reasoning_tag.unwrap_or_else(|| text.trim().to_string()),
        sql,
    }
}

/// Extract `DECISION:`/`REASONING:`/`SQL:` sections, trying literal tag
/// parsing first and a JSON-object fallback second.
fn extract_tagged(text: &str) -> (Option<String>, Option<String>, Option<String>) {
    if text.contains("DECISION:") || text.contains("SQL:") {
        let decision = slice_between(text, "DECISION:", &["REASONING:", "SQL:"]);
        let reasoning = slice_between(text, "REASONING:", &["SQL:"]);
        let sql = slice_after(text, "SQL:");
        return (decision, reasoning, sql);
    }

    if let Some(value) = serde_json::from_str::<serde_json::Value>(text.trim())
        .ok()
        .and_then(|v| v.as_object().cloned())
    {
        let decision = value.get("decision").and_then(|v| v.as_str()).map(str::to_string);
        let reasoning = value.get("reasoning").and_then(|v| v.as_str()).map(str::to_string);
        let sql = value.get("sql").and_then(|v| v.as_str()).map(str::to_string);
        return (decision, reasoning, sql);
    }

    (None, None, None)
}

fn slice_between(text: &str, start_tag: &str, end_tags: &[&str]) -> Option<String> {
    let start = text.find(start_tag)? + start_tag.len();
    let rest = &text[start..];
    let end = end_tags
        .iter()
        .filter_map(|tag| rest.find(tag))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

fn slice_after(text: &str, start_tag: &str) -> Option<String> {
    let start = text.find(start_tag)? + start_tag.len();
    Some(text[start..].trim().to_string())
}

fn clean_sql(raw: &str) -> String {
    let stripped = raw.replace("```sql", "").replace("```", "");
    let trimmed = stripped.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relevant_tagged_response() {
        let text = "DECISION: RELEVANT\nREASONING: orders has the amount column\nSQL: ```sql\nSELECT SUM(amount) FROM orders;\n```";
        let parsed = parse_response(text);
        assert_eq!(parsed.decision, Decision::Relevant);
        assert_eq!(parsed.sql.as_deref(), Some("SELECT SUM(amount) FROM orders"));
        assert!(parsed.reasoning.contains("amount column"));
    }

    #[test]
    fn decision_tag_out_of_scope_wins_even_with_sql() {
        let text = "DECISION: OUT_OF_SCOPE\nREASONING: no matching table\nSQL: SELECT 1";
        let parsed = parse_response(text);
        assert_eq!(parsed.decision, Decision::OutOfScope);
    }

    #[test]
    fn missing_sql_is_out_of_scope() {
        let text = "DECISION: RELEVANT\nREASONING: I don't have enough information\nSQL: NONE";
        let parsed = parse_response(text);
        assert_eq!(parsed.decision, Decision::OutOfScope);
        assert!(parsed.sql.is_none());
    }

    #[test]
    fn untagged_response_with_no_sql_is_out_of_scope() {
        let text = "This question is out of scope for the available tables.";
        let parsed = parse_response(text);
        assert_eq!(parsed.decision, Decision::OutOfScope);
        assert_eq!(parsed.reasoning, text);
    }

    #[test]
    fn json_fallback_is_parsed_when_no_tags_present() {
        let text = r#"{"decision": "RELEVANT", "reasoning": "ok", "sql": "SELECT 1 FROM orders"}"#;
        let parsed = parse_response(text);
        assert_eq!(parsed.decision, Decision::Relevant);
        assert_eq!(parsed.sql.as_deref(), Some("SELECT 1 FROM orders"));
    }
}
