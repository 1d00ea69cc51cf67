//! JQL query compiler.
//!
//! Turns a [`SearchRequest`] into a [`CompiledQuery`]. The output is a pure
//! function of the request and [`CompileOptions`]: facet lists are sorted and
//! deduplicated, and clauses are always emitted in the same order, so equal
//! requests produce byte-identical JQL and share a cache entry.
//!
//! # Clause layout
//!
//! ```text
//! <text> AND project IN (...) AND status IN (...) AND "<platform>" = "..." AND created >= -Nd ORDER BY ...
//! ```
//!
//! The text clause ORs one group per searchable field; inside a group every
//! term must match:
//!
//! ```text
//! ((summary ~ "crash^3" AND summary ~ "login^2") OR (description ~ ...) OR (comment ~ ...))
//! ```
//!
//! # Term weighting
//!
//! | Token | Emitted |
//! |-------|---------|
//! | signal word (`error`, `fail`, `crash`, `bug`) | `"token^3"` |
//! | longer than 3 characters | `"token^2"` |
//! | all digits | `token` (unquoted) |
//! | anything else | `"token"` |
//!
//! Input wrapped in double quotes is an exact phrase and is emitted as one
//! unboosted term.

use std::collections::BTreeSet;

use crate::error::{SearchError, SearchResult};
use crate::models::{CompiledQuery, SearchRequest, SortOrder};

/// Words that most often mark a defect report.
const SIGNAL_TERMS: [&str; 4] = ["error", "fail", "crash", "bug"];

const HIGH_BOOST: u8 = 3;
const MEDIUM_BOOST: u8 = 2;

/// Fields always searched by free text, in emission order.
const TEXT_FIELDS: [&str; 3] = ["summary", "description", "comment"];

/// Issue fields requested from the search endpoint.
pub const BASE_FIELDS: [&str; 8] = [
    "summary",
    "description",
    "status",
    "labels",
    "created",
    "updated",
    "assignee",
    "attachment",
];

/// Instance-specific settings that shape the compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// JQL name of the platform facet field (e.g. `Platform` or `cf[10010]`).
    pub platform_field: String,
    /// Response field id carrying platform values, requested in `fields`.
    pub platform_field_id: Option<String>,
    /// Searchable attachment-text field, present only when the capability
    /// probe found it.
    pub attachment_field: Option<String>,
    pub max_results: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            platform_field: "Platform".to_string(),
            platform_field_id: None,
            attachment_field: None,
            max_results: 50,
        }
    }
}

/// Compile a search request into JQL.
///
/// # Errors
///
/// [`SearchError::QueryCompile`] when the free text is blank and no
/// structured filter is set; such a query would match every issue.
pub fn compile(request: &SearchRequest, options: &CompileOptions) -> SearchResult<CompiledQuery> {
    let text = free_text(&request.text);
    if text.is_empty() && !request.has_structured_filter() {
        return Err(SearchError::QueryCompile(
            "enter search text or choose at least one filter".to_string(),
        ));
    }

    let mut clauses: Vec<String> = Vec::new();

    if !text.is_empty() {
        clauses.push(text_clause(text, options.attachment_field.as_deref()));
    }

    let projects = canonical_set(&request.projects, |p| p.to_ascii_uppercase());
    if !projects.is_empty() {
        clauses.push(format!("project IN ({})", quoted_list(&projects)));
    }

    let statuses = canonical_set(&request.statuses, |s| s.to_string());
    if !statuses.is_empty() {
        clauses.push(format!("status IN ({})", quoted_list(&statuses)));
    }

    if let Some(platform) = request.platform.as_deref().map(str::trim) {
        if !platform.is_empty() {
            clauses.push(format!(
                "\"{}\" = \"{}\"",
                escape(&options.platform_field),
                escape(platform)
            ));
        }
    }

    if let Some(days) = request.window.days() {
        clauses.push(format!("created >= -{}d", days));
    }

    let mut jql = clauses.join(" AND ");
    if let Some(order) = SortOrder::from_key(&request.sort) {
        jql.push(' ');
        jql.push_str(order.clause());
    }

    let mut fields: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
    if let Some(ref id) = options.platform_field_id {
        fields.push(id.clone());
    }

    Ok(CompiledQuery {
        jql,
        max_results: options.max_results,
        fields,
    })
}

/// Escape a value for interpolation inside a double-quoted JQL string.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// A single free-text term as it will appear after `~`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Phrase(String),
    Number(String),
    Word { text: String, boost: Option<u8> },
}

impl Term {
    fn render(&self) -> String {
        match self {
            // Escaped inner quotes make Jira treat the content as a phrase.
            Term::Phrase(p) => format!("\"\\\"{}\\\"\"", escape(p)),
            Term::Number(n) => n.clone(),
            Term::Word {
                text,
                boost: Some(b),
            } => format!("\"{}^{}\"", escape(text), b),
            Term::Word { text, boost: None } => format!("\"{}\"", escape(text)),
        }
    }
}

fn parse_terms(text: &str) -> Vec<Term> {
    if let Some(phrase) = exact_phrase(text) {
        return vec![Term::Phrase(phrase.to_string())];
    }

    text.split_whitespace()
        .map(|token| {
            if token.chars().all(|c| c.is_ascii_digit()) {
                return Term::Number(token.to_string());
            }
            let lower = token.to_lowercase();
            let boost = if SIGNAL_TERMS.contains(&lower.as_str()) {
                Some(HIGH_BOOST)
            } else if token.chars().count() > 3 {
                Some(MEDIUM_BOOST)
            } else {
                None
            };
            Term::Word {
                text: token.to_string(),
                boost,
            }
        })
        .collect()
}

/// Trimmed free text; an empty quoted phrase counts as no text.
fn free_text(raw: &str) -> &str {
    let text = raw.trim();
    match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) if inner.trim().is_empty() => "",
        _ => text,
    }
}

/// Content of a `"quoted phrase"`, if the whole input is one.
fn exact_phrase(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let inner = inner.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

fn text_clause(text: &str, attachment_field: Option<&str>) -> String {
    let terms: Vec<String> = parse_terms(text).iter().map(Term::render).collect();

    let mut fields: Vec<String> = TEXT_FIELDS.iter().map(|f| f.to_string()).collect();
    if let Some(field) = attachment_field {
        fields.push(field_name(field));
    }

    let groups: Vec<String> = fields
        .iter()
        .map(|field| {
            let parts: Vec<String> = terms.iter().map(|t| format!("{} ~ {}", field, t)).collect();
            format!("({})", parts.join(" AND "))
        })
        .collect();

    format!("({})", groups.join(" OR "))
}

/// Plain identifiers go through as-is; anything else is quoted.
fn field_name(field: &str) -> String {
    if field
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        field.to_string()
    } else {
        format!("\"{}\"", escape(field))
    }
}

/// Trim, drop blanks, normalize, sort and deduplicate a facet list.
fn canonical_set(values: &[String], normalize: impl Fn(&str) -> String) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(normalize)
        .collect()
}

fn quoted_list(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", escape(v)))
        .collect::<Vec<_>>()
        .join(", ")
}
