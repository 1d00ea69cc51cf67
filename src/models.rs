//! Core data models used throughout jira-lens.
//!
//! These types represent the search requests, issues and attachments that
//! flow through the query and retrieval pipeline.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Relative creation window applied on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeWindow {
    Last7Days,
    Last30Days,
    LastYear,
    #[default]
    AllTime,
}

impl TimeWindow {
    /// Window length in days; `None` for all time.
    pub fn days(self) -> Option<u32> {
        match self {
            TimeWindow::Last7Days => Some(7),
            TimeWindow::Last30Days => Some(30),
            TimeWindow::LastYear => Some(365),
            TimeWindow::AllTime => None,
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" | "week" => Ok(TimeWindow::Last7Days),
            "30d" | "month" => Ok(TimeWindow::Last30Days),
            "1y" | "365d" | "year" => Ok(TimeWindow::LastYear),
            "all" | "" => Ok(TimeWindow::AllTime),
            other => Err(format!(
                "unknown time window '{}'. Use 7d, 30d, 1y, or all.",
                other
            )),
        }
    }
}

/// Sort orders understood by the query compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    UpdatedDesc,
    UpdatedAsc,
    CreatedDesc,
    CreatedAsc,
    Priority,
}

impl SortOrder {
    /// Map a user-facing sort key. Unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "updated" => Some(SortOrder::UpdatedDesc),
            "updated_asc" => Some(SortOrder::UpdatedAsc),
            "created" => Some(SortOrder::CreatedDesc),
            "created_asc" => Some(SortOrder::CreatedAsc),
            "priority" => Some(SortOrder::Priority),
            _ => None,
        }
    }

    pub fn clause(self) -> &'static str {
        match self {
            SortOrder::UpdatedDesc => "ORDER BY updated DESC",
            SortOrder::UpdatedAsc => "ORDER BY updated ASC",
            SortOrder::CreatedDesc => "ORDER BY created DESC",
            SortOrder::CreatedAsc => "ORDER BY created ASC",
            SortOrder::Priority => "ORDER BY priority DESC",
        }
    }
}

/// A user-triggered search, before compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub text: String,
    pub projects: Vec<String>,
    pub window: TimeWindow,
    /// Raw sort key; unrecognized keys are dropped by the compiler.
    pub sort: String,
    pub statuses: Vec<String>,
    pub platform: Option<String>,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sort: "updated".to_string(),
            ..Default::default()
        }
    }

    /// Whether any filter besides free text is set. Blank facet values do
    /// not count.
    pub fn has_structured_filter(&self) -> bool {
        let any_value = |values: &[String]| values.iter().any(|v| !v.trim().is_empty());
        any_value(&self.projects)
            || any_value(&self.statuses)
            || self.platform.as_deref().is_some_and(|p| !p.trim().is_empty())
            || self.window != TimeWindow::AllTime
    }
}

/// The wire form of a search: JQL plus pagination and field selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledQuery {
    pub jql: String,
    pub max_results: u32,
    pub fields: Vec<String>,
}

impl CompiledQuery {
    pub fn fields_param(&self) -> String {
        self.fields.join(",")
    }
}

/// Basic-auth credentials. The secret is never printed.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Stable identity of the credential scope (instance + user).
    ///
    /// Used as half of the response cache key; re-entering a new password for
    /// the same user stays in the same scope.
    pub fn identity(&self, base_url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(base_url.trim_end_matches('/').as_bytes());
        hasher.update(b"\n");
        hasher.update(self.username.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Issue key, e.g. `BCC-142`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IssueKey {
    pub project: String,
    pub number: u64,
}

impl FromStr for IssueKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (project, number) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("malformed issue key '{}'", s))?;
        if project.is_empty() {
            return Err(format!("malformed issue key '{}'", s));
        }
        let number = number
            .parse::<u64>()
            .map_err(|_| format!("malformed issue key '{}'", s))?;
        Ok(Self {
            project: project.to_string(),
            number,
        })
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project, self.number)
    }
}

/// A file attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    /// Download URL (`content` in the REST payload).
    pub content_url: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// One issue as returned by a single retrieval. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub key: IssueKey,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
    pub labels: Vec<String>,
    pub created: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub assignee: Option<String>,
    pub attachments: Vec<Attachment>,
    pub platforms: Vec<String>,
}

impl Issue {
    pub fn browse_url(&self, base_url: &str) -> String {
        format!("{}/browse/{}", base_url.trim_end_matches('/'), self.key)
    }
}

/// Shared handle to an immutable issue.
pub type IssueRef = Arc<Issue>;

/// Text extracted from one attachment, with a per-attachment warning when the
/// extraction pipeline degraded to empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub warning: Option<String>,
}
