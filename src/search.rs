//! Search pipeline: compile, retrieve, filter, paginate, render.
//!
//! [`SearchService`] runs one search end to end and never returns stale
//! results: a failed search yields an empty [`ResultSet`] together with the
//! error. [`run_search`] is the `jlens search` command on top of it.

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::client::IssueClient;
use crate::config::Config;
use crate::error::SearchError;
use crate::extract::AttachmentExtractor;
use crate::filter::{self, PageView, ResultSet, ViewState};
use crate::models::{CompiledQuery, Credentials, ExtractedText, SearchRequest};
use crate::query::{self, CompileOptions};

/// Result of one search. Exactly one of `results`/`error` is meaningful.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// The query sent to the server, when compilation succeeded.
    pub query: Option<CompiledQuery>,
    pub results: ResultSet,
    pub error: Option<SearchError>,
}

impl SearchOutcome {
    fn failed(query: Option<CompiledQuery>, error: SearchError) -> Self {
        Self {
            query,
            results: ResultSet::default(),
            error: Some(error),
        }
    }
}

pub struct SearchService {
    client: IssueClient,
    options: CompileOptions,
}

impl SearchService {
    pub fn new(client: IssueClient, options: CompileOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &IssueClient {
        &self.client
    }

    /// Run a search under `credentials`.
    pub async fn run(&self, request: &SearchRequest, credentials: &Credentials) -> SearchOutcome {
        // Validate before touching the network.
        let compiled = match query::compile(request, &self.options) {
            Ok(q) => q,
            Err(e) => return SearchOutcome::failed(None, e),
        };

        let capabilities = self.client.capabilities(credentials).await;
        let compiled = match capabilities.attachment_field {
            None => compiled,
            Some(field) => {
                let options = CompileOptions {
                    attachment_field: Some(field),
                    ..self.options.clone()
                };
                match query::compile(request, &options) {
                    Ok(q) => q,
                    Err(e) => return SearchOutcome::failed(None, e),
                }
            }
        };
        debug!(jql = %compiled.jql, "compiled search");

        match self.client.search(&compiled, credentials).await {
            Ok(results) => {
                let now = Utc::now().fixed_offset();
                SearchOutcome {
                    results: filter::within_window(&results, request.window, now),
                    query: Some(compiled),
                    error: None,
                }
            }
            Err(e) => SearchOutcome::failed(Some(compiled), e),
        }
    }
}

/// Options for `jlens search` beyond the request itself.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub request: SearchRequest,
    pub page: usize,
    pub page_size: Option<usize>,
    pub ocr: bool,
    pub json: bool,
}

/// Extracted text for one attachment on the shown page.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentText {
    pub issue: String,
    pub filename: String,
    #[serde(flatten)]
    pub extracted: ExtractedText,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    jql: Option<&'a str>,
    error: Option<String>,
    #[serde(flatten)]
    view: &'a PageView,
    attachments: &'a [AttachmentText],
}

pub async fn run_search(config: &Config, args: SearchArgs) -> Result<()> {
    let credentials = config.credentials_from_env()?;
    warn_unknown_projects(config, &args.request.projects);

    let client = IssueClient::new(config)?;
    let service = SearchService::new(client, config.compile_options());
    let outcome = service.run(&args.request, &credentials).await;

    if let Some(SearchError::QueryCompile(ref msg)) = outcome.error {
        bail!("{}", msg);
    }

    let state = ViewState {
        page: args.page,
        page_size: args.page_size.unwrap_or(config.display.page_size),
        statuses: args.request.statuses.clone(),
        platform: args.request.platform.clone(),
    };
    let view = filter::present(&outcome.results, &state);

    let attachments = if args.ocr && config.ocr.enabled && !view.issues.is_empty() {
        let extractor = Arc::new(AttachmentExtractor::from_config(config)?);
        extract_page_attachments(extractor, &view, &credentials).await
    } else {
        Vec::new()
    };

    if args.json {
        let report = JsonReport {
            jql: outcome.query.as_ref().map(|q| q.jql.as_str()),
            error: outcome.error.as_ref().map(|e| e.to_string()),
            view: &view,
            attachments: &attachments,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(ref err) = outcome.error {
        println!("Search failed: {}", err);
        println!("No results.");
        return Ok(());
    }

    print!("{}", render_page(&view, config.base_url(), &attachments));
    Ok(())
}

fn warn_unknown_projects(config: &Config, requested: &[String]) {
    let known = &config.query.projects;
    if known.is_empty() {
        return;
    }
    for project in requested {
        if !known.iter().any(|k| k.eq_ignore_ascii_case(project)) {
            warn!(project = %project, "project is not in query.projects");
        }
    }
}

/// OCR every image attachment on the page concurrently.
async fn extract_page_attachments(
    extractor: Arc<AttachmentExtractor>,
    view: &PageView,
    credentials: &Credentials,
) -> Vec<AttachmentText> {
    let mut tasks = JoinSet::new();
    for issue in &view.issues {
        for attachment in issue.attachments.iter().filter(|a| a.is_image()) {
            let extractor = Arc::clone(&extractor);
            let credentials = credentials.clone();
            let issue_key = issue.key.to_string();
            let attachment = attachment.clone();
            tasks.spawn(async move {
                let extracted = extractor
                    .extract_text(&attachment.content_url, &attachment.mime_type, &credentials)
                    .await;
                AttachmentText {
                    issue: issue_key,
                    filename: attachment.filename,
                    extracted,
                }
            });
        }
    }

    let mut done = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(text) => done.push(text),
            Err(e) => warn!(error = %e, "attachment extraction task failed"),
        }
    }
    done.sort_by(|a, b| (&a.issue, &a.filename).cmp(&(&b.issue, &b.filename)));
    done
}

/// Plain-text rendering of one page.
pub fn render_page(view: &PageView, base_url: &str, attachments: &[AttachmentText]) -> String {
    let mut out = String::new();
    if view.issues.is_empty() {
        out.push_str("No results.\n");
        return out;
    }

    let mut by_issue: HashMap<&str, Vec<&AttachmentText>> = HashMap::new();
    for a in attachments {
        by_issue.entry(a.issue.as_str()).or_default().push(a);
    }

    let _ = writeln!(
        out,
        "Page {} of {} ({} matching, {} retrieved)",
        view.state.page, view.total_pages, view.total_matches, view.total_retrieved
    );
    if !view.available_statuses.is_empty() {
        let _ = writeln!(out, "Statuses: {}", view.available_statuses.join(", "));
    }
    if !view.available_platforms.is_empty() {
        let _ = writeln!(out, "Platforms: {}", view.available_platforms.join(", "));
    }
    out.push('\n');

    let offset = (view.state.page - 1) * view.state.page_size;
    for (i, issue) in view.issues.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} [{}] {}",
            offset + i + 1,
            issue.key,
            issue.status,
            issue.summary
        );
        let _ = writeln!(out, "    updated: {}", issue.updated.format("%Y-%m-%d %H:%M"));
        if let Some(ref assignee) = issue.assignee {
            let _ = writeln!(out, "    assignee: {}", assignee);
        }
        if !issue.platforms.is_empty() {
            let _ = writeln!(out, "    platforms: {}", issue.platforms.join(", "));
        }
        if !issue.labels.is_empty() {
            let _ = writeln!(out, "    labels: {}", issue.labels.join(", "));
        }
        let _ = writeln!(out, "    url: {}", issue.browse_url(base_url));

        let key = issue.key.to_string();
        for a in by_issue.get(key.as_str()).into_iter().flatten() {
            match a.extracted.warning {
                Some(ref w) => {
                    let _ = writeln!(out, "    attachment {}: warning: {}", a.filename, w);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "    attachment {}: \"{}\"",
                        a.filename,
                        a.extracted.text.replace('\n', " ").trim()
                    );
                }
            }
        }
        out.push('\n');
    }
    out
}
