//! Jira REST retrieval client.
//!
//! Executes compiled queries against `GET /rest/api/2/search` under the call
//! policies from [`crate::policy`]:
//!
//! - **Cache**: successful responses (including empty ones) are cached per
//!   (compiled query, credential scope) and served without network access.
//! - **Retry**: timeouts, connection errors and 5xx are retried with
//!   exponential backoff; 429 waits on its own budget.
//! - **Rate limit**: every outbound request, retries included, passes
//!   through one shared [`RateLimiter`].
//!
//! A 401/403 is never retried. It invalidates every cached response for the
//! credential scope, so a search after re-authentication goes to the server.
//!
//! The client also runs the capability probe (`GET /rest/api/2/field`) once
//! per session to learn whether attachment text is searchable.

use reqwest::header::{ACCEPT, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dates;
use crate::error::{excerpt, SearchError, SearchResult};
use crate::filter::ResultSet;
use crate::models::{Attachment, CompiledQuery, Credentials, Issue, IssueKey};
use crate::policy::{CacheKey, RateLimiter, ResponseCache, RetryPolicy};

/// Optional server features discovered by the capability probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// JQL field that searches extracted attachment text, if the instance
    /// has one.
    pub attachment_field: Option<String>,
}

pub struct IssueClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    cache: ResponseCache,
    platform_field_id: Option<String>,
    attachment_field: Option<String>,
    capabilities: OnceCell<Capabilities>,
}

impl IssueClient {
    /// Build a client with its own rate limiter.
    pub fn new(config: &Config) -> SearchResult<Self> {
        let limiter = Arc::new(RateLimiter::per_minute(
            config.retrieval.requests_per_minute,
        ));
        Self::with_limiter(config, limiter)
    }

    /// Build a client that shares an existing rate limiter handle.
    pub fn with_limiter(config: &Config, limiter: Arc<RateLimiter>) -> SearchResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.retrieval.timeout())
            .build()
            .map_err(|e| SearchError::Fatal(format!("failed to build HTTP client: {}", e)))?;

        let attachment_field = if config.query.probe_attachment_search {
            Some(config.query.attachment_field.clone()).filter(|f| !f.trim().is_empty())
        } else {
            None
        };

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            limiter,
            retry: config.retrieval.retry_policy(),
            cache: ResponseCache::new(
                config.retrieval.cache_capacity,
                config.retrieval.cache_ttl(),
            ),
            platform_field_id: config.query.platform_field_id.clone(),
            attachment_field,
            capabilities: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared handle to this client's rate limiter.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Execute a compiled query.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Auth`] on 401/403; the credential scope's cache is
    ///   cleared and the caller must re-authenticate.
    /// - [`SearchError::Transient`] once retries are exhausted.
    /// - [`SearchError::RateLimited`] once the 429 budget is exhausted.
    /// - [`SearchError::Http`] / [`SearchError::Fatal`] otherwise.
    pub async fn search(
        &self,
        query: &CompiledQuery,
        credentials: &Credentials,
    ) -> SearchResult<ResultSet> {
        let key = CacheKey {
            query: query.clone(),
            identity: credentials.identity(&self.base_url),
        };

        if let Some(hit) = self.cache.get(&key).await {
            debug!(jql = %query.jql, issues = hit.len(), "search served from cache");
            return Ok(hit);
        }

        let url = format!("{}/rest/api/2/search", self.base_url);
        let params = [
            ("jql", query.jql.clone()),
            ("maxResults", query.max_results.to_string()),
            ("fields", query.fields_param()),
        ];

        let (client, url, params) = (self, &url, &params);
        let outcome = self
            .retry
            .run(move || async move {
                client.limiter.acquire().await;
                debug!(jql = %params[0].1, "sending search request");
                client
                    .get_json::<SearchResponse>(url, params, credentials)
                    .await
            })
            .await;

        match outcome {
            Ok(response) => {
                let results = into_result_set(response, self.platform_field_id.as_deref());
                info!(jql = %query.jql, issues = results.len(), "search completed");
                self.cache.insert(key, results.clone()).await;
                Ok(results)
            }
            Err(err @ SearchError::Auth { .. }) => {
                warn!(error = %err, "credentials rejected, invalidating cached responses");
                self.cache.invalidate_scope(&key.identity);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Capabilities of the remote instance, probed at most once per client.
    ///
    /// A failed probe is logged and treated as "no optional features"; it is
    /// not remembered, so the next call probes again.
    pub async fn capabilities(&self, credentials: &Credentials) -> Capabilities {
        let Some(ref field) = self.attachment_field else {
            return Capabilities::default();
        };

        let probed = self
            .capabilities
            .get_or_try_init(|| self.probe(field, credentials))
            .await;

        match probed {
            Ok(caps) => caps.clone(),
            Err(err) => {
                warn!(error = %err, "capability probe failed, attachment search disabled");
                Capabilities::default()
            }
        }
    }

    async fn probe(&self, field: &str, credentials: &Credentials) -> SearchResult<Capabilities> {
        let url = format!("{}/rest/api/2/field", self.base_url);
        self.limiter.acquire().await;
        let descriptors: Vec<FieldDescriptor> = self
            .get_json(&url, &[] as &[(&str, String)], credentials)
            .await?;

        let supported = descriptors.iter().any(|d| {
            d.id == field
                || d.name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(field))
        });
        info!(field, supported, "capability probe finished");

        Ok(Capabilities {
            attachment_field: supported.then(|| field.to_string()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        credentials: &Credentials,
    ) -> SearchResult<T> {
        let resp = self
            .http
            .get(url)
            .basic_auth(&credentials.username, Some(&credentials.secret))
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| SearchError::Fatal(format!("malformed response from {}: {}", url, e)));
        }

        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = resp.text().await.unwrap_or_default();
        Err(SearchError::from_status(
            status.as_u16(),
            excerpt(&body),
            retry_after,
        ))
    }
}

/// `jlens probe`: report the optional features of the configured instance.
pub async fn run_probe(config: &Config) -> anyhow::Result<()> {
    let credentials = config.credentials_from_env()?;
    let client = IssueClient::new(config)?;
    let caps = client.capabilities(&credentials).await;

    println!("Instance: {}", client.base_url());
    match caps.attachment_field {
        Some(field) => println!("Attachment text search: available ({})", field),
        None => println!("Attachment text search: unavailable"),
    }
    Ok(())
}

// ============ Wire format ============

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    #[serde(default)]
    fields: RawFields,
}

#[derive(Debug, Deserialize, Default)]
struct RawFields {
    summary: Option<String>,
    description: Option<String>,
    status: Option<Named>,
    labels: Option<Vec<String>>,
    created: Option<String>,
    updated: Option<String>,
    assignee: Option<RawUser>,
    attachment: Option<Vec<RawAttachment>>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    id: Value,
    #[serde(default)]
    filename: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct FieldDescriptor {
    id: String,
    name: Option<String>,
}

fn into_result_set(response: SearchResponse, platform_field_id: Option<&str>) -> ResultSet {
    let issues = response
        .issues
        .into_iter()
        .filter_map(|raw| match raw.key.parse::<IssueKey>() {
            Ok(key) => Some(into_issue(key, raw.fields, platform_field_id)),
            Err(e) => {
                warn!(error = %e, "skipping issue with malformed key");
                None
            }
        })
        .collect();
    ResultSet::new(issues)
}

fn into_issue(key: IssueKey, fields: RawFields, platform_field_id: Option<&str>) -> Issue {
    let platforms = platform_field_id
        .and_then(|id| fields.extra.get(id))
        .map(facet_values)
        .unwrap_or_default();

    let attachments = fields
        .attachment
        .unwrap_or_default()
        .into_iter()
        .map(|a| Attachment {
            id: scalar_string(&a.id),
            filename: a.filename,
            mime_type: a.mime_type,
            content_url: a.content,
        })
        .collect();

    Issue {
        key,
        summary: fields.summary.unwrap_or_default(),
        description: fields.description.filter(|d| !d.trim().is_empty()),
        status: fields
            .status
            .and_then(|s| s.name)
            .unwrap_or_else(|| "Unknown".to_string()),
        labels: fields.labels.unwrap_or_default(),
        created: dates::parse(fields.created.as_deref().unwrap_or_default()),
        updated: dates::parse(fields.updated.as_deref().unwrap_or_default()),
        assignee: fields.assignee.and_then(|a| a.display_name),
        attachments,
        platforms,
    }
}

/// Custom facet fields arrive as a string, a `{value}`/`{name}` option
/// object, or an array of either.
fn facet_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        Value::Array(items) => items.iter().flat_map(facet_values).collect(),
        _ => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::Mutex;
    use std::time::Instant;

    const ONE_ISSUE: &str = r#"{
        "issues": [{
            "key": "BCC-7",
            "fields": {
                "summary": "Crash on login",
                "description": "Stack trace attached",
                "status": {"name": "Open"},
                "labels": ["mobile"],
                "created": "2024-01-15T10:30:00.000+0000",
                "updated": "2024-01-16T08:00:00.123+0100",
                "assignee": {"displayName": "Dana Reyes"},
                "attachment": [{
                    "id": "10001",
                    "filename": "screen.png",
                    "mimeType": "image/png",
                    "content": "https://acme.atlassian.net/secure/attachment/10001/screen.png"
                }],
                "customfield_10010": [{"value": "iOS"}, {"value": "Android"}]
            }
        }]
    }"#;

    fn test_config(url: &str) -> Config {
        let mut config = Config::minimal(url);
        config.retrieval.requests_per_minute = 0;
        config.retrieval.backoff_min_ms = 1;
        config.retrieval.backoff_max_ms = 5;
        config.query.platform_field_id = Some("customfield_10010".into());
        config
    }

    fn creds() -> Credentials {
        Credentials::new("dev@example.com", "token")
    }

    fn query(jql: &str) -> CompiledQuery {
        CompiledQuery {
            jql: jql.to_string(),
            max_results: 50,
            fields: vec!["summary".into(), "status".into()],
        }
    }

    #[test]
    fn test_parse_issue_payload() {
        let response: SearchResponse = serde_json::from_str(ONE_ISSUE).unwrap();
        let rs = into_result_set(response, Some("customfield_10010"));
        assert_eq!(rs.len(), 1);
        let issue = &rs.issues()[0];
        assert_eq!(issue.key.to_string(), "BCC-7");
        assert_eq!(issue.status, "Open");
        assert_eq!(issue.assignee.as_deref(), Some("Dana Reyes"));
        assert_eq!(issue.platforms, vec!["iOS", "Android"]);
        assert_eq!(issue.attachments.len(), 1);
        assert_eq!(issue.attachments[0].id, "10001");
        assert!(issue.attachments[0].is_image());
        assert_eq!(
            issue.created.timestamp(),
            dates::parse("2024-01-15T10:30:00Z").timestamp()
        );
        assert_eq!(
            issue.updated.timestamp(),
            dates::parse("2024-01-16T07:00:00Z").timestamp()
        );
        assert!(rs.facets().platforms.contains("Android"));
    }

    #[test]
    fn test_parse_tolerates_nulls_and_bad_keys() {
        let body = r#"{"issues": [
            {"key": "nokey", "fields": {}},
            {"key": "CSR-1", "fields": {"summary": null, "description": null,
             "status": null, "labels": null, "assignee": null, "attachment": null,
             "customfield_10010": "Web"}}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let rs = into_result_set(response, Some("customfield_10010"));
        assert_eq!(rs.len(), 1);
        let issue = &rs.issues()[0];
        assert_eq!(issue.status, "Unknown");
        assert!(issue.labels.is_empty());
        assert!(issue.description.is_none());
        assert_eq!(issue.platforms, vec!["Web"]);
    }

    #[test]
    fn test_facet_values_shapes() {
        assert_eq!(facet_values(&serde_json::json!("iOS")), vec!["iOS"]);
        assert_eq!(facet_values(&serde_json::json!({"name": "Linux"})), vec!["Linux"]);
        assert!(facet_values(&serde_json::json!(null)).is_empty());
        assert!(facet_values(&serde_json::json!(42)).is_empty());
    }

    #[tokio::test]
    async fn test_search_hits_network_then_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::UrlEncoded("jql".into(), "text ~ \"crash\"".into()))
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ONE_ISSUE)
            .expect(1)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        let q = query("text ~ \"crash\"");

        let first = client.search(&q, &creds()).await.unwrap();
        let second = client.search(&q, &creds()).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first.issues()[0], &second.issues()[0]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_result_is_terminal_and_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"issues": []}"#)
            .expect(1)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        assert!(client.search(&query("x"), &creds()).await.unwrap().is_empty());
        assert!(client.search(&query("x"), &creds()).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_invalidates_scope() {
        let mut server = mockito::Server::new_async().await;
        let cached = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::UrlEncoded("jql".into(), "a".into()))
            .with_status(200)
            .with_body(ONE_ISSUE)
            .expect(2)
            .create_async()
            .await;
        let forbidden = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::UrlEncoded("jql".into(), "b".into()))
            .with_status(403)
            .with_body("CAPTCHA required")
            .expect(1)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();

        client.search(&query("a"), &creds()).await.unwrap();
        client.search(&query("a"), &creds()).await.unwrap();

        let err = client.search(&query("b"), &creds()).await.unwrap_err();
        assert!(matches!(err, SearchError::Auth { status: 403 }));

        // Re-authenticated with a new secret: same scope, cache was cleared.
        let renewed = Credentials::new("dev@example.com", "new-token");
        client.search(&query("a"), &renewed).await.unwrap();

        cached.assert_async().await;
        forbidden.assert_async().await;
    }

    /// Mock whose requests record their arrival time.
    async fn timed_mock(
        server: &mut mockito::Server,
        path: &str,
        status: usize,
        arrivals: &Arc<Mutex<Vec<Instant>>>,
    ) -> mockito::Mock {
        let arrivals = Arc::clone(arrivals);
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body_from_request(move |_| {
                arrivals.lock().unwrap().push(Instant::now());
                b"{}".to_vec()
            })
            .create_async()
            .await
    }

    fn assert_spaced(arrivals: &[Instant], interval: Duration) {
        // Arrival jitter on loopback stays well under this slack.
        let slack = Duration::from_millis(40);
        for pair in arrivals.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap + slack >= interval, "requests only {:?} apart", gap);
        }
    }

    #[tokio::test]
    async fn test_retries_wait_for_rate_limiter() {
        let mut server = mockito::Server::new_async().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let _search = timed_mock(&mut server, "/rest/api/2/search", 503, &arrivals).await;

        let interval = Duration::from_millis(200);
        let limiter = Arc::new(RateLimiter::with_interval(interval));
        let client = IssueClient::with_limiter(&test_config(&server.url()), limiter).unwrap();

        let started = Instant::now();
        let err = client.search(&query("x"), &creds()).await.unwrap_err();
        assert!(err.is_transient());
        // Three attempts, two limiter gaps; backoff alone is a few ms.
        assert!(started.elapsed() >= interval * 2);

        let arrivals = arrivals.lock().unwrap().clone();
        assert_eq!(arrivals.len(), 3);
        assert_spaced(&arrivals, interval);
    }

    #[tokio::test]
    async fn test_limiter_shared_across_clients_and_probe() {
        let mut server = mockito::Server::new_async().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let _field = timed_mock(&mut server, "/rest/api/2/field", 200, &arrivals).await;
        let _search = timed_mock(&mut server, "/rest/api/2/search", 200, &arrivals).await;

        let interval = Duration::from_millis(150);
        let limiter = Arc::new(RateLimiter::with_interval(interval));
        let config = test_config(&server.url());
        let a = IssueClient::with_limiter(&config, Arc::clone(&limiter)).unwrap();
        let b = IssueClient::with_limiter(&config, Arc::clone(&limiter)).unwrap();
        assert!(Arc::ptr_eq(&a.limiter(), &b.limiter()));

        let (creds_caps, creds_a, creds_b) = (creds(), creds(), creds());
        let (query_a, query_b) = (query("a"), query("b"));
        let (caps, ra, rb) = tokio::join!(
            a.capabilities(&creds_caps),
            a.search(&query_a, &creds_a),
            b.search(&query_b, &creds_b)
        );
        // The field mock answers `{}`, which is not a descriptor list.
        assert_eq!(caps, Capabilities::default());
        assert!(ra.unwrap().is_empty());
        assert!(rb.unwrap().is_empty());

        let mut arrivals = arrivals.lock().unwrap().clone();
        arrivals.sort();
        assert_eq!(arrivals.len(), 3);
        assert_spaced(&arrivals, interval);
    }

    #[tokio::test]
    async fn test_server_errors_retried_then_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .expect(3)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        let err = client.search(&query("x"), &creds()).await.unwrap_err();
        assert!(matches!(err, SearchError::Transient(ref m) if m.contains("503")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_surfaced_after_budget() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(3)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        let err = client.search(&query("x"), &creds()).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::ZERO
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"errorMessages":["Error in the JQL Query"]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        match client.search(&query("x"), &creds()).await {
            Err(SearchError::Http { status, excerpt }) => {
                assert_eq!(status, 400);
                assert!(excerpt.contains("Error in the JQL Query"));
            }
            other => panic!("expected HTTP error, got {:?}", other.map(|r| r.len())),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_runs_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/field")
            .with_status(200)
            .with_body(r#"[{"id": "summary", "name": "Summary"},
                           {"id": "customfield_12000", "name": "attachmentContent"}]"#)
            .expect(1)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        let caps = client.capabilities(&creds()).await;
        assert_eq!(caps.attachment_field.as_deref(), Some("attachmentContent"));
        assert_eq!(client.capabilities(&creds()).await, caps);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_absent_field_and_failure() {
        let mut server = mockito::Server::new_async().await;
        let absent = server
            .mock("GET", "/rest/api/2/field")
            .with_status(200)
            .with_body(r#"[{"id": "summary", "name": "Summary"}]"#)
            .create_async()
            .await;

        let client = IssueClient::new(&test_config(&server.url())).unwrap();
        assert_eq!(client.capabilities(&creds()).await, Capabilities::default());
        absent.assert_async().await;

        let mut failing = mockito::Server::new_async().await;
        let mock = failing
            .mock("GET", "/rest/api/2/field")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        let client = IssueClient::new(&test_config(&failing.url())).unwrap();
        assert_eq!(client.capabilities(&creds()).await, Capabilities::default());
        assert_eq!(client.capabilities(&creds()).await, Capabilities::default());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_disabled_makes_no_request() {
        let mut config = test_config("http://127.0.0.1:9");
        config.query.probe_attachment_search = false;
        let client = IssueClient::new(&config).unwrap();
        assert_eq!(client.capabilities(&creds()).await, Capabilities::default());
    }
}
