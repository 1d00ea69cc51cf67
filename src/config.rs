//! TOML configuration.
//!
//! ```toml
//! [jira]
//! base_url = "https://acme.atlassian.net"
//! # username_env = "JIRA_USERNAME"
//! # token_env = "JIRA_API_TOKEN"
//!
//! [retrieval]
//! requests_per_minute = 30
//! cache_ttl_secs = 3600
//!
//! [query]
//! projects = ["BCC", "RBOC", "BDATAS", "CSR"]
//! platform_field = "Platform"
//! platform_field_id = "customfield_10010"
//!
//! [ocr]
//! command = "tesseract"
//! language = "eng"
//! ```
//!
//! Every section except `[jira]` is optional.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::Credentials;
use crate::policy::RetryPolicy;
use crate::query::CompileOptions;

/// Upper bound on a single remote call.
pub const MAX_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub jira: JiraConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    #[serde(default = "default_username_env")]
    pub username_env: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_username_env() -> String {
    "JIRA_USERNAME".to_string()
}
fn default_token_env() -> String {
    "JIRA_API_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            max_attempts: default_max_attempts(),
            backoff_min_ms: default_backoff_min_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            rate_limit_retries: default_rate_limit_retries(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            max_results: default_max_results(),
        }
    }
}

fn default_requests_per_minute() -> u32 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_min_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    8_000
}
fn default_rate_limit_retries() -> u32 {
    2
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_cache_capacity() -> u64 {
    256
}
fn default_max_results() -> u32 {
    50
}

impl RetrievalConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_delay: Duration::from_millis(self.backoff_min_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            rate_limit_retries: self.rate_limit_retries,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// Known project codes. Empty means any project key is accepted.
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,
    #[serde(default = "default_platform_field")]
    pub platform_field: String,
    #[serde(default)]
    pub platform_field_id: Option<String>,
    #[serde(default = "default_attachment_field")]
    pub attachment_field: String,
    #[serde(default = "default_true")]
    pub probe_attachment_search: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            projects: default_projects(),
            platform_field: default_platform_field(),
            platform_field_id: None,
            attachment_field: default_attachment_field(),
            probe_attachment_search: true,
        }
    }
}

fn default_projects() -> Vec<String> {
    ["BCC", "RBOC", "BDATAS", "CSR"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}
fn default_platform_field() -> String {
    "Platform".to_string()
}
fn default_attachment_field() -> String {
    "attachmentContent".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ocr_command")]
    pub command: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
    #[serde(default = "default_ocr_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ocr_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_ocr_command(),
            language: default_ocr_language(),
            max_bytes: default_ocr_max_bytes(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_ocr_cache_capacity(),
        }
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}
fn default_ocr_language() -> String {
    "eng".to_string()
}
fn default_ocr_max_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_ocr_cache_capacity() -> u64 {
    1024
}

impl Config {
    /// A configuration with defaults everywhere, for running without a file.
    pub fn minimal(base_url: &str) -> Self {
        Self {
            jira: JiraConfig {
                base_url: base_url.to_string(),
                username_env: default_username_env(),
                token_env: default_token_env(),
            },
            retrieval: RetrievalConfig::default(),
            query: QueryConfig::default(),
            display: DisplayConfig::default(),
            ocr: OcrConfig::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.jira.base_url.trim_end_matches('/')
    }

    /// Compile options before the capability probe has run.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            platform_field: self.query.platform_field.clone(),
            platform_field_id: self.query.platform_field_id.clone(),
            attachment_field: None,
            max_results: self.retrieval.max_results,
        }
    }

    /// Read credentials from the configured environment variables.
    pub fn credentials_from_env(&self) -> Result<Credentials> {
        let username = std::env::var(&self.jira.username_env)
            .with_context(|| format!("{} environment variable not set", self.jira.username_env))?;
        let secret = std::env::var(&self.jira.token_env)
            .with_context(|| format!("{} environment variable not set", self.jira.token_env))?;
        Ok(Credentials::new(username, secret))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let base = config.jira.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        bail!("jira.base_url must start with http:// or https://");
    }

    let r = &config.retrieval;
    if r.timeout_secs == 0 || r.timeout_secs > MAX_TIMEOUT_SECS {
        bail!("retrieval.timeout_secs must be in 1..={}", MAX_TIMEOUT_SECS);
    }
    if r.max_attempts == 0 {
        bail!("retrieval.max_attempts must be >= 1");
    }
    if r.backoff_min_ms > r.backoff_max_ms {
        bail!("retrieval.backoff_min_ms must not exceed retrieval.backoff_max_ms");
    }
    if r.max_results == 0 || r.max_results > 1000 {
        bail!("retrieval.max_results must be in 1..=1000");
    }
    if r.cache_ttl_secs == 0 {
        bail!("retrieval.cache_ttl_secs must be > 0");
    }

    if config.display.page_size == 0 {
        bail!("display.page_size must be > 0");
    }

    if config.ocr.enabled && config.ocr.command.trim().is_empty() {
        bail!("ocr.command must be set when OCR is enabled");
    }
    if config.ocr.timeout_secs == 0 {
        bail!("ocr.timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = parse("[jira]\nbase_url = \"https://acme.atlassian.net/\"\n").unwrap();
        assert_eq!(config.base_url(), "https://acme.atlassian.net");
        assert_eq!(config.retrieval.requests_per_minute, 30);
        assert_eq!(config.retrieval.max_attempts, 3);
        assert_eq!(config.retrieval.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.retrieval.timeout(), Duration::from_secs(30));
        assert_eq!(config.query.projects, vec!["BCC", "RBOC", "BDATAS", "CSR"]);
        assert_eq!(config.display.page_size, 10);
        assert_eq!(config.ocr.command, "tesseract");
        assert_eq!(config.jira.token_env, "JIRA_API_TOKEN");
    }

    #[test]
    fn test_timeout_capped() {
        let err = parse(
            "[jira]\nbase_url = \"https://x\"\n[retrieval]\ntimeout_secs = 60\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_bad_base_url() {
        assert!(parse("[jira]\nbase_url = \"acme.atlassian.net\"\n").is_err());
    }

    #[test]
    fn test_backoff_bounds() {
        let err = parse(
            "[jira]\nbase_url = \"https://x\"\n[retrieval]\nbackoff_min_ms = 9000\nbackoff_max_ms = 100\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("backoff_min_ms"));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = parse(
            "[jira]\nbase_url = \"https://x\"\n[retrieval]\nmax_attempts = 5\nbackoff_min_ms = 10\nbackoff_max_ms = 20\n",
        )
        .unwrap();
        let policy = config.retrieval.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.min_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(20));
    }

    #[test]
    fn test_compile_options() {
        let config = parse(
            "[jira]\nbase_url = \"https://x\"\n[query]\nplatform_field = \"cf[10010]\"\nplatform_field_id = \"customfield_10010\"\n",
        )
        .unwrap();
        let opts = config.compile_options();
        assert_eq!(opts.platform_field, "cf[10010]");
        assert_eq!(opts.platform_field_id.as_deref(), Some("customfield_10010"));
        assert_eq!(opts.attachment_field, None);
        assert_eq!(opts.max_results, 50);
    }

    #[test]
    fn test_minimal_is_valid() {
        assert!(validate(&Config::minimal("https://acme.atlassian.net")).is_ok());
    }
}
