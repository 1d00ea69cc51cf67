//! # jira-lens
//!
//! An interactive Jira issue-search client.
//!
//! jira-lens compiles a free-text search plus structured filters into a
//! weighted JQL query, retrieves matching issues under a rate limit with
//! retries and a TTL response cache, and lets the caller narrow and page
//! through the snapshot locally. Image attachments can be OCR'd on demand.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌──────────────────┐
//! │ SearchRequest│──▶│  Query Compiler    │──▶│ Retrieval Client │──▶ Jira REST
//! └──────────────┘   │  (JQL + weights)   │   │ cache/retry/rate │
//!                    └────────────────────┘   └────────┬─────────┘
//!                                                      ▼
//!                    ┌────────────────────┐   ┌──────────────────┐
//!                    │ Attachment Text    │◀──│ Filter/Paginator │──▶ CLI (jlens)
//!                    │ Extractor (OCR)    │   │ facets + pages   │
//!                    └────────────────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export JIRA_USERNAME=dev@example.com JIRA_API_TOKEN=...
//! jlens probe
//! jlens search "login crash" --project BCC --window 30d
//! jlens search "\"NullPointerException in SyncService\"" --status Open --ocr
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Retrieval error taxonomy |
//! | [`query`] | Search request to JQL compiler |
//! | [`dates`] | Timestamp normalization |
//! | [`policy`] | Rate limiter, retry policy, response cache |
//! | [`client`] | Jira REST client and capability probe |
//! | [`extract`] | Attachment download, OCR and text extraction |
//! | [`filter`] | Facet filtering and pagination |
//! | [`search`] | End-to-end search pipeline and CLI rendering |

pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod extract;
pub mod filter;
pub mod models;
pub mod policy;
pub mod query;
pub mod search;
