//! Client-side facet filtering and pagination.
//!
//! The server answers the compiled query; everything here works on the
//! retrieved snapshot without another request. Filters never mutate issues:
//! they produce new, order-preserving subsequences that share the same
//! `Arc<Issue>` entries.
//!
//! An empty facet selection means "no constraint". Facet values available
//! for selection are computed once, when a [`ResultSet`] is built from a
//! retrieval, and carried unchanged through every filter.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::{Issue, IssueRef, TimeWindow};

/// Distinct facet values seen in one retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetIndex {
    pub statuses: BTreeSet<String>,
    pub platforms: BTreeSet<String>,
}

impl FacetIndex {
    fn scan(issues: &[IssueRef]) -> Self {
        let mut index = FacetIndex::default();
        for issue in issues {
            index.statuses.insert(issue.status.clone());
            index.platforms.extend(issue.platforms.iter().cloned());
        }
        index
    }
}

/// Ordered issues answering one compiled query.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    issues: Vec<IssueRef>,
    facets: Arc<FacetIndex>,
}

impl ResultSet {
    /// Wrap a fresh retrieval and index its facets.
    pub fn new(issues: Vec<Issue>) -> Self {
        let issues: Vec<IssueRef> = issues.into_iter().map(Arc::new).collect();
        let facets = Arc::new(FacetIndex::scan(&issues));
        Self { issues, facets }
    }

    pub fn issues(&self) -> &[IssueRef] {
        &self.issues
    }

    pub fn facets(&self) -> &FacetIndex {
        &self.facets
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    fn retain(&self, keep: impl Fn(&Issue) -> bool) -> Self {
        Self {
            issues: self
                .issues
                .iter()
                .filter(|issue| keep(issue))
                .cloned()
                .collect(),
            facets: Arc::clone(&self.facets),
        }
    }
}

/// Keep issues matching the selected statuses and platform.
///
/// An empty status list or a missing/blank platform does not constrain.
/// Status names compare case-insensitively.
pub fn filter(results: &ResultSet, statuses: &[String], platform: Option<&str>) -> ResultSet {
    let statuses: Vec<&str> = statuses
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let platform = platform.map(str::trim).filter(|p| !p.is_empty());

    if statuses.is_empty() && platform.is_none() {
        return results.clone();
    }

    results.retain(|issue| {
        let status_ok = statuses.is_empty()
            || statuses
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&issue.status));
        let platform_ok = match platform {
            None => true,
            Some(p) => issue.platforms.iter().any(|v| v.eq_ignore_ascii_case(p)),
        };
        status_ok && platform_ok
    })
}

/// Re-check the server's relative-date clause against normalized timestamps.
pub fn within_window(
    results: &ResultSet,
    window: TimeWindow,
    now: DateTime<FixedOffset>,
) -> ResultSet {
    match window.days() {
        None => results.clone(),
        Some(days) => {
            let cutoff = now - Duration::days(days as i64);
            results.retain(|issue| issue.created >= cutoff)
        }
    }
}

/// Number of pages for `len` items; zero for an empty set.
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// Clamp a 1-indexed page number into `[1, page_count]`.
pub fn clamp_page(len: usize, page_size: usize, page_number: usize) -> usize {
    page_number.clamp(1, page_count(len, page_size).max(1))
}

/// Slice out one 1-indexed page. Out-of-range page numbers clamp to the
/// nearest valid page; an empty input yields an empty slice.
pub fn paginate<T>(items: &[T], page_size: usize, page_number: usize) -> &[T] {
    if items.is_empty() {
        return &[];
    }
    let size = page_size.max(1);
    let page = clamp_page(items.len(), size, page_number);
    let start = (page - 1) * size;
    let end = (start + size).min(items.len());
    &items[start..end]
}

/// UI session state, passed into and returned from [`present`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub page: usize,
    pub page_size: usize,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            statuses: Vec::new(),
            platform: None,
        }
    }
}

/// One rendered page of a result set.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub issues: Vec<IssueRef>,
    pub total_matches: usize,
    pub total_retrieved: usize,
    pub total_pages: usize,
    pub available_statuses: Vec<String>,
    pub available_platforms: Vec<String>,
    /// The input state with its page number clamped.
    pub state: ViewState,
}

/// Apply the view state's facet selection and page to a result set.
pub fn present(results: &ResultSet, state: &ViewState) -> PageView {
    let filtered = filter(results, &state.statuses, state.platform.as_deref());
    let page_size = state.page_size.max(1);
    let page = clamp_page(filtered.len(), page_size, state.page);

    PageView {
        issues: paginate(filtered.issues(), page_size, page).to_vec(),
        total_matches: filtered.len(),
        total_retrieved: results.len(),
        total_pages: page_count(filtered.len(), page_size),
        available_statuses: results.facets().statuses.iter().cloned().collect(),
        available_platforms: results.facets().platforms.iter().cloned().collect(),
        state: ViewState {
            page,
            page_size,
            ..state.clone()
        },
    }
}
