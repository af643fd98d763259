//! GitHub repository search

use crate::domain::{RepositoryDescriptor, MAX_SEARCH_RESULTS};
use crate::error::SourceError;
use crate::source::{rank_and_dedupe, DescriptorSource};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub caps `per_page` at 100.
const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    full_name: Option<String>,
    clone_url: Option<String>,
    stargazers_count: Option<u64>,
    size: Option<u64>,
    html_url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

impl RawRepository {
    fn into_descriptor(self, index: usize) -> Result<RepositoryDescriptor, SourceError> {
        let identifier = self
            .full_name
            .filter(|n| n.contains('/'))
            .ok_or_else(|| SourceError::Malformed(format!("item {index} has no full_name")))?;
        let clone_url = self.clone_url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            SourceError::Malformed(format!("{identifier} has no clone_url"))
        })?;
        let stars = self.stargazers_count.ok_or_else(|| {
            SourceError::Malformed(format!("{identifier} has no stargazers_count"))
        })?;

        Ok(RepositoryDescriptor {
            identifier,
            clone_url,
            html_url: self.html_url,
            description: self.description,
            stars,
            size_kb: self.size.unwrap_or(0),
        })
    }
}

/// Search client for `GET /search/repositories`.
pub struct GithubSearch {
    client: Client,
    api_url: String,
    max_pages: usize,
}

impl GithubSearch {
    pub fn new(api_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            max_pages: MAX_SEARCH_RESULTS / PER_PAGE,
        })
    }

    /// Limit how many result pages are requested.
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.clamp(1, MAX_SEARCH_RESULTS / PER_PAGE);
        self
    }

    fn fetch_page(
        &self,
        query: &str,
        page: usize,
        credential: Option<&str>,
    ) -> Result<Vec<RepositoryDescriptor>, SourceError> {
        let url = format!("{}/search/repositories", self.api_url);
        let per_page = PER_PAGE.to_string();
        let page_number = page.to_string();
        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("repo-harvest/", env!("CARGO_PKG_VERSION")))
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
                ("page", page_number.as_str()),
            ]);
        if let Some(token) = credential {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        tracing::debug!("GET {url} q={query:?} page={page}");
        let response = request.send().map_err(|e| SourceError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| SourceError::Network(e.to_string()))?;
        parse_search_page(status, &body)
    }
}

impl DescriptorSource for GithubSearch {
    fn fetch(
        &self,
        query: &str,
        count: usize,
        credential: Option<&str>,
    ) -> Result<Vec<RepositoryDescriptor>, SourceError> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1;

        while found.len() < count && page <= self.max_pages {
            let items = match self.fetch_page(query, page, credential) {
                Ok(items) => items,
                Err(SourceError::AuthInvalid) => return Err(SourceError::AuthInvalid),
                // Later pages failing keeps what was already collected.
                Err(err) if !found.is_empty() => {
                    tracing::warn!("Stopping search after page {}: {}", page - 1, err);
                    break;
                }
                Err(err) => return Err(err),
            };
            if items.is_empty() {
                break;
            }
            let short_page = items.len() < PER_PAGE;
            // Results can shift between pages; count only identifiers not seen yet.
            found.extend(items.into_iter().filter(|d| seen.insert(d.identifier.to_ascii_lowercase())));
            if short_page {
                break;
            }
            page += 1;
        }

        let ranked = rank_and_dedupe(found, count);
        if ranked.is_empty() {
            return Err(SourceError::EmptyResult(query.to_string()));
        }
        tracing::info!("Search for {query:?} returned {} repositories", ranked.len());
        Ok(ranked)
    }
}

/// Map one search response onto descriptors or a [`SourceError`].
pub fn parse_search_page(status: u16, body: &str) -> Result<Vec<RepositoryDescriptor>, SourceError> {
    match status {
        200..=299 => {}
        401 => return Err(SourceError::AuthInvalid),
        403 | 429 => return Err(SourceError::RateLimited(api_message(body, status))),
        _ => return Err(SourceError::Network(api_message(body, status))),
    }

    let page: SearchPage = serde_json::from_str(body)
        .map_err(|e| SourceError::Malformed(format!("invalid search response JSON: {e}")))?;
    page.items.into_iter().enumerate().map(|(i, raw)| raw.into_descriptor(i)).collect()
}

fn api_message(body: &str, status: u16) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .map(|m| format!("HTTP {status}: {m}"))
        .unwrap_or_else(|| format!("HTTP {status}"))
}
