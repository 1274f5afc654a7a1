//! arXiv adapter - random recent paper from a set of categories

use async_trait::async_trait;
use cosmos_poster_domain::{
    ContentProvider, ContentRecord, FetchHint, PaperPayload, SourceError,
};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::text::to_ascii;

/// Configuration for the arXiv source
#[derive(Debug, Clone)]
pub struct ArxivConfig {
    pub base_url: String,
    pub categories: Vec<String>,
    pub max_results: u32,
    pub timeout: Duration,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org".to_string(),
            categories: default_categories(),
            max_results: 100,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Computation and Language, AI, Machine Learning, Computer Vision, Statistics ML
pub fn default_categories() -> Vec<String> {
    ["cs.CL", "cs.AI", "cs.LG", "cs.CV", "stat.ML"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// arXiv query API source
pub struct ArxivSource {
    client: Client,
    config: ArxivConfig,
}

impl ArxivSource {
    pub fn new(config: ArxivConfig) -> Result<Self, SourceError> {
        if config.categories.is_empty() {
            return Err(SourceError::Api("No arXiv categories configured".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Pick a random category, then a random paper among its newest submissions
    pub async fn fetch_random_paper(&self) -> Result<Option<PaperPayload>, SourceError> {
        let Some(category) = self
            .config
            .categories
            .choose(&mut rand::thread_rng())
            .cloned()
        else {
            return Ok(None);
        };

        let entries = self.query_category(&category).await?;
        if entries.is_empty() {
            tracing::warn!(category = %category, "No papers found in category");
            return Ok(None);
        }

        let Some(entry) = entries.choose(&mut rand::thread_rng()) else {
            return Ok(None);
        };

        Ok(Some(paper_from_entry(entry, &category)))
    }

    async fn query_category(&self, category: &str) -> Result<Vec<Entry>, SourceError> {
        let url = format!("{}/api/query", self.config.base_url.trim_end_matches('/'));
        let max_results = self.config.max_results.to_string();

        tracing::debug!(category = %category, "Querying arXiv");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", format!("cat:{}", category).as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if response.status() == 429 {
            return Err(SourceError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "arXiv query failed ({}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let feed: Feed =
            quick_xml::de::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(feed.entries)
    }
}

fn paper_from_entry(entry: &Entry, category: &str) -> PaperPayload {
    let entry_id = entry.id.trim();
    let arxiv_id = entry_id.rsplit('/').next().unwrap_or(entry_id).to_string();

    let authors = entry
        .authors
        .iter()
        .map(|a| a.name.trim())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    PaperPayload {
        arxiv_id,
        title: entry.title.as_deref().map(to_ascii),
        authors: Some(to_ascii(&authors)).filter(|a| !a.is_empty()),
        url: Some(entry_id.to_string()),
        summary: entry.summary.as_deref().map(to_ascii),
        category: category.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: Option<String>,
    summary: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[async_trait]
impl ContentProvider for ArxivSource {
    async fn fetch_candidate(
        &self,
        _hint: &FetchHint<'_>,
    ) -> Result<Option<ContentRecord>, SourceError> {
        Ok(self.fetch_random_paper().await?.map(ContentRecord::paper))
    }

    fn name(&self) -> &'static str {
        "arxiv"
    }
}
