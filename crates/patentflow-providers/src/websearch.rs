//! Google Custom Search client for prior-art retrieval, restricted to the
//! known patent databases.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use patentflow_core::error::PipelineError;
use patentflow_core::search::{RawSearchResult, SearchBackend};

const PROVIDER: &str = "google-search";
const SITE_FILTER: &str = "(site:patents.google.com OR site:twpat.tipo.gov.tw)";

pub struct GoogleSearchClient {
    http: reqwest::Client,
    api_key: String,
    engine_id: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearchClient {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            base_url: "https://www.googleapis.com".into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RawSearchResult>, PipelineError> {
        let sited_query = format!("{query} {SITE_FILTER}");
        let url = format!("{}/customsearch/v1", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", sited_query.as_str()),
                ("num", &max_results.to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::provider(PROVIDER, status.as_u16(), body));
        }

        let parsed: SearchResponse = res.json().await?;
        info!(hits = parsed.items.len(), "prior-art search returned");

        Ok(parsed
            .items
            .into_iter()
            .map(|item| RawSearchResult {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"items":[{"title":"US123 valve","link":"https://patents.google.com/x"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].snippet, "");
    }

    #[test]
    fn test_empty_payload_is_zero_items() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
    }
}
