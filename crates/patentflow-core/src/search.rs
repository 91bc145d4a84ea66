//! Prior-art retrieval: bounded query building, result normalization, and
//! the degrade-to-unavailable policy.
//!
//! Retrieval failures never fail the pipeline: the adapter returns
//! `PriorArt::Unavailable` with a reason and the phase proceeds without
//! enrichment. No retries happen at this layer.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::PipelineError;
use crate::types::{PriorArt, SearchResult};

/// Publication-number pattern covering US/EP/WO-style numbers and Taiwanese
/// TWI/TWU/TWM numbers.
static PATENT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Z]{2}\d{7,10}[A-Z]?\d?|TW[IUM]?\d{6,9})").expect("valid pattern")
});

/// A raw hit from the search collaborator, before normalization.
#[derive(Debug, Clone)]
pub struct RawSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The search collaborator contract: one query in, raw hits out.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<RawSearchResult>, PipelineError>;
}

/// Adapter over a [`SearchBackend`] that owns query construction, result
/// normalization and the partial-failure policy.
pub struct PriorArtAdapter {
    backend: std::sync::Arc<dyn SearchBackend>,
    max_results: usize,
}

impl PriorArtAdapter {
    pub fn new(backend: std::sync::Arc<dyn SearchBackend>, max_results: usize) -> Self {
        Self {
            backend,
            max_results,
        }
    }

    /// Run one retrieval. Any backend failure or empty payload degrades to
    /// `Unavailable` instead of propagating.
    pub async fn retrieve(&self, title: &str, field: &str, solution: &str) -> PriorArt {
        let query = build_query(title, field, solution);
        tracing::info!(query = %query, "prior-art search");

        match self.backend.search(&query, self.max_results).await {
            Ok(raw) if raw.is_empty() => {
                PriorArt::Unavailable("no matching prior art found".into())
            }
            Ok(raw) => PriorArt::Results(raw.into_iter().map(normalize).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "prior-art search failed, continuing without enrichment");
                PriorArt::Unavailable(e.to_string())
            }
        }
    }
}

/// Build the bounded search query: title + field plus the first three
/// deduplicated solution tokens longer than two characters.
pub fn build_query(title: &str, field: &str, solution: &str) -> String {
    let mut query = format!("{title} {field}");

    let mut seen = Vec::new();
    for token in solution.split(|c: char| c.is_whitespace() || ",;.、。；".contains(c)) {
        if token.chars().count() > 2 && !seen.contains(&token) {
            seen.push(token);
            if seen.len() == 3 {
                break;
            }
        }
    }
    for token in seen {
        query.push(' ');
        query.push_str(token);
    }

    query.trim().to_string()
}

/// Classify the hit's source database from its URL domain.
pub fn classify_source(url: &str) -> &'static str {
    const KNOWN_DOMAINS: &[(&str, &str)] = &[
        ("patents.google.com", "Google Patents"),
        ("twpat.tipo.gov.tw", "TIPO"),
    ];
    KNOWN_DOMAINS
        .iter()
        .find(|(domain, _)| url.contains(domain))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

fn normalize(raw: RawSearchResult) -> SearchResult {
    let patent_number = PATENT_NUMBER
        .find(&raw.title)
        .map(|m| m.as_str().to_string());
    let source = classify_source(&raw.url).to_string();
    SearchResult {
        title: raw.title,
        url: raw.url,
        snippet: raw.snippet,
        patent_number,
        source,
    }
}

/// Render a retrieval outcome into the text block folded into the Analyze
/// prompt.
pub fn format_prior_art(prior_art: &PriorArt) -> String {
    match prior_art {
        PriorArt::Unavailable(reason) => {
            format!("[Prior-art retrieval unavailable]\n{reason}")
        }
        PriorArt::Results(results) => {
            let mut out = format!("[Prior-art search results]\n{} hits:\n\n", results.len());
            for (i, r) in results.iter().enumerate() {
                out.push_str(&format!("--- Patent {} ---\n", i + 1));
                out.push_str(&format!("Title: {}\n", r.title));
                if let Some(ref number) = r.patent_number {
                    out.push_str(&format!("Publication number: {number}\n"));
                }
                out.push_str(&format!("Source: {}\n", r.source));
                out.push_str(&format!("Snippet: {}\n", r.snippet));
                out.push_str(&format!("Link: {}\n\n", r.url));
            }
            out
        }
    }
}
