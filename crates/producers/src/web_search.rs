//! Web search producer backed by DuckDuckGo Lite.
//!
//! DuckDuckGo Lite serves plain HTML with no JavaScript, which makes it
//! parseable with simple string scanning instead of a DOM library. Results
//! come back as facts (`result_1`..`result_n`) plus a raw context listing.

use async_trait::async_trait;
use contextfuse_core::error::ProducerError;
use contextfuse_core::{estimate_tokens, Fact, Producer, Snapshot};
use tracing::{debug, warn};

const SEARCH_URL: &str = "https://lite.duckduckgo.com/lite/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) contextfuse/0.1";
const DEFAULT_MAX_RESULTS: usize = 5;
const SNIPPET_FACT_CHARS: usize = 100;

/// A single parsed search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Searches the web and snapshots the top results.
pub struct WebSearchProducer {
    id: String,
    client: reqwest::Client,
    max_results: usize,
}

impl WebSearchProducer {
    pub fn new() -> Result<Self, ProducerError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ProducerError::Failed {
                producer_id: "web_search".into(),
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self {
            id: "web_search".into(),
            client,
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    async fn fetch(&self, query: &str) -> Result<String, ProducerError> {
        let response = self
            .client
            .post(SEARCH_URL)
            .header("User-Agent", USER_AGENT)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| ProducerError::Failed {
                producer_id: self.id.clone(),
                reason: format!("search request: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(ProducerError::Failed {
                producer_id: self.id.clone(),
                reason: format!("search returned HTTP {}", response.status().as_u16()),
            });
        }

        response.text().await.map_err(|e| ProducerError::Failed {
            producer_id: self.id.clone(),
            reason: format!("reading search response: {e}"),
        })
    }
}

#[async_trait]
impl Producer for WebSearchProducer {
    fn producer_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Searches the web via DuckDuckGo and returns the top results"
    }

    async fn produce(&self, query: &str) -> Result<Snapshot, ProducerError> {
        let html = self.fetch(query).await?;
        let results = parse_results(&html, self.max_results);
        debug!(count = results.len(), %query, "Web search complete");

        if results.is_empty() {
            warn!(%query, "Web search returned no results");
            return Snapshot::new(&self.id, format!("No web results found for: {query}"))
                .map_err(|e| ProducerError::InvalidSnapshot {
                    producer_id: self.id.clone(),
                    reason: e.to_string(),
                });
        }

        let mut facts = Vec::with_capacity(results.len());
        let mut raw = String::new();
        for (i, result) in results.iter().enumerate() {
            let snippet_head: String = result.snippet.chars().take(SNIPPET_FACT_CHARS).collect();
            let fact = Fact::new(
                format!("result_{}", i + 1),
                format!("{}: {}", result.title, snippet_head),
            )
            .map_err(|e| ProducerError::InvalidSnapshot {
                producer_id: self.id.clone(),
                reason: e.to_string(),
            })?;
            facts.push(fact);

            raw.push_str(&format!(
                "[{}] {}\n    {}\n    {}\n",
                i + 1,
                result.title,
                result.url,
                result.snippet
            ));
        }

        let token_count = estimate_tokens(&raw);
        let summary = format!("Top {} web results for: {query}", results.len());

        Snapshot::new(&self.id, summary)
            .map(|s| s.with_facts(facts).with_raw_context(raw, token_count))
            .map_err(|e| ProducerError::InvalidSnapshot {
                producer_id: self.id.clone(),
                reason: e.to_string(),
            })
    }
}

/// Parse DuckDuckGo Lite result HTML. Each result is an anchor with
/// `rel="nofollow"` followed by a `<td class="result-snippet">` cell.
fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for chunk in html.split("<a rel=\"nofollow\"").skip(1) {
        if results.len() >= max_results {
            break;
        }

        let Some(url) = extract_between(chunk, "href=\"", "\"") else {
            continue;
        };
        let Some(title_raw) = extract_between(chunk, ">", "</a>") else {
            continue;
        };
        let title = strip_tags(title_raw);
        if title.is_empty() {
            continue;
        }

        let snippet = extract_between(chunk, "<td class=\"result-snippet\">", "</td>")
            .map(strip_tags)
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url: url.to_string(),
            snippet,
        });
    }

    results
}

fn extract_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

/// Drop HTML tags, decode the handful of entities DuckDuckGo emits, and
/// collapse whitespace.
fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <table>
          <tr><td>1.</td><td>
            <a rel="nofollow" href="https://example.com/rust" class='result-link'>The <b>Rust</b> Language</a>
          </td></tr>
          <tr><td></td><td class="result-snippet">A language empowering everyone to build reliable &amp; efficient software.</td></tr>
          <tr><td>2.</td><td>
            <a rel="nofollow" href="https://example.org/tokio">Tokio</a>
          </td></tr>
          <tr><td></td><td class="result-snippet">An asynchronous runtime for the Rust programming language.</td></tr>
        </table>
    "#;

    #[test]
    fn parses_titles_urls_and_snippets() {
        let results = parse_results(SAMPLE, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "The Rust Language");
        assert_eq!(results[0].url, "https://example.com/rust");
        assert_eq!(
            results[0].snippet,
            "A language empowering everyone to build reliable & efficient software."
        );
        assert_eq!(results[1].title, "Tokio");
    }

    #[test]
    fn respects_max_results() {
        let results = parse_results(SAMPLE, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Rust Language");
    }

    #[test]
    fn empty_html_yields_no_results() {
        assert!(parse_results("<html><body></body></html>", 5).is_empty());
    }

    #[test]
    fn anchor_without_href_is_skipped() {
        let html = r#"<a rel="nofollow" class="x">Broken</a>"#;
        assert!(parse_results(html, 5).is_empty());
    }

    #[test]
    fn strip_tags_collapses_whitespace_and_entities() {
        assert_eq!(
            strip_tags("  a <b>bold</b>\n  &quot;word&quot; "),
            "a bold \"word\""
        );
    }
}
