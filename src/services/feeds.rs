// src/services/feeds.rs

//! Feed and index-page collector.
//!
//! Fetches every RSS/Atom feed and HTML index page listed in the source
//! registry and turns their entries into [`RawItem`]s. Article bodies are
//! never fetched here.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, IndexSource, RawItem, SourceEntry, SourceType};
use crate::utils::{http, resolve};

/// Summary of a collection run.
#[derive(Debug, Default)]
pub struct CollectOutcome {
    pub items: Vec<RawItem>,
    pub source_total: usize,
    pub source_failures: usize,
    /// Entries dropped because their link was already collected
    pub duplicates: usize,
}

/// One fetch unit: a feed URL or an index page of a registry domain.
#[derive(Debug, Clone)]
enum Job<'a> {
    Feed { domain: &'a str, url: &'a str },
    Index { domain: &'a str, index: &'a IndexSource },
}

impl Job<'_> {
    fn url(&self) -> &str {
        match self {
            Job::Feed { url, .. } => url,
            Job::Index { index, .. } => &index.url,
        }
    }
}

/// Collects raw link observations from the registry's feeds and index pages.
pub struct FeedCollector {
    config: CrawlerConfig,
    client: Client,
}

impl FeedCollector {
    /// Create a collector with a client built from `config`.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &CrawlerConfig, client: Client) -> Self {
        Self {
            config: config.clone(),
            client,
        }
    }

    /// Fetch all sources with bounded concurrency.
    ///
    /// Results are gathered in source-declaration order whatever order the
    /// requests finish in. A failing source is logged and counted, never fatal.
    pub async fn collect(&self, sources: &[SourceEntry]) -> CollectOutcome {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let concurrency = self.config.max_concurrent.max(1);

        let jobs: Vec<Job<'_>> = sources
            .iter()
            .flat_map(|source| {
                let feeds = source.rss.iter().map(move |url| Job::Feed {
                    domain: &source.domain,
                    url,
                });
                let indexes = source.indexes.iter().map(move |index| Job::Index {
                    domain: &source.domain,
                    index,
                });
                feeds.chain(indexes)
            })
            .collect();

        let mut outcome = CollectOutcome {
            source_total: jobs.len(),
            ..CollectOutcome::default()
        };

        let mut results = stream::iter(jobs)
            .map(|job| async move {
                let result = self.run_job(&job).await;
                (job, result)
            })
            .buffered(concurrency);

        let mut seen = HashSet::new();
        while let Some((job, result)) = results.next().await {
            match result {
                Ok(items) => {
                    log::debug!("{} -> {} entries", job.url(), items.len());
                    for item in items {
                        if seen.insert(item.url.clone()) {
                            outcome.items.push(item);
                        } else {
                            outcome.duplicates += 1;
                        }
                    }
                }
                Err(error) => {
                    outcome.source_failures += 1;
                    log::warn!("Failed to collect {}: {}", job.url(), error);
                }
            }

            if delay.as_millis() > 0 {
                tokio::time::sleep(delay).await;
            }
        }

        outcome
    }

    async fn run_job(&self, job: &Job<'_>) -> Result<Vec<RawItem>> {
        let limit = self.config.limit_per_feed;
        match job {
            Job::Feed { domain, url } => {
                let body = http::fetch_bytes(&self.client, url).await?;
                parse_feed(url, &body, domain, limit)
            }
            Job::Index { domain, index } => {
                let body = http::fetch_text(&self.client, &index.url).await?;
                parse_index(&body, index, domain, limit)
            }
        }
    }
}

/// Parse a feed body, trying RSS first and Atom second.
pub fn parse_feed(url: &str, body: &[u8], domain: &str, limit: usize) -> Result<Vec<RawItem>> {
    let items = if let Ok(channel) = rss::Channel::read_from(body) {
        rss_items(&channel, domain)
    } else if let Ok(feed) = atom_syndication::Feed::read_from(body) {
        atom_items(&feed, domain)
    } else {
        return Err(AppError::feed(url, "neither RSS nor Atom"));
    };
    Ok(cap(items, limit))
}

fn rss_items(channel: &rss::Channel, domain: &str) -> Vec<RawItem> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let link = item.link()?.trim();
            if link.is_empty() {
                return None;
            }
            let published = item.pub_date().map(str::to_string).or_else(|| {
                item.dublin_core_ext()
                    .and_then(|dc| dc.dates().first().cloned())
            });
            Some(RawItem {
                url: link.to_string(),
                title: item.title().unwrap_or_default().trim().to_string(),
                summary: strip_html(item.description().unwrap_or_default()),
                published,
                source_domain: Some(domain.to_string()),
                source_type: SourceType::Rss,
            })
        })
        .collect()
}

fn atom_items(feed: &atom_syndication::Feed, domain: &str) -> Vec<RawItem> {
    feed.entries()
        .iter()
        .filter_map(|entry| {
            let links = entry.links();
            let link = links
                .iter()
                .find(|l| l.rel() == "alternate")
                .or_else(|| links.first())?
                .href()
                .trim();
            if link.is_empty() {
                return None;
            }

            let summary = entry
                .summary()
                .map(|s| s.as_str())
                .filter(|s| !s.trim().is_empty())
                .or_else(|| entry.content().and_then(|c| c.value()))
                .unwrap_or_default();
            let published = entry.published().unwrap_or(entry.updated()).to_rfc3339();

            Some(RawItem {
                url: link.to_string(),
                title: entry.title().as_str().trim().to_string(),
                summary: strip_html(summary),
                published: Some(published),
                source_domain: Some(domain.to_string()),
                source_type: SourceType::Rss,
            })
        })
        .collect()
}

/// Pull candidate article links out of an HTML listing page.
///
/// Only anchors whose `href` matches `link_pattern` are kept. The anchor text
/// is the title. `date_regex` is run over the text of the anchor's enclosing
/// element and its first capture group becomes the publish date.
pub fn parse_index(html: &str, index: &IndexSource, domain: &str, limit: usize) -> Result<Vec<RawItem>> {
    let link_pattern = index.link_pattern.as_deref().map(Regex::new).transpose()?;
    let date_regex = index.date_regex.as_deref().map(Regex::new).transpose()?;
    let anchors = Selector::parse("a[href]")
        .map_err(|e| AppError::validation(format!("anchor selector: {e}")))?;
    let base = Url::parse(index.base.as_deref().unwrap_or(&index.url))?;

    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }
        if link_pattern.as_ref().is_some_and(|p| !p.is_match(href)) {
            continue;
        }
        let Some(url) = resolve(&base, href) else {
            continue;
        };

        let text = collapse_whitespace(&anchor.text().collect::<String>());
        let title = if text.is_empty() { href.to_string() } else { text };

        let published = date_regex.as_ref().and_then(|re| {
            let context = anchor
                .parent()
                .and_then(ElementRef::wrap)
                .map(|p| p.text().collect::<String>())
                .unwrap_or_default();
            re.captures(&context)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        });

        items.push(RawItem {
            url,
            title,
            summary: String::new(),
            published,
            source_domain: Some(domain.to_string()),
            source_type: SourceType::Index,
        });
    }

    Ok(cap(items, limit))
}

fn cap(mut items: Vec<RawItem>, limit: usize) -> Vec<RawItem> {
    if limit > 0 && items.len() > limit {
        items.truncate(limit);
    }
    items
}

/// Text content of an HTML fragment with whitespace collapsed.
fn strip_html(html: &str) -> String {
    if !html.contains('<') {
        return collapse_whitespace(html);
    }
    let fragment = Html::parse_fragment(html);
    collapse_whitespace(&fragment.root_element().text().collect::<String>())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
