//! RSS/Atom feed fetching.
//!
//! Each configured [`FeedSource`] is fetched sequentially. Documents are
//! parsed as RSS 2.0 first and Atom second. Only the first
//! `entries_per_feed` entries of each feed are kept.

use crate::config::FeedSource;
use crate::error::FeedError;
use crate::utils::strip_html;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A raw feed entry, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    /// Plain text, HTML already stripped.
    pub summary: String,
    pub link: String,
    pub source: String,
    /// `None` when the feed gave no parseable date.
    pub published: Option<DateTime<Utc>>,
}

/// Fetches the configured feeds one after another.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    sources: Vec<FeedSource>,
    entries_per_feed: usize,
}

impl FeedClient {
    pub fn new(sources: Vec<FeedSource>, entries_per_feed: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(concat!("oil_field_insights/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
            sources,
            entries_per_feed,
        }
    }

    /// Fetch every feed, skipping (and logging) the ones that fail.
    #[instrument(level = "info", skip_all, fields(feeds = self.sources.len()))]
    pub async fn fetch_all(&self) -> Vec<FeedEntry> {
        let per_feed: Vec<Vec<FeedEntry>> = stream::iter(self.sources.iter())
            .then(|source| async move {
                match self.fetch_feed(source).await {
                    Ok(entries) => {
                        debug!(url = %source.url, count = entries.len(), "Fetched feed");
                        entries
                    }
                    Err(e) => {
                        warn!(url = %source.url, error = %e, "Feed fetch failed; skipping source");
                        Vec::new()
                    }
                }
            })
            .collect()
            .await;

        let entries: Vec<FeedEntry> = per_feed.into_iter().flatten().collect();
        info!(count = entries.len(), "Collected feed entries");
        entries
    }

    #[instrument(level = "debug", skip_all, fields(url = %source.url))]
    async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FeedError> {
        let response = self.client.get(&source.url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status {
                status: response.status().as_u16(),
                url: source.url.clone(),
            });
        }
        let body = response.bytes().await?;
        parse_feed(&body, source, self.entries_per_feed)
    }
}

/// Parse an RSS or Atom document into at most `limit` entries.
pub fn parse_feed(
    body: &[u8],
    source: &FeedSource,
    limit: usize,
) -> Result<Vec<FeedEntry>, FeedError> {
    if let Ok(channel) = rss::Channel::read_from(body) {
        return Ok(parse_rss_channel(&channel, source, limit));
    }
    if let Ok(feed) = atom_syndication::Feed::read_from(body) {
        return Ok(parse_atom_feed(&feed, source, limit));
    }
    Err(FeedError::Parse(source.url.clone()))
}

fn parse_rss_channel(channel: &rss::Channel, source: &FeedSource, limit: usize) -> Vec<FeedEntry> {
    channel
        .items()
        .iter()
        .take(limit)
        .filter_map(|item| {
            let title = item.title()?.trim().to_string();
            if title.is_empty() {
                return None;
            }
            let link = item.link().unwrap_or_default().trim().to_string();
            let published = item
                .pub_date()
                .and_then(parse_feed_date)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().first())
                        .and_then(|d| parse_feed_date(d))
                });
            Some(FeedEntry {
                source: source_name(source, channel.title(), &link),
                summary: strip_html(item.description().unwrap_or_default()),
                title,
                link,
                published,
            })
        })
        .collect()
}

fn parse_atom_feed(feed: &atom_syndication::Feed, source: &FeedSource, limit: usize) -> Vec<FeedEntry> {
    let feed_title = feed.title().to_string();
    feed.entries()
        .iter()
        .take(limit)
        .filter_map(|entry| {
            let title = entry.title().to_string().trim().to_string();
            if title.is_empty() {
                return None;
            }
            let link = entry
                .links()
                .first()
                .map(|l| l.href().to_string())
                .unwrap_or_default();
            let published = entry
                .published()
                .or_else(|| Some(entry.updated()))
                .map(|d| d.with_timezone(&Utc));
            let summary_html = entry
                .summary()
                .map(|s| s.as_str())
                .or_else(|| entry.content().and_then(|c| c.value()))
                .unwrap_or_default();
            Some(FeedEntry {
                source: source_name(source, &feed_title, &link),
                summary: strip_html(summary_html),
                title,
                link,
                published,
            })
        })
        .collect()
}

/// RFC 2822 (RSS) first, then RFC 3339 (Dublin Core, Atom-ish feeds).
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Configured name, else the channel title, else the link's host.
fn source_name(source: &FeedSource, channel_title: &str, link: &str) -> String {
    if let Some(name) = source.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.trim().to_string();
    }
    let channel_title = channel_title.trim();
    if !channel_title.is_empty() {
        return channel_title.to_string();
    }
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| "Unknown".to_string())
}
