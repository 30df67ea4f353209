//! Article selection: dedup, score, filter, order, diversify.

use super::feeds::FeedEntry;
use super::scoring::{Recency, RelevanceScorer, recency};
use crate::config::SelectionConfig;
use crate::models::Article;
use crate::utils::truncate_chars;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Dedup key for titles: lowercased, whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn raw feed entries into the episode's article list.
///
/// Entries are deduplicated by normalized title (first one wins) before
/// scoring. Entries scoring `<= 0` on keywords and dated entries past the
/// age limit are dropped. The rest are ordered by total score (stable, so
/// ties keep feed order) and picked greedily under the per-source cap.
#[instrument(level = "info", skip_all, fields(entries = entries.len()))]
pub fn select_articles(
    entries: Vec<FeedEntry>,
    scorer: &RelevanceScorer,
    config: &SelectionConfig,
    now: DateTime<Utc>,
) -> Vec<Article> {
    let mut scored: Vec<Article> = entries
        .into_iter()
        .unique_by(|e| normalize_title(&e.title))
        .filter_map(|entry| score_entry(entry, scorer, config, now))
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));

    let selected = take_diverse(scored, config.per_source_cap, config.max_articles);
    info!(selected = selected.len(), "Selected articles");
    selected
}

fn score_entry(
    entry: FeedEntry,
    scorer: &RelevanceScorer,
    config: &SelectionConfig,
    now: DateTime<Utc>,
) -> Option<Article> {
    let keyword_score = scorer.score(&format!("{} {}", entry.title, entry.summary));
    if keyword_score <= 0 {
        debug!(title = %entry.title, score = keyword_score, "Dropped: not relevant");
        return None;
    }

    let (bonus, age_label) = match recency(entry.published, now, config.max_age_hours) {
        Recency::Keep { bonus, label } => (bonus, label),
        Recency::TooOld => {
            debug!(title = %entry.title, "Dropped: too old");
            return None;
        }
    };

    Some(Article {
        score: keyword_score + bonus,
        summary: truncate_chars(&entry.summary, config.summary_chars),
        published: entry.published.unwrap_or(now),
        title: entry.title,
        source: entry.source,
        link: entry.link,
        age_label,
    })
}

/// Walk `articles` in order, keeping at most `per_source` per source and
/// `limit` overall.
fn take_diverse(articles: Vec<Article>, per_source: usize, limit: usize) -> Vec<Article> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(limit);
    for article in articles {
        if out.len() >= limit {
            break;
        }
        let count = counts.entry(article.source.clone()).or_default();
        if *count >= per_source {
            continue;
        }
        *count += 1;
        out.push(article);
    }
    out
}
