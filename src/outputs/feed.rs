//! Podcast RSS feed (RSS 2.0 + iTunes) built from the episode directory.
//!
//! The feed is regenerated from scratch on every run: one `<item>` per MP3
//! file, newest first, at most [`MAX_EPISODES`]. Everything except
//! `lastBuildDate` and the copyright year is a pure function of the
//! directory contents.

use super::transcript;
use crate::config::ShowInfo;
use crate::error::PipelineError;
use crate::utils::{format_duration, long_date};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rss::extension::itunes::{
    ITunesCategoryBuilder, ITunesChannelExtensionBuilder, ITunesItemExtensionBuilder,
    ITunesOwnerBuilder,
};
use rss::{Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const MAX_EPISODES: usize = 50;
/// Used when an episode has no transcript sidecar.
pub const PLACEHOLDER_DURATION: &str = "10:00";
const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// An audio file found in the episode directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub file_name: String,
    pub date: NaiveDate,
    pub size: u64,
    /// `M:SS` or `H:MM:SS`.
    pub duration: String,
}

impl Episode {
    /// First 16 bytes of SHA-256 over the file name, hex encoded.
    pub fn guid(&self) -> String {
        let digest = Sha256::digest(self.file_name.as_bytes());
        hex::encode(&digest[..16])
    }

    pub fn pub_date(&self) -> String {
        self.date.and_time(NaiveTime::MIN).and_utc().to_rfc2822()
    }
}

/// Date from names like `oil_news_20261017.mp3`.
pub fn episode_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_suffix(".mp3")?;
    let digits = stem.rsplit('_').next()?;
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// List episodes in `dir`, newest first, capped at [`MAX_EPISODES`].
///
/// A missing directory yields no episodes. Files whose name carries no
/// parseable date are dated `today`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn scan_episodes(dir: &Path, today: NaiveDate) -> Result<Vec<Episode>, PipelineError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Episode directory does not exist yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut episodes = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.ends_with(".mp3") {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let duration = transcript::read_duration(&entry.path())
            .await
            .map(|secs| format_duration(secs.round() as u64))
            .unwrap_or_else(|| PLACEHOLDER_DURATION.to_string());

        episodes.push(Episode {
            date: episode_date(&file_name).unwrap_or(today),
            size: metadata.len(),
            duration,
            file_name,
        });
    }

    episodes.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
    episodes.truncate(MAX_EPISODES);
    info!(count = episodes.len(), "Scanned episodes");
    Ok(episodes)
}

/// Build the channel document for `episodes`.
pub fn build_channel(show: &ShowInfo, episodes: &[Episode], now: DateTime<Utc>) -> Channel {
    let owner = ITunesOwnerBuilder::default()
        .name(Some(show.author.clone()))
        .email(Some(show.email.clone()))
        .build();
    let category = ITunesCategoryBuilder::default()
        .text(show.category.clone())
        .build();
    let itunes = ITunesChannelExtensionBuilder::default()
        .author(Some(show.author.clone()))
        .summary(Some(show.description.clone()))
        .explicit(Some("no".to_string()))
        .image(Some(show.image_url()))
        .owner(Some(owner))
        .categories(vec![category])
        .build();

    let items: Vec<Item> = episodes.iter().map(|e| build_item(show, e)).collect();

    let mut channel = ChannelBuilder::default()
        .title(show.title.clone())
        .link(show.base_url.clone())
        .description(show.description.clone())
        .language(Some(show.language.clone()))
        .copyright(Some(format!("© {}", now.year())))
        .last_build_date(Some(now.to_rfc2822()))
        .itunes_ext(Some(itunes))
        .items(items)
        .build();
    channel
        .namespaces
        .insert("content".to_string(), CONTENT_NAMESPACE.to_string());
    channel
}

fn build_item(show: &ShowInfo, episode: &Episode) -> Item {
    let date = long_date(episode.date);
    let url = format!(
        "{}/{}/{}",
        show.base_url.trim_end_matches('/'),
        show.episodes_path.trim_matches('/'),
        episode.file_name
    );

    let guid = GuidBuilder::default()
        .value(episode.guid())
        .permalink(false)
        .build();
    let enclosure = EnclosureBuilder::default()
        .url(url.clone())
        .length(episode.size.to_string())
        .mime_type("audio/mpeg".to_string())
        .build();
    let itunes = ITunesItemExtensionBuilder::default()
        .duration(Some(episode.duration.clone()))
        .explicit(Some("no".to_string()))
        .build();

    ItemBuilder::default()
        .title(Some(format!("{} - {}", show.episode_title, date)))
        .description(Some(format!("Daily oil and gas industry news for {date}")))
        .link(Some(url))
        .guid(Some(guid))
        .pub_date(Some(episode.pub_date()))
        .enclosure(Some(enclosure))
        .itunes_ext(Some(itunes))
        .build()
}

/// Regenerate `<output_dir>/feed.xml` from `<output_dir>/<episodes_path>`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn publish_feed(
    output_dir: &Path,
    show: &ShowInfo,
    now: DateTime<Utc>,
) -> Result<PathBuf, PipelineError> {
    let episodes_dir = output_dir.join(&show.episodes_path);
    let episodes = scan_episodes(&episodes_dir, now.date_naive()).await?;
    let channel = build_channel(show, &episodes, now);

    let xml = channel.write_to(Vec::new())?;
    let path = output_dir.join("feed.xml");
    fs::create_dir_all(output_dir).await?;
    fs::write(&path, xml).await?;
    info!(path = %path.display(), episodes = episodes.len(), "Wrote RSS feed");
    Ok(path)
}
