//! # Oil Field Insights
//!
//! Builds a daily two-host oil and gas news podcast: pulls industry RSS
//! feeds, picks the most relevant stories, writes a dialogue script, voices
//! it with neural TTS, mixes an ambient bed underneath and publishes an
//! RSS/iTunes feed plus a static landing page.
//!
//! ## Usage
//!
//! ```sh
//! oil_field_insights -o ./docs
//! oil_field_insights -o ./docs --publish-only
//! ```
//!
//! ## Architecture
//!
//! The pipeline is strictly sequential:
//! 1. **Fetching**: download and parse every configured RSS/Atom feed
//! 2. **Selection**: dedupe, score for relevance and recency, cap per source
//! 3. **Market**: optional WTI/Brent snapshot (needs `ALPHA_VANTAGE_API_KEY`)
//! 4. **Script**: template dialogue, or Gemini-written with template fallback
//! 5. **Speech**: one TTS clip per turn, with retries and backoff
//! 6. **Audio**: pauses, background music, normalization, MP3 export
//! 7. **Publishing**: transcript sidecar, `feed.xml`, `index.html`

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod audio;
mod cli;
mod config;
mod error;
mod models;
mod news;
mod outputs;
mod script;
mod speech;
mod utils;

use api::{GeminiClient, RetryAsk};
use audio::codec::Ffmpeg;
use cli::Cli;
use config::PodcastConfig;
use error::PipelineError;
use news::feeds::FeedClient;
use news::market::MarketClient;
use news::scoring::RelevanceScorer;
use news::selection::select_articles;
use outputs::transcript::Transcript;
use outputs::{feed, page, transcript};
use script::{AiScript, ScriptStrategy, TemplateScript};
use speech::edge::EdgeTts;
use speech::{Narrator, RetrySpeech};
use utils::{ensure_writable_dir, format_duration, long_date};

const LLM_MAX_RETRIES: usize = 2;
const LLM_BASE_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("oil_field_insights starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(output_dir = %args.output_dir, config = ?args.config, publish_only = args.publish_only, "Parsed CLI arguments");

    let mut config = PodcastConfig::load(args.config.as_deref()).await?;
    if let Some(base_url) = &args.base_url {
        config.show.base_url = base_url.trim_end_matches('/').to_string();
        info!(base_url = %config.show.base_url, "Base URL overridden");
    }

    let output_dir = PathBuf::from(&args.output_dir);
    let episodes_dir = output_dir.join(&config.show.episodes_path);
    for dir in [&output_dir, &episodes_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    if args.publish_only {
        publish(&output_dir, &config).await?;
        info!(elapsed = ?start_time.elapsed(), "Publish-only run complete");
        return Ok(());
    }

    if let Err(e) = produce_episode(&args, &config, &episodes_dir).await {
        error!(error = %e, "Episode generation failed; nothing published");
        return Err(e.into());
    }
    publish(&output_dir, &config).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Fetch, select, script, narrate and render today's episode.
#[instrument(level = "info", skip_all)]
async fn produce_episode(
    args: &Cli,
    config: &PodcastConfig,
    episodes_dir: &Path,
) -> Result<(), PipelineError> {
    let t0 = std::time::Instant::now();
    let now = Utc::now();
    let today = Local::now().date_naive();

    // ---- Fetch and select ----
    let entries = FeedClient::new(config.feeds.clone(), config.selection.entries_per_feed)
        .fetch_all()
        .await;
    info!(count = entries.len(), "Total feed entries");

    let scorer = RelevanceScorer::new(&config.scoring)?;
    let articles = select_articles(entries, &scorer, &config.selection, now);
    if articles.is_empty() {
        return Err(PipelineError::NoArticles);
    }
    for (i, a) in articles.iter().enumerate() {
        info!(rank = i + 1, score = a.score, source = %a.source, age = %a.age_label, title = %a.title, "Selected article");
    }

    // ---- Market data ----
    let market = match args.alpha_vantage_key() {
        Some(key) => MarketClient::new(&config.market, key.to_string()).snapshot().await,
        None => {
            info!("ALPHA_VANTAGE_API_KEY not set; skipping market update");
            None
        }
    };

    // ---- Script ----
    let template = TemplateScript::new(config.hosts.clone(), &config.show.episode_title, today);
    let strategy: ScriptStrategy<RetryAsk<GeminiClient>> = match args.gemini_key() {
        Some(key) => match GeminiClient::new(&config.llm, key.to_string()) {
            Ok(client) => ScriptStrategy::Ai(AiScript::new(
                RetryAsk::new(client, LLM_MAX_RETRIES, LLM_BASE_DELAY),
                template,
            )),
            Err(e) => {
                warn!(error = %e, "Could not build Gemini client; using template script");
                ScriptStrategy::Template(template)
            }
        },
        None => {
            info!("GEMINI_API_KEY not set; using template script");
            ScriptStrategy::Template(template)
        }
    };
    let mut rng = rand::rng();
    let script = strategy.generate(&articles, market.as_ref(), &mut rng).await;
    info!(strategy = strategy.name(), turns = script.len(), "Script ready");

    // ---- Speech ----
    let engine = RetrySpeech::new(EdgeTts::new(&config.tts), config.tts.retry_policy());
    let narrated = Narrator::new(engine, config).narrate(&script).await?;

    // ---- Audio ----
    let episode_path = episodes_dir.join(format!(
        "{}_{}.mp3",
        config.episode_prefix,
        today.format("%Y%m%d")
    ));
    let ffmpeg = Ffmpeg::new(&args.ffmpeg, config.audio.sample_rate);
    let duration_secs = audio::render_episode(&narrated, &ffmpeg, &config.audio, &episode_path).await?;

    // ---- Transcript ----
    let record = Transcript {
        title: format!("{} - {}", config.show.episode_title, long_date(today)),
        date: today,
        generated_at: now,
        strategy: strategy.name().to_string(),
        duration_secs,
        market,
        articles,
        script,
    };
    if let Err(e) = transcript::write_transcript(&record, &episode_path).await {
        warn!(error = %e, "Failed to write transcript; feed will use a placeholder duration");
    }

    info!(
        episode = %episode_path.display(),
        articles = record.articles.len(),
        turns = record.script.len(),
        synthesized = narrated.len(),
        duration = %format_duration(duration_secs.round() as u64),
        elapsed_secs = t0.elapsed().as_secs(),
        "Episode ready"
    );
    Ok(())
}

/// Regenerate `feed.xml` and `index.html` from the episode directory.
async fn publish(output_dir: &Path, config: &PodcastConfig) -> Result<(), PipelineError> {
    feed::publish_feed(output_dir, &config.show, Utc::now()).await?;
    page::write_index(output_dir, &config.show).await?;
    Ok(())
}
