//! Command-line interface definitions for Oil Field Insights.
//!
//! All credentials and deployment-specific paths can be given as flags or
//! through the environment (a `.env` file is loaded first).

use clap::Parser;

/// Command-line arguments for the podcast generator.
///
/// # Examples
///
/// ```sh
/// # Template script, no market data
/// oil_field_insights -o ./docs
///
/// # AI script and market data, custom show config
/// GEMINI_API_KEY=... ALPHA_VANTAGE_API_KEY=... oil_field_insights -c show.yaml
///
/// # Rebuild feed.xml and index.html only
/// oil_field_insights --publish-only
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for episodes, feed.xml and index.html
    #[arg(short, long, default_value = "docs")]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Google Gemini API key; enables AI-written scripts
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Alpha Vantage API key; enables the market update
    #[arg(long, env = "ALPHA_VANTAGE_API_KEY", hide_env_values = true)]
    pub alpha_vantage_api_key: Option<String>,

    /// Public URL the output directory is served from
    #[arg(long, env = "PODCAST_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to the ffmpeg binary
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// Regenerate the feed and page without producing a new episode
    #[arg(long)]
    pub publish_only: bool,
}

impl Cli {
    /// Treats an empty key (e.g. `GEMINI_API_KEY=` in `.env`) as absent.
    pub fn gemini_key(&self) -> Option<&str> {
        non_empty(self.gemini_api_key.as_deref())
    }

    pub fn alpha_vantage_key(&self) -> Option<&str> {
        non_empty(self.alpha_vantage_api_key.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "oil_field_insights",
            "--output-dir",
            "./public",
            "--config",
            "show.yaml",
            "--gemini-api-key",
            "g-key",
            "--alpha-vantage-api-key",
            "av-key",
            "--base-url",
            "https://cdn.example.com/oil",
            "--ffmpeg",
            "/usr/local/bin/ffmpeg",
            "--publish-only",
        ]);

        assert_eq!(cli.output_dir, "./public");
        assert_eq!(cli.config.as_deref(), Some("show.yaml"));
        assert_eq!(cli.gemini_key(), Some("g-key"));
        assert_eq!(cli.alpha_vantage_key(), Some("av-key"));
        assert_eq!(cli.base_url.as_deref(), Some("https://cdn.example.com/oil"));
        assert_eq!(cli.ffmpeg, "/usr/local/bin/ffmpeg");
        assert!(cli.publish_only);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["oil_field_insights", "-o", "/tmp/out", "-c", "/tmp/c.yaml"]);

        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.yaml"));
        assert!(!cli.publish_only);
    }

    #[test]
    fn test_blank_keys_are_absent() {
        let cli = Cli::parse_from(["oil_field_insights", "--gemini-api-key", "  "]);
        assert_eq!(cli.gemini_key(), None);
        assert_eq!(non_empty(None), None);
    }
}
