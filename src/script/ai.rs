//! LLM-written dialogue scripts.
//!
//! One prompt, one completion. The completion should be a JSON array of
//! `{speaker, text, emotion}` objects; anything else goes through a
//! line-based repair pass, and if fewer than [`MIN_TURNS`] turns survive
//! the template script is used instead. The standard closing from
//! [`TemplateScript::closing`] is always appended.

use super::template::TemplateScript;
use crate::api::AskAsync;
use crate::models::{Article, DialogueTurn, Emotion, MarketSnapshot, Script, Speaker};
use crate::utils::{long_date, looks_truncated, truncate_chars, truncate_for_log};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Fewer parsed turns than this and the completion is discarded.
pub const MIN_TURNS: usize = 6;
const MAX_PROMPT_ARTICLES: usize = 5;
const PROMPT_SUMMARY_CHARS: usize = 300;
/// Heuristic extraction ignores lines this short.
const MIN_LINE_CHARS: usize = 11;

#[derive(Debug, Deserialize)]
struct RawTurn {
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
}

/// Script strategy backed by an [`AskAsync`] client.
#[derive(Debug)]
pub struct AiScript<C> {
    client: C,
    template: TemplateScript,
}

impl<C> AiScript<C>
where
    C: AskAsync,
{
    /// `template` supplies the names, date and closing, and is the fallback.
    pub fn new(client: C, template: TemplateScript) -> Self {
        Self { client, template }
    }

    #[instrument(level = "info", skip_all, fields(articles = articles.len()))]
    pub async fn generate<R>(
        &self,
        articles: &[Article],
        market: Option<&MarketSnapshot>,
        rng: &mut R,
    ) -> Script
    where
        R: Rng + ?Sized,
    {
        if articles.is_empty() {
            return self.template.generate(articles, market, rng);
        }

        let prompt = self.prompt(articles, market);
        debug!(chars = prompt.len(), "Built script prompt");

        let completion = match self.client.ask(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "AI script generation failed; using template");
                return self.template.generate(articles, market, rng);
            }
        };

        let mut script = self.parse_completion(&completion);
        if script.len() < MIN_TURNS {
            warn!(
                turns = script.len(),
                preview = %truncate_for_log(&completion, 200),
                "AI script too short; using template"
            );
            return self.template.generate(articles, market, rng);
        }

        info!(turns = script.len(), "AI script accepted");
        script.extend(self.template.closing());
        script
    }

    fn prompt(&self, articles: &[Article], market: Option<&MarketSnapshot>) -> String {
        let hosts = self.template.hosts();

        let articles_text: String = articles
            .iter()
            .take(MAX_PROMPT_ARTICLES)
            .enumerate()
            .map(|(i, a)| {
                format!(
                    "Article {}:\nTitle: {}\nSummary: {}\nSource: {}\nPublished: {}\n---\n",
                    i + 1,
                    a.title,
                    truncate_chars(&a.summary, PROMPT_SUMMARY_CHARS),
                    a.source,
                    a.age_label
                )
            })
            .collect();

        let market_text = match market {
            Some(m) => format!(
                "Market Data:\n- WTI Crude: ${:.2} ({})\n- Brent Crude: ${:.2} ({})\n\n",
                m.wti_crude, m.change_wti, m.brent_crude, m.change_brent
            ),
            None => String::new(),
        };

        let emotions = Emotion::ALL
            .iter()
            .map(|e| e.label())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You are writing a podcast script for \"{show}\", an engaging conversational podcast about the oil and gas industry.\n\n\
             Write a natural dialogue between two hosts:\n\
             - {h1} (host1): analytical, asks insightful questions, connects dots between stories\n\
             - {h2} (host2): enthusiastic, provides context, explains technical concepts simply\n\n\
             Today's date: {date}\n\n\
             {market_text}\
             News Articles:\n{articles_text}\n\
             Write a 4-5 minute script with:\n\
             1. An engaging opening hook that references the date{market_hint}\n\
             2. Natural back-and-forth discussion of the top 3 stories\n\
             3. Phrases like \"That's fascinating!\", \"Right!\", \"Here's what's interesting...\"\n\
             4. Connections between the stories and bigger industry trends\n\
             5. 8-12 turns per host\n\
             6. A forward-looking insight at the end\n\n\
             Do NOT include a goodbye or sign-off; the closing is added separately.\n\n\
             IMPORTANT: Return ONLY a JSON array in exactly this format, no markdown or extra text:\n\
             [\n  {{\"speaker\": \"host1\", \"text\": \"Opening line here...\", \"emotion\": \"neutral\"}},\n  \
             {{\"speaker\": \"host2\", \"text\": \"Response here...\", \"emotion\": \"excited\"}}\n]\n\n\
             Emotions can be: {emotions}\n",
            show = self.template.show_name(),
            h1 = hosts.host1,
            h2 = hosts.host2,
            date = long_date(self.template.date()),
            market_hint = if market.is_some() { " and the market mood" } else { "" },
        )
    }

    /// Turns from a completion: JSON first, line heuristics second.
    fn parse_completion(&self, completion: &str) -> Script {
        let body = strip_fences(completion);
        match parse_json_turns(body) {
            Ok(raw) => raw
                .into_iter()
                .filter_map(|t| self.normalize(t))
                .collect(),
            Err(e) => {
                warn!(
                    error = %e,
                    truncated = looks_truncated(&e),
                    "AI response is not a JSON script; extracting dialogue lines"
                );
                self.extract_lines(completion)
            }
        }
    }

    fn normalize(&self, raw: RawTurn) -> Option<DialogueTurn> {
        let text = raw.text.unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return None;
        }
        let speaker = self.speaker_from_label(raw.speaker.as_deref().unwrap_or_default());
        let emotion = Emotion::from_label(raw.emotion.as_deref().unwrap_or_default());
        Some(DialogueTurn::new(speaker, text, emotion))
    }

    /// `host2` or the second host's name; anything else is host1.
    fn speaker_from_label(&self, label: &str) -> Speaker {
        let label = label.trim();
        if label.eq_ignore_ascii_case(Speaker::Host2.id())
            || label.eq_ignore_ascii_case(&self.template.hosts().host2)
        {
            Speaker::Host2
        } else {
            Speaker::Host1
        }
    }

    /// Best-effort recovery from prose output. Prefixed lines set the
    /// speaker; speakers alternate after every accepted line.
    fn extract_lines(&self, completion: &str) -> Script {
        let hosts = self.template.hosts();
        let host1_prefixes = [format!("{}:", hosts.host1), "host1:".to_string()];
        let host2_prefixes = [format!("{}:", hosts.host2), "host2:".to_string()];

        let mut script = Vec::new();
        let mut current = Speaker::Host1;

        for line in completion.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('{') || line.starts_with('[') || line.starts_with("```") {
                continue;
            }

            let text = if host1_prefixes.iter().any(|p| line.contains(p.as_str())) {
                current = Speaker::Host1;
                after_colon(line)
            } else if host2_prefixes.iter().any(|p| line.contains(p.as_str())) {
                current = Speaker::Host2;
                after_colon(line)
            } else {
                line
            };

            if text.chars().count() >= MIN_LINE_CHARS {
                script.push(DialogueTurn::new(current, text, Emotion::Neutral));
                current = current.other();
            }
        }
        script
    }
}

fn after_colon(line: &str) -> &str {
    line.split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(line)
        .trim()
        .trim_start_matches('*')
        .trim()
}

/// Drop a surrounding markdown code fence, if any.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim()
        .strip_suffix("```")
        .unwrap_or(without_open.trim())
        .trim()
}

/// Parse the body as a JSON array, retrying on the outermost `[...]` span.
fn parse_json_turns(body: &str) -> Result<Vec<RawTurn>, serde_json::Error> {
    match serde_json::from_str(body) {
        Ok(turns) => Ok(turns),
        Err(e) => match (body.find('['), body.rfind(']')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end]),
            _ => Err(e),
        },
    }
}
