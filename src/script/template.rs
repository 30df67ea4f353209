//! Template-based dialogue script.
//!
//! Layout: opening (2 turns), market check (2 turns, only with a snapshot),
//! three turns per article (introduction, summary, reaction), closing
//! (3 turns). Phrase variety comes from the caller's [`Rng`].

use crate::config::HostNames;
use crate::models::{Article, DialogueTurn, Emotion, MarketSnapshot, Script, Speaker};
use crate::utils::{long_date, truncate_chars};
use chrono::NaiveDate;
use rand::Rng;
use rand::seq::IndexedRandom;

const SUMMARY_CHARS: usize = 200;

const LEAD_INTROS: &[&str] = &[
    "Let's start with our top story:",
    "Leading things off today:",
    "First up, the story everyone's talking about:",
];

const TRANSITIONS: &[&str] = &[
    "Now, here's another important development:",
    "Moving on to our next story:",
    "Next up:",
    "Here's one that caught my eye:",
    "Shifting gears a bit:",
];

const REACTION_OPENERS: &[&str] = &["That's really interesting!", "Fascinating.", "Huh, okay."];

const DRILLING_REACTIONS: &[&str] = &[
    "This could really reshape drilling operations going forward.",
    "Crews in the field are going to feel this one.",
    "That's a big deal for rig activity this quarter.",
];

const PRICE_REACTIONS: &[&str] = &[
    "The market implications here are significant.",
    "Traders are going to be watching that number closely.",
    "That kind of move ripples through every budget in the sector.",
];

const GENERAL_REACTIONS: &[&str] = &[
    "This is definitely something the industry is watching closely.",
    "I suspect we'll be hearing a lot more about this.",
    "It'll be interesting to see how the rest of the sector responds.",
];

/// What an article is mostly about, for picking a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Drilling,
    Price,
    General,
}

impl Topic {
    fn of(title: &str) -> Topic {
        let title = title.to_lowercase();
        if title.contains("drilling") {
            Topic::Drilling
        } else if title.contains("price") {
            Topic::Price
        } else {
            Topic::General
        }
    }

    fn reactions(self) -> &'static [&'static str] {
        match self {
            Topic::Drilling => DRILLING_REACTIONS,
            Topic::Price => PRICE_REACTIONS,
            Topic::General => GENERAL_REACTIONS,
        }
    }

    fn emotion(self) -> Emotion {
        match self {
            Topic::Drilling => Emotion::Thoughtful,
            Topic::Price => Emotion::Concerned,
            Topic::General => Emotion::Thoughtful,
        }
    }
}

/// Builds scripts from fixed phrases.
#[derive(Debug, Clone)]
pub struct TemplateScript {
    hosts: HostNames,
    show_name: String,
    date: NaiveDate,
}

impl TemplateScript {
    pub fn new(hosts: HostNames, show_name: &str, date: NaiveDate) -> Self {
        Self {
            hosts,
            show_name: show_name.to_string(),
            date,
        }
    }

    pub fn hosts(&self) -> &HostNames {
        &self.hosts
    }

    pub fn show_name(&self) -> &str {
        &self.show_name
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn generate<R>(
        &self,
        articles: &[Article],
        market: Option<&MarketSnapshot>,
        rng: &mut R,
    ) -> Script
    where
        R: Rng + ?Sized,
    {
        let mut script = self.opening(articles.len());
        if let Some(market) = market {
            script.extend(self.market_segment(market));
        }
        for (i, article) in articles.iter().enumerate() {
            script.extend(self.discuss(i, article, rng));
        }
        script.extend(self.closing());
        script
    }

    fn opening(&self, story_count: usize) -> Vec<DialogueTurn> {
        let stories = match story_count {
            1 => "one major story".to_string(),
            n => format!("{n} major stories"),
        };
        vec![
            DialogueTurn::new(
                Speaker::Host1,
                format!(
                    "Good morning everyone, and welcome to {}! I'm {}, here with my co-host {}. \
                     Today is {}, and we've got some fascinating developments in the oil and gas sector to discuss.",
                    self.show_name,
                    self.hosts.host1,
                    self.hosts.host2,
                    long_date(self.date)
                ),
                Emotion::Neutral,
            ),
            DialogueTurn::new(
                Speaker::Host2,
                format!(
                    "That's right, {}! The industry never sleeps, and today we've got {} that caught our attention. \
                     From drilling innovations to market movements, let's dive right in!",
                    self.hosts.host1, stories
                ),
                Emotion::Excited,
            ),
        ]
    }

    fn market_segment(&self, market: &MarketSnapshot) -> Vec<DialogueTurn> {
        vec![
            DialogueTurn::new(
                Speaker::Host1,
                format!(
                    "But first, let's check the markets. WTI Crude is trading at ${:.2}, {} for the day.",
                    market.wti_crude,
                    describe_change(&market.change_wti)
                ),
                Emotion::Neutral,
            ),
            DialogueTurn::new(
                Speaker::Host2,
                format!(
                    "And Brent Crude is at ${:.2}, {}. Interesting dynamics in the market today.",
                    market.brent_crude,
                    describe_change(&market.change_brent)
                ),
                Emotion::Thoughtful,
            ),
        ]
    }

    fn discuss<R>(&self, index: usize, article: &Article, rng: &mut R) -> Vec<DialogueTurn>
    where
        R: Rng + ?Sized,
    {
        let intros = if index == 0 { LEAD_INTROS } else { TRANSITIONS };
        let intro = pick(intros, rng);

        let summary = truncate_chars(article.summary.trim(), SUMMARY_CHARS);
        let summary_line = if summary.is_empty() {
            format!("The details are still coming in. This comes from {}.", article.source)
        } else {
            format!("{}... This comes from {}.", summary.trim_end_matches('.'), article.source)
        };

        let topic = Topic::of(&article.title);
        let reaction = format!(
            "{} {}",
            pick(REACTION_OPENERS, rng),
            pick(topic.reactions(), rng)
        );

        vec![
            DialogueTurn::new(
                Speaker::Host1,
                format!("{} {}.", intro, article.title.trim_end_matches('.')),
                Emotion::Neutral,
            ),
            DialogueTurn::new(Speaker::Host2, summary_line, Emotion::Neutral),
            DialogueTurn::new(Speaker::Host1, reaction, topic.emotion()),
        ]
    }

    /// The standard sign-off every script ends with.
    pub fn closing(&self) -> Vec<DialogueTurn> {
        vec![
            DialogueTurn::new(
                Speaker::Host1,
                format!(
                    "And that wraps up today's {}. Thanks for joining us!",
                    self.show_name
                ),
                Emotion::Neutral,
            ),
            DialogueTurn::new(
                Speaker::Host2,
                format!(
                    "Remember to subscribe for daily updates on the oil and gas industry. I'm {}...",
                    self.hosts.host2
                ),
                Emotion::Neutral,
            ),
            DialogueTurn::new(
                Speaker::Host1,
                format!(
                    "And I'm {}. Have a great day, and we'll see you tomorrow!",
                    self.hosts.host1
                ),
                Emotion::Optimistic,
            ),
        ]
    }
}

fn pick<R>(phrases: &'static [&'static str], rng: &mut R) -> &'static str
where
    R: Rng + ?Sized,
{
    phrases.choose(rng).copied().unwrap_or_default()
}

/// `+1.2%` → `up 1.2%`, `-0.4%` → `down 0.4%`, zero → `flat`.
fn describe_change(change: &str) -> String {
    let change = change.trim();
    let magnitude = change.trim_start_matches(['+', '-']);
    let is_zero = magnitude
        .trim_end_matches('%')
        .parse::<f64>()
        .map(|v| v == 0.0)
        .unwrap_or(false);
    if is_zero {
        "flat".to_string()
    } else if change.starts_with('-') {
        format!("down {magnitude}")
    } else if change.starts_with('+') {
        format!("up {magnitude}")
    } else {
        change.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn article(title: &str, source: &str) -> Article {
        Article {
            title: title.to_string(),
            summary: "Operators reported higher output across the basin.".to_string(),
            source: source.to_string(),
            link: "https://example.com/a".to_string(),
            score: 12,
            published: Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).unwrap(),
            age_label: "2 hours ago".to_string(),
        }
    }

    fn template() -> TemplateScript {
        TemplateScript::new(
            HostNames::default(),
            "Oil Field Insights",
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        )
    }

    fn market() -> MarketSnapshot {
        MarketSnapshot {
            wti_crude: 75.5,
            brent_crude: 79.3,
            change_wti: "+0.5%".to_string(),
            change_brent: "-0.8%".to_string(),
        }
    }

    #[test]
    fn test_layout_with_market() {
        let articles = vec![
            article("New drilling record set", "Rigzone"),
            article("Crude price slides", "World Oil"),
            article("Refinery restarts", "Reuters"),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let script = template().generate(&articles, Some(&market()), &mut rng);

        // 2 opening + 2 market + 3 per article + 3 closing
        assert_eq!(script.len(), 2 + 2 + 9 + 3);
        assert!(script[0].text.contains("October 17, 2026"));
        assert!(script[0].text.contains("I'm Alex, here with my co-host Sam"));
        assert!(script[1].text.contains("3 major stories"));
        assert!(script[2].text.contains("$75.50, up 0.5%"));
        assert!(script[3].text.contains("$79.30, down 0.8%"));
        assert!(script[4].text.ends_with("New drilling record set."));
        assert!(script[5].text.contains("This comes from Rigzone."));
        assert_eq!(script[6].emotion, Emotion::Thoughtful);
        // Price story reacts with concern.
        assert_eq!(script[9].emotion, Emotion::Concerned);

        let last = script.last().unwrap();
        assert_eq!(last.speaker, Speaker::Host1);
        assert!(last.text.starts_with("And I'm Alex."));
        assert!(script.iter().all(|t| !t.text.trim().is_empty()));
    }

    #[test]
    fn test_market_turns_omitted_without_snapshot() {
        let articles = vec![article("Pipeline approved", "Rigzone")];
        let mut rng = StdRng::seed_from_u64(1);
        let script = template().generate(&articles, None, &mut rng);
        assert_eq!(script.len(), 2 + 3 + 3);
        assert!(script[1].text.contains("one major story"));
        assert!(!script.iter().any(|t| t.text.contains("WTI Crude")));
    }

    #[test]
    fn test_same_seed_same_script() {
        let articles = vec![
            article("Pipeline approved", "Rigzone"),
            article("Offshore lease sale", "World Oil"),
        ];
        let a = template().generate(&articles, None, &mut StdRng::seed_from_u64(42));
        let b = template().generate(&articles, None, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_summary_still_speaks() {
        let mut a = article("Pipeline approved", "Rigzone");
        a.summary = "   ".to_string();
        let script = template().generate(&[a], None, &mut StdRng::seed_from_u64(3));
        assert_eq!(
            script[3].text,
            "The details are still coming in. This comes from Rigzone."
        );
    }

    #[test]
    fn test_describe_change() {
        assert_eq!(describe_change("+1.2%"), "up 1.2%");
        assert_eq!(describe_change("-0.4%"), "down 0.4%");
        assert_eq!(describe_change("+0.0%"), "flat");
        assert_eq!(describe_change("n/a"), "n/a");
    }

    #[test]
    fn test_topic_detection() {
        assert_eq!(Topic::of("Horizontal DRILLING gains"), Topic::Drilling);
        assert_eq!(Topic::of("Oil prices climb"), Topic::Price);
        assert_eq!(Topic::of("Merger announced"), Topic::General);
    }
}
