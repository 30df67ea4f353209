//! Dialogue script generation.
//!
//! [`ScriptStrategy`] picks between the fixed-phrase [`TemplateScript`] and
//! the LLM-backed [`AiScript`]. Both end with the same closing turns and
//! never return an empty script.

pub mod ai;
pub mod template;

pub use ai::AiScript;
pub use template::TemplateScript;

use crate::api::AskAsync;
use crate::models::{Article, MarketSnapshot, Script};
use rand::Rng;

/// How the episode's script gets written.
#[derive(Debug)]
pub enum ScriptStrategy<C> {
    Template(TemplateScript),
    Ai(AiScript<C>),
}

impl<C> ScriptStrategy<C>
where
    C: AskAsync,
{
    pub fn name(&self) -> &'static str {
        match self {
            ScriptStrategy::Template(_) => "template",
            ScriptStrategy::Ai(_) => "ai",
        }
    }

    pub async fn generate<R>(
        &self,
        articles: &[Article],
        market: Option<&MarketSnapshot>,
        rng: &mut R,
    ) -> Script
    where
        R: Rng + ?Sized,
    {
        match self {
            ScriptStrategy::Template(t) => t.generate(articles, market, rng),
            ScriptStrategy::Ai(ai) => ai.generate(articles, market, rng).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostNames;
    use crate::error::LlmError;
    use crate::models::Speaker;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Unreachable;

    impl AskAsync for Unreachable {
        async fn ask(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyCompletion)
        }
    }

    fn template() -> TemplateScript {
        TemplateScript::new(
            HostNames::default(),
            "Oil Field Insights",
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_both_strategies_end_with_closing() {
        let strategies: Vec<ScriptStrategy<Unreachable>> = vec![
            ScriptStrategy::Template(template()),
            ScriptStrategy::Ai(AiScript::new(Unreachable, template())),
        ];
        for strategy in strategies {
            let script = strategy
                .generate(&[], None, &mut StdRng::seed_from_u64(5))
                .await;
            assert!(!script.is_empty(), "{} produced nothing", strategy.name());
            let tail: Vec<Speaker> = script.iter().rev().take(3).map(|t| t.speaker).collect();
            assert_eq!(tail, vec![Speaker::Host1, Speaker::Host2, Speaker::Host1]);
            assert!(script.iter().all(|t| !t.text.is_empty()));
        }
    }
}
