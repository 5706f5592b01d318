//! Follow-up judgment against the previous analysis

use super::rules::RuleBasedClassifier;
use crate::error::{Result, StockError};
use crate::prompts::{FollowUpJudgeContext, PromptLibrary, names};
use async_trait::async_trait;
use equisage_core::{FollowUpClassifier, FollowUpJudgment};
use equisage_llm::{CompletionRequest, LLMProvider, Message};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Words that refer back to the previous subject or ask about its data
pub const FOLLOW_UP_INDICATORS: &[&str] = &[
    "it",
    "its",
    "this",
    "that",
    "they",
    "their",
    "the stock",
    "the company",
    "same",
    "also",
    "continue",
    "more",
    "why",
    "explain",
    "what about",
    "how about",
    "margin",
    "profit",
    "revenue",
    "debt",
    "dividend",
    "valuation",
    "rsi",
    "macd",
    "buy",
    "sell",
    "hold",
];

/// Parse a one-word judgment
pub fn parse_judgment(text: &str) -> Option<FollowUpJudgment> {
    let word = text
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .find(|w| !w.is_empty())?
        .to_uppercase()
        .replace(['_', '-'], "");
    match word.as_str() {
        "FOLLOWUP" => Some(FollowUpJudgment::Continuation),
        "NEW" => Some(FollowUpJudgment::NewSubject),
        "OTHER" => Some(FollowUpJudgment::Unrelated),
        _ => None,
    }
}

/// Keyword judgment used when the model cannot answer
pub struct FollowUpHeuristic {
    rules: RuleBasedClassifier,
    indicators: Regex,
}

impl FollowUpHeuristic {
    /// Compile the indicator list
    pub fn new() -> Result<Self> {
        let alternation = FOLLOW_UP_INDICATORS
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            rules: RuleBasedClassifier::new()?,
            indicators: Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
                .map_err(|e| StockError::Other(e.to_string()))?,
        })
    }

    /// Judge `message` against `prior_topic`
    ///
    /// A named company decides on its own: the same company continues, any
    /// other company is a new subject. Otherwise pronouns and data words
    /// mark a continuation.
    pub fn judge(&self, message: &str, prior_topic: &str) -> FollowUpJudgment {
        if let Some(company) = self.rules.find_company(message) {
            let topic = prior_topic.to_lowercase();
            let same = topic.contains(company.name)
                || self.rules.find_company(prior_topic) == Some(company);
            return if same {
                FollowUpJudgment::Continuation
            } else {
                FollowUpJudgment::NewSubject
            };
        }
        if self.indicators.is_match(message) {
            FollowUpJudgment::Continuation
        } else {
            FollowUpJudgment::Unrelated
        }
    }
}

/// Model judgment with the keyword heuristic as fallback
pub struct LlmFollowUpClassifier {
    provider: Arc<dyn LLMProvider>,
    prompts: Arc<PromptLibrary>,
    heuristic: FollowUpHeuristic,
    model: String,
}

impl LlmFollowUpClassifier {
    /// Create a classifier using the provider's default model
    pub fn new(provider: Arc<dyn LLMProvider>, prompts: Arc<PromptLibrary>) -> Result<Self> {
        let model = provider.default_model().to_string();
        Ok(Self {
            provider,
            prompts,
            heuristic: FollowUpHeuristic::new()?,
            model,
        })
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn ask_model(&self, message: &str, topic: &str) -> Result<Option<FollowUpJudgment>> {
        let prompt = self
            .prompts
            .render(names::FOLLOW_UP_JUDGE, FollowUpJudgeContext { topic, message })?;
        let request = CompletionRequest::builder(self.model.clone())
            .add_message(Message::user(prompt))
            .temperature(0.0)
            .max_tokens(10)
            .build();
        let response = self.provider.complete(request).await?;
        Ok(parse_judgment(response.text()))
    }
}

#[async_trait]
impl FollowUpClassifier for LlmFollowUpClassifier {
    async fn judge(
        &self,
        message: &str,
        prior_topic: &str,
    ) -> equisage_core::Result<FollowUpJudgment> {
        match self.ask_model(message, prior_topic).await {
            Ok(Some(judgment)) => {
                debug!(?judgment, topic = prior_topic, "Follow-up judged by model");
                return Ok(judgment);
            }
            Ok(None) => warn!("Follow-up model reply not understood, using keywords"),
            Err(err) => warn!("Follow-up model failed, using keywords: {}", err),
        }
        Ok(self.heuristic.judge(message, prior_topic))
    }
}
