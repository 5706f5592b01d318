//! Language-model intent classifier with rule fallback

use super::rules::RuleBasedClassifier;
use crate::error::{Result, StockError};
use crate::prompts::{IntentContext, PromptLibrary, names};
use async_trait::async_trait;
use equisage_core::{Classification, DialogueMessage, Intent, IntentClassifier};
use equisage_llm::{CompletionRequest, LLMProvider, Message};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Earlier messages shown to the model
const HISTORY_WINDOW: usize = 4;

#[derive(Debug, Deserialize)]
struct IntentReply {
    intent: String,
    #[serde(default)]
    stock_ticker: Option<String>,
}

/// Rules first, the model only when they are inconclusive
///
/// Rules are conclusive when they name a greeting, a help request or a
/// known company. Anything else (nothing matched, or an analysis keyword
/// without a known company) goes to the model. A model failure or an
/// unparsable answer falls back to the rule result.
pub struct LlmIntentClassifier {
    provider: Arc<dyn LLMProvider>,
    prompts: Arc<PromptLibrary>,
    rules: RuleBasedClassifier,
    json_block: Regex,
    model: String,
}

impl LlmIntentClassifier {
    /// Create a classifier using the provider's default model
    pub fn new(provider: Arc<dyn LLMProvider>, prompts: Arc<PromptLibrary>) -> Result<Self> {
        let model = provider.default_model().to_string();
        Ok(Self {
            provider,
            prompts,
            rules: RuleBasedClassifier::new()?,
            json_block: Regex::new(r"(?s)\{.*\}").map_err(|e| StockError::Other(e.to_string()))?,
            model,
        })
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn ask_model(&self, message: &str, prior: &[DialogueMessage]) -> Result<Classification> {
        let history = &prior[prior.len().saturating_sub(HISTORY_WINDOW)..];
        let prompt = self.prompts.render(names::INTENT, IntentContext { message, history })?;

        let request = CompletionRequest::builder(self.model.clone())
            .add_message(Message::user(prompt))
            .temperature(0.0)
            .max_tokens(200)
            .build();
        let response = self.provider.complete(request).await?;
        debug!(reply = response.text(), "Intent model answered");
        self.parse_reply(response.text())
    }

    /// Parse the first JSON object in a model reply
    pub fn parse_reply(&self, text: &str) -> Result<Classification> {
        let block = self
            .json_block
            .find(text)
            .ok_or_else(|| StockError::Other("no JSON object in intent reply".to_string()))?;
        let reply: IntentReply = serde_json::from_str(block.as_str())?;

        let intent = Intent::from_label(&reply.intent).unwrap_or(Intent::OffTopic);
        let ticker = reply.stock_ticker.as_deref().and_then(normalize_ticker);
        Ok(match intent {
            Intent::StockAnalysis => Classification::new(intent, ticker),
            Intent::FollowUp => Classification::off_topic(),
            other => Classification::new(other, None),
        })
    }
}

/// Uppercased NSE ticker; bare symbols get the `.NS` suffix
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() || ticker == "NULL" || ticker == "NONE" {
        return None;
    }
    if !ticker.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '&' | '-')) {
        return None;
    }
    Some(if ticker.contains('.') { ticker } else { format!("{ticker}.NS") })
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        message: &str,
        prior: &[DialogueMessage],
    ) -> equisage_core::Result<Classification> {
        let by_rules = self.rules.match_rules(message);
        if let Some(classification) = &by_rules {
            let conclusive =
                classification.intent != Intent::StockAnalysis || classification.ticker.is_some();
            if conclusive {
                debug!(?classification, "Classified by rules");
                return Ok(classification.clone());
            }
        }

        match self.ask_model(message, prior).await {
            Ok(classification) => {
                info!(
                    intent = ?classification.intent,
                    ticker = ?classification.ticker,
                    "Classified by model"
                );
                Ok(classification)
            }
            Err(err) => {
                warn!("Model intent classification failed, using rules: {}", err);
                Ok(by_rules.unwrap_or_else(Classification::off_topic))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn classifier(provider: Arc<ScriptedProvider>) -> LlmIntentClassifier {
        LlmIntentClassifier::new(provider, Arc::new(PromptLibrary::new().unwrap())).unwrap()
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" vedl "), Some("VEDL.NS".to_string()));
        assert_eq!(normalize_ticker("tcs.ns"), Some("TCS.NS".to_string()));
        assert_eq!(normalize_ticker("null"), None);
        assert_eq!(normalize_ticker("not a ticker"), None);
    }

    #[test]
    fn test_parse_reply_with_prose() {
        let classifier = classifier(ScriptedProvider::replying("unused"));
        let reply =
            "Sure! ```json\n{\"intent\": \"stock_analysis\", \"stock_ticker\": \"VEDL.NS\"}\n```";
        let classification = classifier.parse_reply(reply).unwrap();
        assert_eq!(classification.intent, Intent::StockAnalysis);
        assert_eq!(classification.ticker.as_deref(), Some("VEDL.NS"));

        let classification = classifier
            .parse_reply(r#"{"intent": "greeting", "stock_ticker": "TCS.NS"}"#)
            .unwrap();
        assert_eq!(classification, Classification::new(Intent::Greeting, None));

        assert!(classifier.parse_reply("I think it is a greeting").is_err());
    }

    #[tokio::test]
    async fn test_rules_short_circuit_model() {
        let provider = ScriptedProvider::replying(r#"{"intent": "off_topic"}"#);
        let classifier = classifier(provider.clone());

        let classification = classifier.classify("analyze infosys", &[]).await.unwrap();
        assert_eq!(classification.ticker.as_deref(), Some("INFY.NS"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_resolves_unknown_company() {
        let provider = ScriptedProvider::replying(
            r#"{"intent": "stock_analysis", "stock_ticker": "VEDL.NS"}"#,
        );
        let classifier = classifier(provider.clone());

        let classification = classifier.classify("analyze vedanta", &[]).await.unwrap();
        assert_eq!(
            classification,
            Classification::new(Intent::StockAnalysis, Some("VEDL.NS".to_string()))
        );
        assert_eq!(provider.calls(), 1);
        assert!(provider.prompts()[0].contains("analyze vedanta"));
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_rules() {
        let classifier = classifier(ScriptedProvider::failing());

        let classification = classifier.classify("analyze vedanta", &[]).await.unwrap();
        assert_eq!(classification, Classification::new(Intent::StockAnalysis, None));

        let classification = classifier.classify("recommend a movie", &[]).await.unwrap();
        assert_eq!(classification, Classification::off_topic());
    }

    #[tokio::test]
    async fn test_garbled_reply_falls_back() {
        let classifier = classifier(ScriptedProvider::replying("{intent: greeting"));
        let classification = classifier.classify("yo what's up", &[]).await.unwrap();
        assert_eq!(classification, Classification::off_topic());
    }
}
