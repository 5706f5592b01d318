//! Report and follow-up answer synthesis

use crate::config::StockConfig;
use crate::error::Result;
use crate::prompts::{
    ANALYST_PERSONA, DISCLAIMER, FollowUpAnswerContext, PromptLibrary, ReportContext, names,
};
use async_trait::async_trait;
use equisage_core::{ConversationState, Error, ReportSynthesizer, SessionPayload};
use equisage_llm::{CompletionRequest, LLMProvider, Message};
use std::sync::Arc;
use tracing::{info, warn};

const FOLLOW_UP_MAX_TOKENS: usize = 1024;

/// Writes reports and follow-up answers with a language model
pub struct LlmReportSynthesizer {
    provider: Arc<dyn LLMProvider>,
    prompts: Arc<PromptLibrary>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl LlmReportSynthesizer {
    /// Create a synthesizer with the configured sampling settings
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        prompts: Arc<PromptLibrary>,
        config: &StockConfig,
    ) -> Self {
        let model = config
            .llm_model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        Self {
            provider,
            prompts,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    async fn complete(&self, prompt: String, max_tokens: usize) -> Result<String> {
        let request = CompletionRequest::builder(self.model.clone())
            .system(ANALYST_PERSONA)
            .add_message(Message::user(prompt))
            .temperature(self.temperature)
            .max_tokens(max_tokens)
            .build();
        let response = self.provider.complete(request).await?;
        info!(
            model = %self.model,
            tokens = response.usage.total(),
            stop = ?response.stop_reason,
            "Completion received"
        );
        Ok(response.text().trim().to_string())
    }
}

fn empty_reply(what: &str) -> Error {
    Error::Synthesis(format!("model returned an empty {what}"))
}

/// Append the disclaimer when the model left it out
pub fn ensure_disclaimer(report: String) -> String {
    if report.contains(DISCLAIMER) {
        report
    } else {
        warn!("Report is missing the disclaimer, appending it");
        format!("{report}\n\n{DISCLAIMER}")
    }
}

#[async_trait]
impl ReportSynthesizer for LlmReportSynthesizer {
    async fn synthesize_report(&self, state: &ConversationState) -> equisage_core::Result<String> {
        let context = ReportContext::from_state(state);
        let prompt = self
            .prompts
            .render(names::REPORT, &context)
            .map_err(Error::from)?;

        let report = self
            .complete(prompt, self.max_tokens)
            .await
            .map_err(Error::from)?;
        if report.is_empty() {
            return Err(empty_reply("report"));
        }
        Ok(ensure_disclaimer(report))
    }

    async fn answer_follow_up(
        &self,
        message: &str,
        session: &SessionPayload,
    ) -> equisage_core::Result<String> {
        let prompt = self
            .prompts
            .render(names::FOLLOW_UP_ANSWER, FollowUpAnswerContext::new(message, session))
            .map_err(Error::from)?;

        let answer = self
            .complete(prompt, FOLLOW_UP_MAX_TOKENS)
            .await
            .map_err(Error::from)?;
        if answer.is_empty() {
            return Err(empty_reply("answer"));
        }
        Ok(answer)
    }
}
