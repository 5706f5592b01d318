//! Scripted language model for the collaborator tests

use async_trait::async_trait;
use equisage_llm::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason, TokenUsage,
};
use std::sync::{Arc, Mutex};

/// Provider answering every request with the same text, or failing
pub(crate) struct ScriptedProvider {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
    systems: Mutex<Vec<Option<String>>>,
}

impl ScriptedProvider {
    pub(crate) fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
            systems: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
            systems: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Text of every user message received, in order
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// System prompt of every request, in order
    pub(crate) fn system_prompts(&self) -> Vec<Option<String>> {
        self.systems.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> equisage_llm::Result<CompletionResponse> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.text().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);
        self.systems.lock().unwrap().push(request.system.clone());

        match &self.reply {
            Some(text) => Ok(CompletionResponse {
                message: Message::assistant(text.clone()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            }),
            None => Err(LLMError::RequestFailed("503 Service Unavailable".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}
