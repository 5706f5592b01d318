//! Wiring of the concrete collaborators into an orchestrator

use crate::api::{GoogleNewsClient, ScreenerClient, YahooFinanceClient};
use crate::classifier::{LlmFollowUpClassifier, LlmIntentClassifier};
use crate::collectors::{GoogleCompanyNews, GoogleMarketNews, ScreenerFundamentals, YahooTechnicals};
use crate::config::StockConfig;
use crate::delivery::ConversationLocks;
use crate::document::MarkdownRenderer;
use crate::error::Result;
use crate::platforms::TelegramBot;
use crate::prompts::PromptLibrary;
use crate::session::SqliteSessionStore;
use crate::synthesizer::LlmReportSynthesizer;
use equisage_core::{ConversationId, InMemorySessionStore, SessionStore, TurnResponse};
use equisage_llm::LLMProvider;
use equisage_llm::providers::OpenAIProvider;
use equisage_workflow::{CannedReplies, Orchestrator};
use std::sync::Arc;
use tracing::info;

/// A ready-to-use EquiSage orchestrator and its configuration
///
/// Every entry point (one-shot questions, the shell, Telegram) shares one
/// lock table, so turns of the same conversation never overlap.
pub struct StockService {
    orchestrator: Arc<Orchestrator>,
    locks: ConversationLocks,
    config: StockConfig,
}

impl StockService {
    /// Build every collaborator from `config`, using its language model settings
    pub async fn from_config(config: StockConfig) -> Result<Self> {
        let provider = OpenAIProvider::with_config(config.openai_config()?)?;
        Self::with_provider(config, Arc::new(provider)).await
    }

    /// Build every collaborator around an existing provider
    pub async fn with_provider(
        config: StockConfig,
        provider: Arc<dyn LLMProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let prompts = Arc::new(PromptLibrary::new()?);

        let mut intent = LlmIntentClassifier::new(Arc::clone(&provider), Arc::clone(&prompts))?;
        let mut follow_up =
            LlmFollowUpClassifier::new(Arc::clone(&provider), Arc::clone(&prompts))?;
        if let Some(model) = &config.llm_model {
            intent = intent.with_model(model.clone());
            follow_up = follow_up.with_model(model.clone());
        }

        let news = GoogleNewsClient::new(&config)?;
        let sessions: Arc<dyn SessionStore> = match &config.session_db {
            Some(path) => Arc::new(SqliteSessionStore::open(path).await?),
            None => {
                info!("No session database configured, sessions are kept in memory");
                Arc::new(InMemorySessionStore::new())
            }
        };

        let orchestrator = Orchestrator::builder()
            .intent_classifier(Arc::new(intent))
            .follow_up_classifier(Arc::new(follow_up))
            .fundamentals(Arc::new(ScreenerFundamentals::new(ScreenerClient::new(&config)?)))
            .technicals(Arc::new(YahooTechnicals::new(YahooFinanceClient::new(&config))))
            .company_news(Arc::new(GoogleCompanyNews::new(news.clone(), &config)))
            .market_news(Arc::new(GoogleMarketNews::new(news, &config)))
            .synthesizer(Arc::new(LlmReportSynthesizer::new(provider, prompts, &config)))
            .renderer(Arc::new(MarkdownRenderer::new(config.reports_dir.clone())))
            .session_store(sessions)
            .replies(CannedReplies::default())
            .build()?;

        info!(?orchestrator, "EquiSage orchestrator ready");
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            locks: ConversationLocks::new(),
            config,
        })
    }

    /// The wired orchestrator
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Configuration the service was built from
    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    /// Answer one message
    pub async fn ask(
        &self,
        conversation_id: impl Into<ConversationId>,
        text: impl Into<String>,
    ) -> Result<TurnResponse> {
        let conversation_id: ConversationId = conversation_id.into();
        let _turn = self.locks.lock(&conversation_id).await;
        Ok(self.orchestrator.handle_message(conversation_id, text).await?)
    }

    /// Serve Telegram chats until the process stops
    pub async fn run_telegram(&self) -> Result<()> {
        let token = self.config.require_telegram_token()?.to_string();
        TelegramBot::new(self.orchestrator(), self.locks.clone(), &self.config).run(&token).await;
        Ok(())
    }
}
