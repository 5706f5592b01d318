//! Hand-written collaborators for the workflow tests

use async_trait::async_trait;
use equisage_core::{
    Article, Classification, CompanyNewsFetcher, ConversationId, ConversationState,
    DocumentRenderer, Error, FollowUpClassifier, FollowUpJudgment, Fundamentals,
    FundamentalsFetcher, Indicator, Intent, IntentClassifier, MarketNewsFetcher, Metric,
    ReportSynthesizer, Result, SessionPayload, SessionRecord, SessionStore, Slot, SlotKey, Table,
    Technicals, TechnicalsFetcher,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn fundamentals(company: &str) -> Fundamentals {
    Fundamentals {
        company_name: company.to_string(),
        source_url: "https://www.screener.in/company/TEST/".to_string(),
        key_ratios: vec![Metric::new("Stock P/E", "24.1")],
        pros: vec!["Debt free".to_string()],
        cons: vec![],
        quarterly_results: Table::default(),
        shareholding_pattern: Table::default(),
    }
}

pub(crate) fn technicals(chart: Option<&str>) -> Technicals {
    Technicals {
        last_close: 1520.5,
        as_of: "2024-05-10".to_string(),
        indicators: vec![Indicator {
            name: "RSI (14)".to_string(),
            value: Some(61.2),
            signal: "Neutral".to_string(),
        }],
        chart_path: chart.map(PathBuf::from),
    }
}

pub(crate) fn article(title: &str) -> Article {
    Article {
        title: title.to_string(),
        url: format!("https://news.example.com/{}", title.len()),
        published: None,
        source: None,
        summary: None,
        topic: None,
    }
}

pub(crate) fn session_payload(company: &str, ticker: &str) -> SessionPayload {
    SessionPayload {
        company_name: company.to_string(),
        ticker: ticker.to_string(),
        fundamentals: fundamentals(company),
        technicals: Slot::Ready(technicals(None)),
        company_news: Slot::Ready(vec![article("Quarterly profit beats estimates")]),
        market_news: Slot::Ready(vec![]),
        report: format!("Report on {company}"),
    }
}

pub(crate) struct FixedIntent {
    result: Result<Classification>,
    calls: AtomicUsize,
}

impl FixedIntent {
    pub(crate) fn ok(intent: Intent, ticker: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(Classification::new(intent, ticker.map(ToString::to_string))),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(Error::Classification("model returned prose".to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentClassifier for FixedIntent {
    async fn classify(
        &self,
        _message: &str,
        _prior: &[equisage_core::DialogueMessage],
    ) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub(crate) struct FixedFollowUp {
    result: Result<FollowUpJudgment>,
    topics: Mutex<Vec<String>>,
}

impl FixedFollowUp {
    pub(crate) fn ok(judgment: FollowUpJudgment) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(judgment),
            topics: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(Error::Classification("timeout".to_string())),
            topics: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }
}

#[async_trait]
impl FollowUpClassifier for FixedFollowUp {
    async fn judge(&self, _message: &str, prior_topic: &str) -> Result<FollowUpJudgment> {
        self.topics.lock().unwrap().push(prior_topic.to_string());
        self.result.clone()
    }
}

/// Store whose every call fails
pub(crate) struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn load(&self, _conversation_id: &ConversationId) -> Result<Option<SessionRecord>> {
        Err(Error::Storage("database is locked".to_string()))
    }

    async fn save(
        &self,
        _conversation_id: &ConversationId,
        _payload: SessionPayload,
    ) -> Result<()> {
        Err(Error::Storage("database is locked".to_string()))
    }
}

pub(crate) struct FakeFundamentals {
    result: Result<Fundamentals>,
    calls: AtomicUsize,
}

impl FakeFundamentals {
    pub(crate) fn ok(company: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(fundamentals(company)),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(Error::collector(SlotKey::Fundamentals, "company page not found")),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FundamentalsFetcher for FakeFundamentals {
    async fn fetch(&self, _ticker: &str) -> Result<Fundamentals> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub(crate) struct FakeTechnicals {
    result: Result<Technicals>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    pub(crate) completed: AtomicBool,
}

impl FakeTechnicals {
    pub(crate) fn ok(chart: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(technicals(chart)),
            delay: None,
            calls: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(Error::collector(SlotKey::Technicals, "no price history")),
            delay: None,
            calls: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
        })
    }

    pub(crate) fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(technicals(None)),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TechnicalsFetcher for FakeTechnicals {
    async fn fetch(&self, _ticker: &str, _company_name: &str) -> Result<Technicals> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.store(true, Ordering::SeqCst);
        self.result.clone()
    }
}

pub(crate) struct FakeNews {
    result: Result<Vec<Article>>,
    calls: AtomicUsize,
}

impl FakeNews {
    pub(crate) fn ok(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(titles.iter().map(|t| article(t)).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(key: SlotKey) -> Arc<Self> {
        Arc::new(Self {
            result: Err(Error::collector(key, "feed unreachable")),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompanyNewsFetcher for FakeNews {
    async fn fetch(&self, _ticker: &str, _company_name: &str) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[async_trait]
impl MarketNewsFetcher for FakeNews {
    async fn fetch(&self) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Synthesizer that records what it was shown
pub(crate) struct FakeSynthesizer {
    report: Result<String>,
    answer: Result<String>,
    report_calls: AtomicUsize,
    answer_calls: AtomicUsize,
    seen_slots: Mutex<Vec<SlotKey>>,
    seen_failed: Mutex<Vec<SlotKey>>,
}

impl FakeSynthesizer {
    pub(crate) fn new(report: Result<String>, answer: Result<String>) -> Arc<Self> {
        Arc::new(Self {
            report,
            answer,
            report_calls: AtomicUsize::new(0),
            answer_calls: AtomicUsize::new(0),
            seen_slots: Mutex::new(Vec::new()),
            seen_failed: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn ok() -> Arc<Self> {
        Self::new(
            Ok("## Executive Summary\nSolid quarter.".to_string()),
            Ok("Operating margin was 21%.".to_string()),
        )
    }

    pub(crate) fn failing() -> Arc<Self> {
        Self::new(
            Err(Error::Synthesis("quota exceeded".to_string())),
            Err(Error::Synthesis("quota exceeded".to_string())),
        )
    }

    pub(crate) fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn answer_calls(&self) -> usize {
        self.answer_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_slots(&self) -> Vec<SlotKey> {
        self.seen_slots.lock().unwrap().clone()
    }

    pub(crate) fn seen_failed(&self) -> Vec<SlotKey> {
        self.seen_failed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSynthesizer for FakeSynthesizer {
    async fn synthesize_report(&self, state: &ConversationState) -> Result<String> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_slots.lock().unwrap() = state.filled_slots();
        let mut failed = Vec::new();
        if state.technicals.is_failed() {
            failed.push(SlotKey::Technicals);
        }
        if state.company_news.is_failed() {
            failed.push(SlotKey::CompanyNews);
        }
        if state.market_news.is_failed() {
            failed.push(SlotKey::MarketNews);
        }
        *self.seen_failed.lock().unwrap() = failed;
        self.report.clone()
    }

    async fn answer_follow_up(&self, _message: &str, _session: &SessionPayload) -> Result<String> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

pub(crate) struct FakeRenderer {
    result: Result<Option<PathBuf>>,
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub(crate) fn ok(path: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(Some(PathBuf::from(path))),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(Error::Generic("disk full".to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(&self, _state: &ConversationState, _report: &str) -> Result<Option<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
