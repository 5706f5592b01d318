//! Prompt templates and the contexts that fill them
//!
//! Templates are MiniJinja sources compiled once into a [`PromptLibrary`].
//! Rendering is strict: a context missing a variable is an error rather than
//! a silently empty section.

mod templates;

use crate::error::Result;
use equisage_core::{ConversationState, DialogueMessage, SessionPayload, Slot};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// Template names
pub mod names {
    pub const INTENT: &str = "stock.intent";
    pub const FOLLOW_UP_JUDGE: &str = "stock.follow_up_judge";
    pub const REPORT: &str = "stock.report";
    pub const FOLLOW_UP_ANSWER: &str = "stock.follow_up_answer";
}

/// System prompt of the report and follow-up answer requests
pub const ANALYST_PERSONA: &str = "You are EquiSage, an expert AI stock market analyst for the Indian market. Your tone is professional, insightful, and data-driven.";

/// Closing line of every report
pub const DISCLAIMER: &str = "**Disclaimer:** This is an AI-generated analysis based on publicly available data and is not financial advice. Please conduct your own research before making any investment decisions.";

const NOT_AVAILABLE: &str = "Not available.";

/// Compiled prompt templates
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    /// Compile all templates
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template(names::INTENT, templates::INTENT)?;
        env.add_template(names::FOLLOW_UP_JUDGE, templates::FOLLOW_UP_JUDGE)?;
        env.add_template(names::REPORT, templates::REPORT)?;
        env.add_template(names::FOLLOW_UP_ANSWER, templates::FOLLOW_UP_ANSWER)?;
        Ok(Self { env })
    }

    /// Render the template `name` with `context`
    pub fn render(&self, name: &str, context: impl Serialize) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}

impl std::fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLibrary")
            .field("templates", &self.env.templates().map(|(name, _)| name).collect::<Vec<_>>())
            .finish()
    }
}

/// Context of the intent prompt
#[derive(Debug, Serialize)]
pub struct IntentContext<'a> {
    pub message: &'a str,
    pub history: &'a [DialogueMessage],
}

/// Context of the follow-up judgment prompt
#[derive(Debug, Serialize)]
pub struct FollowUpJudgeContext<'a> {
    pub topic: &'a str,
    pub message: &'a str,
}

/// Context of the report prompt, every section pre-formatted
#[derive(Debug, Serialize)]
pub struct ReportContext {
    pub company_name: String,
    pub ticker: String,
    pub source_url: String,
    pub key_ratios: String,
    pub pros_cons: String,
    pub quarterly_results: String,
    pub shareholding_pattern: String,
    pub technicals: String,
    pub company_news: String,
    pub market_news: String,
    pub disclaimer: &'static str,
}

impl ReportContext {
    /// Collect the joined state into report sections
    pub fn from_state(state: &ConversationState) -> Self {
        let (source_url, key_ratios, pros_cons, quarterly_results, shareholding_pattern) =
            match state.fundamentals.ready() {
                Some(f) => (
                    f.source_url.clone(),
                    pretty(&f.key_ratios),
                    pretty(&serde_json::json!({ "pros": f.pros, "cons": f.cons })),
                    pretty(&f.quarterly_results),
                    pretty(&f.shareholding_pattern),
                ),
                None => {
                    let missing = slot_text(&state.fundamentals);
                    (String::new(), missing.clone(), missing.clone(), missing.clone(), missing)
                }
            };

        Self {
            company_name: state.subject().unwrap_or("the company").to_string(),
            ticker: state.ticker.clone().unwrap_or_default(),
            source_url,
            key_ratios,
            pros_cons,
            quarterly_results,
            shareholding_pattern,
            technicals: slot_text(&state.technicals.clone().map(|t| t.without_artifacts())),
            company_news: slot_text(&state.company_news),
            market_news: slot_text(&state.market_news),
            disclaimer: DISCLAIMER,
        }
    }
}

/// Context of the follow-up answer prompt
#[derive(Debug, Serialize)]
pub struct FollowUpAnswerContext<'a> {
    pub company_name: &'a str,
    pub ticker: &'a str,
    pub report: &'a str,
    pub data: String,
    pub question: &'a str,
}

impl<'a> FollowUpAnswerContext<'a> {
    /// Build from the restored session only
    pub fn new(question: &'a str, session: &'a SessionPayload) -> Self {
        let data = serde_json::json!({
            "fundamentals": session.fundamentals,
            "technicals": session.technicals,
            "company_news": session.company_news,
            "market_news": session.market_news,
        });
        Self {
            company_name: session.topic(),
            ticker: &session.ticker,
            report: &session.report,
            data: pretty(&data),
            question,
        }
    }
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| NOT_AVAILABLE.to_string())
}

/// Prompt text of a result slot
fn slot_text<T: Serialize>(slot: &Slot<T>) -> String {
    match slot {
        Slot::Ready(value) => pretty(value),
        Slot::Failed(err) => format!("Unavailable: {}", err.message),
        Slot::Empty => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equisage_core::{
        Article, CollectorError, Fundamentals, Indicator, Metric, SlotKey, Table, Technicals,
    };
    use std::path::PathBuf;

    fn analysed_state() -> ConversationState {
        let mut state = ConversationState::from_message(7_i64, "analyze infosys");
        state.ticker = Some("INFY.NS".to_string());
        state.company_name = Some("Infosys Ltd".to_string());
        state.fundamentals = Slot::Ready(Fundamentals {
            company_name: "Infosys Ltd".to_string(),
            source_url: "https://www.screener.in/company/INFY/".to_string(),
            key_ratios: vec![Metric::new("ROCE", "37.5 %")],
            pros: vec!["Debt free".to_string()],
            cons: vec![],
            quarterly_results: Table::default(),
            shareholding_pattern: Table::default(),
        });
        state.technicals = Slot::Ready(Technicals {
            last_close: 1420.0,
            as_of: "2024-05-10".to_string(),
            indicators: vec![Indicator {
                name: "RSI (14)".to_string(),
                value: Some(44.0),
                signal: "Neutral".to_string(),
            }],
            chart_path: Some(PathBuf::from("/tmp/INFY_chart.png")),
        });
        state.company_news =
            Slot::Failed(CollectorError::new(SlotKey::CompanyNews, "feed unreachable"));
        state.market_news = Slot::Ready(vec![Article {
            title: "RBI holds repo rate".to_string(),
            url: "https://news.example.com/rbi".to_string(),
            published: None,
            source: None,
            summary: None,
            topic: Some("RBI interest rate decision".to_string()),
        }]);
        state
    }

    #[test]
    fn test_all_templates_compile() {
        let library = PromptLibrary::new().unwrap();
        let debug = format!("{library:?}");
        assert!(debug.contains(names::REPORT));
    }

    #[test]
    fn test_report_prompt_sections() {
        let library = PromptLibrary::new().unwrap();
        let prompt = library
            .render(names::REPORT, ReportContext::from_state(&analysed_state()))
            .unwrap();

        for heading in [
            "1. Fundamental Analysis",
            "2. Technical Outlook",
            "3. Shareholding Pattern",
            "4. News & Market Sentiment",
            "5. EquiSage Verdict",
        ] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
        assert!(prompt.contains("**Infosys Ltd** (INFY.NS)"));
        assert!(prompt.contains("37.5 %"));
        assert!(prompt.contains("Unavailable: feed unreachable"));
        assert!(prompt.contains("RBI holds repo rate"));
        assert!(prompt.ends_with(DISCLAIMER));
        assert!(!prompt.contains("INFY_chart.png"));
    }

    #[test]
    fn test_report_without_fundamentals() {
        let mut state = ConversationState::from_message(7_i64, "analyze tcs");
        state.ticker = Some("TCS.NS".to_string());
        let context = ReportContext::from_state(&state);
        assert_eq!(context.company_name, "TCS.NS");
        assert_eq!(context.key_ratios, NOT_AVAILABLE);
        assert_eq!(context.technicals, NOT_AVAILABLE);
    }

    #[test]
    fn test_intent_prompt_history() {
        let library = PromptLibrary::new().unwrap();
        let history = vec![DialogueMessage::user("hi"), DialogueMessage::assistant("Hello!")];
        let prompt = library
            .render(
                names::INTENT,
                IntentContext {
                    message: "what about vedanta",
                    history: &history,
                },
            )
            .unwrap();
        assert!(prompt.contains("- user: hi"));
        assert!(prompt.contains("- assistant: Hello!"));
        assert!(prompt.contains("what about vedanta"));

        let prompt = library
            .render(names::INTENT, IntentContext { message: "hi", history: &[] })
            .unwrap();
        assert!(!prompt.contains("Earlier conversation"));
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let library = PromptLibrary::new().unwrap();
        let result = library.render(names::FOLLOW_UP_JUDGE, serde_json::json!({ "topic": "TCS" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_follow_up_answer_uses_session() {
        let state = analysed_state();
        let session = state.to_session_payload("Infosys looks fairly valued.").unwrap();
        let library = PromptLibrary::new().unwrap();
        let prompt = library
            .render(
                names::FOLLOW_UP_ANSWER,
                FollowUpAnswerContext::new("what is the ROCE?", &session),
            )
            .unwrap();
        assert!(prompt.contains("Infosys looks fairly valued."));
        assert!(prompt.contains("37.5 %"));
        assert!(prompt.contains("what is the ROCE?"));
    }
}
