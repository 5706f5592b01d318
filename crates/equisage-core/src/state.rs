//! Conversation state threaded through one orchestrator run

use crate::error::{Error, Result};
use crate::payload::{Article, Fundamentals, Technicals};
use crate::session::SessionPayload;
use crate::slot::{Slot, SlotKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable identifier of one user's dialogue (a chat id, a CLI session name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Create a new identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Author of a dialogue message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

/// A single message in the dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueMessage {
    /// Who wrote the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl DialogueMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Resolved intent of the latest user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Fresh analysis of a company
    StockAnalysis,
    /// Salutation
    Greeting,
    /// Usage question
    Help,
    /// Anything else
    OffTopic,
    /// Continuation of the previous analysis
    FollowUp,
}

impl Intent {
    /// Parse the labels used by classifiers ("stock_analysis", "GREETING", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "stock_analysis" | "analysis" => Some(Self::StockAnalysis),
            "greeting" => Some(Self::Greeting),
            "help" => Some(Self::Help),
            "off_topic" | "other" => Some(Self::OffTopic),
            "followup" | "follow_up" => Some(Self::FollowUp),
            _ => None,
        }
    }
}

/// Output of the intent classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Detected intent
    pub intent: Intent,
    /// Resolved exchange ticker, when the message named a known company
    pub ticker: Option<String>,
}

impl Classification {
    /// Create a classification
    pub fn new(intent: Intent, ticker: Option<String>) -> Self {
        Self { intent, ticker }
    }

    /// Classification used when the classifier cannot be trusted
    pub fn off_topic() -> Self {
        Self::new(Intent::OffTopic, None)
    }
}

/// Judgment of a message against the previous analysis topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpJudgment {
    /// The message continues the previous subject
    Continuation,
    /// The message is about a different company
    NewSubject,
    /// The message is unrelated to stock analysis
    Unrelated,
}

/// Branch chosen by the router for this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingDecision {
    /// Answer from the restored session
    AnswerFollowup,
    /// Start a fresh analysis with the fundamentals fetch
    FetchScreener,
    /// Reply with the greeting
    GenerateGreeting,
    /// Reply with usage help
    GenerateHelp,
    /// Reply with an off-topic deflection
    GenerateOffTopic,
}

/// Kind of file attached to a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Price chart image
    Chart,
    /// Generated report document
    Document,
}

/// A file sent alongside the reply text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// What the file is
    pub kind: AttachmentKind,
    /// Where the file lives on disk
    pub path: PathBuf,
}

/// Terminal response of one turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnResponse {
    /// Reply text, channel-neutral
    pub text: String,
    /// Zero or more attached files
    pub attachments: Vec<Attachment>,
}

impl TurnResponse {
    /// Text-only response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Add an attachment
    pub fn with_attachment(mut self, kind: AttachmentKind, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(Attachment {
            kind,
            path: path.into(),
        });
        self
    }

    /// First attachment of the given kind
    pub fn attachment(&self, kind: AttachmentKind) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecisionToken {
    #[default]
    Unset,
    Set(RoutingDecision),
    Consumed(RoutingDecision),
}

/// The single mutable record threaded through the graph for one turn
///
/// The state is moved into one orchestrator run and never aliased outside it.
/// Fan-out branches only ever see an immutable snapshot.
#[derive(Debug, Clone)]
pub struct ConversationState {
    /// Conversation this turn belongs to
    pub conversation_id: ConversationId,
    /// Dialogue so far, oldest first; the last entry is the message being answered
    pub messages: Vec<DialogueMessage>,
    /// Resolved intent
    pub intent: Option<Intent>,
    /// Resolved ticker
    pub ticker: Option<String>,
    /// Resolved company name
    pub company_name: Option<String>,
    /// Fundamentals slot
    pub fundamentals: Slot<Fundamentals>,
    /// Technicals slot
    pub technicals: Slot<Technicals>,
    /// Company news slot
    pub company_news: Slot<Vec<Article>>,
    /// Market news slot
    pub market_news: Slot<Vec<Article>>,
    /// Payload restored from the session store on a follow-up
    pub restored_session: Option<SessionPayload>,
    decision: DecisionToken,
    response: Option<TurnResponse>,
    failure: Option<String>,
}

impl ConversationState {
    /// Start a turn with the given dialogue history
    pub fn new(conversation_id: impl Into<ConversationId>, messages: Vec<DialogueMessage>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages,
            intent: None,
            ticker: None,
            company_name: None,
            fundamentals: Slot::Empty,
            technicals: Slot::Empty,
            company_news: Slot::Empty,
            market_news: Slot::Empty,
            restored_session: None,
            decision: DecisionToken::Unset,
            response: None,
            failure: None,
        }
    }

    /// Start a turn from a single user message
    pub fn from_message(
        conversation_id: impl Into<ConversationId>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(conversation_id, vec![DialogueMessage::user(text)])
    }

    /// Text of the most recent user message
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Messages before the most recent user message
    pub fn prior_messages(&self) -> &[DialogueMessage] {
        match self.messages.iter().rposition(|m| m.role == Role::User) {
            Some(idx) => &self.messages[..idx],
            None => &self.messages,
        }
    }

    /// Subject of the analysis: company name, falling back to the ticker
    pub fn subject(&self) -> Option<&str> {
        self.company_name.as_deref().or(self.ticker.as_deref())
    }

    /// Which slot keys currently hold something other than `Empty`
    pub fn filled_slots(&self) -> Vec<SlotKey> {
        let mut keys = Vec::new();
        if !self.fundamentals.is_empty() {
            keys.push(SlotKey::Fundamentals);
        }
        if !self.technicals.is_empty() {
            keys.push(SlotKey::Technicals);
        }
        if !self.company_news.is_empty() {
            keys.push(SlotKey::CompanyNews);
        }
        if !self.market_news.is_empty() {
            keys.push(SlotKey::MarketNews);
        }
        keys
    }

    /// Record the routing decision for this turn
    ///
    /// Fails with a contract violation if a decision was already recorded.
    pub fn set_decision(&mut self, decision: RoutingDecision) -> Result<()> {
        match self.decision {
            DecisionToken::Unset => {
                self.decision = DecisionToken::Set(decision);
                Ok(())
            }
            DecisionToken::Set(existing) | DecisionToken::Consumed(existing) => {
                Err(Error::contract(format!(
                    "routing decision already set to {existing:?}, refusing {decision:?}"
                )))
            }
        }
    }

    /// Consume the routing decision
    ///
    /// Fails with a contract violation if no decision is pending.
    pub fn take_decision(&mut self) -> Result<RoutingDecision> {
        match self.decision {
            DecisionToken::Set(decision) => {
                self.decision = DecisionToken::Consumed(decision);
                Ok(decision)
            }
            DecisionToken::Unset => Err(Error::contract(
                "routing decision consumed before it was set",
            )),
            DecisionToken::Consumed(decision) => Err(Error::contract(format!(
                "routing decision {decision:?} consumed twice"
            ))),
        }
    }

    /// Decision recorded for this turn, whether or not it was consumed
    pub fn decision(&self) -> Option<RoutingDecision> {
        match self.decision {
            DecisionToken::Unset => None,
            DecisionToken::Set(d) | DecisionToken::Consumed(d) => Some(d),
        }
    }

    /// Attach the terminal response
    ///
    /// The reply text is appended to the dialogue as an assistant message.
    /// A turn has exactly one reply, so finishing twice is a contract violation.
    pub fn finish(&mut self, response: TurnResponse) -> Result<()> {
        if self.response.is_some() {
            return Err(Error::contract("turn already has a response"));
        }
        self.messages.push(DialogueMessage::assistant(response.text.clone()));
        self.response = Some(response);
        Ok(())
    }

    /// Replace whatever response the turn had with an internal-error reply
    pub fn abort(&mut self, reason: impl Into<String>, reply: impl Into<String>) {
        let reply = reply.into();
        if self.response.is_some() {
            self.messages.pop();
        }
        self.messages.push(DialogueMessage::assistant(reply.clone()));
        self.response = Some(TurnResponse::text(reply));
        self.failure = Some(reason.into());
    }

    /// Whether the turn has a terminal response
    pub fn is_finished(&self) -> bool {
        self.response.is_some()
    }

    /// The terminal response, once finished
    pub fn response(&self) -> Option<&TurnResponse> {
        self.response.as_ref()
    }

    /// Take ownership of the terminal response
    pub fn into_response(self) -> Option<TurnResponse> {
        self.response
    }

    /// Reason recorded when the turn was aborted
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Build the session payload for a completed analysis
    ///
    /// Returns `None` unless fundamentals are populated and a ticker is
    /// resolved. Transient artifacts are stripped.
    pub fn to_session_payload(&self, report: &str) -> Option<SessionPayload> {
        let fundamentals = self.fundamentals.ready()?.clone();
        let ticker = self.ticker.clone()?;
        let company_name = self
            .company_name
            .clone()
            .unwrap_or_else(|| fundamentals.company_name.clone());

        Some(SessionPayload {
            company_name,
            ticker,
            fundamentals,
            technicals: self.technicals.clone().map(|t| t.without_artifacts()),
            company_news: self.company_news.clone(),
            market_news: self.market_news.clone(),
            report: report.to_string(),
        })
    }
}
