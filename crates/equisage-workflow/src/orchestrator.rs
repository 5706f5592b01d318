//! Turn orchestrator
//!
//! The Orchestrator drives one message through the fixed graph:
//! 1. ROUTER picks a branch (follow-up, fresh analysis, or a canned reply)
//! 2. A fresh analysis fetches fundamentals, then fans out to the remaining
//!    collectors and joins on all of them
//! 3. The joined state is synthesized into a report and packaged with its
//!    artifacts; the session is saved once the turn has its response
//! 4. Every path ends at END with exactly one response
//!
//! Collector and synthesis failures degrade the reply. Configuration errors
//! are returned to the caller; contract violations abort the turn with the
//! internal-error reply.

use crate::fork_join::{
    slot_is_empty, Branch, CompanyNewsBranch, ForkJoin, MarketNewsBranch, TechnicalsBranch,
};
use crate::replies::CannedReplies;
use crate::router::Router;
use crate::topology::{Node, Topology};
use equisage_core::{
    AttachmentKind, CompanyNewsFetcher, ConversationId, ConversationState, DocumentRenderer,
    Error, FollowUpClassifier, FundamentalsFetcher, IntentClassifier, MarketNewsFetcher,
    ReportSynthesizer, Result, RoutingDecision, SessionPayload, SessionStore, Slot, SlotKey,
    TechnicalsFetcher, TurnResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Report text carried from GENERATE_REPORT to GENERATE_ARTIFACT
///
/// `session` is present only for a synthesized report.
struct Draft {
    text: String,
    session: Option<SessionPayload>,
}

fn decision_node(decision: RoutingDecision) -> Node {
    match decision {
        RoutingDecision::AnswerFollowup => Node::AnswerFollowup,
        RoutingDecision::FetchScreener => Node::FetchScreener,
        RoutingDecision::GenerateGreeting => Node::Greeting,
        RoutingDecision::GenerateHelp => Node::Help,
        RoutingDecision::GenerateOffTopic => Node::OffTopic,
    }
}

/// Runs conversation turns over the fixed graph
pub struct Orchestrator {
    topology: Topology,
    router: Router,
    fundamentals: Arc<dyn FundamentalsFetcher>,
    fan_out: ForkJoin,
    synthesizer: Arc<dyn ReportSynthesizer>,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    sessions: Arc<dyn SessionStore>,
    replies: CannedReplies,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("topology", &self.topology)
            .field("fan_out", &self.fan_out)
            .field("renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Start building an orchestrator
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Canned replies used by the terminal nodes
    pub fn replies(&self) -> &CannedReplies {
        &self.replies
    }

    /// Run one turn to completion
    ///
    /// The returned state always carries a response unless the error is a
    /// configuration error.
    pub async fn run(&self, mut state: ConversationState) -> Result<ConversationState> {
        let span = info_span!(
            "turn",
            conversation = %state.conversation_id,
            run_id = %Uuid::new_v4()
        );

        async move {
            let started = Instant::now();
            match self.execute(&mut state).await {
                Ok(path) => {
                    info!(
                        path = %path.iter().map(Node::as_str).collect::<Vec<_>>().join(" -> "),
                        "Turn completed in {:?}",
                        started.elapsed()
                    );
                }
                Err(Error::Configuration(message)) => {
                    error!("Turn rejected: {}", message);
                    return Err(Error::Configuration(message));
                }
                Err(err) => {
                    error!("Turn aborted: {}", err);
                    state.abort(err.to_string(), self.replies.internal_error.clone());
                }
            }
            Ok(state)
        }
        .instrument(span)
        .await
    }

    /// Run a turn for a single message and return its response
    pub async fn handle_message(
        &self,
        conversation_id: impl Into<ConversationId>,
        text: impl Into<String>,
    ) -> Result<TurnResponse> {
        let state = self
            .run(ConversationState::from_message(conversation_id, text))
            .await?;
        state
            .into_response()
            .ok_or_else(|| Error::contract("turn finished without a response"))
    }

    async fn execute(&self, state: &mut ConversationState) -> Result<Vec<Node>> {
        let mut walk = self.topology.walk();
        let mut draft: Option<Draft> = None;

        loop {
            let node = walk.current();
            debug!(node = %node, "Entering node");

            let next = match node {
                Node::Router => {
                    self.router.route(state).await?;
                    decision_node(state.take_decision()?)
                }
                Node::FetchScreener => self.fetch_screener(state).await?,
                Node::FanOut => {
                    walk.fork(&self.fan_out.nodes())?;
                    let failed = self.fan_out.run(state).await?;
                    if !failed.is_empty() {
                        warn!(?failed, "Continuing with partial data");
                    }
                    continue;
                }
                Node::FetchTechnicals | Node::FetchNews | Node::FetchMarketNews => {
                    return Err(Error::contract(format!("{node} entered outside the fan-out")));
                }
                Node::Join => {
                    self.check_joined(state)?;
                    Node::GenerateReport
                }
                Node::GenerateReport => {
                    draft = Some(self.generate_report(state).await?);
                    Node::GenerateArtifact
                }
                Node::GenerateArtifact => {
                    let draft = draft
                        .take()
                        .ok_or_else(|| {
                            Error::contract("GENERATE_ARTIFACT reached without a report")
                        })?;
                    self.generate_artifact(state, draft).await?;
                    Node::End
                }
                Node::AnswerFollowup => {
                    self.answer_follow_up(state).await?;
                    Node::End
                }
                Node::Greeting => {
                    state.finish(TurnResponse::text(self.replies.greeting.clone()))?;
                    Node::End
                }
                Node::Help => {
                    state.finish(TurnResponse::text(self.replies.help.clone()))?;
                    Node::End
                }
                Node::OffTopic => {
                    state.finish(TurnResponse::text(self.replies.off_topic_reply()))?;
                    Node::End
                }
                Node::End => {
                    if !state.is_finished() {
                        return Err(Error::contract("reached END without a response"));
                    }
                    break;
                }
            };

            walk.advance(next)?;
        }

        Ok(walk.into_path())
    }

    async fn fetch_screener(&self, state: &mut ConversationState) -> Result<Node> {
        let ticker = state
            .ticker
            .clone()
            .ok_or_else(|| Error::contract("FETCH_SCREENER reached without a ticker"))?;

        info!(ticker = %ticker, "Fetching fundamentals");
        match self.fundamentals.fetch(&ticker).await {
            Ok(fundamentals) => {
                let name = if fundamentals.company_name.trim().is_empty() {
                    ticker
                } else {
                    fundamentals.company_name.clone()
                };
                state.company_name = Some(name);
                state.fundamentals = Slot::Ready(fundamentals);
                Ok(Node::FanOut)
            }
            Err(Error::Configuration(message)) => Err(Error::Configuration(message)),
            Err(err) => {
                warn!(ticker = %ticker, "Fundamentals unavailable, abandoning analysis: {}", err);
                state.fundamentals = Slot::from_result(SlotKey::Fundamentals, Err(err));
                Ok(Node::OffTopic)
            }
        }
    }

    fn check_joined(&self, state: &ConversationState) -> Result<()> {
        if !state.fundamentals.is_ready() {
            return Err(Error::contract("JOIN reached without fundamentals"));
        }
        for key in self.fan_out.keys() {
            if slot_is_empty(state, key) {
                return Err(Error::contract(format!("JOIN reached with {key} unfilled")));
            }
        }
        Ok(())
    }

    async fn generate_report(&self, state: &ConversationState) -> Result<Draft> {
        let subject = state.subject().unwrap_or_default().to_string();

        match self.synthesizer.synthesize_report(state).await {
            Ok(text) => {
                let payload = state.to_session_payload(&text).ok_or_else(|| {
                    Error::contract("analysis completed without fundamentals or ticker")
                })?;
                Ok(Draft {
                    text,
                    session: Some(payload),
                })
            }
            Err(Error::Configuration(message)) => Err(Error::Configuration(message)),
            Err(err) => {
                warn!(subject = %subject, "Report synthesis failed: {}", err);
                Ok(Draft {
                    text: self.replies.synthesis_failure(&subject),
                    session: None,
                })
            }
        }
    }

    async fn generate_artifact(&self, state: &mut ConversationState, draft: Draft) -> Result<()> {
        let mut response = TurnResponse::text(draft.text.clone());

        if let Some(chart) = state.technicals.ready().and_then(|t| t.chart_path.clone()) {
            response = response.with_attachment(AttachmentKind::Chart, chart);
        }

        if let (Some(_), Some(renderer)) = (&draft.session, &self.renderer) {
            match renderer.render(state, &draft.text).await {
                Ok(Some(path)) => {
                    debug!(path = %path.display(), "Rendered report document");
                    response = response.with_attachment(AttachmentKind::Document, path);
                }
                Ok(None) => {}
                Err(err) => warn!("Report document not rendered: {}", err),
            }
        }

        state.finish(response)?;

        if let Some(payload) = draft.session {
            if let Err(err) = self.sessions.save(&state.conversation_id, payload).await {
                warn!("Session not saved, follow-ups will start fresh: {}", err);
            }
        }
        Ok(())
    }

    async fn answer_follow_up(&self, state: &mut ConversationState) -> Result<()> {
        let session = state
            .restored_session
            .clone()
            .ok_or_else(|| Error::contract("ANSWER_FOLLOWUP reached without a restored session"))?;
        let message = state
            .last_user_message()
            .ok_or_else(|| Error::contract("ANSWER_FOLLOWUP reached without a message"))?
            .to_string();

        let text = match self.synthesizer.answer_follow_up(&message, &session).await {
            Ok(text) => text,
            Err(Error::Configuration(message)) => return Err(Error::Configuration(message)),
            Err(err) => {
                warn!(topic = %session.topic(), "Follow-up answer failed: {}", err);
                self.replies.synthesis_failure(session.topic())
            }
        };

        state.finish(TurnResponse::text(text))
    }
}

/// Builder for Orchestrator
pub struct OrchestratorBuilder {
    intent: Option<Arc<dyn IntentClassifier>>,
    follow_up: Option<Arc<dyn FollowUpClassifier>>,
    fundamentals: Option<Arc<dyn FundamentalsFetcher>>,
    technicals: Option<Arc<dyn TechnicalsFetcher>>,
    company_news: Option<Arc<dyn CompanyNewsFetcher>>,
    market_news: Option<Arc<dyn MarketNewsFetcher>>,
    synthesizer: Option<Arc<dyn ReportSynthesizer>>,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    sessions: Option<Arc<dyn SessionStore>>,
    replies: CannedReplies,
    topology: Option<Topology>,
}

impl OrchestratorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            intent: None,
            follow_up: None,
            fundamentals: None,
            technicals: None,
            company_news: None,
            market_news: None,
            synthesizer: None,
            renderer: None,
            sessions: None,
            replies: CannedReplies::default(),
            topology: None,
        }
    }

    /// Set the intent classifier
    pub fn intent_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.intent = Some(classifier);
        self
    }

    /// Set the follow-up classifier
    pub fn follow_up_classifier(mut self, classifier: Arc<dyn FollowUpClassifier>) -> Self {
        self.follow_up = Some(classifier);
        self
    }

    /// Set the fundamentals fetcher
    pub fn fundamentals(mut self, fetcher: Arc<dyn FundamentalsFetcher>) -> Self {
        self.fundamentals = Some(fetcher);
        self
    }

    /// Set the technicals fetcher
    pub fn technicals(mut self, fetcher: Arc<dyn TechnicalsFetcher>) -> Self {
        self.technicals = Some(fetcher);
        self
    }

    /// Set the company news fetcher
    pub fn company_news(mut self, fetcher: Arc<dyn CompanyNewsFetcher>) -> Self {
        self.company_news = Some(fetcher);
        self
    }

    /// Set the market news fetcher
    pub fn market_news(mut self, fetcher: Arc<dyn MarketNewsFetcher>) -> Self {
        self.market_news = Some(fetcher);
        self
    }

    /// Set the report synthesizer
    pub fn synthesizer(mut self, synthesizer: Arc<dyn ReportSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Set the document renderer (optional)
    pub fn renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the session store
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    /// Override the canned replies
    pub fn replies(mut self, replies: CannedReplies) -> Self {
        self.replies = replies;
        self
    }

    /// Override the graph (validated on build)
    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Build the orchestrator
    ///
    /// Fails with a configuration error when a required collaborator is
    /// missing or the fan-out does not match the graph.
    pub fn build(self) -> Result<Orchestrator> {
        let intent = required(self.intent, "intent classifier")?;
        let follow_up = required(self.follow_up, "follow-up classifier")?;
        let fundamentals = required(self.fundamentals, "fundamentals fetcher")?;
        let technicals = required(self.technicals, "technicals fetcher")?;
        let company_news = required(self.company_news, "company news fetcher")?;
        let market_news = required(self.market_news, "market news fetcher")?;
        let synthesizer = required(self.synthesizer, "report synthesizer")?;
        let sessions = required(self.sessions, "session store")?;
        self.replies.validate()?;

        let topology = match self.topology {
            Some(topology) => topology,
            None => Topology::standard()?,
        };

        let branches: Vec<Arc<dyn Branch>> = vec![
            Arc::new(TechnicalsBranch::new(technicals)),
            Arc::new(CompanyNewsBranch::new(company_news)),
            Arc::new(MarketNewsBranch::new(market_news)),
        ];
        let fan_out = ForkJoin::new(branches)?;

        let mut declared = topology.fan_out_branches().to_vec();
        let mut wired = fan_out.nodes();
        declared.sort();
        wired.sort();
        if declared != wired {
            return Err(Error::Configuration(format!(
                "fan-out branches {wired:?} do not match the graph {declared:?}"
            )));
        }

        Ok(Orchestrator {
            topology,
            router: Router::new(intent, follow_up, Arc::clone(&sessions)),
            fundamentals,
            fan_out,
            synthesizer,
            renderer: self.renderer,
            sessions,
            replies: self.replies,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn required<T: ?Sized>(value: Option<Arc<T>>, what: &str) -> Result<Arc<T>> {
    value.ok_or_else(|| Error::Configuration(format!("{what} is required")))
}
