//! Per-message routing
//!
//! The router runs once per turn. It first tries to treat the message as a
//! follow-up to the stored session, then falls back to fresh intent
//! classification. Classifier and store failures never escape: they degrade
//! to "no session" or an off-topic classification.

use equisage_core::{
    Classification, ConversationState, Error, FollowUpClassifier, FollowUpJudgment, Intent,
    IntentClassifier, Result, RoutingDecision, SessionRecord, SessionStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pure routing table
///
/// `judgment` is `Some` only when a session exists and the follow-up
/// classifier answered.
pub fn decide(
    classification: &Classification,
    judgment: Option<FollowUpJudgment>,
) -> RoutingDecision {
    if judgment == Some(FollowUpJudgment::Continuation) {
        return RoutingDecision::AnswerFollowup;
    }
    match classification.intent {
        Intent::StockAnalysis if classification.ticker.is_some() => RoutingDecision::FetchScreener,
        Intent::Greeting => RoutingDecision::GenerateGreeting,
        Intent::Help => RoutingDecision::GenerateHelp,
        Intent::StockAnalysis | Intent::OffTopic | Intent::FollowUp => {
            RoutingDecision::GenerateOffTopic
        }
    }
}

/// Entry node of the graph
pub struct Router {
    intent: Arc<dyn IntentClassifier>,
    follow_up: Arc<dyn FollowUpClassifier>,
    sessions: Arc<dyn SessionStore>,
}

impl Router {
    /// Create a router
    pub fn new(
        intent: Arc<dyn IntentClassifier>,
        follow_up: Arc<dyn FollowUpClassifier>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            intent,
            follow_up,
            sessions,
        }
    }

    /// Decide the branch for this turn and record it in `state`
    ///
    /// Fails only with a configuration error (no user message) or a contract
    /// violation (decision already set).
    pub async fn route(&self, state: &mut ConversationState) -> Result<RoutingDecision> {
        let message = state
            .last_user_message()
            .ok_or_else(|| Error::Configuration("message history is empty".to_string()))?
            .to_string();

        if let Some(record) = self.load_session(state).await {
            let topic = record.payload.topic().to_string();
            match self.follow_up.judge(&message, &topic).await {
                Ok(FollowUpJudgment::Continuation) => {
                    info!(topic = %topic, "Message continues the previous analysis");
                    let payload = record.payload;
                    state.intent = Some(Intent::FollowUp);
                    state.ticker = Some(payload.ticker.clone());
                    state.company_name = Some(payload.company_name.clone());
                    state.restored_session = Some(payload);
                    state.set_decision(RoutingDecision::AnswerFollowup)?;
                    return Ok(RoutingDecision::AnswerFollowup);
                }
                Ok(judgment) => debug!(?judgment, "Not a follow-up of {}", topic),
                Err(err) => warn!("Follow-up classification failed, treating as fresh: {}", err),
            }
        }

        let classification = match self.intent.classify(&message, state.prior_messages()).await {
            Ok(classification) => classification,
            Err(err) => {
                warn!("Intent classification failed, routing off-topic: {}", err);
                Classification::off_topic()
            }
        };

        let decision = decide(&classification, None);
        info!(
            intent = ?classification.intent,
            ticker = classification.ticker.as_deref().unwrap_or("-"),
            ?decision,
            "Routed message"
        );

        state.intent = Some(classification.intent);
        if decision == RoutingDecision::FetchScreener {
            state.ticker = classification.ticker;
        }
        state.set_decision(decision)?;
        Ok(decision)
    }

    async fn load_session(&self, state: &ConversationState) -> Option<SessionRecord> {
        match self.sessions.load(&state.conversation_id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    conversation = %state.conversation_id,
                    "Session load failed, continuing without: {}", err
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedFollowUp, FixedIntent, FailingStore, session_payload};
    use equisage_core::{ConversationId, InMemorySessionStore};

    fn classification(intent: Intent, ticker: Option<&str>) -> Classification {
        Classification::new(intent, ticker.map(ToString::to_string))
    }

    #[test]
    fn test_decide_table() {
        let cases = [
            (
                classification(Intent::StockAnalysis, Some("TCS.NS")),
                None,
                RoutingDecision::FetchScreener,
            ),
            (classification(Intent::StockAnalysis, None), None, RoutingDecision::GenerateOffTopic),
            (classification(Intent::Greeting, None), None, RoutingDecision::GenerateGreeting),
            (classification(Intent::Help, None), None, RoutingDecision::GenerateHelp),
            (classification(Intent::OffTopic, None), None, RoutingDecision::GenerateOffTopic),
            (classification(Intent::FollowUp, None), None, RoutingDecision::GenerateOffTopic),
            (
                classification(Intent::Greeting, None),
                Some(FollowUpJudgment::Continuation),
                RoutingDecision::AnswerFollowup,
            ),
            (
                classification(Intent::Help, None),
                Some(FollowUpJudgment::NewSubject),
                RoutingDecision::GenerateHelp,
            ),
        ];
        for (input, judgment, expected) in cases {
            assert_eq!(decide(&input, judgment), expected, "{input:?} / {judgment:?}");
        }
    }

    #[test]
    fn test_decide_is_deterministic() {
        let input = classification(Intent::StockAnalysis, Some("INFY.NS"));
        let first = decide(&input, Some(FollowUpJudgment::Unrelated));
        for _ in 0..10 {
            assert_eq!(decide(&input, Some(FollowUpJudgment::Unrelated)), first);
        }
    }

    #[tokio::test]
    async fn test_empty_history_is_configuration_error() {
        let router = Router::new(
            FixedIntent::ok(Intent::Greeting, None),
            FixedFollowUp::ok(FollowUpJudgment::Continuation),
            Arc::new(InMemorySessionStore::new()),
        );
        let mut state = ConversationState::new(1_i64, vec![]);
        let err = router.route(&mut state).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(state.decision().is_none());
    }

    #[tokio::test]
    async fn test_classifier_failure_routes_off_topic() {
        let router = Router::new(
            FixedIntent::failing(),
            FixedFollowUp::ok(FollowUpJudgment::Continuation),
            Arc::new(InMemorySessionStore::new()),
        );
        let mut state = ConversationState::from_message(1_i64, "analyze reliance");
        let decision = router.route(&mut state).await.unwrap();
        assert_eq!(decision, RoutingDecision::GenerateOffTopic);
        assert_eq!(state.intent, Some(Intent::OffTopic));
    }

    #[tokio::test]
    async fn test_store_failure_is_no_session() {
        let router = Router::new(
            FixedIntent::ok(Intent::Greeting, None),
            FixedFollowUp::ok(FollowUpJudgment::Continuation),
            Arc::new(FailingStore),
        );
        let mut state = ConversationState::from_message(1_i64, "hi");
        let decision = router.route(&mut state).await.unwrap();
        assert_eq!(decision, RoutingDecision::GenerateGreeting);
        assert!(state.restored_session.is_none());
    }

    #[tokio::test]
    async fn test_continuation_restores_session() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .save(&ConversationId::from(42_i64), session_payload("Infosys Ltd", "INFY.NS"))
            .await
            .unwrap();
        let follow_up = FixedFollowUp::ok(FollowUpJudgment::Continuation);
        let intent = FixedIntent::ok(Intent::OffTopic, None);
        let router = Router::new(intent.clone(), follow_up.clone(), store);

        let mut state = ConversationState::from_message(42_i64, "what was its margin?");
        let decision = router.route(&mut state).await.unwrap();

        assert_eq!(decision, RoutingDecision::AnswerFollowup);
        assert_eq!(state.intent, Some(Intent::FollowUp));
        assert_eq!(state.ticker.as_deref(), Some("INFY.NS"));
        assert_eq!(follow_up.topics(), vec!["Infosys Ltd".to_string()]);
        assert_eq!(intent.calls(), 0);
    }

    #[tokio::test]
    async fn test_new_subject_classifies_fresh() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .save(&ConversationId::from(42_i64), session_payload("Infosys Ltd", "INFY.NS"))
            .await
            .unwrap();
        let router = Router::new(
            FixedIntent::ok(Intent::StockAnalysis, Some("WIPRO.NS")),
            FixedFollowUp::ok(FollowUpJudgment::NewSubject),
            store,
        );

        let mut state = ConversationState::from_message(42_i64, "analyze wipro");
        let decision = router.route(&mut state).await.unwrap();

        assert_eq!(decision, RoutingDecision::FetchScreener);
        assert_eq!(state.ticker.as_deref(), Some("WIPRO.NS"));
        assert!(state.restored_session.is_none());
    }

    #[tokio::test]
    async fn test_follow_up_failure_falls_back_to_fresh() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .save(&ConversationId::from(9_i64), session_payload("Infosys Ltd", "INFY.NS"))
            .await
            .unwrap();
        let router = Router::new(
            FixedIntent::ok(Intent::Help, None),
            FixedFollowUp::failing(),
            store,
        );

        let mut state = ConversationState::from_message(9_i64, "help");
        assert_eq!(router.route(&mut state).await.unwrap(), RoutingDecision::GenerateHelp);
    }

    #[tokio::test]
    async fn test_route_twice_is_violation() {
        let router = Router::new(
            FixedIntent::ok(Intent::Greeting, None),
            FixedFollowUp::ok(FollowUpJudgment::Unrelated),
            Arc::new(InMemorySessionStore::new()),
        );
        let mut state = ConversationState::from_message(1_i64, "hi");
        router.route(&mut state).await.unwrap();
        assert!(matches!(
            router.route(&mut state).await,
            Err(Error::ContractViolation(_))
        ));
    }
}
