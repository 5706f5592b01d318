//! Intent and follow-up classifiers

pub mod follow_up;
pub mod llm;
pub mod rules;

pub use follow_up::{FollowUpHeuristic, LlmFollowUpClassifier};
pub use llm::LlmIntentClassifier;
pub use rules::RuleBasedClassifier;
