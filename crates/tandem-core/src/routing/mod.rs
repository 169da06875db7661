//! Intent routing.
//!
//! - `classifier` -- decides which agent an utterance is for (`IntentClassifier`)
//! - `handler` -- sub-agent handlers and the dispatch table (`AgentRegistry`)
//! - `markup` -- strips presentation markup from handler output
//! - `router` -- the Unbound/Bound state machine (`IntentRouter`)

pub mod classifier;
pub mod handler;
pub mod markup;
pub mod router;

pub use classifier::{CompletionClassifier, IntentClassifier, KeywordClassifier};
pub use handler::{AgentHandler, AgentRegistry, AgentTurn, BoxAgentHandler, CompletionAgent};
pub use router::IntentRouter;
