//! Intent router.
//!
//! A routing session is Unbound until the classifier picks an agent, and
//! Bound afterwards. The router keeps no state of its own: the caller passes
//! the bound agent and the last turn number back on every call.
//!
//! Turn handling:
//! - Bound (agent supplied): invoke that agent's handler, strip markup.
//! - Unbound: classify. A match binds the agent and confirms it without
//!   invoking the handler; no match returns a clarification prompt.
//! - Every call returns `turn_number + 1`.

use std::time::Duration;

use tandem_types::error::CoreError;
use tandem_types::routing::{AgentName, RoutingResult, RoutingState, RoutingStatus};
use tracing::{debug, info};

use crate::conversation::service::require_identity;
use crate::deadline::within;
use crate::routing::classifier::IntentClassifier;
use crate::routing::handler::{AgentRegistry, AgentTurn};
use crate::routing::markup::strip_markup;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct IntentRouter<K: IntentClassifier> {
    classifier: K,
    registry: AgentRegistry,
    timeout: Duration,
}

impl<K: IntentClassifier> IntentRouter<K> {
    pub fn new(classifier: K, registry: AgentRegistry) -> Self {
        Self {
            classifier,
            registry,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Deadline for each classifier and handler call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Route one utterance.
    ///
    /// A blank `current_agent` is treated as absent. An agent name that does
    /// not parse, or that has no registered handler, fails with
    /// [`CoreError::UnknownAgent`] listing the valid choices.
    pub async fn route(
        &self,
        twin_id: &str,
        message: &str,
        current_agent: Option<&str>,
        turn_number: u32,
    ) -> Result<RoutingResult, CoreError> {
        let twin_id = require_identity(twin_id, "twin")?;
        if message.trim().is_empty() {
            return Err(CoreError::invalid("message is empty"));
        }
        let turn = turn_number.saturating_add(1);

        match current_agent.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                let agent = self.bound_agent(name)?;
                self.invoke(twin_id, message, agent, turn).await
            }
            None => self.classify(twin_id, message, turn).await,
        }
    }

    /// [`Self::route`] driven by the state returned from the previous turn.
    pub async fn route_state(
        &self,
        twin_id: &str,
        message: &str,
        state: &RoutingState,
    ) -> Result<RoutingResult, CoreError> {
        self.route(
            twin_id,
            message,
            state.agent.map(|a| a.display_name()),
            state.turn_number,
        )
        .await
    }

    fn bound_agent(&self, name: &str) -> Result<AgentName, CoreError> {
        let unknown = || CoreError::UnknownAgent {
            name: name.to_string(),
            choices: self.registry.choices(),
        };
        let agent: AgentName = name.parse().map_err(|_| unknown())?;
        if !self.registry.contains(agent) {
            return Err(unknown());
        }
        Ok(agent)
    }

    async fn invoke(
        &self,
        twin_id: &str,
        message: &str,
        agent: AgentName,
        turn: u32,
    ) -> Result<RoutingResult, CoreError> {
        let handler = self.registry.get(agent).ok_or_else(|| CoreError::UnknownAgent {
            name: agent.display_name().to_string(),
            choices: self.registry.choices(),
        })?;

        let agent_turn = AgentTurn {
            twin_id: twin_id.to_string(),
            message: message.to_string(),
            turn_number: turn,
        };
        let raw = within("agent handler", self.timeout, handler.handle(&agent_turn)).await??;
        debug!(twin_id, agent = %agent, turn, "agent handler replied");

        Ok(RoutingResult {
            twin_id: twin_id.to_string(),
            status: RoutingStatus::Bound,
            agent: Some(agent),
            turn_number: turn,
            response: strip_markup(&raw),
            invoked: true,
            confidence: None,
            reason: None,
        })
    }

    async fn classify(
        &self,
        twin_id: &str,
        message: &str,
        turn: u32,
    ) -> Result<RoutingResult, CoreError> {
        let classification =
            within("intent classification", self.timeout, self.classifier.classify(message)).await??;

        let matched = classification
            .agent
            .filter(|agent| self.registry.contains(*agent));

        let (status, response) = match matched {
            Some(agent) => {
                info!(twin_id, agent = %agent, turn, confidence = classification.confidence, "agent bound");
                (
                    RoutingStatus::Bound,
                    format!("Perfecto, te paso con {agent}. ¿En qué te puede ayudar?"),
                )
            }
            None => {
                debug!(twin_id, turn, reason = %classification.reason, "no agent selected");
                (
                    RoutingStatus::Unbound,
                    format!(
                        "No tengo claro con qué agente quieres hablar. Puedes elegir entre: {}.",
                        self.registry.choices()
                    ),
                )
            }
        };

        Ok(RoutingResult {
            twin_id: twin_id.to_string(),
            status,
            agent: matched,
            turn_number: turn,
            response,
            invoked: false,
            confidence: Some(classification.confidence),
            reason: Some(classification.reason),
        })
    }
}
