//! Sub-agent handlers and the dispatch table.
//!
//! `AgentHandler` is an RPITIT trait, so handlers of different concrete types
//! are stored as [`BoxAgentHandler`] (object-safe `AgentHandlerDyn` plus a
//! blanket impl, same shape as `BoxCompletionCollaborator`).

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tandem_types::collaborator::CompletionRequest;
use tandem_types::error::CoreError;
use tandem_types::routing::AgentName;

use crate::collaborator::CompletionCollaborator;

/// One turn handed to a bound sub-agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTurn {
    pub twin_id: String,
    pub message: String,
    /// The turn number this invocation produces (already incremented).
    pub turn_number: u32,
}

pub trait AgentHandler: Send + Sync {
    fn agent(&self) -> AgentName;

    /// Free-form reply text. May contain markup; the router strips it.
    fn handle(&self, turn: &AgentTurn) -> impl Future<Output = Result<String, CoreError>> + Send;
}

pub trait AgentHandlerDyn: Send + Sync {
    fn agent(&self) -> AgentName;

    fn handle_boxed<'a>(
        &'a self,
        turn: &'a AgentTurn,
    ) -> Pin<Box<dyn Future<Output = Result<String, CoreError>> + Send + 'a>>;
}

impl<T: AgentHandler> AgentHandlerDyn for T {
    fn agent(&self) -> AgentName {
        AgentHandler::agent(self)
    }

    fn handle_boxed<'a>(
        &'a self,
        turn: &'a AgentTurn,
    ) -> Pin<Box<dyn Future<Output = Result<String, CoreError>> + Send + 'a>> {
        Box::pin(self.handle(turn))
    }
}

/// Type-erased handler stored in the [`AgentRegistry`].
pub struct BoxAgentHandler {
    inner: Box<dyn AgentHandlerDyn>,
}

impl BoxAgentHandler {
    pub fn new<T: AgentHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Box::new(handler),
        }
    }

    pub fn agent(&self) -> AgentName {
        self.inner.agent()
    }

    pub async fn handle(&self, turn: &AgentTurn) -> Result<String, CoreError> {
        self.inner.handle_boxed(turn).await
    }
}

/// The fixed dispatch table: at most one handler per agent.
#[derive(Default)]
pub struct AgentRegistry {
    handlers: BTreeMap<AgentName, BoxAgentHandler>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a [`CompletionAgent`] for every agent, all sharing one
    /// collaborator.
    pub fn with_completion_agents<C: CompletionCollaborator + 'static>(collaborator: Arc<C>) -> Self {
        let mut registry = Self::new();
        for agent in AgentName::ALL {
            registry.register(CompletionAgent::new(agent, collaborator.clone()));
        }
        registry
    }

    /// Register `handler`, replacing any handler for the same agent.
    pub fn register<T: AgentHandler + 'static>(&mut self, handler: T) {
        let handler = BoxAgentHandler::new(handler);
        self.handlers.insert(handler.agent(), handler);
    }

    pub fn get(&self, agent: AgentName) -> Option<&BoxAgentHandler> {
        self.handlers.get(&agent)
    }

    pub fn contains(&self, agent: AgentName) -> bool {
        self.handlers.contains_key(&agent)
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentName> + '_ {
        self.handlers.keys().copied()
    }

    /// Comma-separated display names of the registered agents.
    pub fn choices(&self) -> String {
        self.agents()
            .map(|a| a.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn default_instruction(agent: AgentName) -> &'static str {
    match agent {
        AgentName::Memories => {
            "Eres Mis-Memorias. Ayudas a guardar y recordar anécdotas, historias y fotos de la vida del usuario."
        }
        AgentName::Documents => {
            "Eres Mis-Documentos. Ayudas a localizar, resumir y organizar los documentos personales del usuario."
        }
        AgentName::Family => {
            "Eres Mi-Familia. Ayudas con la información sobre familiares y relaciones del usuario."
        }
        AgentName::Agenda => {
            "Eres Mi-Agenda. Ayudas a gestionar citas, eventos y recordatorios del usuario."
        }
    }
}

/// Handler that forwards the turn to the completion collaborator with a
/// per-agent instruction.
pub struct CompletionAgent<C: CompletionCollaborator> {
    agent: AgentName,
    collaborator: Arc<C>,
    instruction: String,
}

impl<C: CompletionCollaborator> CompletionAgent<C> {
    pub fn new(agent: AgentName, collaborator: Arc<C>) -> Self {
        Self {
            agent,
            collaborator,
            instruction: default_instruction(agent).to_string(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }
}

impl<C: CompletionCollaborator> AgentHandler for CompletionAgent<C> {
    fn agent(&self) -> AgentName {
        self.agent
    }

    async fn handle(&self, turn: &AgentTurn) -> Result<String, CoreError> {
        let request = CompletionRequest::new(turn.message.clone()).with_instruction(format!(
            "{} Usuario: {}. Turno {}.",
            self.instruction, turn.twin_id, turn.turn_number
        ));
        let completion = self.collaborator.complete(&request).await?;
        Ok(completion.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCollaborator;

    #[test]
    fn test_registry_with_completion_agents() {
        let registry =
            AgentRegistry::with_completion_agents(Arc::new(ScriptedCollaborator::new()));
        for agent in AgentName::ALL {
            assert!(registry.contains(agent));
        }
        assert_eq!(
            registry.choices(),
            "Mis-Memorias, Mis-Documentos, Mi-Familia, Mi-Agenda"
        );
    }

    #[test]
    fn test_register_replaces() {
        let collaborator = Arc::new(ScriptedCollaborator::new());
        let mut registry = AgentRegistry::new();
        registry.register(CompletionAgent::new(AgentName::Agenda, collaborator.clone()));
        registry.register(
            CompletionAgent::new(AgentName::Agenda, collaborator).with_instruction("otra"),
        );
        assert_eq!(registry.agents().count(), 1);
        assert!(!registry.contains(AgentName::Family));
    }

    #[tokio::test]
    async fn completion_agent_forwards_turn() {
        let collaborator = Arc::new(ScriptedCollaborator::new().reply("Tienes cita a las 10.", None));
        let handler = BoxAgentHandler::new(CompletionAgent::new(AgentName::Agenda, collaborator.clone()));

        let reply = handler
            .handle(&AgentTurn {
                twin_id: "twin-1".into(),
                message: "¿qué tengo mañana?".into(),
                turn_number: 2,
            })
            .await
            .unwrap();
        assert_eq!(reply, "Tienes cita a las 10.");

        let requests = collaborator.requests();
        let request = &requests[0];
        assert_eq!(request.prompt, "¿qué tengo mañana?");
        let instruction = request.instruction.as_deref().unwrap();
        assert!(instruction.starts_with("Eres Mi-Agenda"));
        assert!(instruction.contains("twin-1"));
    }
}
