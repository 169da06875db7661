//! Intent classifiers.
//!
//! The router only needs `classify(text) -> Classification`. Two strategies
//! are provided: a deterministic keyword matcher and a classifier that asks
//! the completion collaborator to pick an agent name.

use std::future::Future;
use std::sync::Arc;

use tandem_types::collaborator::CompletionRequest;
use tandem_types::error::CoreError;
use tandem_types::routing::{AgentName, Classification};
use tracing::debug;

use crate::collaborator::CompletionCollaborator;

pub trait IntentClassifier: Send + Sync {
    fn classify(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Classification, CoreError>> + Send;
}

/// Lowercase, fold accents, and reduce everything but letters and digits to
/// single spaces.
fn fold(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            'á' | 'Á' | 'à' | 'À' => 'a',
            'é' | 'É' | 'è' | 'È' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' | 'ò' | 'Ò' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            c if c.is_alphanumeric() => c.to_ascii_lowercase(),
            _ => ' ',
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn keywords(agent: AgentName) -> &'static [&'static str] {
    match agent {
        AgentName::Memories => &[
            "memoria", "memorias", "recuerdo", "recuerdos", "recordar", "anecdota",
            "historia", "historias", "foto", "fotos", "memory", "memories", "remember",
            "story", "stories", "photo", "photos",
        ],
        AgentName::Documents => &[
            "documento", "documentos", "archivo", "archivos", "pasaporte", "dni",
            "factura", "facturas", "contrato", "recibo", "papeles", "document",
            "documents", "file", "files", "passport", "invoice", "contract", "receipt",
        ],
        AgentName::Family => &[
            "familia", "familiar", "hijo", "hija", "hijos", "madre", "padre", "mama",
            "papa", "abuela", "abuelo", "hermano", "hermana", "pareja", "primo", "prima",
            "family", "mother", "father", "son", "daughter", "sister", "brother",
            "grandmother", "grandfather", "relative", "relatives",
        ],
        AgentName::Agenda => &[
            "agenda", "cita", "citas", "recordatorio", "recordatorios", "calendario",
            "reunion", "evento", "eventos", "cumpleanos", "calendar", "appointment",
            "reminder", "reminders", "meeting", "schedule", "event", "birthday",
        ],
    }
}

/// Deterministic classifier over agent names and Spanish/English keywords.
///
/// An explicit agent name ("Mis-Memorias", "mi agenda") wins outright.
/// Otherwise the agent with the most keyword hits is chosen; ties and
/// zero hits leave the utterance unmatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn classify_text(&self, text: &str) -> Classification {
        let folded = fold(text);
        let padded = format!(" {folded} ");

        for agent in AgentName::ALL {
            let name = fold(agent.display_name());
            let compact = name.replace(' ', "");
            if padded.contains(&format!(" {name} ")) || padded.contains(&format!(" {compact} ")) {
                return Classification {
                    agent: Some(agent),
                    confidence: 0.95,
                    reason: format!("message names {agent}"),
                };
            }
        }

        let words: Vec<&str> = folded.split(' ').collect();
        let mut scores: Vec<(AgentName, usize)> = AgentName::ALL
            .into_iter()
            .map(|agent| {
                let hits = words.iter().filter(|w| keywords(agent).contains(w)).count();
                (agent, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .collect();
        scores.sort_by(|a, b| b.1.cmp(&a.1));

        match scores.as_slice() {
            [] => Classification::unmatched("no agent keywords found"),
            [(_, top), (_, second), ..] if top == second => {
                Classification::unmatched("keywords match more than one agent")
            }
            [(agent, hits), ..] => Classification {
                agent: Some(*agent),
                confidence: (0.5 + 0.1 * *hits as f32).min(0.85),
                reason: format!("{hits} keyword(s) for {agent}"),
            },
        }
    }
}

impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, CoreError> {
        Ok(self.classify_text(text))
    }
}

const CLASSIFIER_INSTRUCTION: &str = "Clasifica el mensaje del usuario. Responde únicamente con \
el nombre de uno de estos agentes: Mis-Memorias (recuerdos e historias), Mis-Documentos \
(documentos y archivos), Mi-Familia (familia y relaciones), Mi-Agenda (citas y recordatorios). \
Si ninguno encaja, responde none.";

/// Asks the completion collaborator to name the agent.
pub struct CompletionClassifier<C: CompletionCollaborator> {
    collaborator: Arc<C>,
}

impl<C: CompletionCollaborator> CompletionClassifier<C> {
    pub fn new(collaborator: Arc<C>) -> Self {
        Self { collaborator }
    }
}

/// Interpret the collaborator's answer. Anything that is not exactly one
/// agent name is unmatched.
fn parse_answer(answer: &str) -> Classification {
    let cleaned = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
        .trim();
    match cleaned.to_lowercase().as_str() {
        "" | "none" | "null" | "ninguno" => {
            Classification::unmatched("classifier found no matching agent")
        }
        _ => match cleaned.parse::<AgentName>() {
            Ok(agent) => Classification {
                agent: Some(agent),
                confidence: 0.9,
                reason: format!("classifier selected {agent}"),
            },
            Err(_) => Classification::unmatched(format!("unrecognized classifier answer '{cleaned}'")),
        },
    }
}

impl<C: CompletionCollaborator> IntentClassifier for CompletionClassifier<C> {
    async fn classify(&self, text: &str) -> Result<Classification, CoreError> {
        let request = CompletionRequest::new(text).with_instruction(CLASSIFIER_INSTRUCTION);
        let completion = self.collaborator.complete(&request).await?;
        let classification = parse_answer(&completion.text);
        debug!(answer = %completion.text, agent = ?classification.agent, "completion classifier answered");
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCollaborator;
    use tandem_types::error::{CollaboratorError, ErrorKind};

    fn agent_for(text: &str) -> Option<AgentName> {
        KeywordClassifier.classify_text(text).agent
    }

    #[test]
    fn test_explicit_name_wins() {
        let c = KeywordClassifier.classify_text("I want the Mis-Memorias agent");
        assert_eq!(c.agent, Some(AgentName::Memories));
        assert!(c.confidence > 0.9);

        assert_eq!(agent_for("pásame con mi agenda por favor"), Some(AgentName::Agenda));
        assert_eq!(agent_for("MIS_DOCUMENTOS"), Some(AgentName::Documents));
        assert_eq!(agent_for("hablar con mifamilia"), Some(AgentName::Family));
    }

    #[test]
    fn test_keywords_spanish_and_english() {
        assert_eq!(agent_for("necesito renovar el pasaporte"), Some(AgentName::Documents));
        assert_eq!(agent_for("Remind me about the dentist appointment"), Some(AgentName::Agenda));
        assert_eq!(agent_for("cuéntame un recuerdo de la abuela y sus recuerdos"), Some(AgentName::Memories));
        assert_eq!(agent_for("Reunión el martes"), Some(AgentName::Agenda));
    }

    #[test]
    fn test_unmatched_and_ambiguous() {
        assert_eq!(agent_for("hola, ¿qué tal?"), None);
        // one family keyword, one document keyword
        assert_eq!(agent_for("el pasaporte de mi hija"), None);
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer(" \"Mi-Agenda\". ").agent, Some(AgentName::Agenda));
        assert_eq!(parse_answer("documents").agent, Some(AgentName::Documents));
        assert_eq!(parse_answer("none").agent, None);
        assert_eq!(parse_answer("Mis-Recetas").agent, None);
        assert_eq!(parse_answer("Mi-Agenda, or maybe Mi-Familia").agent, None);
    }

    #[tokio::test]
    async fn completion_classifier_uses_collaborator() {
        let collaborator = Arc::new(ScriptedCollaborator::new().reply("Mi-Familia", None));
        let classifier = CompletionClassifier::new(collaborator.clone());
        let c = classifier.classify("quiero hablar de mi hermano").await.unwrap();
        assert_eq!(c.agent, Some(AgentName::Family));

        let requests = collaborator.requests();
        assert_eq!(requests[0].prompt, "quiero hablar de mi hermano");
        assert!(requests[0].instruction.is_some());
    }

    #[tokio::test]
    async fn completion_classifier_failure() {
        let collaborator = Arc::new(
            ScriptedCollaborator::new().fail(CollaboratorError::Request("timeout".into())),
        );
        let err = CompletionClassifier::new(collaborator)
            .classify("hola")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
    }
}
