//! Intent-routing types: the closed agent set and per-turn routing state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of sub-agents a routing session can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentName {
    #[serde(rename = "Mis-Memorias")]
    Memories,
    #[serde(rename = "Mis-Documentos")]
    Documents,
    #[serde(rename = "Mi-Familia")]
    Family,
    #[serde(rename = "Mi-Agenda")]
    Agenda,
}

impl AgentName {
    pub const ALL: [AgentName; 4] = [
        AgentName::Memories,
        AgentName::Documents,
        AgentName::Family,
        AgentName::Agenda,
    ];

    /// User-facing name, also the wire name.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentName::Memories => "Mis-Memorias",
            AgentName::Documents => "Mis-Documentos",
            AgentName::Family => "Mi-Familia",
            AgentName::Agenda => "Mi-Agenda",
        }
    }

    /// English identifier accepted as an alternative spelling.
    pub fn slug(&self) -> &'static str {
        match self {
            AgentName::Memories => "memories",
            AgentName::Documents => "documents",
            AgentName::Family => "family",
            AgentName::Agenda => "agenda",
        }
    }

    /// Comma-separated display names, for clarification prompts.
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(AgentName::display_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AgentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        let compact = wanted.replace('-', "");
        AgentName::ALL
            .into_iter()
            .find(|agent| {
                let display = normalize_name(agent.display_name());
                display == wanted || display.replace('-', "") == compact || agent.slug() == wanted
            })
            .ok_or_else(|| format!("unknown agent: '{s}'"))
    }
}

/// Lowercase, fold Spanish accents, and unify separators to `-`.
pub fn normalize_name(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            '_' | ' ' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Output of an intent classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub agent: Option<AgentName>,
    /// 0.0 - 1.0.
    pub confidence: f32,
    pub reason: String,
}

impl Classification {
    pub fn unmatched(reason: impl Into<String>) -> Self {
        Self {
            agent: None,
            confidence: 0.0,
            reason: reason.into(),
        }
    }
}

/// Whether a routing session has an agent bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStatus {
    Unbound,
    Bound,
}

/// Per-turn routing record, owned by the caller between turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingState {
    #[serde(default)]
    pub agent: Option<AgentName>,
    #[serde(default)]
    pub turn_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reason: Option<String>,
}

impl RoutingState {
    pub fn status(&self) -> RoutingStatus {
        if self.agent.is_some() {
            RoutingStatus::Bound
        } else {
            RoutingStatus::Unbound
        }
    }

    /// Drop the binding while keeping the turn counter monotonic.
    pub fn cleared(&self) -> Self {
        Self {
            agent: None,
            turn_number: self.turn_number,
            last_confidence: None,
            last_reason: None,
        }
    }
}

/// Response envelope of a single routing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub twin_id: String,
    pub status: RoutingStatus,
    #[serde(default)]
    pub agent: Option<AgentName>,
    pub turn_number: u32,
    /// Plain-text response (markup stripped).
    pub response: String,
    /// Whether a sub-agent handler ran on this turn.
    pub invoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RoutingResult {
    /// The state the caller should pass back on the next turn.
    pub fn state(&self) -> RoutingState {
        RoutingState {
            agent: self.agent,
            turn_number: self.turn_number,
            last_confidence: self.confidence,
            last_reason: self.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_parse_variants() {
        assert_eq!("Mis-Memorias".parse::<AgentName>().unwrap(), AgentName::Memories);
        assert_eq!("mis memorias".parse::<AgentName>().unwrap(), AgentName::Memories);
        assert_eq!("MisMemorias".parse::<AgentName>().unwrap(), AgentName::Memories);
        assert_eq!("family".parse::<AgentName>().unwrap(), AgentName::Family);
        assert_eq!("mi_agenda".parse::<AgentName>().unwrap(), AgentName::Agenda);
        assert!("Mis-Recetas".parse::<AgentName>().is_err());
    }

    #[test]
    fn test_agent_serde_uses_display_name() {
        let json = serde_json::to_string(&AgentName::Documents).unwrap();
        assert_eq!(json, "\"Mis-Documentos\"");
        let parsed: AgentName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, AgentName::Documents);
    }

    #[test]
    fn test_normalize_folds_accents() {
        assert_eq!(normalize_name("  Mí Álbum_Ñ "), "mi-album-n");
    }

    #[test]
    fn test_state_status_and_clear() {
        let state = RoutingState {
            agent: Some(AgentName::Family),
            turn_number: 4,
            last_confidence: Some(0.9),
            last_reason: Some("keyword".into()),
        };
        assert_eq!(state.status(), RoutingStatus::Bound);
        let cleared = state.cleared();
        assert_eq!(cleared.status(), RoutingStatus::Unbound);
        assert_eq!(cleared.turn_number, 4);
    }

    #[test]
    fn test_choices_lists_all() {
        let choices = AgentName::choices();
        for agent in AgentName::ALL {
            assert!(choices.contains(agent.display_name()));
        }
    }
}
