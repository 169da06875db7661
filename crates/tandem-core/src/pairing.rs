//! Pairing key resolver.
//!
//! Derives the [`ConversationKey`] of a two-party conversation from the two
//! participant identifiers. The derivation is pure and deterministic, so the
//! key doubles as the idempotency key for conversation lookup.

use tandem_types::conversation::{ConversationKey, KEY_SEPARATOR, OriginMode, PairParty, PartyRole};
use tandem_types::error::CoreError;

/// Resolve the conversation key for two parties.
///
/// - `Canonical`: roles are ignored; identifiers are sorted ordinally, so
///   `resolve(a, b) == resolve(b, a)`.
/// - `InitiatorFirst` / `ResponderFirst`: exactly one party must be the
///   initiator; the key is ordered by role, never by argument position.
pub fn resolve(
    a: PairParty<'_>,
    b: PairParty<'_>,
    mode: OriginMode,
) -> Result<ConversationKey, CoreError> {
    let a_id = normalize(a.id)?;
    let b_id = normalize(b.id)?;

    if a_id == b_id {
        return Err(CoreError::invalid(format!(
            "a conversation needs two distinct participants, got '{a_id}' twice"
        )));
    }

    match mode {
        OriginMode::Canonical => {
            let (first, second) = if a_id <= b_id { (a_id, b_id) } else { (b_id, a_id) };
            ConversationKey::from_parts(first, second)
        }
        OriginMode::InitiatorFirst | OriginMode::ResponderFirst => {
            let (initiator, responder) = match (a.role, b.role) {
                (PartyRole::Initiator, PartyRole::Responder) => (a_id, b_id),
                (PartyRole::Responder, PartyRole::Initiator) => (b_id, a_id),
                _ => {
                    return Err(CoreError::invalid(format!(
                        "{mode} keys need one initiator and one responder"
                    )));
                }
            };
            if mode == OriginMode::InitiatorFirst {
                ConversationKey::from_parts(initiator, responder)
            } else {
                ConversationKey::from_parts(responder, initiator)
            }
        }
    }
}

/// Canonical key for two plain identifiers.
pub fn resolve_canonical(a: &str, b: &str) -> Result<ConversationKey, CoreError> {
    resolve(
        PairParty::initiator(a),
        PairParty::responder(b),
        OriginMode::Canonical,
    )
}

fn normalize(id: &str) -> Result<&str, CoreError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CoreError::invalid("participant identifier is empty"));
    }
    if id.contains(KEY_SEPARATOR) {
        return Err(CoreError::invalid(format!(
            "participant identifier '{id}' contains the reserved separator '{KEY_SEPARATOR}'"
        )));
    }
    Ok(id)
}
