//! Mention-token detection.
//!
//! A mention is the configured prefix immediately followed by an assistant
//! participant's id, matched case-insensitively and bounded on both sides so
//! `mail@bot` and `@bot-2` do not mention `bot`.

use regex::RegexBuilder;
use tandem_types::session::{Participant, Session};

/// The assistant mentioned earliest in `body`, ignoring `sender` itself.
///
/// Candidate ids are matched in a single pass as one alternation, longest first.
pub fn mentioned_assistant<'a>(
    session: &'a Session,
    body: &str,
    prefix: &str,
    sender: &str,
) -> Option<&'a Participant> {
    let mut candidates: Vec<&Participant> =
        session.assistants().filter(|p| p.id != sender).collect();
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by_key(|p| std::cmp::Reverse(p.id.len()));

    let ids = candidates
        .iter()
        .map(|p| regex::escape(&p.id))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?:^|[^\w]){}((?:{ids}))(?:[^\w-]|$)",
        regex::escape(prefix)
    );
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()?;

    let matched = re.captures(body)?.get(1)?.as_str().to_lowercase();
    candidates
        .into_iter()
        .find(|p| p.id.to_lowercase() == matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session() -> Session {
        Session {
            id: "s1".into(),
            name: None,
            participants: vec![
                Participant::human("alice", "Alice"),
                Participant::assistant("bot", "Tandem"),
                Participant::assistant("helper", "Helper"),
            ],
            context: None,
            messages: Vec::new(),
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
        }
    }

    fn mentioned(body: &str) -> Option<String> {
        let session = session();
        mentioned_assistant(&session, body, "@", "alice").map(|p| p.id.clone())
    }

    #[test]
    fn test_detects_mention() {
        assert_eq!(mentioned("@bot what's on today?").as_deref(), Some("bot"));
        assert_eq!(mentioned("hey @BOT, ayuda").as_deref(), Some("bot"));
        assert_eq!(mentioned("thanks @bot").as_deref(), Some("bot"));
    }

    #[test]
    fn test_word_bounded() {
        assert_eq!(mentioned("mail@bot.com is mine"), None);
        assert_eq!(mentioned("@bot-2 is someone else"), None);
        assert_eq!(mentioned("@botanist"), None);
        assert_eq!(mentioned("bot without prefix"), None);
    }

    #[test]
    fn test_earliest_mention_wins() {
        assert_eq!(mentioned("@helper then @bot").as_deref(), Some("helper"));
    }

    #[test]
    fn test_humans_and_self_are_not_mentions() {
        let session = session();
        assert!(mentioned_assistant(&session, "@alice hola", "@", "bot").is_none());
        assert!(mentioned_assistant(&session, "@bot talking to myself", "@", "bot").is_none());
    }

    #[test]
    fn test_overlapping_ids() {
        let mut session = session();
        session.participants.push(Participant::assistant("botanist", "Botanist"));
        let found = mentioned_assistant(&session, "oye @Botanist, y @bot", "@", "alice");
        assert_eq!(found.map(|p| p.id.as_str()), Some("botanist"));
        let found = mentioned_assistant(&session, "@bot-2 no, @bot sí", "@", "alice");
        assert_eq!(found.map(|p| p.id.as_str()), Some("bot"));
    }

    #[test]
    fn test_custom_prefix() {
        let session = session();
        let found = mentioned_assistant(&session, "!bot ping", "!", "alice");
        assert_eq!(found.map(|p| p.id.as_str()), Some("bot"));
        assert!(mentioned_assistant(&session, "@bot ping", "!", "alice").is_none());
    }
}
