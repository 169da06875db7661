//! Two-party conversation commands: send, read, messages.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use tandem_types::conversation::{ConversationKey, OriginMode, PartyRole};
use tandem_types::message::SendMessageRequest;

use crate::cli::output::{self, Output};
use crate::state::AppState;

pub struct SendArgs {
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub id: Option<String>,
    pub origin: OriginMode,
    pub role: PartyRole,
    pub owner: Option<String>,
}

/// Send a message and confirm delivery.
///
/// # Examples
///
/// ```bash
/// tandem send --from ana --to beto "hola"
/// tandem send --from coach --to ana --origin initiator-first "¿empezamos?"
/// ```
pub async fn send(state: &AppState, args: SendArgs, out: Output) -> anyhow::Result<()> {
    let mut request = SendMessageRequest::new(args.sender, args.recipient, args.body);
    request.origin = args.origin;
    request.sender_role = args.role;
    request.owner_id = args.owner;
    if let Some(id) = args.id {
        request = request.with_message_id(id);
    }

    #[derive(serde::Serialize)]
    struct Sent {
        conversation_key: ConversationKey,
        message_id: String,
        status: tandem_types::message::MessageStatus,
        inserted: bool,
        cost: f64,
    }

    let result = state.conversations.send(request).await.map(|outcome| Sent {
        conversation_key: outcome.conversation.key,
        message_id: outcome.message.id.clone(),
        status: outcome.message.status(),
        inserted: outcome.inserted,
        cost: outcome.cost,
    });

    out.finish(result, |sent| {
        let verb = if sent.inserted { "Sent" } else { "Already stored" };
        output::success(format!(
            "{verb} {} in {} ({})",
            style(&sent.message_id).cyan(),
            style(&sent.conversation_key).bold(),
            sent.status
        ));
    })
}

/// Mark messages read by `reader`.
pub async fn read(
    state: &AppState,
    key: &str,
    reader: &str,
    ids: &[String],
    out: Output,
) -> anyhow::Result<()> {
    let result = match ConversationKey::parse(key) {
        Ok(key) => state.conversations.mark_read(&key, ids, reader).await,
        Err(e) => Err(e),
    };

    out.finish(result, |receipt| {
        output::success(format!("Marked {} message(s) read", receipt.marked.len()));
        if receipt.already_read + receipt.not_found + receipt.not_addressed > 0 {
            output::hint(format!(
                "already read: {}, not found: {}, not addressed to {reader}: {}",
                receipt.already_read, receipt.not_found, receipt.not_addressed
            ));
        }
    })
}

/// List a conversation's messages from `requester`'s point of view.
pub async fn messages(
    state: &AppState,
    key: &str,
    requester: &str,
    unread_only: bool,
    out: Output,
) -> anyhow::Result<()> {
    let result = match ConversationKey::parse(key) {
        Ok(key) => {
            state
                .conversations
                .get_messages(&key, requester, unread_only)
                .await
        }
        Err(e) => Err(e),
    };

    out.finish(result, |messages| {
        if messages.is_empty() {
            println!();
            println!(
                "  {} No messages in {} for {}.",
                style("i").blue().bold(),
                style(key).cyan(),
                style(requester).cyan()
            );
            println!();
            return;
        }

        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Id").fg(Color::White),
            Cell::new("From").fg(Color::White),
            Cell::new("Sent").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Message").fg(Color::White),
        ]);

        for enriched in messages {
            let m = &enriched.message;
            let from = if enriched.is_mine {
                format!("{} (you)", m.sender_id)
            } else {
                m.sender_id.clone()
            };
            let body = match (&m.voice, m.body.is_empty()) {
                (Some(voice), true) => format!("[voice] {}", voice.uri),
                _ => output::truncate(&m.body, 48),
            };
            table.add_row(vec![
                Cell::new(output::truncate(&m.id, 12)),
                Cell::new(from),
                Cell::new(m.created_at.format("%Y-%m-%d %H:%M").to_string()),
                output::status_cell(enriched.status),
                Cell::new(body),
            ]);
        }

        println!();
        println!("{table}");
        let unread = messages.iter().filter(|m| m.needs_read_confirmation).count();
        if unread > 0 {
            println!();
            output::hint(format!(
                "{unread} unread. Confirm with: tandem read {key} --reader {requester} <ids>"
            ));
        }
    })
}
