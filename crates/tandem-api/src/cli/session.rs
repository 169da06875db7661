//! Group session commands: create, send, messages, read, join, presence.

use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use tandem_types::message::NewMessage;
use tandem_types::session::{Participant, ParticipantKind, Session};

use crate::cli::output::{self, Output};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Create a session with at least two participants.
    Create {
        /// Human participant as `id` or `id:Display Name` (repeatable).
        #[arg(long = "human")]
        humans: Vec<String>,

        /// Assistant participant as `id` or `id:Display Name` (repeatable).
        #[arg(long = "assistant")]
        assistants: Vec<String>,

        /// Session id (generated when omitted).
        #[arg(long)]
        id: Option<String>,

        /// Human-readable session name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Post a message; mentioning an assistant takes its turn.
    Send {
        /// Session id.
        session: String,

        /// Sender participant id.
        #[arg(long = "from")]
        sender: String,

        /// Message text.
        body: String,

        /// Direct the message to one participant instead of the whole session.
        #[arg(long = "to")]
        recipient: Option<String>,

        /// Message id (makes retries idempotent).
        #[arg(long)]
        id: Option<String>,

        /// Continuation context returned by the previous assistant turn.
        #[arg(long)]
        context: Option<String>,
    },

    /// List a session's messages for one participant.
    Messages {
        /// Session id.
        session: String,

        /// Identity the listing is computed for.
        #[arg(long = "as")]
        requester: String,

        /// Only messages still awaiting this identity's read confirmation.
        #[arg(long)]
        unread: bool,
    },

    /// Record read receipts.
    Read {
        /// Session id.
        session: String,

        /// Participant doing the reading.
        #[arg(long)]
        reader: String,

        /// Message ids to mark.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Add a participant to an existing session.
    Join {
        /// Session id.
        session: String,

        /// Participant as `id` or `id:Display Name`.
        participant: String,

        /// Participant kind: human or assistant.
        #[arg(long, default_value = "human")]
        kind: ParticipantKind,
    },

    /// Mark a participant online or offline.
    Presence {
        /// Session id.
        session: String,

        /// Participant id.
        participant: String,

        /// Mark offline instead of online.
        #[arg(long)]
        offline: bool,
    },
}

/// Parse `id` or `id:Display Name`. A missing name defaults to the id.
fn parse_participant(spec: &str, kind: ParticipantKind) -> Participant {
    let (id, name) = match spec.split_once(':') {
        Some((id, name)) => (id.trim(), name.trim()),
        None => (spec.trim(), ""),
    };
    let name = if name.is_empty() { id } else { name };
    match kind {
        ParticipantKind::Human => Participant::human(id, name),
        ParticipantKind::Assistant => Participant::assistant(id, name),
    }
}

pub async fn handle_session_command(
    cmd: SessionCommand,
    state: &AppState,
    out: Output,
) -> anyhow::Result<()> {
    match cmd {
        SessionCommand::Create {
            humans,
            assistants,
            id,
            name,
        } => {
            let participants = humans
                .iter()
                .map(|h| parse_participant(h, ParticipantKind::Human))
                .chain(
                    assistants
                        .iter()
                        .map(|a| parse_participant(a, ParticipantKind::Assistant)),
                )
                .collect();
            let result = state.sessions.create_session(participants, name, id).await;
            out.finish(result, |session| {
                output::success(format!("Session {} ready", style(&session.id).cyan()));
                print_participants(session);
                output::hint(format!(
                    "Post with: tandem session send {} --from <participant> \"...\"",
                    session.id
                ));
            })
        }

        SessionCommand::Send {
            session,
            sender,
            body,
            recipient,
            id,
            context,
        } => {
            let mut draft = NewMessage::text(sender, recipient, body);
            if let Some(id) = id {
                draft = draft.with_id(id);
            }
            let result = state.sessions.send_message(&session, draft, context).await;
            out.finish(result, |outcome| {
                output::success(format!("Posted {}", style(&outcome.message.id).cyan()));
                if let Some(reply) = &outcome.reply {
                    println!(
                        "  {} {}",
                        style(format!("{}:", reply.sender_id)).magenta().bold(),
                        reply.body
                    );
                    println!();
                }
                if let Some(ctx) = &outcome.updated_context {
                    output::hint(format!("context: {ctx}"));
                }
            })
        }

        SessionCommand::Messages {
            session,
            requester,
            unread,
        } => {
            let result = state.sessions.get_messages(&session, &requester, unread).await;
            out.finish(result, |messages| {
                if messages.is_empty() {
                    println!();
                    println!(
                        "  {} No messages in session {}.",
                        style("i").blue().bold(),
                        style(&session).cyan()
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
                    Cell::new("To").fg(Color::White),
                    Cell::new("Status").fg(Color::White),
                    Cell::new("Message").fg(Color::White),
                ]);
                for enriched in messages {
                    let m = &enriched.message;
                    let to = m.recipient_id.as_deref().unwrap_or("everyone");
                    let status = if enriched.needs_read_confirmation {
                        Cell::new("unread").fg(Color::Yellow)
                    } else {
                        output::status_cell(enriched.status)
                    };
                    table.add_row(vec![
                        Cell::new(output::truncate(&m.id, 12)),
                        Cell::new(&m.sender_id),
                        Cell::new(to),
                        status,
                        Cell::new(output::truncate(&m.body, 48)),
                    ]);
                }
                println!();
                println!("{table}");
                println!();
            })
        }

        SessionCommand::Read {
            session,
            reader,
            ids,
        } => {
            let result = state.sessions.mark_read(&session, &ids, &reader).await;
            out.finish(result, |receipt| {
                output::success(format!("Marked {} message(s) read", receipt.marked.len()));
            })
        }

        SessionCommand::Join {
            session,
            participant,
            kind,
        } => {
            let participant = parse_participant(&participant, kind);
            let joined_id = participant.id.clone();
            let result = state.sessions.add_participant(&session, participant).await;
            out.finish(result, |session| {
                output::success(format!(
                    "{} is in session {}",
                    style(&joined_id).cyan(),
                    style(&session.id).cyan()
                ));
                print_participants(session);
            })
        }

        SessionCommand::Presence {
            session,
            participant,
            offline,
        } => {
            let result = state
                .sessions
                .set_presence(&session, &participant, !offline)
                .await;
            out.finish(result, print_participants)
        }
    }
}

fn print_participants(session: &Session) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Participant").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Online").fg(Color::White),
    ]);
    for p in &session.participants {
        let online = if p.online {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&p.id),
            Cell::new(&p.display_name),
            Cell::new(p.kind.to_string()),
            online,
        ]);
    }
    println!("{table}");
    println!();
}
