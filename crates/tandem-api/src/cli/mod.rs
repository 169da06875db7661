//! CLI command definitions and dispatch for the `tandem` binary.
//!
//! Uses clap derive macros for argument parsing. Two-party commands sit at
//! the top level (`tandem send`, `tandem read`); group sessions follow a
//! noun-verb pattern (`tandem session create`).

pub mod conversation;
pub mod output;
pub mod route;
pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use tandem_types::conversation::{OriginMode, PartyRole};

/// Two-party conversations, group sessions, and intent routing.
#[derive(Parser)]
#[command(name = "tandem", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use an in-memory store instead of the SQLite database (state is lost on exit).
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a message between two participants.
    Send {
        /// Sender identifier.
        #[arg(long = "from")]
        sender: String,

        /// Recipient identifier.
        #[arg(long = "to")]
        recipient: String,

        /// Message text.
        body: String,

        /// Message id (makes retries idempotent).
        #[arg(long)]
        id: Option<String>,

        /// Key derivation mode: canonical, initiator-first, responder-first.
        #[arg(long, default_value = "canonical")]
        origin: OriginMode,

        /// Sender's role for directed keys.
        #[arg(long, default_value = "initiator", value_parser = parse_role)]
        role: PartyRole,

        /// Owning application id recorded on a new conversation.
        #[arg(long)]
        owner: Option<String>,
    },

    /// Mark messages of a conversation as read.
    Read {
        /// Conversation key (e.g. `ana_beto`).
        key: String,

        /// Identity doing the reading.
        #[arg(long)]
        reader: String,

        /// Message ids to mark.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List the messages of a conversation.
    #[command(alias = "ls")]
    Messages {
        /// Conversation key (e.g. `ana_beto`).
        key: String,

        /// Identity the listing is computed for.
        #[arg(long = "as")]
        requester: String,

        /// Only messages still awaiting this identity's read confirmation.
        #[arg(long)]
        unread: bool,
    },

    /// Manage group sessions.
    Session {
        #[command(subcommand)]
        action: session::SessionCommand,
    },

    /// Route one utterance to a sub-agent.
    Route {
        /// Twin (user) the utterance belongs to.
        #[arg(long)]
        twin: String,

        /// Utterance text.
        message: String,

        /// Agent already bound from a previous turn.
        #[arg(long)]
        agent: Option<String>,

        /// Turn counter returned by the previous turn.
        #[arg(long, default_value = "0")]
        turn: u32,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Emit one JSON object per log line.
        #[arg(long)]
        log_json: bool,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long, env = "TANDEM_OTEL")]
        otel: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn parse_role(s: &str) -> Result<PartyRole, String> {
    match s.to_lowercase().as_str() {
        "initiator" => Ok(PartyRole::Initiator),
        "responder" => Ok(PartyRole::Responder),
        other => Err(format!("invalid role: '{other}' (expected initiator or responder)")),
    }
}
