//! `tandem route` -- one routing turn from the command line.
//!
//! The CLI keeps no routing state between invocations: pass the bound agent
//! and turn counter printed by the previous call with `--agent` / `--turn`.

use console::style;

use tandem_types::routing::{RoutingResult, RoutingState, RoutingStatus};

use crate::cli::output::{self, Output};
use crate::state::AppState;

pub async fn route(
    state: &AppState,
    twin: &str,
    message: &str,
    agent: Option<&str>,
    turn: u32,
    out: Output,
) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct Routed {
        #[serde(flatten)]
        result: RoutingResult,
        state: RoutingState,
    }

    let result = state
        .router
        .route(twin, message, agent, turn)
        .await
        .map(|result| Routed {
            state: result.state(),
            result,
        });

    out.finish(result, |routed| {
        let r = &routed.result;
        println!();
        match (r.status, r.agent) {
            (RoutingStatus::Bound, Some(agent)) => println!(
                "  {} {} (turn {})",
                style("→").green().bold(),
                style(agent).cyan().bold(),
                r.turn_number
            ),
            _ => println!(
                "  {} no agent bound (turn {})",
                style("?").yellow().bold(),
                r.turn_number
            ),
        }
        println!();
        println!("  {}", r.response);
        println!();
        if let Some(confidence) = r.confidence {
            output::hint(format!("confidence {confidence:.2}"));
        }
        let next_agent = r
            .agent
            .map(|a| format!(" --agent {}", a.display_name()))
            .unwrap_or_default();
        output::hint(format!(
            "next: tandem route --twin {twin}{next_agent} --turn {} \"...\"",
            r.turn_number
        ));
    })
}
