//! Interactive move loop for an active game.

use std::str::FromStr;

use anyhow::Result;
use serde_json::json;
use tac_core::ClickOutcome;
use tac_realtime::{listener, ChannelEventKind, Listener};
use tac_session::SessionDirector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::Context;
use crate::output::{self, OutputFormat};

const HELP: &str = "\
Commands:
  pick <n>, <n>   click field n (first click picks up, second drops)
  undo            take back your last move
  board           show the board
  status          show connection status
  link            show the share link
  quit            leave the game";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayCommand {
    Click(usize),
    Undo,
    Board,
    Status,
    Link,
    Help,
    Quit,
}

fn parse_field(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("Not a field number: {raw}"))
}

impl FromStr for PlayCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["pick" | "p", field] => parse_field(field).map(PlayCommand::Click),
            [field] if field.starts_with(|c: char| c.is_ascii_digit()) => {
                parse_field(field).map(PlayCommand::Click)
            }
            ["undo" | "u"] => Ok(PlayCommand::Undo),
            ["board" | "b"] => Ok(PlayCommand::Board),
            ["status" | "s"] => Ok(PlayCommand::Status),
            ["link" | "l"] => Ok(PlayCommand::Link),
            ["help" | "h" | "?"] => Ok(PlayCommand::Help),
            ["quit" | "q" | "exit"] => Ok(PlayCommand::Quit),
            _ => Err(format!("Unknown command: {line} (type 'help')")),
        }
    }
}

/// Reads commands from stdin until `quit` or end of input, then leaves the
/// game.
pub async fn run(ctx: &Context, director: &SessionDirector) -> Result<()> {
    let format = ctx.format;
    let notify: Listener = listener(move |event| output::print_event(event, &format));
    for kind in ChannelEventKind::ALL {
        director.events().on(kind, notify.clone());
    }

    output::print_board(&director.fields(), director.selected(), &format);
    if format == OutputFormat::Text {
        println!("Type 'help' for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut moved = false;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<PlayCommand>() {
            Ok(command) => command,
            Err(message) => {
                output::print_error(&message, &format);
                continue;
            }
        };

        match command {
            PlayCommand::Click(index) => {
                let outcome = director.click(index);
                moved |= matches!(outcome, ClickOutcome::Moved(_));
                report_click(director, &outcome, &format);
            }
            PlayCommand::Undo => {
                if director.undo().is_some() {
                    moved = true;
                    output::print_success("Move undone", &format);
                    output::print_board(&director.fields(), director.selected(), &format);
                } else {
                    output::print_success("Nothing to undo", &format);
                }
            }
            PlayCommand::Board => {
                output::print_board(&director.fields(), director.selected(), &format);
            }
            PlayCommand::Status => print_status(ctx, director),
            PlayCommand::Link => match director.share_link(&ctx.config.share_base_url()?) {
                Ok(link) => output::print_success(link.as_str(), &format),
                Err(err) => output::print_error(&err.to_string(), &format),
            },
            PlayCommand::Help => println!("{HELP}"),
            PlayCommand::Quit => break,
        }
    }

    for kind in ChannelEventKind::ALL {
        director.events().off(kind, &notify);
    }

    // Queued channel writes do not outlive the runtime.
    if moved {
        if let Some(game_id) = director.active_game() {
            if let Err(err) = director.store().put(&game_id, &director.fields()).await {
                warn!(game_id = %game_id, error = %err, "Final board not stored remotely");
            }
        }
    }
    director.leave_session();
    Ok(())
}

fn report_click(director: &SessionDirector, outcome: &ClickOutcome, format: &OutputFormat) {
    match (format, outcome) {
        (OutputFormat::Text, ClickOutcome::Rejected(_)) => {
            output::print_error(&output::describe_outcome(outcome), format);
        }
        (OutputFormat::Text, ClickOutcome::Moved(fields)) => {
            output::print_board(fields, None, format);
        }
        (OutputFormat::Text, _) => println!("{}", output::describe_outcome(outcome)),
        (OutputFormat::Json, _) => {
            let ok = !matches!(outcome, ClickOutcome::Rejected(_));
            println!(
                "{}",
                json!({
                    "ok": ok,
                    "message": output::describe_outcome(outcome),
                    "selected": director.selected(),
                })
            );
        }
    }
}

fn print_status(ctx: &Context, director: &SessionDirector) {
    let game = director
        .active_game()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let state = director.connection_state();
    match ctx.format {
        OutputFormat::Text => {
            output::print_heading("Status");
            output::print_row("Game", &game);
            output::print_row("Connection", state.label());
            output::print_row("Failed connects", &director.channel().attempts().to_string());
            output::print_row("Undo steps", &director.history_len().to_string());
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "game_id": game,
                "connection": state.label(),
                "attempts": director.channel().attempts(),
                "history": director.history_len(),
            })
        ),
    }
}
