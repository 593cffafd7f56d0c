//! Output formatting for the CLI.

use clap::ValueEnum;
use serde_json::json;
use tac_core::{ClickOutcome, Field, FieldKind, PlayerId, CIRCLE_FIELDS};
use tac_realtime::ChannelEvent;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => {
            println!("{}", json!({ "status": "success", "message": message }));
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            eprintln!("{}", json!({ "status": "error", "message": message }));
        }
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}

/// Print the board with the selected field marked.
pub fn print_board(fields: &[Field], selected: Option<usize>, format: &OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", render_board(fields, selected)),
        OutputFormat::Json => {
            println!("{}", json!({ "fields": fields, "selected": selected }));
        }
    }
}

/// Print a channel notification.
pub fn print_event(event: &ChannelEvent, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("* {}", describe_event(event)),
        OutputFormat::Json => println!("{}", event_json(event)),
    }
}

fn cell(field: &Field, index: usize, selected: Option<usize>) -> String {
    let mark = field
        .marble()
        .map(|m| m.player.to_string())
        .unwrap_or_else(|| ".".to_string());
    if selected == Some(index) {
        format!("[{mark}]")
    } else {
        format!(" {mark} ")
    }
}

/// Text board: circle fields in rows of 16, then each player's target and
/// home slots. Cells show the owning player of the marble or `.`.
pub fn render_board(fields: &[Field], selected: Option<usize>) -> String {
    let mut out = String::new();
    let circle = &fields[..CIRCLE_FIELDS.min(fields.len())];
    for (row, chunk) in circle.chunks(16).enumerate() {
        let start = row * 16;
        let cells: String = chunk
            .iter()
            .enumerate()
            .map(|(offset, field)| cell(field, start + offset, selected))
            .collect();
        out.push_str(&format!("circle {start:>3}:{cells}\n"));
    }

    for kind in [FieldKind::Target, FieldKind::Home] {
        for player in PlayerId::all() {
            let slots: Vec<(usize, &Field)> = fields
                .iter()
                .enumerate()
                .filter(|(_, f)| f.kind() == kind && f.owner() == Some(player))
                .collect();
            let Some((first, _)) = slots.first() else {
                continue;
            };
            let cells: String = slots
                .iter()
                .map(|(index, field)| cell(field, *index, selected))
                .collect();
            out.push_str(&format!("{:<6} P{player} ({first:>2}):{cells}\n", kind.to_string()));
        }
    }
    out
}

/// One-line description of a click result.
pub fn describe_outcome(outcome: &ClickOutcome) -> String {
    match outcome {
        ClickOutcome::Selected(index) => format!("Picked up marble on field {index}"),
        ClickOutcome::Deselected => "Selection cleared".to_string(),
        ClickOutcome::Ignored => "Nothing to pick up there".to_string(),
        ClickOutcome::Rejected(err) => format!("Move rejected: {err}"),
        ClickOutcome::Moved(_) => "Moved".to_string(),
    }
}

pub fn describe_event(event: &ChannelEvent) -> String {
    match event {
        ChannelEvent::Connected {
            game_id,
            local_only: false,
        } => format!("Connected to game {game_id}"),
        ChannelEvent::Connected {
            game_id,
            local_only: true,
        } => format!("Playing game {game_id} in local-only mode"),
        ChannelEvent::Disconnected { reason, .. } => format!("Disconnected ({reason})"),
        ChannelEvent::Error { message, .. } => format!("Connection error: {message}"),
        ChannelEvent::Fallback { .. } => {
            "Realtime sync unavailable, continuing in local-only mode".to_string()
        }
        ChannelEvent::GameUpdate { .. } => "Board updated by another player".to_string(),
    }
}

fn event_json(event: &ChannelEvent) -> serde_json::Value {
    let game_id = event.game_id().as_str();
    match event {
        ChannelEvent::Connected { local_only, .. } => {
            json!({ "event": "connected", "game_id": game_id, "local_only": local_only })
        }
        ChannelEvent::Disconnected { reason, .. } => {
            json!({ "event": "disconnected", "game_id": game_id, "reason": reason.to_string() })
        }
        ChannelEvent::Error { message, .. } => {
            json!({ "event": "error", "game_id": game_id, "message": message })
        }
        ChannelEvent::Fallback { .. } => json!({ "event": "fallback", "game_id": game_id }),
        ChannelEvent::GameUpdate { fields, .. } => {
            json!({ "event": "gameUpdate", "game_id": game_id, "fields": fields })
        }
    }
}
