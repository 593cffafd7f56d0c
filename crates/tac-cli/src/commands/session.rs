//! Session commands.

use anyhow::Result;
use serde_json::json;
use tac_session::{parse_game_reference, share_link};

use super::{open_backends, open_director, play, Context};
use crate::output::{self, OutputFormat};

/// Start a new game and play it.
pub async fn create(ctx: &Context) -> Result<()> {
    let director = open_director(ctx)?;
    let game_id = director.create_session().await?;

    let link = share_link(&ctx.config.share_base_url()?, &game_id);
    match ctx.format {
        OutputFormat::Text => {
            output::print_heading("New game");
            output::print_row("Game", game_id.as_str());
            output::print_row("Share link", link.as_str());
        }
        OutputFormat::Json => {
            println!("{}", json!({ "game_id": game_id, "link": link.as_str() }));
        }
    }

    play::run(ctx, &director).await
}

/// Join an existing game by id or share link and play it.
pub async fn join(ctx: &Context, reference: &str) -> Result<()> {
    let director = open_director(ctx)?;
    let game_id = director.join_session(reference).await?;
    output::print_success(&format!("Joined game {game_id}"), &ctx.format);
    play::run(ctx, &director).await
}

/// Print the last stored board of a game.
pub async fn show(ctx: &Context, reference: &str) -> Result<()> {
    let game_id = parse_game_reference(reference)?;
    let store = open_backends(ctx)?.store;

    match store.get(&game_id).await {
        Some(fields) => {
            if ctx.format == OutputFormat::Text {
                output::print_heading(&format!("Game {game_id}"));
            }
            output::print_board(&fields, None, &ctx.format);
        }
        None => output::print_error(&format!("No stored board for game {game_id}"), &ctx.format),
    }
    Ok(())
}

/// Print the share link for a game.
pub fn link(ctx: &Context, reference: &str) -> Result<()> {
    let game_id = parse_game_reference(reference)?;
    let link = share_link(&ctx.config.share_base_url()?, &game_id);
    match ctx.format {
        OutputFormat::Text => println!("{link}"),
        OutputFormat::Json => println!("{}", json!({ "game_id": game_id, "link": link.as_str() })),
    }
    Ok(())
}
