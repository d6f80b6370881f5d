use poise::CreateReply;
use serenity::builder::CreateEmbed;

use crate::{Context, Error};

/// Provides help information about available commands
#[poise::command(slash_command, prefix_command, category = "Builtin")]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let lines: Vec<String> = ctx
        .framework()
        .options()
        .commands
        .iter()
        .filter(|cmd| !cmd.hide_in_help)
        .map(|cmd| {
            format!(
                "**{}** – *{}*",
                cmd.name,
                cmd.description.as_deref().unwrap_or("No description provided.")
            )
        })
        .collect();

    let embed = CreateEmbed::new()
        .title("Available Commands")
        .description(lines.join("\n"))
        .color(0x5865F2);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
