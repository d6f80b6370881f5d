use std::time::Duration;

use tracing::info;

use crate::config::KNOWN_MODULES;
use crate::{Context, Error};

/// `Hh Mm Ss`
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

/// Replies with Pong! and the bot's latency
#[poise::command(slash_command, prefix_command, category = "Builtin")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency_ms = ctx.ping().await.as_millis();
    info!("User {} invoked ping command. Latency: {latency_ms}ms", ctx.author().name);
    ctx.reply(format!("Pong! ({latency_ms}ms)")).await?;
    Ok(())
}

/// Replies with the bot's uptime
#[poise::command(slash_command, prefix_command, category = "Builtin")]
pub async fn uptime(ctx: Context<'_>) -> Result<(), Error> {
    let uptime = format_uptime(ctx.data().started_at.elapsed());
    info!("User {} invoked uptime command. Uptime: {uptime}", ctx.author().name);
    ctx.reply(format!("Uptime: {uptime}")).await?;
    Ok(())
}

/// Lists enabled and disabled modules with descriptions
#[poise::command(slash_command, prefix_command, category = "Builtin")]
pub async fn listmodules(ctx: Context<'_>) -> Result<(), Error> {
    info!("User {} invoked listmodules command.", ctx.author().name);
    let config = &ctx.data().config;

    let (enabled, disabled): (Vec<_>, Vec<_>) = KNOWN_MODULES
        .iter()
        .partition(|(name, _)| config.is_enabled(name));
    let lines = |modules: Vec<&(&str, &str)>| {
        modules
            .iter()
            .map(|(name, desc)| format!("**{name}** – *{desc}*"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    if enabled.is_empty() {
        ctx.reply("No modules are currently enabled.").await?;
        return Ok(());
    }

    ctx.reply(format!(
        "## **Enabled modules:**\n{}\n\n## **Disabled modules:**\n{}",
        lines(enabled),
        lines(disabled)
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_format() {
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 4 * 60 + 5)), "3h 4m 5s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "0h 0m 59s");
    }
}
