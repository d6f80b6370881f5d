use std::time::Duration;

use poise::CreateReply;
use rand::seq::SliceRandom;
use tracing::info;

use crate::{Context, Error};

pub const TENOR_GIFS: [&str; 9] = [
    "sonic-unleashed-eggman-robotnik-sandwich-eggman-sandwich-gif-8651613417481721241",
    "tf2-bread-gif-10184446768704095641",
    "boykisser-spin-silly-cat-silly-cat-gif-15869807335045066863",
    "gun-loading-gun-cursed-emoji-mad-gif-24853374",
    "cary-cary-huang-huang-bfdi-battle-for-dream-island-gif-15347344906309488092",
    "r-tachyon-ume-musume-uma-musume-horse-gif-6355441694660360746",
    "will-wood-ik-i-know-gif-13165299665569457587",
    "jollyposting-cat-the-voices-jolly-santa-gif-13844772206269131622",
    "post-this-cat-ryujinr-grey-cat-gif-13471549557469691566",
];

/// Frames the surprise message cycles through before it deletes itself.
pub const SURPRISE_FRAMES: [&str; 13] = [
    "..",
    "...",
    "processing",
    "processing.",
    "processing..",
    "processing...",
    "thinking",
    "thinking.",
    "thinking..",
    "thinking...",
    "no thoughts",
    "one thought",
    "too many thoughts",
];

const SURPRISE_INTRO: &str = "-# This was made 100% by generative AI. \
    Upon asking for a suprise, this was it's response.";

pub fn random_gif_url() -> String {
    let id = TENOR_GIFS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(TENOR_GIFS[0]);
    format!("https://tenor.com/view/{id}")
}

/// Replies with an honest shrug
#[poise::command(slash_command, prefix_command, category = "RandFun")]
pub async fn idfk(ctx: Context<'_>) -> Result<(), Error> {
    info!("User {} invoked idfk command.", ctx.author().name);
    ctx.reply("Well, *I* don't know either! Don't ask me!").await?;
    Ok(())
}

/// Posts a random gif
#[poise::command(slash_command, prefix_command, category = "RandFun")]
pub async fn gif(ctx: Context<'_>) -> Result<(), Error> {
    let url = random_gif_url();
    info!("User {} invoked gif command: {url}", ctx.author().name);
    ctx.reply(url).await?;
    Ok(())
}

/// Asks the AI for a surprise
#[poise::command(slash_command, prefix_command, category = "Surprise")]
pub async fn suprise(ctx: Context<'_>) -> Result<(), Error> {
    info!("User {} invoked suprise command.", ctx.author().name);
    let handle = ctx.send(CreateReply::default().content(SURPRISE_INTRO)).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    for frame in SURPRISE_FRAMES {
        handle
            .edit(ctx, CreateReply::default().content(frame))
            .await?;
        tokio::time::sleep(Duration::from_millis(450)).await;
    }

    handle.edit(ctx, CreateReply::default().content("done")).await?;
    tokio::time::sleep(Duration::from_millis(1200)).await;
    handle.delete(ctx).await?;
    Ok(())
}
