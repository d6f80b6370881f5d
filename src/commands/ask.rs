use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use poise::CreateReply;
use tracing::info;

use crate::ai::prompt::{Attachment, PromptError, PromptInput, Replier};
use crate::{Context, Error};

struct CommandReplier<'a> {
    ctx: Context<'a>,
}

#[async_trait]
impl Replier for CommandReplier<'_> {
    async fn reply(
        &self,
        text: &str,
    ) -> Result<(serenity::MessageId, serenity::ChannelId), Error> {
        let handle = self.ctx.reply(text).await?;
        let sent = handle.message().await?;
        Ok((sent.id, sent.channel_id))
    }
}

/// Ask the AI chatbot a question. Reply to its answer to keep the conversation going.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Chatbot",
    check = "crate::commands::chatbot_allowed"
)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "What to ask"]
    #[rest]
    prompt: String,
    #[description = "Optional image"] image: Option<serenity::Attachment>,
) -> Result<(), Error> {
    info!("User {} invoked ask command: {prompt:?}", ctx.author().name);

    let Some(chatbot) = &ctx.data().chatbot else {
        ctx.send(
            CreateReply::default()
                .content("The chatbot is not configured.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    // Prefix users attach the image to the command message instead.
    let image = match (&image, ctx) {
        (Some(image), _) => Some(Attachment::from(image)),
        (None, poise::Context::Prefix(prefix)) => prefix.msg.attachments.first().map(Attachment::from),
        (None, _) => None,
    };

    let input = PromptInput {
        author: ctx.author().name.clone(),
        prompt,
        image,
    };

    if input.prompt.trim().is_empty() {
        ctx.send(
            CreateReply::default()
                .content(PromptError::EmptyPrompt.to_string())
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let replier = CommandReplier { ctx };
    match chatbot.handle(input, None, &replier).await {
        Ok(_) => {}
        Err(PromptError::Reply(e)) => return Err(e),
        Err(e) => {
            ctx.send(CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
        }
    }

    Ok(())
}
