use std::time::Instant;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use tracing::warn;

use super::prompt::{Attachment, PromptError, PromptInput, Replier};
use crate::{Data, Error};

/// Replies to a plain channel message.
struct MessageReplier<'a> {
    ctx: &'a serenity::Context,
    msg: &'a serenity::Message,
}

#[async_trait]
impl Replier for MessageReplier<'_> {
    async fn reply(
        &self,
        text: &str,
    ) -> Result<(serenity::MessageId, serenity::ChannelId), Error> {
        let sent = self.msg.reply(&self.ctx.http, text).await?;
        Ok((sent.id, sent.channel_id))
    }
}

/// Continues a conversation when someone replies to its latest bot message.
/// Replies to anything else, including older messages of the same
/// conversation, are ignored without a word.
pub async fn handle(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    let Some(chatbot) = &data.chatbot else {
        return Ok(());
    };

    if msg.author.bot {
        return Ok(());
    }

    let Some(replied_to) = msg.message_reference.as_ref().and_then(|r| r.message_id) else {
        return Ok(());
    };

    let Some(conversation) = chatbot
        .store()
        .resolve_conversation(replied_to, msg.channel_id)
    else {
        return Ok(());
    };

    if !data
        .config
        .module(crate::config::CHATBOT_MODULE)
        .is_user_allowed(msg.author.id.get())
    {
        warn!("Unauthorized chatbot reply by {} ({})", msg.author.name, msg.author.id);
        return Ok(());
    }

    let prompt = msg.content.trim();
    // Prefix commands sent as replies belong to the framework.
    if prompt.is_empty() || prompt.starts_with(&data.config.prefix) {
        return Ok(());
    }

    chatbot
        .store()
        .touch(conversation.root_id, replied_to, Instant::now());

    let input = PromptInput {
        author: msg.author.name.clone(),
        prompt: prompt.to_string(),
        image: msg.attachments.first().map(Attachment::from),
    };

    let _typing = msg.channel_id.start_typing(&ctx.http);
    let replier = MessageReplier { ctx, msg };
    match chatbot.handle(input, Some(&conversation), &replier).await {
        Ok(_) => {}
        Err(PromptError::Reply(e)) => return Err(e),
        Err(e) => {
            msg.reply(&ctx.http, e.to_string()).await?;
        }
    }

    Ok(())
}
