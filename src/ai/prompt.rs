use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use tracing::{error, info};

use super::gemini::Generator;
use super::{Conversation, ConversationStore, HistoryItem, ImagePart, Turn};
use crate::Error;

/// User-visible failures of a prompt. Nothing is recorded when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("You must specify a prompt!")]
    EmptyPrompt,
    #[error("That attachment isn't an image.")]
    NotAnImage,
    #[error("I couldn't download that image attachment.")]
    ImageDownload,
    #[error("An error occurred while generating a response.")]
    Generation,
    #[error("failed to send reply: {0}")]
    Reply(Error),
}

#[derive(Clone, Debug)]
pub struct Attachment {
    pub url: String,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

impl From<&serenity::model::channel::Attachment> for Attachment {
    fn from(a: &serenity::model::channel::Attachment) -> Self {
        Self {
            url: a.url.clone(),
            content_type: a.content_type.clone(),
        }
    }
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

#[async_trait]
impl ImageFetcher for reqwest::Client {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let bytes = self.get(url).send().await?.error_for_status()?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Posts the bot's answer and reports where it landed.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn reply(&self, text: &str) -> Result<(MessageId, ChannelId), Error>;
}

pub struct PromptInput {
    pub author: String,
    pub prompt: String,
    pub image: Option<Attachment>,
}

pub struct PromptHandler {
    store: Arc<ConversationStore>,
    generator: Arc<dyn Generator>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl PromptHandler {
    pub fn new(
        store: Arc<ConversationStore>,
        generator: Arc<dyn Generator>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            store,
            generator,
            fetcher,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Runs one turn: validate, generate, reply, then record. A fresh prompt
    /// starts a conversation anchored on the reply; a continued one advances
    /// the conversation to it. Returns the reply's message id.
    pub async fn handle(
        &self,
        input: PromptInput,
        conversation: Option<&Conversation>,
        replier: &dyn Replier,
    ) -> Result<MessageId, PromptError> {
        let prompt = input.prompt.trim();
        if prompt.is_empty() {
            return Err(PromptError::EmptyPrompt);
        }

        let image = match &input.image {
            Some(attachment) if !attachment.is_image() => return Err(PromptError::NotAnImage),
            Some(attachment) => {
                let data = self.fetcher.fetch(&attachment.url).await.map_err(|e| {
                    error!("Failed to download image attachment: {e}");
                    PromptError::ImageDownload
                })?;
                Some(ImagePart {
                    mime_type: attachment
                        .content_type
                        .clone()
                        .unwrap_or_else(|| "image/jpeg".to_string()),
                    data,
                })
            }
            None => None,
        };

        let line = format!("{}: {prompt}", input.author);
        let mut contents: Vec<HistoryItem> = conversation
            .map(|c| c.history.clone())
            .unwrap_or_default();
        contents.push(HistoryItem::Text(line.clone()));
        if let Some(image) = &image {
            contents.push(HistoryItem::Image(image.clone()));
        }

        let text = self.generator.generate(&contents).await.map_err(|e| {
            error!("AI generation failed: {e}");
            PromptError::Generation
        })?;

        let reply = crate::utils::truncate_for_discord(&text);
        let (sent, channel_id) = replier.reply(&reply).await.map_err(PromptError::Reply)?;

        let turn = Turn {
            prompt: line,
            image,
            response: format!("Bot: {text}"),
        };
        match conversation {
            Some(c) => {
                self.store
                    .continue_conversation(c.root_id, c.latest_anchor, turn, sent, Instant::now());
            }
            None => {
                self.store
                    .start_conversation(turn, sent, channel_id, Instant::now());
            }
        }
        info!("Answered prompt from {} (reply={sent})", input.author);
        Ok(sent)
    }
}
