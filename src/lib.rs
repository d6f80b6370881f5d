pub mod ai;
pub mod commands;
pub mod config;
pub mod events;
pub mod logging;
pub mod music;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    pub config: config::BotConfig,
    pub scheduler: music::player::Scheduler,
    pub resolver: Arc<dyn music::source::MediaResolver>,
    /// Present only when the chatbot module is enabled and an API key is set.
    pub chatbot: Option<ai::prompt::PromptHandler>,
    pub started_at: Instant,
}
