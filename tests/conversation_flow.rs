use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use turtlebott::ai::gemini::{GeminiError, Generator};
use turtlebott::ai::prompt::{
    Attachment, ImageFetcher, PromptError, PromptHandler, PromptInput, Replier,
};
use turtlebott::ai::{ConversationStore, HistoryItem, Turn};
use turtlebott::Error;

fn turn(prompt: &str, response: &str) -> Turn {
    Turn {
        prompt: prompt.to_string(),
        image: None,
        response: response.to_string(),
    }
}

fn texts(history: &[HistoryItem]) -> Vec<String> {
    history
        .iter()
        .filter_map(|item| match item {
            HistoryItem::Text(text) => Some(text.clone()),
            HistoryItem::Image(_) => None,
        })
        .collect()
}

/// Answers with a fixed text, or fails when built with `failing()`.
struct FakeGenerator {
    answer: Option<String>,
    seen: Mutex<Vec<Vec<HistoryItem>>>,
}

impl FakeGenerator {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Vec<HistoryItem>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, contents: &[HistoryItem]) -> Result<String, GeminiError> {
        self.seen.lock().unwrap().push(contents.to_vec());
        self.answer
            .clone()
            .ok_or_else(|| GeminiError::Api("quota exceeded".to_string()))
    }
}

struct FakeFetcher {
    bytes: Option<Vec<u8>>,
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, Error> {
        self.bytes.clone().ok_or_else(|| "404 Not Found".into())
    }
}

/// Hands out increasing message ids in one channel.
struct FakeReplier {
    channel_id: ChannelId,
    next_id: AtomicU64,
    sent: Mutex<Vec<String>>,
}

impl FakeReplier {
    fn new(channel: u64, first_id: u64) -> Self {
        Self {
            channel_id: ChannelId::new(channel),
            next_id: AtomicU64::new(first_id),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Replier for FakeReplier {
    async fn reply(&self, text: &str) -> Result<(MessageId, ChannelId), Error> {
        self.sent.lock().unwrap().push(text.to_string());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok((MessageId::new(id), self.channel_id))
    }
}

fn handler(generator: Arc<FakeGenerator>, image: Option<Vec<u8>>) -> PromptHandler {
    PromptHandler::new(
        Arc::new(ConversationStore::new(20, Duration::from_secs(900))),
        generator,
        Arc::new(FakeFetcher { bytes: image }),
    )
}

fn input(prompt: &str) -> PromptInput {
    PromptInput {
        author: "alice".to_string(),
        prompt: prompt.to_string(),
        image: None,
    }
}

#[test]
fn test_history_is_capped_oldest_first() {
    let store = ConversationStore::new(2, Duration::from_secs(900));
    assert_eq!(store.history_cap(), 4);

    let now = Instant::now();
    let channel = ChannelId::new(1);
    let root = MessageId::new(100);
    store.start_conversation(turn("u1", "b1"), root, channel, now);
    assert!(store.continue_conversation(root, root, turn("u2", "b2"), MessageId::new(101), now));
    assert!(store.continue_conversation(
        root,
        MessageId::new(101),
        turn("u3", "b3"),
        MessageId::new(102),
        now
    ));

    let conversation = store
        .resolve_conversation(MessageId::new(102), channel)
        .unwrap();
    assert_eq!(texts(&conversation.history), ["u2", "b2", "u3", "b3"]);
}

#[test]
fn test_only_latest_reply_continues() {
    let store = ConversationStore::new(20, Duration::from_secs(900));
    let now = Instant::now();
    let channel = ChannelId::new(1);
    let a = MessageId::new(200);
    let b = MessageId::new(201);

    store.start_conversation(turn("hi", "hello"), a, channel, now);
    assert!(store.resolve_conversation(a, channel).is_some());
    assert!(store.continue_conversation(a, a, turn("more", "sure"), b, now));

    // Replying to A after B was posted goes nowhere
    assert!(store.resolve_conversation(a, channel).is_none());
    let conversation = store.resolve_conversation(b, channel).unwrap();
    assert_eq!(conversation.root_id, a);
    assert_eq!(conversation.latest_anchor, b);

    // Neither does a reply from another channel
    assert!(store.resolve_conversation(b, ChannelId::new(2)).is_none());

    // Or a message the bot never sent
    assert!(store.resolve_conversation(MessageId::new(999), channel).is_none());
}

#[test]
fn test_sweep_evicts_conversation_and_anchors() {
    let timeout = Duration::from_secs(900);
    let store = ConversationStore::new(20, timeout);
    let now = Instant::now();
    let channel = ChannelId::new(1);
    let root = MessageId::new(300);

    store.start_conversation(turn("hi", "hello"), root, channel, now);
    store.continue_conversation(root, root, turn("again", "yes"), MessageId::new(301), now);
    store.start_conversation(
        turn("later", "ok"),
        MessageId::new(400),
        channel,
        now + Duration::from_secs(600),
    );
    assert_eq!(store.anchor_count(), 3);

    // Exactly at the timeout the conversation is still alive
    assert!(store.sweep(now + timeout).is_empty());

    let evicted = store.sweep(now + timeout + Duration::from_secs(1));
    assert_eq!(evicted, [root]);
    assert_eq!(store.len(), 1);
    assert_eq!(store.anchor_count(), 1);
    assert!(store
        .resolve_conversation(MessageId::new(301), channel)
        .is_none());

    // A late turn for the evicted conversation is refused
    assert!(!store.continue_conversation(
        root,
        MessageId::new(301),
        turn("late", "nope"),
        MessageId::new(302),
        now + timeout * 2
    ));
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let generator = FakeGenerator::answering("unused");
    let handler = handler(generator.clone(), None);
    let replier = FakeReplier::new(1, 500);

    let err = handler
        .handle(input("   "), None, &replier)
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::EmptyPrompt));
    assert_eq!(err.to_string(), "You must specify a prompt!");
    assert!(generator.calls().is_empty());
    assert!(handler.store().is_empty());
}

#[tokio::test]
async fn test_non_image_attachment_is_rejected_before_generation() {
    let generator = FakeGenerator::answering("unused");
    let handler = handler(generator.clone(), Some(vec![1, 2, 3]));
    let replier = FakeReplier::new(1, 500);

    let mut prompt = input("what is this");
    prompt.image = Some(Attachment {
        url: "https://cdn.discordapp.com/notes.txt".to_string(),
        content_type: Some("text/plain".to_string()),
    });

    let err = handler.handle(prompt, None, &replier).await.unwrap_err();
    assert!(matches!(err, PromptError::NotAnImage));
    assert!(generator.calls().is_empty());
    assert!(replier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_image_download_is_reported() {
    let generator = FakeGenerator::answering("unused");
    let handler = handler(generator.clone(), None);
    let replier = FakeReplier::new(1, 500);

    let mut prompt = input("what is this");
    prompt.image = Some(Attachment {
        url: "https://cdn.discordapp.com/cat.png".to_string(),
        content_type: Some("image/png".to_string()),
    });

    let err = handler.handle(prompt, None, &replier).await.unwrap_err();
    assert!(matches!(err, PromptError::ImageDownload));
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn test_backend_failure_records_nothing() {
    let generator = FakeGenerator::failing();
    let handler = handler(generator.clone(), None);
    let replier = FakeReplier::new(1, 500);

    let err = handler
        .handle(input("hello"), None, &replier)
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::Generation));
    assert_eq!(generator.calls().len(), 1);
    assert!(handler.store().is_empty());
    assert!(replier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fresh_prompt_starts_conversation() {
    let generator = FakeGenerator::answering("Hi alice!");
    let handler = handler(generator.clone(), Some(vec![0x89, 0x50]));
    let replier = FakeReplier::new(7, 500);

    let mut prompt = input("  hello there ");
    prompt.image = Some(Attachment {
        url: "https://cdn.discordapp.com/cat.png".to_string(),
        content_type: Some("image/png".to_string()),
    });
    let sent = handler.handle(prompt, None, &replier).await.unwrap();
    assert_eq!(sent, MessageId::new(500));
    assert_eq!(*replier.sent.lock().unwrap(), ["Hi alice!"]);

    let calls = generator.calls();
    let contents = &calls[0];
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[0], HistoryItem::Text("alice: hello there".to_string()));
    assert!(matches!(&contents[1], HistoryItem::Image(img) if img.mime_type == "image/png"));

    let conversation = handler
        .store()
        .resolve_conversation(sent, ChannelId::new(7))
        .unwrap();
    assert_eq!(conversation.root_id, sent);
    assert_eq!(
        texts(&conversation.history),
        ["alice: hello there", "Bot: Hi alice!"]
    );
    assert_eq!(conversation.history.len(), 3);
}

#[tokio::test]
async fn test_reply_continues_conversation() {
    let generator = FakeGenerator::answering("Sure.");
    let handler = handler(generator.clone(), None);
    let replier = FakeReplier::new(7, 500);

    let first = handler.handle(input("hi"), None, &replier).await.unwrap();
    let conversation = handler
        .store()
        .resolve_conversation(first, ChannelId::new(7))
        .unwrap();

    let second = handler
        .handle(input("and then?"), Some(&conversation), &replier)
        .await
        .unwrap();
    assert_eq!(second, MessageId::new(501));

    // The model saw the earlier turn before the new prompt
    assert_eq!(
        texts(&generator.calls()[1]),
        ["alice: hi", "Bot: Sure.", "alice: and then?"]
    );

    assert!(handler
        .store()
        .resolve_conversation(first, ChannelId::new(7))
        .is_none());
    let conversation = handler
        .store()
        .resolve_conversation(second, ChannelId::new(7))
        .unwrap();
    assert_eq!(conversation.root_id, first);
    assert_eq!(conversation.history.len(), 4);
    assert_eq!(handler.store().len(), 1);
}

#[tokio::test]
async fn test_long_answer_is_truncated_but_stored_whole() {
    let long = "x".repeat(2500);
    let generator = FakeGenerator::answering(&long);
    let handler = handler(generator, None);
    let replier = FakeReplier::new(7, 500);

    let sent = handler.handle(input("essay"), None, &replier).await.unwrap();
    let posted = replier.sent.lock().unwrap()[0].clone();
    assert_eq!(posted.chars().count(), 2000);
    assert!(posted.ends_with("..."));

    let conversation = handler
        .store()
        .resolve_conversation(sent, ChannelId::new(7))
        .unwrap();
    assert_eq!(texts(&conversation.history)[1], format!("Bot: {long}"));
}

#[test]
fn test_accepted_reply_survives_sweep_during_generation() {
    let timeout = Duration::from_secs(900);
    let store = ConversationStore::new(20, timeout);
    let start = Instant::now();
    let channel = ChannelId::new(1);
    let root = MessageId::new(600);
    store.start_conversation(turn("hi", "hello"), root, channel, start);

    // A reply lands just before the timeout and the backend is slow to answer
    let replied_at = start + timeout - Duration::from_secs(1);
    assert!(store.touch(root, root, replied_at));
    assert!(store.sweep(start + timeout + Duration::from_secs(60)).is_empty());

    assert!(store.continue_conversation(
        root,
        root,
        turn("still here?", "yes"),
        MessageId::new(601),
        start + timeout + Duration::from_secs(90),
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_touch_requires_latest_anchor() {
    let store = ConversationStore::new(20, Duration::from_secs(900));
    let now = Instant::now();
    let root = MessageId::new(700);
    store.start_conversation(turn("hi", "hello"), root, ChannelId::new(1), now);
    store.continue_conversation(root, root, turn("more", "ok"), MessageId::new(701), now);

    assert!(!store.touch(root, root, now));
    assert!(store.touch(root, MessageId::new(701), now));
    assert!(!store.touch(MessageId::new(999), MessageId::new(999), now));
}
