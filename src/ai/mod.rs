pub mod channel;
pub mod gemini;
pub mod prompt;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serenity::model::id::{ChannelId, MessageId};
use tracing::{info, warn};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryItem {
    Text(String),
    Image(ImagePart),
}

/// One accepted exchange: what the user sent and what the bot answered.
#[derive(Clone, Debug)]
pub struct Turn {
    pub prompt: String,
    pub image: Option<ImagePart>,
    pub response: String,
}

impl Turn {
    fn into_items(self) -> impl Iterator<Item = HistoryItem> {
        std::iter::once(HistoryItem::Text(self.prompt))
            .chain(self.image.map(HistoryItem::Image))
            .chain(std::iter::once(HistoryItem::Text(self.response)))
    }
}

#[derive(Clone, Debug)]
pub struct Conversation {
    pub root_id: MessageId,
    pub latest_anchor: MessageId,
    pub channel_id: ChannelId,
    pub history: Vec<HistoryItem>,
    pub last_activity: Instant,
}

#[derive(Default)]
struct Conversations {
    by_root: HashMap<MessageId, Conversation>,
    // every anchor ever issued -> root of its conversation
    anchors: HashMap<MessageId, MessageId>,
}

/// Reply-chained conversations. One lock covers both maps, so appends,
/// lookups and sweeps never observe them out of step.
pub struct ConversationStore {
    inner: Mutex<Conversations>,
    max_turns: usize,
    timeout: Duration,
}

impl ConversationStore {
    pub fn new(max_turns: usize, timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Conversations::default()),
            max_turns,
            timeout,
        }
    }

    /// Each turn adds a prompt and a response, so the cap is counted in items.
    pub fn history_cap(&self) -> usize {
        self.max_turns.saturating_mul(2).max(4)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Conversations> {
        // A panic mid-update leaves plain maps behind; keep serving them.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn trim(&self, history: &mut Vec<HistoryItem>) {
        let cap = self.history_cap();
        if history.len() > cap {
            history.drain(..history.len() - cap);
        }
    }

    pub fn start_conversation(
        &self,
        turn: Turn,
        anchor: MessageId,
        channel_id: ChannelId,
        now: Instant,
    ) -> Conversation {
        let mut history: Vec<HistoryItem> = turn.into_items().collect();
        self.trim(&mut history);
        let conversation = Conversation {
            root_id: anchor,
            latest_anchor: anchor,
            channel_id,
            history,
            last_activity: now,
        };

        let mut inner = self.lock();
        inner.anchors.insert(anchor, anchor);
        inner.by_root.insert(anchor, conversation.clone());
        info!("Started new conversation root={anchor}");
        conversation
    }

    /// Records a turn made in reply to `replied_to`. Refused when the
    /// conversation is gone or has already moved past that anchor.
    pub fn continue_conversation(
        &self,
        root_id: MessageId,
        replied_to: MessageId,
        turn: Turn,
        new_anchor: MessageId,
        now: Instant,
    ) -> bool {
        let mut inner = self.lock();
        let Some(conversation) = inner.by_root.get_mut(&root_id) else {
            warn!("Conversation root={root_id} expired before the reply was recorded");
            return false;
        };
        if conversation.latest_anchor != replied_to {
            warn!("Conversation root={root_id} moved on, dropping stale turn");
            return false;
        }

        conversation.history.extend(turn.into_items());
        self.trim(&mut conversation.history);
        conversation.latest_anchor = new_anchor;
        conversation.last_activity = now;

        inner.anchors.insert(new_anchor, root_id);
        true
    }

    /// Marks the conversation active as soon as a reply to its latest anchor is
    /// accepted, so a sweep cannot evict it while the answer is generated.
    pub fn touch(&self, root_id: MessageId, replied_to: MessageId, now: Instant) -> bool {
        let mut inner = self.lock();
        match inner.by_root.get_mut(&root_id) {
            Some(conversation) if conversation.latest_anchor == replied_to => {
                conversation.last_activity = now;
                true
            }
            _ => false,
        }
    }

    /// Finds the conversation a reply continues. Only the newest anchor of a
    /// conversation accepts replies, and only from the channel it lives in.
    pub fn resolve_conversation(
        &self,
        replied_to: MessageId,
        channel_id: ChannelId,
    ) -> Option<Conversation> {
        let inner = self.lock();
        let root = inner.anchors.get(&replied_to)?;
        let conversation = inner.by_root.get(root)?;
        if conversation.latest_anchor != replied_to || conversation.channel_id != channel_id {
            return None;
        }
        Some(conversation.clone())
    }

    /// Evicts conversations idle for longer than the timeout, along with every
    /// anchor that pointed at them. Returns the evicted roots.
    pub fn sweep(&self, now: Instant) -> Vec<MessageId> {
        let mut inner = self.lock();
        let expired: Vec<MessageId> = inner
            .by_root
            .values()
            .filter(|c| now.saturating_duration_since(c.last_activity) > self.timeout)
            .map(|c| c.root_id)
            .collect();

        for root in &expired {
            inner.by_root.remove(root);
            inner.anchors.retain(|_, r| *r != *root);
            info!("Expired conversation root={root}");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.lock().by_root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn anchor_count(&self) -> usize {
        self.lock().anchors.len()
    }
}

/// Runs [`ConversationStore::sweep`] every `period` until the task is aborted.
pub fn spawn_sweeper(
    store: Arc<ConversationStore>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.sweep(Instant::now());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> Turn {
        Turn {
            prompt: format!("user: q{n}"),
            image: None,
            response: format!("Bot: a{n}"),
        }
    }

    #[test]
    fn cap_never_below_four() {
        assert_eq!(ConversationStore::new(0, Duration::from_secs(1)).history_cap(), 4);
        assert_eq!(
            ConversationStore::new(usize::MAX, Duration::from_secs(1)).history_cap(),
            usize::MAX
        );
        assert_eq!(ConversationStore::new(1, Duration::from_secs(1)).history_cap(), 4);
        assert_eq!(ConversationStore::new(5, Duration::from_secs(1)).history_cap(), 10);
    }

    #[test]
    fn image_is_stored_between_prompt_and_response() {
        let store = ConversationStore::new(20, Duration::from_secs(60));
        let image = ImagePart {
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
        };
        let c = store.start_conversation(
            Turn {
                prompt: "p".into(),
                image: Some(image.clone()),
                response: "r".into(),
            },
            MessageId::new(1),
            ChannelId::new(9),
            Instant::now(),
        );
        assert_eq!(
            c.history,
            vec![
                HistoryItem::Text("p".into()),
                HistoryItem::Image(image),
                HistoryItem::Text("r".into()),
            ]
        );
    }

    #[test]
    fn stale_anchor_cannot_continue() {
        let store = ConversationStore::new(20, Duration::from_secs(60));
        let now = Instant::now();
        let root = MessageId::new(1);
        store.start_conversation(turn(0), root, ChannelId::new(9), now);
        assert!(store.continue_conversation(root, root, turn(1), MessageId::new(2), now));
        // a second reply racing on the old anchor loses
        assert!(!store.continue_conversation(root, root, turn(2), MessageId::new(3), now));
        let c = store.resolve_conversation(MessageId::new(2), ChannelId::new(9)).unwrap();
        assert_eq!(c.history.len(), 4);
    }

    #[test]
    fn sweep_keeps_fresh_conversations() {
        let store = ConversationStore::new(20, Duration::from_secs(60));
        let now = Instant::now();
        store.start_conversation(turn(0), MessageId::new(1), ChannelId::new(9), now);
        assert!(store.sweep(now + Duration::from_secs(60)).is_empty());
        assert_eq!(store.len(), 1);
    }
}
