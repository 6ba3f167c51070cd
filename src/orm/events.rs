use std::sync::Mutex;

use async_channel::Receiver;

/// The three kinds of cache-membership change a model type broadcasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Edited,
}

/// Named notification channels for one model type.
///
/// `edited` is optional; model types that never announce in-place updates
/// simply leave it unset and `Edited` publishes become no-ops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSet {
    added: String,
    removed: String,
    edited: Option<String>,
}

impl ChannelSet {
    pub fn new(
        added: impl Into<String>,
        removed: impl Into<String>,
        edited: Option<String>,
    ) -> Self {
        Self {
            added: added.into(),
            removed: removed.into(),
            edited,
        }
    }

    /// Default channel naming derived from the collection name.
    pub fn for_collection(collection: &str) -> Self {
        Self {
            added: format!("{collection}.added"),
            removed: format!("{collection}.removed"),
            edited: Some(format!("{collection}.edited")),
        }
    }

    /// Drops the edited channel, keeping added/removed.
    pub fn without_edited(mut self) -> Self {
        self.edited = None;
        self
    }

    pub fn added(&self) -> &str {
        &self.added
    }

    pub fn removed(&self) -> &str {
        &self.removed
    }

    pub fn edited(&self) -> Option<&str> {
        self.edited.as_deref()
    }

    fn channel_for(&self, kind: ChangeKind) -> Option<&str> {
        match kind {
            ChangeKind::Added => Some(&self.added),
            ChangeKind::Removed => Some(&self.removed),
            ChangeKind::Edited => self.edited.as_deref(),
        }
    }
}

/// A single broadcast on one of a model type's channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    kind: ChangeKind,
    channel: String,
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Event hub scoped to one model type's cache.
///
/// Replaces a process-global notification center with explicit
/// subscriptions, so observers (and tests) receive events deterministically.
/// Publishing never blocks; disconnected subscribers are dropped on the next
/// publish.
pub struct Notifier {
    channels: ChannelSet,
    senders: Mutex<Vec<async_channel::Sender<ChangeEvent>>>,
}

impl Notifier {
    pub(crate) fn new(channels: ChannelSet) -> Self {
        Self {
            channels,
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Registers a new subscriber. Events published after this call are
    /// delivered in publish order.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (sender, receiver) = async_channel::unbounded();
        self.senders.lock().unwrap().push(sender);
        receiver
    }

    /// Broadcasts `kind` on its configured channel. An `Edited` publish with
    /// no edited channel configured is silently skipped.
    pub(crate) fn publish(&self, kind: ChangeKind) {
        let Some(channel) = self.channels.channel_for(kind) else {
            return;
        };
        let event = ChangeEvent {
            kind,
            channel: channel.to_string(),
        };
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|sender| sender.try_send(event.clone()).is_ok());
    }
}
