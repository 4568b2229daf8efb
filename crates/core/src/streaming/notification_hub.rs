use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::notification::{Notification, NotificationSink};

/// What happens when a subscriber falls behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferPolicy {
    /// Queue grows without limit.
    Unbounded,
    /// Queue holds at most `n` notifications; newer ones are dropped while full.
    DropNewest(usize),
}

impl BufferPolicy {
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(n) => Self::DropNewest(n.max(1)),
            None => Self::Unbounded,
        }
    }
}

/// Fans every published notification out to all live subscribers.
///
/// Publishing never blocks: workers push regardless of subscriber
/// readiness and the buffer policy decides what a slow subscriber loses.
/// Subscribers that hung up are dropped on the next publish.
pub struct NotificationHub {
    subscribers: Mutex<Vec<Sender<Notification>>>,
    policy: BufferPolicy,
}

impl NotificationHub {
    pub fn new(policy: BufferPolicy) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            policy,
        }
    }

    /// Attaches a subscriber. The first message it receives is `connected`.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = match self.policy {
            BufferPolicy::Unbounded => crossbeam_channel::unbounded(),
            BufferPolicy::DropNewest(n) => crossbeam_channel::bounded(n),
        };
        let _ = tx.try_send(Notification::connected());
        self.lock().push(tx);
        log::debug!("Subscriber attached ({} total)", self.subscriber_count());
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn policy(&self) -> BufferPolicy {
        self.policy
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<Notification>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(BufferPolicy::Unbounded)
    }
}

impl NotificationSink for NotificationHub {
    fn publish(&self, notification: Notification) {
        self.lock()
            .retain(|tx| match tx.try_send(notification.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::trace!("Subscriber queue full, dropping notification");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}
