use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};

const STREAM_CAPACITY: usize = 256;

/// One push from the assistant. `content` is the full reply so far, not a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    pub session_id: String,
    pub message_id: String,
    pub content: String,
    #[serde(default)]
    pub done: bool,
}

/// Fans stream events out to every live subscription.
#[derive(Debug, Clone)]
pub struct StreamHub {
    tx: broadcast::Sender<StreamEvent>,
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STREAM_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: StreamEvent) {
        tracing::trace!(
            session_id = %event.session_id,
            message_id = %event.message_id,
            len = event.content.len(),
            done = event.done,
            "stream event"
        );
        // No receivers simply means nobody is watching this reply.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self, session_id: &str, message_id: &str) -> StreamSubscription {
        StreamSubscription {
            rx: self.tx.subscribe(),
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
            finished: false,
        }
    }
}

/// Receives the events of a single reply. Dropping it unsubscribes.
#[derive(Debug)]
pub struct StreamSubscription {
    rx: broadcast::Receiver<StreamEvent>,
    session_id: String,
    message_id: String,
    finished: bool,
}

impl StreamSubscription {
    /// Next matching event, or `None` once the reply is done or the hub is gone.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }

        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.session_id != self.session_id || event.message_id != self.message_id {
                        continue;
                    }
                    self.finished = event.done;
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Later events carry the full text, so skipping is lossless.
                    tracing::warn!(
                        message_id = %self.message_id,
                        skipped,
                        "stream subscription lagged"
                    );
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        tracing::debug!(
            session_id = %self.session_id,
            message_id = %self.message_id,
            finished = self.finished,
            "stream subscription released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(message_id: &str, content: &str, done: bool) -> StreamEvent {
        StreamEvent {
            session_id: "s-1".to_string(),
            message_id: message_id.to_string(),
            content: content.to_string(),
            done,
        }
    }

    #[tokio::test]
    async fn subscription_filters_other_messages_and_stops_after_done() {
        let hub = StreamHub::new();
        let mut subscription = hub.subscribe("s-1", "m-1");

        hub.publish(event("m-2", "other", false));
        hub.publish(event("m-1", "Hel", false));
        hub.publish(event("m-1", "Hello", true));
        hub.publish(event("m-1", "ignored", false));

        assert_eq!(subscription.next().await, Some(event("m-1", "Hel", false)));
        assert_eq!(subscription.next().await, Some(event("m-1", "Hello", true)));
        assert!(subscription.is_finished());
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn subscription_ends_when_hub_is_dropped() {
        let hub = StreamHub::new();
        let mut subscription = hub.subscribe("s-1", "m-1");
        drop(hub);
        assert_eq!(subscription.next().await, None);
        assert!(subscription.is_finished());
    }

    #[tokio::test]
    async fn events_published_before_subscribe_are_not_seen() {
        let hub = StreamHub::new();
        hub.publish(event("m-1", "early", false));
        let mut subscription = hub.subscribe("s-1", "m-1");
        hub.publish(event("m-1", "late", true));
        assert_eq!(subscription.next().await, Some(event("m-1", "late", true)));
    }

    #[test]
    fn dropping_subscription_releases_receiver() {
        let hub = StreamHub::new();
        let subscription = hub.subscribe("s-1", "m-1");
        assert_eq!(hub.tx.receiver_count(), 1);
        drop(subscription);
        assert_eq!(hub.tx.receiver_count(), 0);
    }
}
