//! Delivery of decrypted messages to the consuming application.

use courier_common::Message;
use tokio::sync::mpsc;

/// Consumer-side interface the server hands accepted messages to.
///
/// `try_enqueue` must not block: a saturated consumer returns `false` and
/// the server signals backpressure to the client instead of holding the
/// request open or dropping the message silently.
pub trait Sink: Send + Sync {
    /// Offer a message to the consumer. Returns whether it was accepted.
    fn try_enqueue(&self, message: Message) -> bool;
}

/// Sink backed by a bounded tokio channel.
///
/// The receiving half is the application's processing loop; a full or
/// closed channel rejects the offer.
pub struct ChannelSink {
    tx: mpsc::Sender<Message>,
}

impl ChannelSink {
    /// Create a sink with the given capacity and the receiver the
    /// consumer drains.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn try_enqueue(&self, message: Message) -> bool {
        self.tx.try_send(message).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(tag: i64) -> Message {
        let mut msg = Message::new();
        msg.insert("tag", tag);
        msg
    }

    #[test]
    fn accepts_until_capacity_then_rejects() {
        let (sink, mut rx) = ChannelSink::bounded(2);

        assert!(sink.try_enqueue(message(1)));
        assert!(sink.try_enqueue(message(2)));
        assert!(!sink.try_enqueue(message(3)));

        // Draining one slot makes the sink accept again.
        let first = rx.try_recv().unwrap();
        assert_eq!(first.get("tag"), Some(&serde_json::json!(1)));
        assert!(sink.try_enqueue(message(4)));
    }

    #[test]
    fn rejects_after_consumer_goes_away() {
        let (sink, rx) = ChannelSink::bounded(4);
        drop(rx);
        assert!(!sink.try_enqueue(message(1)));
    }
}
