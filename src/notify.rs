//! Per-question notifications.
//!
//! Every question the [`QueryEngine`][crate::dns::engine::QueryEngine] processes produces one
//! [`QueryEvent`], whatever the outcome. Events go out on a bounded broadcast channel: sending
//! never waits on subscribers, and a subscriber that falls behind loses the oldest events
//! instead of growing a queue.
use std::fmt;
use std::net::IpAddr;
use tokio::sync::broadcast;
use trust_dns_proto::rr::RecordType;

/// How a question was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Answer records were added to the reply.
    Answered(usize),
    /// Processing succeeded without producing answers.
    NoAnswer,
    /// Processing failed; the reply carries no answers for the question.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
    pub source: IpAddr,
    pub name: String,
    pub query_type: RecordType,
    pub outcome: Outcome,
}

impl fmt::Display for QueryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received DNS request from {} for {} (Type: {})",
            self.source, self.name, self.query_type
        )?;
        if let Outcome::Failed(reason) = &self.outcome {
            write!(f, " [error: {reason}]")?;
        }
        Ok(())
    }
}

/// The sending half of the notification channel. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: broadcast::Sender<QueryEvent>,
}

impl Notifier {
    /// Create a notifier buffering at most `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Notifier { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to the current subscribers, if any.
    pub fn notify(&self, event: QueryEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
