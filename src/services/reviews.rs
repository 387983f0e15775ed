use std::collections::HashSet;

use futures::{future, stream, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::ReviewEvent;

const FEED_CAPACITY: usize = 256;

/// Fan-out of review events to connected subscribers.
#[derive(Clone)]
pub struct ReviewFeed {
    sender: broadcast::Sender<ReviewEvent>,
}

impl Default for ReviewFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl ReviewFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ReviewEvent) {
        // An error only means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.sender.subscribe()
    }
}

/// Events a subscriber should see: the replayed backlog followed by live events.
/// Live events already replayed are dropped. Ids are not assumed to arrive in
/// order, since a lower id can commit after a higher one. The receiver must be
/// created before the backlog is read so nothing falls between the two.
pub fn review_stream(
    backlog: Vec<ReviewEvent>,
    receiver: broadcast::Receiver<ReviewEvent>,
) -> impl Stream<Item = ReviewEvent> + Send {
    let replayed: HashSet<i64> = backlog.iter().map(|e| e.id).collect();

    let live = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((event, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Review subscriber lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .filter(move |event| future::ready(!replayed.contains(&event.id)));

    stream::iter(backlog).chain(live)
}
