//! Event dispatcher — one task per inbound event.
//!
//! Failures are logged here and nowhere else; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::events::EventEnvelope;
use crate::pipeline::notice::NotificationPipeline;
use crate::pipeline::reaction::ReactionPipeline;

/// Routes envelopes to the matching pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    reactions: Arc<ReactionPipeline>,
    notices: Arc<NotificationPipeline>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl Dispatcher {
    pub fn new(reactions: Arc<ReactionPipeline>, notices: Arc<NotificationPipeline>) -> Self {
        Self {
            reactions,
            notices,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Spawn the handler for `event` and return without waiting for it.
    pub async fn dispatch(&self, event: EventEnvelope) {
        let channel = match &event {
            EventEnvelope::ReactionAdded(r) => r.target_channel_id.clone(),
            EventEnvelope::EmojiChanged(_) => String::new(),
        };
        let span = info_span!(
            "event",
            event_id = %Uuid::new_v4(),
            kind = event.kind(),
            channel = %channel,
        );

        let reactions = Arc::clone(&self.reactions);
        let notices = Arc::clone(&self.notices);

        let mut in_flight = self.in_flight.lock().await;
        // Reap finished handlers so the set only holds running ones.
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(
            async move {
                match event {
                    EventEnvelope::ReactionAdded(reaction) => {
                        match reactions.handle(&reaction).await {
                            Ok(outcome) => debug!(?outcome, "Reaction handled"),
                            Err(e) => error!(step = %e.step(), error = %e, "Reaction pipeline failed"),
                        }
                    }
                    EventEnvelope::EmojiChanged(notice) => match notices.handle(&notice).await {
                        Ok(outcome) => debug!(?outcome, "Emoji change handled"),
                        Err(e) => error!(step = %e.step(), error = %e, "Notification pipeline failed"),
                    },
                }
            }
            .instrument(span),
        );
    }

    /// Dispatch every event from `events` until the stream ends.
    ///
    /// Returns the number of events dispatched. Handlers may still be running
    /// afterwards; see [`Dispatcher::shutdown`].
    pub async fn run<S>(&self, events: S) -> usize
    where
        S: Stream<Item = EventEnvelope> + Send,
    {
        let mut events = std::pin::pin!(events);
        let mut count = 0;
        while let Some(event) = events.next().await {
            self.dispatch(event).await;
            count += 1;
        }
        count
    }

    /// Wait up to `grace` for every running handler to finish.
    ///
    /// Handlers still running after `grace` are aborted. Returns how many
    /// were aborted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut in_flight = std::mem::take(&mut *self.in_flight.lock().await);
        if in_flight.is_empty() {
            return 0;
        }
        info!(running = in_flight.len(), "Waiting for in-flight handlers");

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    warn!("Event handler task failed: {e}");
                }
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }
        let aborted = in_flight.len();
        warn!(aborted, "Grace period elapsed, aborting handlers");
        in_flight.shutdown().await;
        aborted
    }
}
