use model::events::Event;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::{
    RwLock,
    mpsc::{self, error::TrySendError},
};
use tracing::{debug, warn};

/// Channel slots held back so a terminal event always finds room.
const TERMINAL_RESERVE: usize = 1;

/// A subscription handle that can be used to unsubscribe from events.
#[derive(Debug, Clone)]
pub struct Subscription {
    event_type_id: TypeId,
    subscriber_id: u64,
}

type Senders = HashMap<u64, Box<dyn Any + Send + Sync>>;

/// Typed fan-out of run events (progress, retries, completion) to any number
/// of subscribers.
///
/// Ordinary events are best effort: a subscriber that has not drained its
/// channel loses them. Terminal events ([`Event::is_terminal`]) use a reserved
/// slot and are awaited, so every live subscriber sees them.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<TypeId, Senders>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sender` for events of type `E`.
    ///
    /// The last [`TERMINAL_RESERVE`] free slots of the channel are only used
    /// by terminal events.
    pub async fn subscribe<E>(&self, sender: mpsc::Sender<Arc<E>>) -> Subscription
    where
        E: Event + Clone,
    {
        let event_type_id = TypeId::of::<E>();
        let subscriber_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers
            .write()
            .await
            .entry(event_type_id)
            .or_default()
            .insert(subscriber_id, Box::new(sender));

        debug!(
            event_type = std::any::type_name::<E>(),
            subscriber_id, "Subscribed to event"
        );

        Subscription {
            event_type_id,
            subscriber_id,
        }
    }

    /// Subscribes with a fresh channel holding `capacity` ordinary events
    /// plus room for the terminal one.
    pub async fn receiver<E>(&self, capacity: usize) -> mpsc::Receiver<Arc<E>>
    where
        E: Event + Clone,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1) + TERMINAL_RESERVE);
        self.subscribe(tx).await;
        rx
    }

    pub async fn publish<E>(&self, event: E)
    where
        E: Event + Clone,
    {
        let senders = self.senders::<E>().await;
        if senders.is_empty() {
            return;
        }

        let event = Arc::new(event);
        let terminal = event.is_terminal();
        let mut closed = Vec::new();

        for (subscriber_id, sender) in senders {
            if terminal {
                if sender.send(event.clone()).await.is_err() {
                    closed.push(subscriber_id);
                }
                continue;
            }

            if sender.capacity() <= TERMINAL_RESERVE {
                if sender.is_closed() {
                    closed.push(subscriber_id);
                } else {
                    warn!(
                        event_type = event.event_type(),
                        subscriber_id, "Dropped event for slow subscriber"
                    );
                }
                continue;
            }

            match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Closed(_)) => closed.push(subscriber_id),
                Err(TrySendError::Full(_)) => warn!(
                    event_type = event.event_type(),
                    subscriber_id, "Dropped event for slow subscriber"
                ),
            }
        }

        if !closed.is_empty() {
            self.prune::<E>(&closed).await;
        }
    }

    /// Clones the senders for `E` so no lock is held while sending.
    async fn senders<E>(&self) -> Vec<(u64, mpsc::Sender<Arc<E>>)>
    where
        E: Event,
    {
        let subscribers = self.subscribers.read().await;
        let Some(type_subscribers) = subscribers.get(&TypeId::of::<E>()) else {
            return Vec::new();
        };

        type_subscribers
            .iter()
            .filter_map(|(id, boxed)| match boxed.downcast_ref::<mpsc::Sender<Arc<E>>>() {
                Some(sender) => Some((*id, sender.clone())),
                None => {
                    warn!(subscriber_id = id, "Failed to downcast sender for subscriber");
                    None
                }
            })
            .collect()
    }

    async fn prune<E>(&self, closed: &[u64])
    where
        E: Event,
    {
        let event_type_id = TypeId::of::<E>();
        let mut subscribers = self.subscribers.write().await;
        if let Some(type_subscribers) = subscribers.get_mut(&event_type_id) {
            for id in closed {
                type_subscribers.remove(id);
            }
            if type_subscribers.is_empty() {
                subscribers.remove(&event_type_id);
            }
        }
        debug!(
            event_type = std::any::type_name::<E>(),
            removed = closed.len(),
            "Pruned closed subscribers"
        );
    }

    pub async fn unsubscribe(&self, subscription: Subscription) {
        let mut subscribers = self.subscribers.write().await;

        if let Some(type_subscribers) = subscribers.get_mut(&subscription.event_type_id) {
            type_subscribers.remove(&subscription.subscriber_id);
            if type_subscribers.is_empty() {
                subscribers.remove(&subscription.event_type_id);
            }
        }
    }

    pub async fn subscriber_count<E>(&self) -> usize
    where
        E: Event,
    {
        self.subscribers
            .read()
            .await
            .get(&TypeId::of::<E>())
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{events::RunFinished, progress::ProgressUpdate};
    use uuid::Uuid;

    fn progress(step: &str) -> ProgressUpdate {
        ProgressUpdate {
            percentage: 10.0,
            chunk_index: Some(0),
            processed_chunks: 1,
            total_chunks: 10,
            matched_count: 0,
            left_only_count: 0,
            right_remaining_count: 0,
            step: step.to_string(),
        }
    }

    #[tokio::test]
    async fn delivers_only_to_matching_event_type() {
        let bus = EventBus::new();
        let mut progress_rx = bus.receiver::<ProgressUpdate>(8).await;
        let mut finished_rx = bus.receiver::<RunFinished>(8).await;

        bus.publish(progress("merged chunk 1/10")).await;

        let got = progress_rx.recv().await.unwrap();
        assert_eq!(got.step, "merged chunk 1/10");
        assert!(finished_rx.try_recv().is_err());
        assert_eq!(bus.subscriber_count::<ProgressUpdate>().await, 1);
    }

    #[tokio::test]
    async fn full_subscribers_do_not_block_publishers() {
        let bus = EventBus::new();
        let mut rx = bus.receiver::<ProgressUpdate>(1).await;

        bus.publish(progress("first")).await;
        bus.publish(progress("second")).await;

        assert_eq!(rx.recv().await.unwrap().step, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn terminal_event_reaches_a_full_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.receiver::<ProgressUpdate>(1).await;

        for step in ["first", "second", "third"] {
            bus.publish(progress(step)).await;
        }
        bus.publish(ProgressUpdate {
            percentage: 100.0,
            ..progress("done")
        })
        .await;

        let mut steps = Vec::new();
        while let Ok(update) = rx.try_recv() {
            steps.push(update.step.clone());
        }
        assert_eq!(steps, vec!["first", "done"]);
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.receiver::<ProgressUpdate>(4).await;
        let _kept = bus.receiver::<ProgressUpdate>(4).await;
        drop(rx);

        bus.publish(progress("after drop")).await;

        assert_eq!(bus.subscriber_count::<ProgressUpdate>().await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_sender() {
        let bus = EventBus::new();
        let (tx, _rx) = mpsc::channel::<Arc<RunFinished>>(1);
        let sub = bus.subscribe(tx).await;
        bus.unsubscribe(sub).await;

        assert_eq!(bus.subscriber_count::<RunFinished>().await, 0);
        bus.publish(RunFinished {
            run_id: Uuid::new_v4(),
            cancelled: false,
            total_matches: 0,
            execution_time_ms: 0,
            timestamp: chrono::Utc::now(),
        })
        .await;
    }
}
