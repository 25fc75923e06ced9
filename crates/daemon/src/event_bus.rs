// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: topic-indexed broadcaster with bounded subscriber queues.
//!
//! Tasks are in-memory by design, so the bus holds no durable log, just
//! a rolling replay buffer per topic for late subscribers. Each
//! subscriber has a bounded queue; overflow drops that subscriber's
//! oldest event and counts it, never blocking the publisher.

use maestro_core::{Event, Topic};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Events retained per topic for late subscribers.
pub const REPLAY_BUFFER: usize = 200;

/// Per-subscriber queue capacity; overflow drops the oldest.
pub const SUBSCRIBER_QUEUE: usize = 256;

struct SubscriberQueue {
    events: Mutex<VecDeque<Event>>,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl SubscriberQueue {
    fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue, dropping the oldest event when full.
    fn push(&self, event: Event) {
        {
            let mut events = self.events.lock();
            events.push_back(event);
            while events.len() > SUBSCRIBER_QUEUE {
                events.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.notify.notify_one();
    }
}

#[derive(Default)]
struct TopicState {
    subscribers: Vec<Arc<SubscriberQueue>>,
    replay: VecDeque<Event>,
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
    /// Rolling history at subscribe time, oldest first.
    pub replay: Vec<Event>,
    queue: Arc<SubscriberQueue>,
}

impl Subscription {
    /// Receive the next event, waiting if the queue is empty.
    pub async fn recv(&mut self) -> Event {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.queue.notify.notified().await;
        }
    }

    /// Pop the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.queue.events.lock().pop_front()
    }

    /// Events this subscriber lost to backpressure.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.closed.store(true, Ordering::Relaxed);
    }
}

/// Bounded in-memory broadcaster.
#[derive(Clone, Default)]
pub struct EventBus {
    topics: Arc<Mutex<HashMap<Topic, TopicState>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, receiving the replay buffer plus everything
    /// published afterwards.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let queue = Arc::new(SubscriberQueue::new());
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();
        state.subscribers.push(Arc::clone(&queue));
        Subscription {
            replay: state.replay.iter().cloned().collect(),
            queue,
        }
    }

    /// Publish to the event's topic. Returns after every live subscriber
    /// queue has the event (or dropped its oldest to make room).
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        let mut topics = self.topics.lock();
        let state = topics.entry(topic).or_default();

        state.replay.push_back(event.clone());
        while state.replay.len() > REPLAY_BUFFER {
            state.replay.pop_front();
        }

        state
            .subscribers
            .retain(|queue| !queue.closed.load(Ordering::Relaxed));
        for queue in &state.subscribers {
            queue.push(event.clone());
        }
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        let mut topics = self.topics.lock();
        let Some(state) = topics.get_mut(&topic) else {
            return 0;
        };
        state
            .subscribers
            .retain(|queue| !queue.closed.load(Ordering::Relaxed));
        state.subscribers.len()
    }

    /// Pump events from a channel into the bus until the channel closes.
    pub async fn pump(self, mut rx: tokio::sync::mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            self.publish(event);
        }
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
