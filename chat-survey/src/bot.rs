//! Wiring an event source, the survey machine and delivery together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::{Deliverer, EventSource, Incoming, OutboundMessage, Reply, SurveyMachine, UserId};

type UserLocks = Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>;

/// Runs the survey for every user talking to the channel.
///
/// Each event is handled on its own task. Events of the same user are
/// processed one after another; different users never wait on each other.
#[derive(Clone)]
pub struct SurveyBot {
    machine: Arc<SurveyMachine>,
    deliverer: Deliverer,
    locks: Arc<UserLocks>,
}

impl SurveyBot {
    pub fn new(machine: Arc<SurveyMachine>, deliverer: Deliverer) -> Self {
        Self {
            machine,
            deliverer,
            locks: Arc::default(),
        }
    }

    pub fn machine(&self) -> &SurveyMachine {
        &self.machine
    }

    pub fn deliverer(&self) -> &Deliverer {
        &self.deliverer
    }

    /// Handle events until the source is exhausted, then wait for the
    /// in-flight ones to finish.
    pub async fn run(&self, mut source: impl EventSource) {
        let mut tasks = JoinSet::new();
        while let Some(incoming) = source.next_event().await {
            let bot = self.clone();
            tasks.spawn(async move { bot.handle(incoming).await });
            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!(error = %e, "Event task failed");
                }
            }
        }
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "Event task failed");
            }
        }
        info!("Event source closed");
    }

    /// Advance the sender's survey and deliver the reply. Returns the number
    /// of reply messages that arrived.
    #[instrument(skip_all, fields(user_id = %incoming.user_id))]
    pub async fn handle(&self, incoming: Incoming) -> usize {
        let lock = self.user_lock(incoming.user_id);
        let delivered = {
            let _guard = lock.lock().await;
            self.advance_and_deliver(&incoming).await
        };
        self.release_user_lock(incoming.user_id, lock);
        delivered
    }

    async fn advance_and_deliver(&self, incoming: &Incoming) -> usize {
        let reply = match self.machine.advance(incoming).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Could not advance survey");
                Reply::single(OutboundMessage::text(&self.machine.texts().apology))
            }
        };

        let mut delivered = 0;
        for message in &reply.messages {
            if !self.deliverer.send(incoming.user_id, message).await {
                warn!(delivered, pending = reply.len() - delivered, "Reply cut short");
                break;
            }
            delivered += 1;
        }
        delivered
    }

    fn user_lock(&self, user_id: UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id)
            .or_default()
            .clone()
    }

    /// Forget the user's lock once no other event of theirs holds or awaits it.
    fn release_user_lock(&self, user_id: UserId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        DeliveryConfig, FieldRegistry, FieldSpec, InboundEvent, MemoryStore, RecordingTransport,
    };

    struct Scripted(VecDeque<Incoming>);

    #[async_trait]
    impl EventSource for Scripted {
        async fn next_event(&mut self) -> Option<Incoming> {
            self.0.pop_front()
        }
    }

    fn bot(store: Arc<MemoryStore>, transport: Arc<RecordingTransport>) -> SurveyBot {
        let registry = FieldRegistry::new(vec![
            FieldSpec::new("name", "Name", "Your name?"),
            FieldSpec::new("city", "City", "Your city?"),
        ])
        .unwrap();
        let machine = Arc::new(SurveyMachine::new(registry, store.clone()));
        SurveyBot::new(
            machine,
            Deliverer::new(store, transport, DeliveryConfig::default()),
        )
    }

    #[tokio::test]
    async fn events_of_one_user_are_handled_in_order() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let source = Scripted(
            [
                Incoming::new(1, InboundEvent::text("/start")),
                Incoming::new(1, InboundEvent::text("Alice")),
                Incoming::new(1, InboundEvent::text("Paris")),
            ]
            .into(),
        );

        bot(store.clone(), transport.clone()).run(source).await;

        assert_eq!(
            transport.texts_to(UserId(1)),
            vec![
                "Your name?",
                "Your city?",
                "You are registered. Your data:\nName: Alice\nCity: Paris"
            ]
        );
        assert_eq!(store.snapshot(UserId(1)).await.unwrap().state, "registered");
    }

    #[tokio::test]
    async fn idle_users_do_not_keep_a_lock() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let bot = bot(store, transport);

        bot.handle(Incoming::new(1, InboundEvent::text("/start"))).await;
        bot.handle(Incoming::new(2, InboundEvent::text("/start"))).await;

        assert!(bot.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn returning_user_is_reachable_again() {
        let store = Arc::new(MemoryStore::new().with_blocked_user(UserId(5), "name"));
        let transport = Arc::new(RecordingTransport::new());
        let bot = bot(store.clone(), transport.clone());

        let delivered = bot.handle(Incoming::new(5, InboundEvent::text("Bob"))).await;

        assert_eq!(delivered, 1);
        assert_eq!(transport.texts_to(UserId(5)), vec!["Your city?"]);
        assert!(!store.snapshot(UserId(5)).await.unwrap().blocked);
    }
}
