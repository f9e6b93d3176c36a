//! Test transport for exercising delivery without a real channel.
//!
//! `RecordingTransport` answers every send from a per-recipient script of
//! outcomes and records each call, including when it happened. Recipients
//! without a script (or whose script ran out) receive every message.
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_survey::{RecordingTransport, TransportError, UserId};
//!
//! let transport = RecordingTransport::new().with_outcomes(
//!     UserId(1),
//!     [Err(TransportError::Network("reset".into())), Ok(())],
//! );
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{MessageHandle, OutboundMessage, Transport, TransportError, UserId};

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct TransportCall {
    pub recipient: UserId,
    pub message: OutboundMessage,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    scripts: Mutex<HashMap<UserId, VecDeque<Result<(), TransportError>>>>,
    persistent: HashMap<UserId, TransportError>,
    calls: Mutex<Vec<TransportCall>>,
    next_handle: AtomicI64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next sends to `recipient` with `outcomes`, in order.
    pub fn with_outcomes(
        mut self,
        recipient: UserId,
        outcomes: impl IntoIterator<Item = Result<(), TransportError>>,
    ) -> Self {
        self.scripts
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(recipient)
            .or_default()
            .extend(outcomes);
        self
    }

    /// Fail every send to `recipient` (after any scripted outcomes) with `error`.
    pub fn always_failing(mut self, recipient: UserId, error: TransportError) -> Self {
        self.persistent.insert(recipient, error);
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, recipient: UserId) -> Vec<TransportCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Texts sent to `recipient`, in order.
    pub fn texts_to(&self, recipient: UserId) -> Vec<String> {
        self.calls_to(recipient)
            .into_iter()
            .map(|call| call.message.text)
            .collect()
    }

    /// Recipients in the order they were first contacted.
    pub fn recipients(&self) -> Vec<UserId> {
        let mut seen = Vec::new();
        for call in lock(&self.calls).iter() {
            if !seen.contains(&call.recipient) {
                seen.push(call.recipient);
            }
        }
        seen
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(
        &self,
        recipient: UserId,
        message: &OutboundMessage,
    ) -> Result<MessageHandle, TransportError> {
        lock(&self.calls).push(TransportCall {
            recipient,
            message: message.clone(),
            at: Instant::now(),
        });

        let scripted = lock(&self.scripts)
            .get_mut(&recipient)
            .and_then(VecDeque::pop_front);
        let outcome = match scripted {
            Some(outcome) => outcome,
            None => match self.persistent.get(&recipient) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            },
        };

        outcome.map(|()| MessageHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
