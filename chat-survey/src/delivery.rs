//! Single-recipient delivery with retries.
//!
//! [`Deliverer::send`] never returns an error. Every failure is classified
//! and reported as `false`, so callers looping over many recipients can keep
//! going:
//!
//! | Transport error | Reaction |
//! |---|---|
//! | `Blocked` | mark the recipient blocked, stop |
//! | `RateLimited` | sleep the requested time, retry without using up an attempt |
//! | `Network` | back off exponentially, retry until attempts run out |
//! | `Other` | stop |
//!
//! Recipients already marked blocked are skipped without any transport call.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::{DeliveryConfig, OutboundMessage, RecordStore, Transport, TransportError, UserId};

/// How a single delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryOutcome {
    Delivered,
    /// The recipient was already marked blocked; nothing was sent.
    RecipientBlocked,
    /// The channel reported the recipient blocked it; now marked blocked.
    PermanentlyRejected,
    /// Every attempt failed with a network error.
    RetriesExhausted,
    /// The channel kept rate limiting past the configured number of waits.
    RateLimitExhausted,
    /// An unclassified transport error.
    Rejected,
}

impl DeliveryOutcome {
    pub fn is_delivered(self) -> bool {
        self == Self::Delivered
    }
}

/// Sends messages through a [`Transport`], consulting and maintaining the
/// blocked flag in a [`RecordStore`].
#[derive(Clone)]
pub struct Deliverer {
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn Transport>,
    config: DeliveryConfig,
}

impl Deliverer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn Transport>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Deliver one message. Returns whether it arrived.
    pub async fn send(&self, recipient: UserId, message: &OutboundMessage) -> bool {
        self.deliver(recipient, message).await.is_delivered()
    }

    /// Deliver one message and report how it went.
    #[instrument(skip_all, fields(recipient = %recipient))]
    pub async fn deliver(&self, recipient: UserId, message: &OutboundMessage) -> DeliveryOutcome {
        match self.store.is_blocked(recipient).await {
            Ok(true) => {
                debug!("Recipient is blocked, skipping send");
                return DeliveryOutcome::RecipientBlocked;
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not read blocked flag, sending anyway"),
        }

        let mut attempt = 1;
        let mut rate_limit_waits = 0;
        loop {
            let error = match self.transport.send_text(recipient, message).await {
                Ok(handle) => {
                    debug!(attempt, handle = handle.0, "Message delivered");
                    return DeliveryOutcome::Delivered;
                }
                Err(error) => error,
            };

            match error {
                TransportError::Blocked(reason) => {
                    warn!(%reason, "Recipient blocked the channel");
                    if let Err(e) = self.store.set_blocked(recipient, true).await {
                        warn!(error = %e, "Could not mark recipient as blocked");
                    }
                    return DeliveryOutcome::PermanentlyRejected;
                }
                TransportError::RateLimited { retry_after } => {
                    if rate_limit_waits >= self.config.max_rate_limit_waits {
                        warn!(rate_limit_waits, "Still rate limited, giving up");
                        return DeliveryOutcome::RateLimitExhausted;
                    }
                    rate_limit_waits += 1;
                    debug!(?retry_after, attempt, "Rate limited, waiting");
                    tokio::time::sleep(retry_after).await;
                }
                TransportError::Network(reason) => {
                    if attempt >= self.config.max_retries {
                        warn!(attempt, %reason, "Delivery failed after all attempts");
                        return DeliveryOutcome::RetriesExhausted;
                    }
                    let delay = self.config.delay_for_attempt(attempt);
                    debug!(attempt, ?delay, %reason, "Network error, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                TransportError::Other(reason) => {
                    warn!(attempt, %reason, "Delivery rejected");
                    return DeliveryOutcome::Rejected;
                }
            }
        }
    }
}
