//! Sending one message to many recipients.

use tracing::{info, instrument};

use crate::{Deliverer, OutboundMessage, UserId};

/// Aggregate result of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutStats {
    pub success: usize,
    pub failed: usize,
}

impl FanoutStats {
    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

impl Deliverer {
    /// Send `message` to every recipient in order.
    ///
    /// Sends are sequential with `fanout_interval` between them to stay under
    /// channel-wide rate limits. A failed recipient never stops the batch.
    #[instrument(skip_all, fields(recipients = recipients.len()))]
    pub async fn send_to_many(
        &self,
        recipients: &[UserId],
        message: &OutboundMessage,
    ) -> FanoutStats {
        let mut stats = FanoutStats::default();
        for (index, &recipient) in recipients.iter().enumerate() {
            if index > 0 && !self.config().fanout_interval.is_zero() {
                tokio::time::sleep(self.config().fanout_interval).await;
            }
            if self.send(recipient, message).await {
                stats.success += 1;
            } else {
                stats.failed += 1;
            }
        }
        info!(success = stats.success, failed = stats.failed, "Fan-out finished");
        stats
    }
}
