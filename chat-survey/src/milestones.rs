//! Staff notifications when the number of participants crosses a threshold.
//!
//! The notifier listens to [`CommitNotice::SurveyCompleted`] and is otherwise
//! independent of the survey machine. Announced thresholds are remembered in
//! a [`ThresholdLedger`] so each one is sent at most once.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, instrument, warn};

use crate::{
    CommitNotice, Deliverer, OutboundMessage, RecordStore, StoreError, ThresholdLedger, UserId,
};

pub type MilestoneMessage = Arc<dyn Fn(u64) -> String + Send + Sync>;

pub struct MilestoneNotifier {
    store: Arc<dyn RecordStore>,
    ledger: Arc<dyn ThresholdLedger>,
    deliverer: Deliverer,
    staff: Vec<UserId>,
    thresholds: Vec<u64>,
    message: MilestoneMessage,
}

impl MilestoneNotifier {
    pub fn new(
        store: Arc<dyn RecordStore>,
        ledger: Arc<dyn ThresholdLedger>,
        deliverer: Deliverer,
        staff: Vec<UserId>,
        thresholds: impl IntoIterator<Item = u64>,
    ) -> Self {
        let mut thresholds: Vec<u64> = thresholds.into_iter().collect();
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            store,
            ledger,
            deliverer,
            staff,
            thresholds,
            message: Arc::new(|threshold| format!("{threshold} participants have registered!")),
        }
    }

    pub fn with_message(
        mut self,
        message: impl Fn(u64) -> String + Send + Sync + 'static,
    ) -> Self {
        self.message = Arc::new(message);
        self
    }

    /// Count registered participants and announce every threshold reached
    /// but not yet announced. Returns the thresholds announced by this call.
    #[instrument(skip_all)]
    pub async fn check(&self) -> Result<Vec<u64>, StoreError> {
        let count = self.count_registered().await?;
        debug!(count, "Counted registered participants");

        let mut announced = Vec::new();
        for &threshold in self.thresholds.iter().take_while(|&&t| t <= count) {
            if self.ledger.is_notified(threshold).await? {
                continue;
            }
            self.ledger.mark_notified(threshold).await?;

            let message = OutboundMessage::text((self.message)(threshold));
            let stats = self.deliverer.send_to_many(&self.staff, &message).await;
            info!(
                threshold,
                count,
                success = stats.success,
                failed = stats.failed,
                "Milestone announced"
            );
            announced.push(threshold);
        }
        Ok(announced)
    }

    /// React to completions until the machine is dropped.
    pub async fn run(self, mut commits: broadcast::Receiver<CommitNotice>) {
        loop {
            match commits.recv().await {
                Ok(CommitNotice::SurveyCompleted { .. }) => {}
                Ok(CommitNotice::FieldCommitted { .. }) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Commit notices were dropped, recounting");
                }
                Err(RecvError::Closed) => break,
            }
            if let Err(e) = self.check().await {
                warn!(error = %e, "Milestone check failed");
            }
        }
    }

    // Full scan per completion. Fine for the participant counts this runs at.
    async fn count_registered(&self) -> Result<u64, StoreError> {
        let mut count = 0;
        for id in self.store.all_user_ids().await? {
            if let Some(record) = self.store.get_user(id).await? {
                if record.is_registered() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeliveryConfig, MemoryStore, RecordingTransport};

    #[tokio::test(start_paused = true)]
    async fn announces_each_threshold_once() {
        let store = Arc::new(
            MemoryStore::new()
                .with_user(UserId(1), "registered")
                .with_user(UserId(2), "registered")
                .with_user(UserId(3), "phone"),
        );
        let transport = Arc::new(RecordingTransport::new());
        let deliverer = Deliverer::new(store.clone(), transport.clone(), DeliveryConfig::default());
        let notifier = MilestoneNotifier::new(
            store.clone(),
            store.clone(),
            deliverer,
            vec![UserId(100), UserId(101)],
            [3, 1, 2],
        );

        assert_eq!(notifier.check().await.unwrap(), vec![1, 2]);
        assert_eq!(notifier.check().await.unwrap(), Vec::<u64>::new());
        assert_eq!(
            transport.texts_to(UserId(100)),
            vec![
                "1 participants have registered!",
                "2 participants have registered!"
            ]
        );
        assert_eq!(transport.calls().len(), 4);

        store.update_state(UserId(3), "registered").await.unwrap();
        assert_eq!(notifier.check().await.unwrap(), vec![3]);
    }
}
