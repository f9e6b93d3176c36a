use async_trait::async_trait;

use crate::{
    Incoming, MessageHandle, OutboundMessage, StoreError, TransportError, UserId, UserRecord,
};

/// Durable per-user records.
///
/// Implementations must make each call atomic for its user. Callers never
/// interleave two read-modify-write sequences for the same user id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record, or `None` for a user never seen before.
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Create a record in the given initial state. Creating an existing
    /// record leaves it untouched.
    async fn create_user(&self, id: UserId, initial_state: &str) -> Result<(), StoreError>;

    async fn update_field(&self, id: UserId, name: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a stored value. Removing a missing value is not an error.
    async fn clear_field(&self, id: UserId, name: &str) -> Result<(), StoreError>;

    async fn update_state(&self, id: UserId, state: &str) -> Result<(), StoreError>;

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError>;

    /// Unknown users are not blocked.
    async fn is_blocked(&self, id: UserId) -> Result<bool, StoreError>;

    /// Must also succeed for users without a record, such as staff who never
    /// took the survey, so that they are not contacted again. Creating the
    /// record later clears the flag.
    async fn set_blocked(&self, id: UserId, blocked: bool) -> Result<(), StoreError>;
}

/// Outbound half of the messaging channel.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(
        &self,
        recipient: UserId,
        message: &OutboundMessage,
    ) -> Result<MessageHandle, TransportError>;
}

/// Inbound half of the messaging channel.
#[async_trait]
pub trait EventSource: Send {
    /// The next decoded event, or `None` once the channel is closed.
    async fn next_event(&mut self) -> Option<Incoming>;
}

/// Remembers which participant-count milestones were already announced.
#[async_trait]
pub trait ThresholdLedger: Send + Sync {
    async fn is_notified(&self, threshold: u64) -> Result<bool, StoreError>;

    async fn mark_notified(&self, threshold: u64) -> Result<(), StoreError>;
}
