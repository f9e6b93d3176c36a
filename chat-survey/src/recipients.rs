//! Recipient queries for broadcasts.

use std::fmt;
use std::sync::Arc;

use crate::{RecordStore, StoreError, UserId, UserRecord};

pub type RecipientPredicate = Arc<dyn Fn(&UserRecord) -> bool + Send + Sync>;

/// Which users a broadcast goes to. Blocked users are never selected.
#[derive(Clone)]
pub enum RecipientFilter {
    /// Everyone who has not blocked the channel.
    AllReachable,

    /// Users who completed the survey.
    Registered,

    /// Users whose stored value for `field` equals `value`.
    FieldEquals { field: String, value: String },

    Custom(RecipientPredicate),
}

impl RecipientFilter {
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn custom(predicate: impl Fn(&UserRecord) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, record: &UserRecord) -> bool {
        if record.blocked {
            return false;
        }
        match self {
            Self::AllReachable => true,
            Self::Registered => record.is_registered(),
            Self::FieldEquals { field, value } => record.values.is(field, value),
            Self::Custom(predicate) => predicate(record),
        }
    }
}

impl fmt::Debug for RecipientFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllReachable => f.write_str("AllReachable"),
            Self::Registered => f.write_str("Registered"),
            Self::FieldEquals { field, value } => f
                .debug_struct("FieldEquals")
                .field("field", field)
                .field("value", value)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Scan the store for users matching `filter`, in ascending id order.
pub async fn select_recipients(
    store: &dyn RecordStore,
    filter: &RecipientFilter,
) -> Result<Vec<UserId>, StoreError> {
    let mut ids = store.all_user_ids().await?;
    ids.sort();

    let mut selected = Vec::new();
    for id in ids {
        let matched = store
            .get_user(id)
            .await?
            .is_some_and(|record| filter.matches(&record));
        if matched {
            selected.push(id);
        }
    }
    Ok(selected)
}
