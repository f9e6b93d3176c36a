use std::fmt;

use crate::{FieldValues, SurveyState};

/// Stable identifier of a recipient on the messaging channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Everything the survey knows about one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,

    /// Raw persisted state marker; see [`SurveyState`].
    pub state: String,

    pub values: FieldValues,

    /// Set when the channel permanently rejected a message to this user.
    /// Cleared when the user writes again.
    pub blocked: bool,
}

impl UserRecord {
    pub fn new(id: UserId, state: impl Into<String>) -> Self {
        Self {
            id,
            state: state.into(),
            values: FieldValues::new(),
            blocked: false,
        }
    }

    /// The parsed current state.
    pub fn survey_state(&self) -> SurveyState {
        SurveyState::parse(&self.state)
    }

    /// Whether the user has completed the survey at least once. Users in the
    /// edit sub-flow count as registered.
    pub fn is_registered(&self) -> bool {
        matches!(
            self.survey_state(),
            SurveyState::Registered | SurveyState::EditMenu | SurveyState::Editing(_)
        )
    }
}
