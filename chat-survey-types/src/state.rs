use std::fmt;

/// Persisted marker for a user who completed the survey.
pub const REGISTERED: &str = "registered";

/// Persisted marker for a user looking at the edit menu.
pub const EDIT_MENU: &str = "edit";

/// Prefix marking a field that is being edited after completion.
pub const EDIT_PREFIX: &str = "edit_";

/// Where a user currently is in the survey.
///
/// Persisted as a plain string: the field name, `edit_<field>`, `registered`
/// or `edit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurveyState {
    /// Answering a field in the normal sequence.
    Field(String),

    /// Re-answering a single field from the edit menu.
    Editing(String),

    /// All fields answered.
    Registered,

    /// Choosing which field to edit.
    EditMenu,
}

impl SurveyState {
    /// Parse a persisted marker. Never fails: anything that is not a known
    /// marker is taken as a field name and resolved against the registry later.
    pub fn parse(raw: &str) -> Self {
        match raw {
            REGISTERED => Self::Registered,
            EDIT_MENU => Self::EditMenu,
            _ => match raw.strip_prefix(EDIT_PREFIX) {
                Some(field) => Self::Editing(field.to_string()),
                None => Self::Field(raw.to_string()),
            },
        }
    }

    /// Whether `name` would be confused with a state marker if used as a
    /// field name.
    pub fn is_reserved(name: &str) -> bool {
        name == REGISTERED || name == EDIT_MENU || name.starts_with(EDIT_PREFIX)
    }

    /// The field name this state refers to, if any.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(name) | Self::Editing(name) => Some(name),
            Self::Registered | Self::EditMenu => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing(_))
    }
}

impl fmt::Display for SurveyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Editing(name) => write!(f, "{EDIT_PREFIX}{name}"),
            Self::Registered => write!(f, "{REGISTERED}"),
            Self::EditMenu => write!(f, "{EDIT_MENU}"),
        }
    }
}
