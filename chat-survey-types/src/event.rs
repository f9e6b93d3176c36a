use crate::UserId;

/// What a button press on a selection keyboard asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectAction {
    /// Toggle (multi-select) or choose (single-select) an option.
    Select,

    /// Commit the current multi-select set.
    Done,
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Free text typed by the user, including reply-keyboard presses.
    Text(String),

    /// The user shared a contact card.
    Contact { phone_number: String },

    /// An inline button press. `option` is empty for [`SelectAction::Done`].
    Selection {
        action: SelectAction,
        option: String,
    },
}

impl InboundEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn contact(phone_number: impl Into<String>) -> Self {
        Self::Contact {
            phone_number: phone_number.into(),
        }
    }

    pub fn select(option: impl Into<String>) -> Self {
        Self::Selection {
            action: SelectAction::Select,
            option: option.into(),
        }
    }

    pub fn done() -> Self {
        Self::Selection {
            action: SelectAction::Done,
            option: String::new(),
        }
    }

    /// The typed answer carried by the event, if it is a typed answer at all.
    /// Contact shares count as typing the shared phone number.
    pub fn typed_input(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Contact { phone_number } => Some(phone_number),
            Self::Selection { .. } => None,
        }
    }
}

/// Sender metadata attached to every event by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMeta {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

impl EventMeta {
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }
}

/// An event together with who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub user_id: UserId,
    pub meta: EventMeta,
    pub event: InboundEvent,
}

impl Incoming {
    pub fn new(user_id: impl Into<UserId>, event: InboundEvent) -> Self {
        Self {
            user_id: user_id.into(),
            meta: EventMeta::default(),
            event,
        }
    }

    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = meta;
        self
    }
}
