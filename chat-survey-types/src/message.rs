use crate::SelectAction;

/// An inline button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button (may carry a selection mark).
    pub text: String,
    pub action: SelectAction,
    /// The option this button stands for; empty for "done".
    pub option: String,
}

impl Button {
    pub fn select(text: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: SelectAction::Select,
            option: option.into(),
        }
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: SelectAction::Done,
            option: String::new(),
        }
    }
}

/// Input affordance the transport should render with a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever the client shows.
    #[default]
    None,

    /// Remove a previously shown reply keyboard.
    Remove,

    /// Inline selection buttons.
    Inline(Vec<Button>),

    /// A reply keyboard with one button per entry; pressing sends its text.
    Menu(Vec<String>),

    /// A single button that shares the user's contact.
    RequestContact { button_text: String },
}

/// A message ready to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Keyboard,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }
}

/// Transport-side identifier of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub i64);

/// Messages produced by one step of the survey, in sending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub messages: Vec<OutboundMessage>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(message: OutboundMessage) -> Self {
        Self {
            messages: vec![message],
        }
    }

    pub fn push(&mut self, message: OutboundMessage) {
        self.messages.push(message);
    }

    /// The last message, which carries the prompt for the next step.
    pub fn prompt(&self) -> Option<&OutboundMessage> {
        self.messages.last()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}
