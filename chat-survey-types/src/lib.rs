//! Core types for the chat-survey crate.
//!
//! This crate provides the foundational types for conversational surveys:
//! - `FieldSpec` and `FieldRegistry` - The ordered, declarative field list
//! - `UserRecord`, `FieldValues` and `SurveyState` - Per-user progress
//! - `InboundEvent` and `OutboundMessage` - What flows over the channel
//! - `RecordStore`, `Transport` and `EventSource` traits - The external seams

mod field;
pub use field::{
    Acknowledgment, AutoCollect, DbFormatter, DisplayFormatter, FieldSpec,
    MULTI_SELECT_DELIMITER, SELECTION_DRAFT_KEY, SKIPPED, SkipPredicate, Validator,
};

mod registry;
pub use registry::FieldRegistry;

mod values;
pub use values::FieldValues;

mod record;
pub use record::{UserId, UserRecord};

mod state;
pub use state::{EDIT_MENU, EDIT_PREFIX, REGISTERED, SurveyState};

mod event;
pub use event::{EventMeta, InboundEvent, Incoming, SelectAction};

mod message;
pub use message::{Button, Keyboard, MessageHandle, OutboundMessage, Reply};

mod error;
pub use error::{RegistryError, StoreError, SurveyError, TransportError};

mod traits;
pub use traits::{EventSource, RecordStore, ThresholdLedger, Transport};
