//! # chat-survey
//!
//! Conversational surveys over messaging channels, with reliable delivery.
//! Transport- and storage-agnostic.
//!
//! A survey is an ordered [`FieldRegistry`] of [`FieldSpec`]s. The
//! [`SurveyMachine`] walks each user through it one inbound event at a time,
//! persisting progress in a [`RecordStore`]. Replies and broadcasts go out
//! through a [`Deliverer`], which retries transient failures, waits out rate
//! limits and remembers recipients who blocked the channel.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_survey::{
//!     Deliverer, DeliveryConfig, FieldRegistry, FieldSpec, MemoryStore, SurveyBot,
//!     SurveyMachine, formatters, validators,
//! };
//!
//! let registry = FieldRegistry::new(vec![
//!     FieldSpec::new("phone", "Phone", "Share your phone number")
//!         .request_contact()
//!         .with_validator(validators::phone)
//!         .with_db_formatter(formatters::phone_digits),
//!     FieldSpec::new("name", "Name", "What is your full name?")
//!         .with_validator(validators::full_name),
//! ])?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let machine = Arc::new(SurveyMachine::new(registry, store.clone()));
//! let deliverer = Deliverer::new(store, transport, DeliveryConfig::from_env()?);
//! SurveyBot::new(machine, deliverer).run(events).await;
//! ```
//!
//! ## Field behaviour
//!
//! - `with_options([...])` - Answer by button press only
//! - `multi_select()` - Toggle options, commit with "Done"
//! - `auto_collect(|meta| ...)` - Fill from event metadata, never prompt
//! - `skip_if(|values| ...)` - Store `"skipped"` and move on when true
//! - `not_editable()` - Hide from the edit menu
//! - `with_acknowledgment(...)` - Confirmation sent after the answer

// Re-export all types from chat-survey-types
pub use chat_survey_types::*;

mod config;
pub use config::{ConfigError, DeliveryConfig, SurveyTexts};

pub mod formatters;
pub mod validators;

mod render;
pub use render::summary;

mod machine;
pub use machine::{CommitNotice, SurveyMachine};

mod delivery;
pub use delivery::{Deliverer, DeliveryOutcome};

mod fanout;
pub use fanout::FanoutStats;

mod recipients;
pub use recipients::{RecipientFilter, RecipientPredicate, select_recipients};

mod milestones;
pub use milestones::{MilestoneMessage, MilestoneNotifier};

mod bot;
pub use bot::SurveyBot;

// In-memory store for tests and demos
mod memory_store;
pub use memory_store::MemoryStore;

// Test transport for exercising delivery without a real channel
mod test_transport;
pub use test_transport::{RecordingTransport, TransportCall};
