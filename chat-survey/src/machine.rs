//! The survey state machine.
//!
//! [`SurveyMachine::advance`] takes one inbound event, moves the sender's
//! record forward and returns the messages to send back. It interprets the
//! [`FieldRegistry`] generically: everything that differs between fields is
//! carried by the field's own closures.
//!
//! Auto-collected and skipped fields are settled without a prompt as soon as
//! the sequence reaches them, so the user only ever sees live fields.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

use crate::render;
use crate::{
    EventMeta, FieldRegistry, FieldSpec, InboundEvent, Incoming, MULTI_SELECT_DELIMITER,
    OutboundMessage, RecordStore, Reply, SKIPPED, SelectAction, StoreError, SurveyError,
    SurveyState, SurveyTexts, UserId, UserRecord,
};

/// Capacity of the commit notice channel. Slow subscribers see `Lagged`.
const COMMIT_CHANNEL_CAPACITY: usize = 256;

/// Published whenever the machine writes a value or a user completes the survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitNotice {
    FieldCommitted {
        user_id: UserId,
        field: String,
        value: String,
    },

    /// The user reached `registered` for the first time.
    SurveyCompleted { user_id: UserId },
}

pub struct SurveyMachine {
    registry: Arc<FieldRegistry>,
    store: Arc<dyn RecordStore>,
    texts: SurveyTexts,
    commits: broadcast::Sender<CommitNotice>,
}

impl SurveyMachine {
    pub fn new(registry: FieldRegistry, store: Arc<dyn RecordStore>) -> Self {
        let (commits, _) = broadcast::channel(COMMIT_CHANNEL_CAPACITY);
        Self {
            registry: Arc::new(registry),
            store,
            texts: SurveyTexts::default(),
            commits,
        }
    }

    pub fn with_texts(mut self, texts: SurveyTexts) -> Self {
        self.texts = texts;
        self
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn texts(&self) -> &SurveyTexts {
        &self.texts
    }

    /// Receive every [`CommitNotice`] published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CommitNotice> {
        self.commits.subscribe()
    }

    /// Process one inbound event and return the reply.
    ///
    /// A state naming a field the registry does not know is answered with
    /// the apology text and logged; the record is left untouched. Store
    /// failures are returned to the caller.
    #[instrument(skip_all, fields(user_id = %incoming.user_id))]
    pub async fn advance(&self, incoming: &Incoming) -> Result<Reply, SurveyError> {
        match self.step(incoming).await {
            Err(SurveyError::UnknownField { user_id, field }) => {
                error!(%user_id, %field, "State refers to an unknown field");
                Ok(Reply::single(OutboundMessage::text(&self.texts.apology)))
            }
            result => result,
        }
    }

    /// Write a value on behalf of an operator. The value goes through the
    /// field's validator and storage formatter; the user's state is kept.
    #[instrument(skip(self, raw))]
    pub async fn correct_field(
        &self,
        user_id: UserId,
        name: &str,
        raw: &str,
    ) -> Result<(), SurveyError> {
        let field = self.field(user_id, name)?;
        let invalid = |message: &str| SurveyError::InvalidValue {
            field: name.to_string(),
            message: message.to_string(),
        };

        if field.has_options() {
            let chosen: Vec<&str> = if field.is_multi_select() {
                raw.split(MULTI_SELECT_DELIMITER).collect()
            } else {
                vec![raw]
            };
            if chosen.iter().any(|option| !field.has_option(option)) {
                return Err(invalid(&self.texts.unknown_option));
            }
        }
        field.validate(raw).map_err(|message| invalid(&message))?;

        let value = field.format_for_storage(raw);
        self.store.update_field(user_id, name, &value).await?;
        info!("Field corrected");
        self.publish(CommitNotice::FieldCommitted {
            user_id,
            field: name.to_string(),
            value,
        });
        Ok(())
    }

    /// The summary a registered user would see, or `None` for unknown users.
    pub async fn summary_for(
        &self,
        user_id: UserId,
    ) -> Result<Option<OutboundMessage>, StoreError> {
        let record = self.store.get_user(user_id).await?;
        Ok(record.map(|record| render::summary(&self.registry, &record.values, &self.texts)))
    }

    async fn step(&self, incoming: &Incoming) -> Result<Reply, SurveyError> {
        let user_id = incoming.user_id;
        let mut reply = Reply::new();

        let Some(mut record) = self.store.get_user(user_id).await? else {
            let first = self.registry.first();
            self.store.create_user(user_id, first.name()).await?;
            info!("New participant");
            let mut record = UserRecord::new(user_id, first.name());
            let state = self
                .settle(&mut record, SurveyState::Field(first.name().to_string()), &incoming.meta)
                .await?;
            self.enter(&mut record, state, &mut reply).await?;
            return Ok(reply);
        };

        if record.blocked {
            self.store.set_blocked(user_id, false).await?;
            record.blocked = false;
            debug!("Participant is reachable again");
        }

        match record.survey_state() {
            SurveyState::Registered => {
                self.on_registered(&mut record, &incoming.event, &mut reply)
                    .await?;
            }
            SurveyState::EditMenu => {
                self.on_edit_menu(&mut record, &incoming.event, &mut reply)
                    .await?;
            }
            SurveyState::Field(name) => {
                self.on_field(&mut record, &name, false, incoming, &mut reply)
                    .await?;
            }
            SurveyState::Editing(name) => {
                self.on_field(&mut record, &name, true, incoming, &mut reply)
                    .await?;
            }
        }
        Ok(reply)
    }

    async fn on_registered(
        &self,
        record: &mut UserRecord,
        event: &InboundEvent,
        reply: &mut Reply,
    ) -> Result<(), SurveyError> {
        let state = match event {
            InboundEvent::Text(text) if text.trim() == self.texts.change_data => {
                SurveyState::EditMenu
            }
            _ => SurveyState::Registered,
        };
        self.enter(record, state, reply).await
    }

    async fn on_edit_menu(
        &self,
        record: &mut UserRecord,
        event: &InboundEvent,
        reply: &mut Reply,
    ) -> Result<(), SurveyError> {
        let state = match event {
            InboundEvent::Text(text) if text.trim() == self.texts.cancel => {
                SurveyState::Registered
            }
            InboundEvent::Text(text) => match self.registry.by_label(text.trim()) {
                Some(field) if field.is_editable() => {
                    debug!(field = field.name(), "Editing field");
                    SurveyState::Editing(field.name().to_string())
                }
                _ => SurveyState::EditMenu,
            },
            _ => SurveyState::EditMenu,
        };
        self.enter(record, state, reply).await
    }

    async fn on_field(
        &self,
        record: &mut UserRecord,
        name: &str,
        editing: bool,
        incoming: &Incoming,
        reply: &mut Reply,
    ) -> Result<(), SurveyError> {
        let field = self.field(record.id, name)?;

        if editing && field.is_auto_collected() {
            if let Some(value) = field.collect(&incoming.meta) {
                self.store_value(record, field, value).await?;
            }
            return self.enter(record, SurveyState::Registered, reply).await;
        }
        if !editing && (field.is_auto_collected() || field.should_skip(&record.values)) {
            let state = self
                .settle(record, SurveyState::Field(name.to_string()), &incoming.meta)
                .await?;
            return self.enter(record, state, reply).await;
        }

        let input = match &incoming.event {
            InboundEvent::Selection { action, option } => {
                return self
                    .on_selection(record, field, editing, *action, option, &incoming.meta, reply)
                    .await;
            }
            event => event.typed_input().unwrap_or_default().trim(),
        };

        if field.has_options() {
            reply.push(render::field_error(
                &self.texts.use_buttons,
                field,
                &record.values,
                &self.texts,
            ));
            return Ok(());
        }

        if let Err(message) = field.validate(input) {
            debug!(field = field.name(), %message, "Answer rejected");
            reply.push(render::field_error(&message, field, &record.values, &self.texts));
            return Ok(());
        }

        let value = field.format_for_storage(input);
        self.commit(record, field, editing, value, &incoming.meta, reply)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn on_selection(
        &self,
        record: &mut UserRecord,
        field: &FieldSpec,
        editing: bool,
        action: SelectAction,
        option: &str,
        meta: &EventMeta,
        reply: &mut Reply,
    ) -> Result<(), SurveyError> {
        if !field.has_options() {
            reply.push(render::field_error(
                &self.texts.type_answer,
                field,
                &record.values,
                &self.texts,
            ));
            return Ok(());
        }

        match action {
            SelectAction::Select if !field.has_option(option) => {
                reply.push(render::field_error(
                    &self.texts.unknown_option,
                    field,
                    &record.values,
                    &self.texts,
                ));
                Ok(())
            }
            SelectAction::Select if !field.is_multi_select() => {
                self.commit(record, field, editing, option.to_string(), meta, reply)
                    .await
            }
            SelectAction::Select => {
                let mut selected = render::draft_selection(field, &record.values);
                if !selected.remove(option) {
                    selected.insert(option.to_string());
                }
                let draft = render::join_selection(field, &selected);
                self.save_draft(record, field, draft).await?;
                reply.push(render::field_prompt(field, &record.values, &self.texts));
                Ok(())
            }
            SelectAction::Done if !field.is_multi_select() => {
                reply.push(render::field_error(
                    &self.texts.use_buttons,
                    field,
                    &record.values,
                    &self.texts,
                ));
                Ok(())
            }
            SelectAction::Done => {
                let selected = render::draft_selection(field, &record.values);
                if selected.is_empty() {
                    reply.push(render::field_error(
                        &self.texts.empty_selection,
                        field,
                        &record.values,
                        &self.texts,
                    ));
                    return Ok(());
                }
                let value = render::join_selection(field, &selected);
                self.save_draft(record, field, String::new()).await?;
                self.commit(record, field, editing, value, meta, reply)
                    .await
            }
        }
    }

    /// Store an accepted value, acknowledge it and move to the next state.
    /// Edits always return to `registered`.
    async fn commit(
        &self,
        record: &mut UserRecord,
        field: &FieldSpec,
        editing: bool,
        value: String,
        meta: &EventMeta,
        reply: &mut Reply,
    ) -> Result<(), SurveyError> {
        if let Some(text) = field
            .acknowledgment()
            .and_then(|acknowledgment| acknowledgment.text_for(&value))
        {
            reply.push(OutboundMessage::text(text));
        }
        self.store_value(record, field, value).await?;

        let next = if editing {
            SurveyState::Registered
        } else {
            self.settle(record, self.next_state(field), meta).await?
        };
        self.enter(record, next, reply).await
    }

    /// Walk forward from `state` over auto-collected and skipped fields,
    /// storing their values, and return the first state that needs the user.
    async fn settle(
        &self,
        record: &mut UserRecord,
        mut state: SurveyState,
        meta: &EventMeta,
    ) -> Result<SurveyState, SurveyError> {
        loop {
            let SurveyState::Field(name) = &state else {
                return Ok(state);
            };
            let field = self.field(record.id, name)?;

            let value = match field.collect(meta) {
                Some(value) => value,
                None if field.should_skip(&record.values) => SKIPPED.to_string(),
                None => return Ok(state),
            };
            debug!(field = field.name(), "Settled without prompting");
            self.store_value(record, field, value).await?;
            state = self.next_state(field);
        }
    }

    /// Persist `state` and push its prompt.
    async fn enter(
        &self,
        record: &mut UserRecord,
        state: SurveyState,
        reply: &mut Reply,
    ) -> Result<(), SurveyError> {
        let prompt = match &state {
            SurveyState::Field(name) | SurveyState::Editing(name) => {
                let field = self.field(record.id, name)?;
                render::field_prompt(field, &record.values, &self.texts)
            }
            SurveyState::Registered => {
                render::summary(&self.registry, &record.values, &self.texts)
            }
            SurveyState::EditMenu => render::edit_menu(&self.registry, &self.texts),
        };

        let completed = state == SurveyState::Registered && !record.is_registered();
        let marker = state.to_string();
        if record.state != marker {
            self.store.update_state(record.id, &marker).await?;
            debug!(from = %record.state, to = %marker, "State changed");
            record.state = marker;
        }
        if completed {
            info!("Survey completed");
            self.publish(CommitNotice::SurveyCompleted { user_id: record.id });
        }

        reply.push(prompt);
        Ok(())
    }

    async fn store_value(
        &self,
        record: &mut UserRecord,
        field: &FieldSpec,
        value: String,
    ) -> Result<(), SurveyError> {
        self.store
            .update_field(record.id, field.name(), &value)
            .await?;
        debug!(field = field.name(), "Value stored");
        record.values.insert(field.name(), value.clone());
        self.publish(CommitNotice::FieldCommitted {
            user_id: record.id,
            field: field.name().to_string(),
            value,
        });
        Ok(())
    }

    /// Persist the in-progress selection of a multi-select field. An empty
    /// selection removes the draft.
    async fn save_draft(
        &self,
        record: &mut UserRecord,
        field: &FieldSpec,
        draft: String,
    ) -> Result<(), SurveyError> {
        let key = field.draft_key();
        if draft.is_empty() {
            self.store.clear_field(record.id, &key).await?;
            record.values.remove(&key);
        } else {
            self.store.update_field(record.id, &key, &draft).await?;
            debug!(field = field.name(), selected = %draft, "Selection changed");
            record.values.insert(key, draft);
        }
        Ok(())
    }

    fn next_state(&self, field: &FieldSpec) -> SurveyState {
        match self.registry.next_after(field.name()) {
            Some(next) => SurveyState::Field(next.name().to_string()),
            None => SurveyState::Registered,
        }
    }

    fn field(&self, user_id: UserId, name: &str) -> Result<&FieldSpec, SurveyError> {
        self.registry
            .get(name)
            .ok_or_else(|| SurveyError::UnknownField {
                user_id,
                field: name.to_string(),
            })
    }

    fn publish(&self, notice: CommitNotice) {
        // No subscribers is fine.
        let _ = self.commits.send(notice);
    }
}
