//! Turning survey positions into outbound messages.

use std::collections::HashSet;

use crate::{
    Button, FieldRegistry, FieldSpec, FieldValues, Keyboard, MULTI_SELECT_DELIMITER,
    OutboundMessage, SurveyTexts,
};

/// The in-progress multi-select set of `field`, read from the record.
pub(crate) fn draft_selection(field: &FieldSpec, values: &FieldValues) -> HashSet<String> {
    values
        .get_list(&field.draft_key())
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Join selected options in declared order.
pub(crate) fn join_selection(field: &FieldSpec, selected: &HashSet<String>) -> String {
    field
        .options()
        .iter()
        .filter(|option| selected.contains(*option))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(MULTI_SELECT_DELIMITER)
}

/// The keyboard that goes with a field's prompt.
pub(crate) fn field_keyboard(
    field: &FieldSpec,
    values: &FieldValues,
    texts: &SurveyTexts,
) -> Keyboard {
    if field.has_options() {
        if !field.is_multi_select() {
            return Keyboard::Inline(
                field
                    .options()
                    .iter()
                    .map(|option| Button::select(option.clone(), option.clone()))
                    .collect(),
            );
        }

        let selected = draft_selection(field, values);
        let mut buttons: Vec<Button> = field
            .options()
            .iter()
            .map(|option| {
                let text = if selected.contains(option) {
                    format!("{}{option}", texts.selected_mark)
                } else {
                    option.clone()
                };
                Button::select(text, option.clone())
            })
            .collect();
        buttons.push(Button::done(texts.done.clone()));
        return Keyboard::Inline(buttons);
    }

    if field.requests_contact() {
        return Keyboard::RequestContact {
            button_text: texts.share_contact.clone(),
        };
    }

    Keyboard::Remove
}

/// The prompt asking for `field`.
pub(crate) fn field_prompt(
    field: &FieldSpec,
    values: &FieldValues,
    texts: &SurveyTexts,
) -> OutboundMessage {
    OutboundMessage::text(field.prompt()).with_keyboard(field_keyboard(field, values, texts))
}

/// An error message that keeps the field's keyboard in place.
pub(crate) fn field_error(
    message: &str,
    field: &FieldSpec,
    values: &FieldValues,
    texts: &SurveyTexts,
) -> OutboundMessage {
    OutboundMessage::text(message).with_keyboard(field_keyboard(field, values, texts))
}

/// Everything collected so far, one `label: value` line per answered field.
pub fn summary(
    registry: &FieldRegistry,
    values: &FieldValues,
    texts: &SurveyTexts,
) -> OutboundMessage {
    let mut text = texts.registered.clone();
    for field in registry.iter() {
        if values.is_skipped(field.name()) {
            continue;
        }
        text.push('\n');
        text.push_str(field.label());
        text.push_str(": ");
        text.push_str(&field.format_for_display(values.get(field.name())));
    }
    OutboundMessage::text(text).with_keyboard(Keyboard::Menu(vec![texts.change_data.clone()]))
}

/// The list of editable fields plus a cancel entry.
pub(crate) fn edit_menu(registry: &FieldRegistry, texts: &SurveyTexts) -> OutboundMessage {
    let mut entries: Vec<String> = registry
        .editable()
        .map(|field| field.label().to_string())
        .collect();
    entries.push(texts.cancel.clone());
    OutboundMessage::text(texts.edit_menu.clone()).with_keyboard(Keyboard::Menu(entries))
}
