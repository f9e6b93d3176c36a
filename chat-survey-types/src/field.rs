use std::fmt;
use std::sync::Arc;

use crate::{EventMeta, FieldValues};

/// Validates raw user input. Returns the message to show on rejection.
pub type Validator = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Normalizes accepted input into its stored form.
pub type DbFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Renders a stored value for display. Receives `None` when nothing is stored.
pub type DisplayFormatter = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;

/// Derives a field value from event metadata instead of user input.
pub type AutoCollect = Arc<dyn Fn(&EventMeta) -> String + Send + Sync>;

/// Decides from the answers so far whether a field should be bypassed.
pub type SkipPredicate = Arc<dyn Fn(&FieldValues) -> bool + Send + Sync>;

/// The value stored for a field whose skip predicate matched.
pub const SKIPPED: &str = "skipped";

/// Separator used when a multi-select answer is stored as one string.
pub const MULTI_SELECT_DELIMITER: &str = ", ";

/// Key suffix under which the in-progress multi-select set is kept.
/// For a field "interests", the draft lives at "interests.selected".
pub const SELECTION_DRAFT_KEY: &str = "selected";

/// Confirmation text sent after a field is committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgment {
    /// The same text regardless of the answer.
    Fixed(String),

    /// Text keyed by the selected option, with an optional fallback for
    /// options (or free-text answers) that have no entry.
    PerOption {
        entries: Vec<(String, String)>,
        fallback: Option<String>,
    },
}

impl Acknowledgment {
    /// Resolve the text for a committed value, if any.
    pub fn text_for(&self, value: &str) -> Option<&str> {
        match self {
            Self::Fixed(text) => Some(text),
            Self::PerOption { entries, fallback } => entries
                .iter()
                .find(|(option, _)| option == value)
                .map(|(_, text)| text.as_str())
                .or(fallback.as_deref()),
        }
    }
}

/// Declarative description of one collectible datum.
///
/// The state machine interprets these generically; behaviour that differs
/// per field lives in the function-typed members, never in the machine.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    label: String,
    prompt: String,
    validator: Option<Validator>,
    db_formatter: Option<DbFormatter>,
    display_formatter: Option<DisplayFormatter>,
    options: Vec<String>,
    multi_select: bool,
    request_contact: bool,
    auto_collect: Option<AutoCollect>,
    skip_if: Option<SkipPredicate>,
    editable: bool,
    acknowledgment: Option<Acknowledgment>,
}

impl FieldSpec {
    /// Create a free-text field that accepts any input.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            prompt: prompt.into(),
            validator: None,
            db_formatter: None,
            display_formatter: None,
            options: Vec::new(),
            multi_select: false,
            request_contact: false,
            auto_collect: None,
            skip_if: None,
            editable: true,
            acknowledgment: None,
        }
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_db_formatter(
        mut self,
        formatter: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.db_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_display_formatter(
        mut self,
        formatter: impl Fn(Option<&str>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.display_formatter = Some(Arc::new(formatter));
        self
    }

    /// Restrict answers to a single choice among `options`.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Allow any non-empty subset of the options.
    pub fn multi_select(mut self) -> Self {
        self.multi_select = true;
        self
    }

    /// Ask the transport to offer a contact-share button.
    pub fn request_contact(mut self) -> Self {
        self.request_contact = true;
        self
    }

    /// Fill the field from event metadata. Auto-collected fields are never
    /// shown to the user and therefore not editable.
    pub fn auto_collect(
        mut self,
        collect: impl Fn(&EventMeta) -> String + Send + Sync + 'static,
    ) -> Self {
        self.auto_collect = Some(Arc::new(collect));
        self.editable = false;
        self
    }

    pub fn skip_if(
        mut self,
        predicate: impl Fn(&FieldValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.skip_if = Some(Arc::new(predicate));
        self
    }

    /// Hide the field from the edit menu.
    pub fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_acknowledgment(mut self, acknowledgment: Acknowledgment) -> Self {
        self.acknowledgment = Some(acknowledgment);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    pub fn is_multi_select(&self) -> bool {
        self.multi_select
    }

    pub fn requests_contact(&self) -> bool {
        self.request_contact
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_auto_collected(&self) -> bool {
        self.auto_collect.is_some()
    }

    pub fn acknowledgment(&self) -> Option<&Acknowledgment> {
        self.acknowledgment.as_ref()
    }

    /// Key of the in-progress multi-select set for this field.
    pub fn draft_key(&self) -> String {
        format!("{}.{}", self.name, SELECTION_DRAFT_KEY)
    }

    /// Run the validator. Fields without one accept everything.
    pub fn validate(&self, input: &str) -> Result<(), String> {
        match &self.validator {
            Some(validator) => validator(input),
            None => Ok(()),
        }
    }

    /// Apply the storage formatter, or pass the input through unchanged.
    pub fn format_for_storage(&self, input: &str) -> String {
        match &self.db_formatter {
            Some(formatter) => formatter(input),
            None => input.to_string(),
        }
    }

    /// Render a stored value for display.
    pub fn format_for_display(&self, value: Option<&str>) -> String {
        match &self.display_formatter {
            Some(formatter) => formatter(value),
            None => value.unwrap_or_default().to_string(),
        }
    }

    /// Compute the auto-collected value, if this field is auto-collected.
    pub fn collect(&self, meta: &EventMeta) -> Option<String> {
        self.auto_collect.as_ref().map(|collect| collect(meta))
    }

    /// Whether the field should be bypassed given the answers so far.
    pub fn should_skip(&self, values: &FieldValues) -> bool {
        self.skip_if.as_ref().is_some_and(|predicate| predicate(values))
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("prompt", &self.prompt)
            .field("options", &self.options)
            .field("multi_select", &self.multi_select)
            .field("request_contact", &self.request_contact)
            .field("auto_collect", &self.auto_collect.is_some())
            .field("skip_if", &self.skip_if.is_some())
            .field("editable", &self.editable)
            .field("acknowledgment", &self.acknowledgment)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_option_acknowledgment_falls_back() {
        let ack = Acknowledgment::PerOption {
            entries: vec![("Yes".into(), "Great!".into())],
            fallback: Some("Noted.".into()),
        };
        assert_eq!(ack.text_for("Yes"), Some("Great!"));
        assert_eq!(ack.text_for("No"), Some("Noted."));
    }

    #[test]
    fn auto_collected_fields_are_not_editable() {
        let field = FieldSpec::new("handle", "Handle", "")
            .auto_collect(|meta| meta.username.clone().unwrap_or_default());
        assert!(!field.is_editable());
        assert!(field.is_auto_collected());
    }

    #[test]
    fn missing_formatters_pass_through() {
        let field = FieldSpec::new("city", "City", "Where do you live?");
        assert_eq!(field.format_for_storage(" Oslo "), " Oslo ");
        assert_eq!(field.format_for_display(None), "");
        assert!(field.validate("anything").is_ok());
    }

    #[test]
    fn draft_key_is_namespaced_under_the_field() {
        let field = FieldSpec::new("interests", "Interests", "Pick some").multi_select();
        assert_eq!(field.draft_key(), "interests.selected");
    }
}
