use chat_survey::{FieldRegistry, FieldSpec, RegistryError, formatters, validators};

/// Ratings at or above this skip the "what should we improve" question.
pub const GOOD_RATING: i64 = 4;

/// Post-event feedback. Low ratings get a follow-up question.
pub fn feedback() -> Result<FieldRegistry, RegistryError> {
    FieldRegistry::new(vec![
        FieldSpec::new("rating", "Rating", "How would you rate the event, from 1 to 5?")
            .with_validator(validators::int_in_range(1, 5))
            .with_db_formatter(formatters::trimmed),
        FieldSpec::new("improve", "To improve", "What should we do better next time?")
            .with_validator(validators::both(
                validators::non_empty,
                validators::max_len(500),
            ))
            .with_display_formatter(formatters::or_placeholder)
            .skip_if(|values| {
                values
                    .get("rating")
                    .and_then(|rating| rating.parse::<i64>().ok())
                    .is_some_and(|rating| rating >= GOOD_RATING)
            }),
        FieldSpec::new("favourite", "Favourite parts", "What did you enjoy?")
            .with_options(["Talks", "Workshops", "Networking", "Food"])
            .multi_select(),
        FieldSpec::new("language", "Language", "")
            .auto_collect(|meta| meta.language_code.clone().unwrap_or_default())
            .with_display_formatter(formatters::or_placeholder),
    ])
}
