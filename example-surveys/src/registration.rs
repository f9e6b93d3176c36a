use chat_survey::{
    Acknowledgment, FieldRegistry, FieldSpec, RegistryError, formatters, validators,
};

pub const STUDENT_YES: &str = "Yes";
pub const STUDENT_NO: &str = "No";

pub const TRACKS: [&str; 4] = ["Backend", "Frontend", "Data", "Design"];

/// Event registration: contact details, a conditional university question
/// and the tracks the participant wants to attend.
pub fn registration() -> Result<FieldRegistry, RegistryError> {
    FieldRegistry::new(vec![
        FieldSpec::new("phone", "Phone", "Please share your phone number.")
            .request_contact()
            .with_validator(validators::phone)
            .with_db_formatter(formatters::phone_digits)
            .with_display_formatter(formatters::phone_pretty),
        FieldSpec::new("handle", "Handle", "")
            .auto_collect(|meta| meta.username.clone().unwrap_or_default())
            .with_display_formatter(formatters::handle_display),
        FieldSpec::new("full_name", "Full name", "What is your full name?")
            .with_validator(validators::full_name)
            .with_db_formatter(formatters::title_case),
        FieldSpec::new(
            "birth_date",
            "Birth date",
            "When were you born? Please use dd.mm.yyyy.",
        )
        .with_validator(validators::date)
        .with_db_formatter(formatters::date_padded),
        FieldSpec::new("email", "Email", "Which email should we send the ticket to?")
            .with_validator(validators::email)
            .with_db_formatter(formatters::lowercase),
        FieldSpec::new("student", "Student", "Are you a student?")
            .with_options([STUDENT_YES, STUDENT_NO])
            .with_acknowledgment(Acknowledgment::PerOption {
                entries: vec![(
                    STUDENT_YES.to_string(),
                    "Great, students get free entry!".to_string(),
                )],
                fallback: None,
            }),
        FieldSpec::new("university", "University", "Which university do you study at?")
            .with_validator(validators::both(
                validators::non_empty,
                validators::max_len(120),
            ))
            .with_db_formatter(formatters::trimmed)
            .with_display_formatter(formatters::or_placeholder)
            .skip_if(|values| !values.is("student", STUDENT_YES)),
        FieldSpec::new("tracks", "Tracks", "Which tracks would you like to attend?")
            .with_options(TRACKS)
            .multi_select()
            .with_acknowledgment(Acknowledgment::Fixed(
                "Thanks! We will send you the schedule closer to the date.".to_string(),
            )),
    ])
}
