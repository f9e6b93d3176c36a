//! Delivery tuning and the fixed texts the survey shows.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// A configuration value that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid {name}: {message}")]
pub struct ConfigError {
    pub name: &'static str,
    pub message: String,
}

/// Retry and pacing parameters for the delivery engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Total transport attempts for transient failures (default: 3).
    pub max_retries: u32,
    /// Backoff base; attempt `n` is followed by `base_delay * 2^(n-1)` (default: 1s).
    pub base_delay: Duration,
    /// Pause between recipients of a fan-out (default: 50ms).
    pub fanout_interval: Duration,
    /// Rate-limit waits tolerated for one message before giving up (default: 10).
    ///
    /// Waits never use up attempts, but once this many have been absorbed the
    /// next rate limit fails the send with `RateLimitExhausted`.
    pub max_rate_limit_waits: u32,
}

impl DeliveryConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `CHAT_SURVEY_MAX_RETRIES` - Transport attempts per message (default: 3)
    /// - `CHAT_SURVEY_BASE_DELAY_MS` - Backoff base in milliseconds (default: 1000)
    /// - `CHAT_SURVEY_FANOUT_INTERVAL_MS` - Pause between fan-out sends (default: 50)
    /// - `CHAT_SURVEY_MAX_RATE_LIMIT_WAITS` - Rate-limit waits per message (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_retries = parse_var("CHAT_SURVEY_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        if max_retries == 0 {
            return Err(ConfigError {
                name: "CHAT_SURVEY_MAX_RETRIES",
                message: "must be at least 1".to_string(),
            });
        }

        let base_delay = parse_var("CHAT_SURVEY_BASE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_delay);

        let fanout_interval = parse_var("CHAT_SURVEY_FANOUT_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.fanout_interval);

        let max_rate_limit_waits = parse_var("CHAT_SURVEY_MAX_RATE_LIMIT_WAITS")?
            .unwrap_or(defaults.max_rate_limit_waits);

        Ok(Self {
            max_retries,
            base_delay,
            fanout_interval,
            max_rate_limit_waits,
        })
    }

    /// Set the number of attempts. Values below 1 are raised to 1.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_fanout_interval(mut self, interval: Duration) -> Self {
        self.fanout_interval = interval;
        self
    }

    pub fn with_max_rate_limit_waits(mut self, waits: u32) -> Self {
        self.max_rate_limit_waits = waits;
        self
    }

    /// Calculate the backoff after a failed attempt (1-indexed).
    ///
    /// Attempt 1 waits `base_delay`, attempt 2 twice that, attempt 3 four
    /// times that, and so on.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(multiplier)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            fanout_interval: Duration::from_millis(50),
            max_rate_limit_waits: 10,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
            name,
            message: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

/// Fixed user-facing texts used by the survey machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyTexts {
    /// Shown when the user's state cannot be resolved.
    pub apology: String,
    /// Shown when free text arrives for a field that needs a button press.
    pub use_buttons: String,
    /// Shown when "done" is pressed with nothing selected.
    pub empty_selection: String,
    /// Shown when a button press arrives for a free-text field.
    pub type_answer: String,
    /// Shown when a selection names an option the field does not have.
    pub unknown_option: String,
    /// Header of the summary shown to registered users.
    pub registered: String,
    /// Reply-keyboard entry that opens the edit menu.
    pub change_data: String,
    /// Prompt of the edit menu.
    pub edit_menu: String,
    /// Reply-keyboard entry that leaves the edit menu.
    pub cancel: String,
    /// Label of the multi-select commit button.
    pub done: String,
    /// Prefix of selected options in a multi-select keyboard.
    pub selected_mark: String,
    /// Label of the contact-share button.
    pub share_contact: String,
}

impl SurveyTexts {
    pub fn with_apology(mut self, text: impl Into<String>) -> Self {
        self.apology = text.into();
        self
    }

    pub fn with_registered(mut self, text: impl Into<String>) -> Self {
        self.registered = text.into();
        self
    }

    pub fn with_change_data(mut self, text: impl Into<String>) -> Self {
        self.change_data = text.into();
        self
    }

    pub fn with_cancel(mut self, text: impl Into<String>) -> Self {
        self.cancel = text.into();
        self
    }

    pub fn with_done(mut self, text: impl Into<String>) -> Self {
        self.done = text.into();
        self
    }
}

impl Default for SurveyTexts {
    fn default() -> Self {
        Self {
            apology: "Sorry, something went wrong on our side. Please try again later."
                .to_string(),
            use_buttons: "Please choose one of the options using the buttons.".to_string(),
            empty_selection: "Please select at least one option before pressing Done."
                .to_string(),
            type_answer: "Please type your answer.".to_string(),
            unknown_option: "That option is not available, please pick one from the list."
                .to_string(),
            registered: "You are registered. Your data:".to_string(),
            change_data: "Change data".to_string(),
            edit_menu: "Which field would you like to change?".to_string(),
            cancel: "Cancel".to_string(),
            done: "Done".to_string(),
            selected_mark: "✅ ".to_string(),
            share_contact: "Share phone number".to_string(),
        }
    }
}
