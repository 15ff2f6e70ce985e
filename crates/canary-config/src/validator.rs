//! Runtime validation of a loaded configuration.

use crate::schema::Config;
use canary_common::{CanaryError, Result};
use std::collections::HashMap;

/// Smallest accepted wizard timeout, in seconds.
pub const MIN_WIZARD_TIMEOUT: u64 = 10;
/// Largest accepted wizard timeout, in seconds.
pub const MAX_WIZARD_TIMEOUT: u64 = 900;

/// A single problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Collects every problem in the configuration.
    pub fn issues(config: &Config) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if config.discord.token.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "discord.token",
                "Discord token cannot be empty",
            ));
        }

        if config.discord.prefix.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "discord.prefix",
                "Command prefix cannot be empty",
            ));
        }

        if config.general.page_size == 0 {
            issues.push(ValidationIssue::new(
                "general.page_size",
                "Page size must be at least 1",
            ));
        }

        let timeout = config.general.wizard_timeout_seconds;
        if !(MIN_WIZARD_TIMEOUT..=MAX_WIZARD_TIMEOUT).contains(&timeout) {
            issues.push(ValidationIssue::new(
                "general.wizard_timeout_seconds",
                format!(
                    "Wizard timeout must be between {MIN_WIZARD_TIMEOUT} and {MAX_WIZARD_TIMEOUT} seconds, got {timeout}"
                ),
            ));
        }

        if config.general.timezone.parse::<chrono_tz::Tz>().is_err() {
            issues.push(ValidationIssue::new(
                "general.timezone",
                format!("Unknown timezone '{}'", config.general.timezone),
            ));
        }

        if config.reminders.poll_interval_seconds == 0 {
            issues.push(ValidationIssue::new(
                "reminders.poll_interval_seconds",
                "Reminder poll interval must be at least 1 second",
            ));
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for (category, spec) in &config.roles.categories {
            for role in &spec.roles {
                let key = role.to_lowercase();
                if let Some(previous) = seen.insert(key, category) {
                    if previous != category {
                        issues.push(ValidationIssue::new(
                            format!("roles.categories.{category}"),
                            format!("Role '{role}' is already listed in category '{previous}'"),
                        ));
                    }
                }
            }
        }

        issues
    }

    /// Validates a configuration, failing on the first problem.
    pub fn validate(config: &Config) -> Result<()> {
        match Self::issues(config).into_iter().next() {
            Some(issue) => Err(CanaryError::Config {
                message: format!("{}: {}", issue.field, issue.message),
                source: None,
            }),
            None => Ok(()),
        }
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate(self)
    }
}
