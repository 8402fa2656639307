//! Pattern syntax validation. All failure is returned as data.

use globset::GlobBuilder;

/// Outcome of validating one candidate pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternValidation {
    pub valid: bool,
    /// The trimmed pattern (empty when the input trimmed to nothing).
    pub pattern: String,
    pub errors: Vec<String>,
}

/// Validate a candidate ignore pattern.
///
/// Rejects empty or whitespace-only input and a lone negation marker;
/// otherwise the un-negated body must compile through the glob engine,
/// whose message is surfaced verbatim on failure.
pub fn validate_pattern(pattern: &str) -> PatternValidation {
    let trimmed = pattern.trim();

    if trimmed.is_empty() {
        return PatternValidation {
            valid: false,
            pattern: String::new(),
            errors: vec!["Pattern is empty".to_owned()],
        };
    }

    if trimmed == "!" {
        return PatternValidation {
            valid: false,
            pattern: trimmed.to_owned(),
            errors: vec!["Negation pattern must include a rule".to_owned()],
        };
    }

    let body = trimmed.strip_prefix('!').unwrap_or(trimmed);
    let mut errors = Vec::new();
    if let Err(err) = GlobBuilder::new(body).literal_separator(true).build() {
        errors.push(err.to_string());
    }

    PatternValidation {
        valid: errors.is_empty(),
        pattern: trimmed.to_owned(),
        errors,
    }
}
