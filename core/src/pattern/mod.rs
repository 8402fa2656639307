//! Glob-pattern utilities: normalization, evaluation, validation.

mod matcher;
mod normalize;
mod validator;

pub use matcher::PatternEvaluation;
pub use matcher::evaluate_patterns;
pub use matcher::matches_any;
pub use normalize::normalize_path;
pub use validator::PatternValidation;
pub use validator::validate_pattern;
