//! Ordered pattern-list evaluation with negation semantics.

use globset::GlobBuilder;
use globset::GlobMatcher;

use super::normalize::normalize_path;

/// Result of evaluating one path against an ordered pattern list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEvaluation {
    /// Verdict of the last matching pattern in list order.
    pub ignored: bool,
    /// Every pattern that matched, in list order, negated ones included
    /// with their original `!` prefix.
    pub matched_patterns: Vec<String>,
}

/// Evaluate `path` against `patterns` in list order.
///
/// Each matching non-negated pattern sets the verdict to ignored; each
/// matching negated pattern (`!rule`) resets it, mirroring layered
/// ignore-file semantics where later entries override earlier ones. Empty
/// and whitespace-only patterns are skipped, as are patterns the glob
/// engine cannot compile (the validator owns reporting those).
pub fn evaluate_patterns<S: AsRef<str>>(path: &str, patterns: &[S]) -> PatternEvaluation {
    let normalized_path = normalize_path(path);
    let mut ignored = false;
    let mut matched_patterns = Vec::new();

    for raw in patterns {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }

        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(body) => (true, body),
            None => (false, trimmed),
        };

        let Some(matcher) = compile(body) else {
            continue;
        };
        if matcher.is_match(&normalized_path) {
            ignored = !negated;
            matched_patterns.push(trimmed.to_owned());
        }
    }

    PatternEvaluation {
        ignored,
        matched_patterns,
    }
}

/// Shorthand verdict: is `path` ignored by `patterns`?
pub fn matches_any<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    evaluate_patterns(path, patterns).ignored
}

fn compile(pattern: &str) -> Option<GlobMatcher> {
    GlobBuilder::new(&normalize_path(pattern))
        // Keep `*` within one path segment; only `**` crosses separators.
        .literal_separator(true)
        .build()
        .ok()
        .map(|glob| glob.compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_match_means_not_ignored() {
        let result = evaluate_patterns("src/main.rs", &["docs/**"]);
        assert!(!result.ignored);
        assert!(result.matched_patterns.is_empty());
    }

    #[test]
    fn simple_match_ignores() {
        let result = evaluate_patterns("dist/bundle.js", &["dist/**"]);
        assert!(result.ignored);
        assert_eq!(result.matched_patterns, vec!["dist/**".to_owned()]);
    }

    #[test]
    fn negation_round_trip() {
        let patterns = ["src/**", "!src/include.ts"];
        let included = evaluate_patterns("src/include.ts", &patterns);
        assert!(!included.ignored);
        assert_eq!(
            included.matched_patterns,
            vec!["src/**".to_owned(), "!src/include.ts".to_owned()]
        );

        let excluded = evaluate_patterns("src/other.ts", &patterns);
        assert!(excluded.ignored);
        assert_eq!(excluded.matched_patterns, vec!["src/**".to_owned()]);
    }

    #[test]
    fn last_matching_pattern_wins() {
        let patterns = ["!logs/keep.log", "logs/**"];
        let result = evaluate_patterns("logs/keep.log", &patterns);
        // The later non-negated match overrides the earlier negation.
        assert!(result.ignored);
    }

    #[test]
    fn blank_patterns_are_skipped() {
        let result = evaluate_patterns("a.txt", &["", "   ", "a.txt"]);
        assert!(result.ignored);
        assert_eq!(result.matched_patterns, vec!["a.txt".to_owned()]);
    }

    #[test]
    fn star_stays_within_a_segment() {
        assert!(matches_any("src/lib.rs", &["src/*.rs"]));
        assert!(!matches_any("src/nested/lib.rs", &["src/*.rs"]));
        assert!(matches_any("src/nested/lib.rs", &["src/**"]));
    }

    #[test]
    fn paths_and_patterns_are_normalized_before_comparison() {
        assert!(matches_any(r"dist\app.js", &["./dist/*.js"]));
    }

    #[test]
    fn matches_dotfiles() {
        assert!(matches_any(".env", &[".env"]));
        assert!(matches_any("secrets/.key", &["secrets/**"]));
    }
}
