//! Substring and regular-expression checks.

use regex::Regex;
use stepwise_types::event::preview;

use super::ValidationOutcome;

/// Characters of actual output quoted in a failure diagnostic.
const DIAGNOSTIC_PREVIEW_CHARS: usize = 100;

/// Case-sensitive substring test.
pub fn validate_contains(output: &str, expected: Option<&str>) -> ValidationOutcome {
    let Some(expected) = expected else {
        return ValidationOutcome::fail("ValidationRule.expected is required for CONTAINS validation");
    };

    if output.contains(expected) {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(format!(
            "Output does not contain '{expected}'. Got: {}",
            diagnostic_preview(output)
        ))
    }
}

/// Unanchored regex search anywhere in the output.
pub fn validate_regex_match(output: &str, pattern: Option<&str>) -> ValidationOutcome {
    let Some(pattern) = pattern else {
        return ValidationOutcome::fail("ValidationRule.pattern is required for REGEX_MATCH validation");
    };

    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            return ValidationOutcome::fail(format!("Invalid regex pattern '{pattern}': {e}"));
        }
    };

    if regex.is_match(output) {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(format!(
            "Output does not match pattern '{pattern}'. Got: {}",
            diagnostic_preview(output)
        ))
    }
}

fn diagnostic_preview(output: &str) -> String {
    let head = preview(output, DIAGNOSTIC_PREVIEW_CHARS);
    if head.len() < output.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
