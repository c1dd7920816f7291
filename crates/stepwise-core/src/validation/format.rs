//! JSON well-formedness check.

use super::ValidationOutcome;

/// Check that `output` is a single JSON value (object, array or scalar).
pub fn validate_json(output: &str) -> ValidationOutcome {
    if output.trim().is_empty() {
        return ValidationOutcome::fail("Empty output cannot be valid JSON");
    }

    match serde_json::from_str::<serde_json::Value>(output) {
        Ok(_) => ValidationOutcome::pass(),
        Err(e) => {
            let position = byte_offset(output, e.line(), e.column());
            let full = e.to_string();
            // serde_json appends " at line L column C"; the position replaces it.
            let message = full
                .rsplit_once(" at line ")
                .map_or(full.as_str(), |(msg, _)| msg);
            ValidationOutcome::fail(format!("JSON parse error at position {position}: {message}"))
        }
    }
}

/// Convert serde_json's 1-based line/column into a byte offset into `text`.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_array_and_scalars_pass() {
        for input in [r#"{"a": [1, 2]}"#, "[]", "42", "\"text\"", "null", " true "] {
            assert!(validate_json(input).passed, "{input} should be valid");
        }
    }

    #[test]
    fn empty_fails_with_dedicated_message() {
        let outcome = validate_json("  ");
        assert_eq!(outcome.error.as_deref(), Some("Empty output cannot be valid JSON"));
    }

    #[test]
    fn malformed_reports_position() {
        let outcome = validate_json(r#"{"name": }"#);
        assert!(!outcome.passed);
        let error = outcome.error.unwrap();
        assert!(error.starts_with("JSON parse error at position "), "got: {error}");
        assert!(!error.contains(" at line "), "got: {error}");
    }

    #[test]
    fn trailing_garbage_fails() {
        assert!(!validate_json(r#"{"a": 1} extra"#).passed);
    }

    #[test]
    fn byte_offset_spans_lines() {
        let text = "ab\ncde\nf";
        assert_eq!(byte_offset(text, 1, 1), 0);
        assert_eq!(byte_offset(text, 2, 2), 4);
        assert_eq!(byte_offset(text, 3, 1), 7);
        assert_eq!(byte_offset(text, 9, 9), text.len());
    }
}
