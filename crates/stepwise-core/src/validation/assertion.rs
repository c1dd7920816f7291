//! Assertion scripts evaluated against model output.
//!
//! A script is a list of JEXL expressions, one per line. Blank lines and
//! lines starting with `#` are ignored. Each remaining line is evaluated
//! with the output bound to `output` and must be truthy. Only the transforms
//! registered below are callable; there is no access to files, processes,
//! the network, or the environment.
//!
//! ```text
//! # the function name must appear
//! output|contains('def add')
//! output|lines|length >= 2
//! ```
//!
//! This is an isolation of capability, not a hardened security boundary:
//! expressions run in-process and are bounded only by the size of the
//! output they inspect.

use std::panic::AssertUnwindSafe;

use jexl_eval::Evaluator;
use jexl_eval::error::EvaluationError;
use serde_json::{Value, json};

use super::ValidationOutcome;

/// Run every assertion line in `test_code` against `output`.
pub fn validate_test_exec(output: &str, test_code: Option<&str>) -> ValidationOutcome {
    let Some(test_code) = test_code else {
        return ValidationOutcome::fail("ValidationRule.test_code is required for TEST_EXEC validation");
    };

    let evaluator = assertion_evaluator();
    let context = json!({ "output": output });

    for (index, line) in test_code.lines().enumerate() {
        let expression = line.trim();
        if expression.is_empty() || expression.starts_with('#') {
            continue;
        }
        let line_no = index + 1;

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            evaluator
                .eval_in_context(expression, &context)
                .map_err(|e| match e {
                    EvaluationError::ParseError(_) => {
                        format!("Test code syntax error: line {line_no}: {e}")
                    }
                    other => format!("Test execution error: line {line_no}: {other}"),
                })
        }));

        match result {
            Ok(Ok(value)) if truthy(&value) => {}
            Ok(Ok(_)) => {
                return ValidationOutcome::fail(format!(
                    "Test assertion failed: line {line_no}: {expression}"
                ));
            }
            Ok(Err(message)) => return ValidationOutcome::fail(message),
            Err(panic) => {
                let message = crate::panic_message(panic.as_ref());
                return ValidationOutcome::fail(format!(
                    "Test execution error: line {line_no}: {message}"
                ));
            }
        }
    }

    ValidationOutcome::pass()
}

/// JavaScript-like truthiness.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn arg_str(args: &[Value], index: usize) -> &str {
    args.get(index).and_then(Value::as_str).unwrap_or("")
}

fn arg_f64(args: &[Value], index: usize) -> Option<f64> {
    match args.get(index)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn numbers(args: &[Value]) -> Vec<f64> {
    args.first()
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

/// Build the evaluator with the allow-listed transforms.
///
/// The evaluator is constructed per call; it is not `Send`.
fn assertion_evaluator() -> Evaluator<'static> {
    Evaluator::new()
        // Strings
        .with_transform("lower", |args: &[Value]| Ok(json!(arg_str(args, 0).to_lowercase())))
        .with_transform("upper", |args: &[Value]| Ok(json!(arg_str(args, 0).to_uppercase())))
        .with_transform("trim", |args: &[Value]| Ok(json!(arg_str(args, 0).trim())))
        .with_transform("split", |args: &[Value]| {
            let delimiter = args.get(1).and_then(Value::as_str).unwrap_or(",");
            let parts: Vec<&str> = arg_str(args, 0).split(delimiter).collect();
            Ok(json!(parts))
        })
        .with_transform("lines", |args: &[Value]| {
            let lines: Vec<&str> = arg_str(args, 0).lines().collect();
            Ok(json!(lines))
        })
        .with_transform("contains", |args: &[Value]| {
            let found = match args.first() {
                Some(Value::Array(items)) => args.get(1).is_some_and(|needle| items.contains(needle)),
                _ => arg_str(args, 0).contains(arg_str(args, 1)),
            };
            Ok(json!(found))
        })
        .with_transform("startsWith", |args: &[Value]| {
            Ok(json!(arg_str(args, 0).starts_with(arg_str(args, 1))))
        })
        .with_transform("endsWith", |args: &[Value]| {
            Ok(json!(arg_str(args, 0).ends_with(arg_str(args, 1))))
        })
        // Conversions
        .with_transform("number", |args: &[Value]| {
            Ok(arg_f64(args, 0).map_or(Value::Null, |n| json!(n)))
        })
        .with_transform("int", |args: &[Value]| {
            Ok(arg_f64(args, 0).map_or(Value::Null, |n| json!(n.trunc())))
        })
        .with_transform("string", |args: &[Value]| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Ok(json!(text))
        })
        .with_transform("bool", |args: &[Value]| {
            Ok(json!(args.first().is_some_and(truthy)))
        })
        .with_transform("json", |args: &[Value]| {
            Ok(serde_json::from_str::<Value>(arg_str(args, 0)).unwrap_or(Value::Null))
        })
        .with_transform("type", |args: &[Value]| {
            let name = match args.first() {
                None | Some(Value::Null) => "null",
                Some(Value::Bool(_)) => "bool",
                Some(Value::Number(_)) => "number",
                Some(Value::String(_)) => "string",
                Some(Value::Array(_)) => "array",
                Some(Value::Object(_)) => "object",
            };
            Ok(json!(name))
        })
        // Collections
        .with_transform("length", |args: &[Value]| {
            let len = match args.first() {
                Some(Value::String(s)) => s.chars().count(),
                Some(Value::Array(a)) => a.len(),
                Some(Value::Object(o)) => o.len(),
                _ => 0,
            };
            Ok(json!(len as f64))
        })
        .with_transform("keys", |args: &[Value]| {
            let keys: Vec<&String> = args
                .first()
                .and_then(Value::as_object)
                .map(|o| o.keys().collect())
                .unwrap_or_default();
            Ok(json!(keys))
        })
        .with_transform("values", |args: &[Value]| {
            let values: Vec<Value> = args
                .first()
                .and_then(Value::as_object)
                .map(|o| o.values().cloned().collect())
                .unwrap_or_default();
            Ok(Value::Array(values))
        })
        .with_transform("sum", |args: &[Value]| Ok(json!(numbers(args).iter().sum::<f64>())))
        .with_transform("min", |args: &[Value]| {
            Ok(numbers(args).into_iter().reduce(f64::min).map_or(Value::Null, |n| json!(n)))
        })
        .with_transform("max", |args: &[Value]| {
            Ok(numbers(args).into_iter().reduce(f64::max).map_or(Value::Null, |n| json!(n)))
        })
        .with_transform("abs", |args: &[Value]| {
            Ok(arg_f64(args, 0).map_or(Value::Null, |n| json!(n.abs())))
        })
        .with_transform("all", |args: &[Value]| {
            let items = args.first().and_then(Value::as_array);
            Ok(json!(items.is_some_and(|a| a.iter().all(truthy))))
        })
        .with_transform("any", |args: &[Value]| {
            let items = args.first().and_then(Value::as_array);
            Ok(json!(items.is_some_and(|a| a.iter().any(truthy))))
        })
        .with_transform("reversed", |args: &[Value]| {
            let value = match args.first() {
                Some(Value::String(s)) => json!(s.chars().rev().collect::<String>()),
                Some(Value::Array(a)) => Value::Array(a.iter().rev().cloned().collect()),
                _ => Value::Null,
            };
            Ok(value)
        })
        .with_transform("sorted", |args: &[Value]| {
            let Some(items) = args.first().and_then(Value::as_array) else {
                return Ok(Value::Null);
            };
            let mut items = items.clone();
            items.sort_by(|a, b| match (a, b) {
                (Value::Number(x), Value::Number(y)) => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(std::cmp::Ordering::Equal),
                _ => a.to_string().cmp(&b.to_string()),
            });
            Ok(Value::Array(items))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(output: &str, code: &str) -> ValidationOutcome {
        validate_test_exec(output, Some(code))
    }

    #[test]
    fn all_lines_true_passes() {
        let code = "# output must define add\noutput|contains('def add')\n\noutput|lines|length == 2";
        let outcome = run("def add(a, b):\n    return a + b", code);
        assert!(outcome.passed, "{outcome:?}");
    }

    #[test]
    fn comments_and_blanks_only_passes() {
        assert!(run("anything", "# nothing to check\n\n   \n").passed);
    }

    #[test]
    fn false_line_reports_line_number_and_expression() {
        let outcome = run("hello", "output|length > 0\noutput|startsWith('bye')");
        assert_eq!(
            outcome.error.as_deref(),
            Some("Test assertion failed: line 2: output|startsWith('bye')")
        );
    }

    #[test]
    fn syntax_error_is_classified() {
        let outcome = run("hello", "output == ");
        let error = outcome.error.unwrap();
        assert!(error.starts_with("Test code syntax error: line 1"), "got: {error}");
    }

    #[test]
    fn unknown_transform_is_execution_error() {
        let outcome = run("hello", "output|shout");
        let error = outcome.error.unwrap();
        assert!(error.starts_with("Test execution error: line 1"), "got: {error}");
    }

    #[test]
    fn privileged_operations_are_unavailable() {
        for code in ["'/etc/passwd'|readFile", "output|exec", "'HOME'|env"] {
            let outcome = run("out", code);
            assert!(!outcome.passed, "{code} should not succeed");
            let error = outcome.error.unwrap();
            assert!(error.starts_with("Test "), "got: {error}");
        }
    }

    #[test]
    fn json_transform_exposes_structure() {
        let outcome = run(
            r#"{"items": [3, 1, 2]}"#,
            "(output|json).items|length == 3\n(output|json).items|sum == 6",
        );
        assert!(outcome.passed, "{outcome:?}");
    }

    #[test]
    fn missing_code_is_configuration_failure() {
        let outcome = validate_test_exec("x", None);
        assert_eq!(
            outcome.error.as_deref(),
            Some("ValidationRule.test_code is required for TEST_EXEC validation")
        );
    }

    #[test]
    fn truthiness_matches_javascript() {
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&Value::Null));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!("x")));
    }
}
