//! Routes each [`ValidationRule`] to its strategy.

use stepwise_types::workflow::ValidationRule;

use super::ValidationOutcome;
use super::assertion::validate_test_exec;
use super::format::validate_json;
use super::judge::validate_llm_judge;
use super::syntax::validate_python_syntax;
use super::text::{validate_contains, validate_regex_match};
use crate::llm::box_provider::BoxLlmProvider;

/// Stateless router from rule kind to validation strategy.
///
/// Only the judge strategy needs the provider; the others ignore it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationDispatcher;

impl ValidationDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Apply one rule to `output`.
    pub async fn validate(
        &self,
        output: &str,
        rule: &ValidationRule,
        provider: Option<&BoxLlmProvider>,
    ) -> ValidationOutcome {
        let outcome = match rule {
            ValidationRule::PythonSyntax => validate_python_syntax(output),
            ValidationRule::JsonValid => validate_json(output),
            ValidationRule::Contains { expected } => validate_contains(output, expected.as_deref()),
            ValidationRule::RegexMatch { pattern } => validate_regex_match(output, pattern.as_deref()),
            ValidationRule::TestExec { test_code } => validate_test_exec(output, test_code.as_deref()),
            ValidationRule::LlmJudge { criteria } => {
                validate_llm_judge(output, criteria.as_deref(), provider).await
            }
            ValidationRule::Unknown { kind } => {
                ValidationOutcome::fail(format!("Unknown validation type: {kind}"))
            }
        };

        if outcome.passed || outcome.error.is_some() {
            outcome
        } else {
            ValidationOutcome::fail(format!("Validation failed: {}", rule.kind()))
        }
    }

    /// Apply `rules` in list order, stopping at the first failure.
    ///
    /// An empty rule list passes.
    pub async fn validate_all(
        &self,
        output: &str,
        rules: &[ValidationRule],
        provider: Option<&BoxLlmProvider>,
    ) -> ValidationOutcome {
        for rule in rules {
            let outcome = self.validate(output, rule, provider).await;
            if !outcome.passed {
                tracing::debug!(rule = rule.kind(), error = ?outcome.error, "validation failed");
                return outcome;
            }
        }
        ValidationOutcome::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn routes_each_kind() {
        let dispatcher = ValidationDispatcher::new();
        let cases = [
            (ValidationRule::PythonSyntax, "x = 1", true),
            (ValidationRule::JsonValid, "{\"a\": 1}", true),
            (ValidationRule::contains("needle"), "haystack", false),
            (ValidationRule::regex(r"^\d+$"), "12345", true),
            (ValidationRule::test_exec("output|length == 3"), "abc", true),
        ];
        for (rule, output, expected) in cases {
            let outcome = dispatcher.validate(output, &rule, None).await;
            assert_eq!(outcome.passed, expected, "{rule:?} on {output:?}: {outcome:?}");
        }
    }

    #[tokio::test]
    async fn unknown_kind_fails_with_tag() {
        let rule = ValidationRule::Unknown {
            kind: "spellcheck".to_string(),
        };
        let outcome = ValidationDispatcher.validate("text", &rule, None).await;
        assert_eq!(outcome.error.as_deref(), Some("Unknown validation type: spellcheck"));
    }

    #[tokio::test]
    async fn empty_rule_list_passes() {
        let outcome = ValidationDispatcher.validate_all("", &[], None).await;
        assert!(outcome.passed);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let scripted = ScriptedProvider::replying("YES");
        let log = scripted.request_log();
        let provider = scripted.boxed();
        let rules = [
            ValidationRule::contains("missing"),
            ValidationRule::llm_judge("anything"),
        ];

        let outcome = ValidationDispatcher
            .validate_all("output", &rules, Some(&provider))
            .await;

        assert!(!outcome.passed);
        assert!(outcome.error.unwrap().starts_with("Output does not contain 'missing'"));
        assert!(log.lock().unwrap().is_empty(), "judge must not be consulted");
    }

    #[tokio::test]
    async fn judge_receives_provider() {
        let provider = ScriptedProvider::replying("YES").boxed();
        let outcome = ValidationDispatcher
            .validate("out", &ValidationRule::llm_judge("ok"), Some(&provider))
            .await;
        assert!(outcome.passed);
    }
}
