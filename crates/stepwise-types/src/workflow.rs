//! Workflow template types for Stepwise.
//!
//! A `Workflow` is a read-only template: an ordered collection of `Step`s,
//! each pairing a model invocation with a list of `ValidationRule`s and a
//! bounded retry budget. Executing a workflow produces a `WorkflowRun`
//! (see [`crate::run`]); the template itself is never mutated by the engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder substituted with the run's current context when a step's
/// prompt is built.
pub const CONTEXT_PLACEHOLDER: &str = "{{context}}";

/// Default retry budget for a step (three attempts in total).
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Upper bound on `Step::max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 5;

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// Models reachable through the Unbound gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    /// Structured tasks and code.
    #[serde(rename = "kimi-k2-instruct-0905")]
    KimiK2Instruct,
    /// Explanations and summaries.
    #[serde(rename = "kimi-k2p5")]
    KimiK2p5,
}

impl ModelName {
    /// Wire identifier sent to the provider and used for pricing lookup.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::KimiK2Instruct => "kimi-k2-instruct-0905",
            ModelName::KimiK2p5 => "kimi-k2p5",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kimi-k2-instruct-0905" => Ok(ModelName::KimiK2Instruct),
            "kimi-k2p5" => Ok(ModelName::KimiK2p5),
            other => Err(format!("invalid model name: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation rules
// ---------------------------------------------------------------------------

/// One acceptance check applied to a step's raw output.
///
/// Kind-specific parameters are optional at the data level: a rule that is
/// missing its parameter still loads, and fails closed when it is evaluated.
/// Tags that are not recognized load as [`ValidationRule::Unknown`] so the
/// dispatcher can reject them explicitly.
///
/// On the wire a rule is a flat object keyed by `type`:
///
/// ```json
/// { "type": "regex_match", "pattern": "def \\w+\\(" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawValidationRule", into = "RawValidationRule")]
pub enum ValidationRule {
    /// Output must parse as a Python program.
    PythonSyntax,
    /// Output must parse as JSON.
    JsonValid,
    /// Output must contain `expected` (case-sensitive).
    Contains { expected: Option<String> },
    /// Output must match `pattern` anywhere.
    RegexMatch { pattern: Option<String> },
    /// Every assertion line in `test_code` must hold.
    TestExec { test_code: Option<String> },
    /// A judge model must answer YES to `criteria`.
    LlmJudge { criteria: Option<String> },
    /// A tag this build does not understand.
    Unknown { kind: String },
}

impl ValidationRule {
    /// The wire tag of this rule.
    pub fn kind(&self) -> &str {
        match self {
            ValidationRule::PythonSyntax => "python_syntax",
            ValidationRule::JsonValid => "json_valid",
            ValidationRule::Contains { .. } => "contains",
            ValidationRule::RegexMatch { .. } => "regex_match",
            ValidationRule::TestExec { .. } => "test_exec",
            ValidationRule::LlmJudge { .. } => "llm_judge",
            ValidationRule::Unknown { kind } => kind,
        }
    }

    pub fn contains(expected: impl Into<String>) -> Self {
        ValidationRule::Contains {
            expected: Some(expected.into()),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        ValidationRule::RegexMatch {
            pattern: Some(pattern.into()),
        }
    }

    pub fn test_exec(test_code: impl Into<String>) -> Self {
        ValidationRule::TestExec {
            test_code: Some(test_code.into()),
        }
    }

    pub fn llm_judge(criteria: impl Into<String>) -> Self {
        ValidationRule::LlmJudge {
            criteria: Some(criteria.into()),
        }
    }
}

/// Flat wire shape shared by every rule kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawValidationRule {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_code: Option<String>,
}

impl From<RawValidationRule> for ValidationRule {
    fn from(raw: RawValidationRule) -> Self {
        match raw.kind.as_str() {
            "python_syntax" => ValidationRule::PythonSyntax,
            "json_valid" => ValidationRule::JsonValid,
            "contains" => ValidationRule::Contains {
                expected: raw.expected,
            },
            "regex_match" => ValidationRule::RegexMatch {
                pattern: raw.pattern,
            },
            "test_exec" => ValidationRule::TestExec {
                test_code: raw.test_code,
            },
            "llm_judge" => ValidationRule::LlmJudge {
                criteria: raw.criteria,
            },
            _ => ValidationRule::Unknown { kind: raw.kind },
        }
    }
}

impl From<ValidationRule> for RawValidationRule {
    fn from(rule: ValidationRule) -> Self {
        let kind = rule.kind().to_string();
        let mut raw = RawValidationRule {
            kind,
            ..Default::default()
        };
        match rule {
            ValidationRule::Contains { expected } => raw.expected = expected,
            ValidationRule::RegexMatch { pattern } => raw.pattern = pattern,
            ValidationRule::TestExec { test_code } => raw.test_code = test_code,
            ValidationRule::LlmJudge { criteria } => raw.criteria = criteria,
            ValidationRule::PythonSyntax
            | ValidationRule::JsonValid
            | ValidationRule::Unknown { .. } => {}
        }
        raw
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One model-call-plus-validation unit with its own retry budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    /// Human-readable label, used in failure reasons.
    pub name: String,
    /// Execution order. Authoritative; need not match list position or be
    /// contiguous.
    pub order: i64,
    pub model: ModelName,
    /// Prompt template; `{{context}}` is replaced with the run's context.
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub validations: Vec<ValidationRule>,
    /// Retries after the first attempt, in `0..=5`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Step {
    /// Build a step with no validations and the default retry budget.
    pub fn new(name: impl Into<String>, order: i64, model: ModelName, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            order,
            model,
            prompt: prompt.into(),
            system_prompt: None,
            validations: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Total attempts this step may make (`max_retries + 1`).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Substitute `context` for every `{{context}}` in the prompt template.
    pub fn render_prompt(&self, context: &str) -> String {
        self.prompt.replace(CONTEXT_PLACEHOLDER, context)
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named, ordered template of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Notified with a run summary once a run reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            steps,
            webhook_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Steps in execution order: ascending `order`, ties keep their
    /// original relative position.
    pub fn ordered_steps(&self) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        // `sort_by_key` is stable.
        steps.sort_by_key(|s| s.order);
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_name_round_trips_wire_identifier() {
        let json = serde_json::to_string(&ModelName::KimiK2p5).unwrap();
        assert_eq!(json, "\"kimi-k2p5\"");
        assert_eq!(
            "kimi-k2-instruct-0905".parse::<ModelName>().unwrap(),
            ModelName::KimiK2Instruct
        );
        assert!("gpt-4o".parse::<ModelName>().is_err());
    }

    #[test]
    fn rule_deserializes_from_flat_object() {
        let rule: ValidationRule =
            serde_json::from_value(json!({"type": "regex_match", "pattern": "^def"})).unwrap();
        assert_eq!(rule, ValidationRule::regex("^def"));
    }

    #[test]
    fn rule_ignores_parameters_of_other_kinds() {
        let rule: ValidationRule = serde_json::from_value(json!({
            "type": "contains",
            "expected": "x",
            "pattern": null,
            "criteria": "unused"
        }))
        .unwrap();
        assert_eq!(rule, ValidationRule::contains("x"));
    }

    #[test]
    fn rule_missing_parameter_still_loads() {
        let rule: ValidationRule = serde_json::from_value(json!({"type": "llm_judge"})).unwrap();
        assert_eq!(rule, ValidationRule::LlmJudge { criteria: None });
    }

    #[test]
    fn unrecognized_rule_tag_loads_as_unknown() {
        let rule: ValidationRule = serde_json::from_value(json!({"type": "spellcheck"})).unwrap();
        assert_eq!(
            rule,
            ValidationRule::Unknown {
                kind: "spellcheck".to_string()
            }
        );
        assert_eq!(rule.kind(), "spellcheck");
    }

    #[test]
    fn rule_serializes_only_its_own_parameter() {
        let value = serde_json::to_value(ValidationRule::test_exec("output|length > 0")).unwrap();
        assert_eq!(
            value,
            json!({"type": "test_exec", "test_code": "output|length > 0"})
        );
    }

    #[test]
    fn step_defaults_apply() {
        let step: Step = serde_json::from_value(json!({
            "name": "draft",
            "order": 0,
            "model": "kimi-k2p5",
            "prompt": "Write about {{context}}"
        }))
        .unwrap();
        assert_eq!(step.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(step.max_attempts(), 3);
        assert!(step.validations.is_empty());
        assert!(step.system_prompt.is_none());
    }

    #[test]
    fn render_prompt_replaces_every_placeholder() {
        let step = Step::new(
            "s",
            0,
            ModelName::KimiK2Instruct,
            "A: {{context}} / B: {{context}}",
        );
        assert_eq!(step.render_prompt("ctx"), "A: ctx / B: ctx");
    }

    #[test]
    fn render_prompt_without_placeholder_is_unchanged() {
        let step = Step::new("s", 0, ModelName::KimiK2Instruct, "static prompt");
        assert_eq!(step.render_prompt("ignored"), "static prompt");
    }

    #[test]
    fn ordered_steps_is_stable_on_ties() {
        let a = Step::new("a", 5, ModelName::KimiK2Instruct, "");
        let b = Step::new("b", 1, ModelName::KimiK2Instruct, "");
        let c = Step::new("c", 5, ModelName::KimiK2Instruct, "");
        let d = Step::new("d", -3, ModelName::KimiK2Instruct, "");
        let wf = Workflow::new("wf", vec![a, b, c, d]);
        let names: Vec<&str> = wf.ordered_steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "a", "c"]);
    }
}
