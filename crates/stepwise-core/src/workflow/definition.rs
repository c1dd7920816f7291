//! Workflow document parsing, validation, import and export.
//!
//! Workflows are authored as JSON or YAML files that deserialize directly
//! into [`Workflow`]. Two levels of checking exist: [`check_runnable`] is
//! what the run controller enforces before executing anything, and
//! [`validate_workflow`] adds the stricter constraints expected of a
//! document on disk.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use stepwise_types::workflow::{MAX_RETRIES_LIMIT, Workflow};
use thiserror::Error;
use uuid::Uuid;

/// Name given to an imported workflow that does not carry one.
pub const IMPORTED_WORKFLOW_NAME: &str = "Imported Workflow";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or checking a workflow document.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML/JSON parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a JSON document into a validated `Workflow`.
pub fn parse_workflow_json(json: &str) -> Result<Workflow, WorkflowError> {
    let workflow: Workflow =
        serde_json::from_str(json).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_workflow(&workflow)?;
    Ok(workflow)
}

/// Parse a YAML document into a validated `Workflow`.
pub fn parse_workflow_yaml(yaml: &str) -> Result<Workflow, WorkflowError> {
    let workflow: Workflow =
        serde_yaml_ng::from_str(yaml).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_workflow(&workflow)?;
    Ok(workflow)
}

/// Load a workflow file, choosing the format by extension.
///
/// `.yaml` and `.yml` are read as YAML; everything else as JSON.
pub fn load_workflow_file(path: &Path) -> Result<Workflow, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => parse_workflow_yaml(&content),
        _ => parse_workflow_json(&content),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Constraints a workflow must satisfy before any step executes.
///
/// - Every step's `max_retries` is at most 5
/// - All step ids are unique
///
/// A workflow with no steps is runnable; it completes immediately with the
/// initial context as its output.
pub fn check_runnable(workflow: &Workflow) -> Result<(), WorkflowError> {
    let mut seen_ids = HashSet::new();
    for step in &workflow.steps {
        if step.max_retries > MAX_RETRIES_LIMIT {
            return Err(WorkflowError::ValidationError(format!(
                "step '{}' has max_retries {} (maximum is {MAX_RETRIES_LIMIT})",
                step.name, step.max_retries
            )));
        }
        if !seen_ids.insert(step.id) {
            return Err(WorkflowError::ValidationError(format!(
                "duplicate step ID: '{}'",
                step.id
            )));
        }
    }
    Ok(())
}

/// Full structural validation of a workflow document.
///
/// Checks everything [`check_runnable`] does, plus:
/// - Name is non-empty
/// - At least one step exists
pub fn validate_workflow(workflow: &Workflow) -> Result<(), WorkflowError> {
    if workflow.name.trim().is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow name must not be empty".to_string(),
        ));
    }
    if workflow.steps.is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow must have at least one step".to_string(),
        ));
    }
    check_runnable(workflow)
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

/// Build a new workflow from an exported document.
///
/// The document's id and timestamps are discarded: the import is a new
/// workflow. A missing or blank name becomes [`IMPORTED_WORKFLOW_NAME`].
pub fn import_workflow(mut document: Value) -> Result<Workflow, WorkflowError> {
    let Some(object) = document.as_object_mut() else {
        return Err(WorkflowError::ParseError(
            "workflow document must be a JSON object".to_string(),
        ));
    };

    let has_name = object
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if !has_name {
        object.insert("name".to_string(), Value::from(IMPORTED_WORKFLOW_NAME));
    }
    object.remove("id");
    object.remove("created_at");
    object.remove("updated_at");

    let mut workflow: Workflow =
        serde_json::from_value(document).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    let now = Utc::now();
    workflow.id = Uuid::now_v7();
    workflow.created_at = now;
    workflow.updated_at = now;

    validate_workflow(&workflow)?;
    Ok(workflow)
}

/// Serialize a workflow to pretty-printed JSON.
pub fn export_workflow_json(workflow: &Workflow) -> Result<String, WorkflowError> {
    serde_json::to_string_pretty(workflow).map_err(|e| WorkflowError::ParseError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_types::workflow::{ModelName, Step, ValidationRule};

    fn step(name: &str, order: i64) -> Step {
        Step::new(name, order, ModelName::KimiK2Instruct, "Summarize {{context}}")
    }

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
name: code-review
description: Draft then critique
steps:
  - name: draft
    order: 1
    model: kimi-k2-instruct-0905
    prompt: "Write a function for {{context}}"
    max_retries: 3
    validations:
      - type: python_syntax
      - type: regex_match
        pattern: "def \\w+\\("
  - name: critique
    order: 2
    model: kimi-k2p5
    prompt: "Review: {{context}}"
"#;
        let wf = parse_workflow_yaml(yaml).expect("should parse");
        assert_eq!(wf.name, "code-review");
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0].max_retries, 3);
        assert_eq!(wf.steps[0].validations[1], ValidationRule::regex(r"def \w+\("));
        assert_eq!(wf.steps[1].model, ModelName::KimiK2p5);
        assert_ne!(wf.steps[0].id, wf.steps[1].id);
    }

    #[test]
    fn test_parse_json_rejects_unknown_model() {
        let json = r#"{"name": "x", "steps": [{"name": "s", "order": 0, "model": "gpt-4", "prompt": "p"}]}"#;
        let err = parse_workflow_json(json).unwrap_err();
        assert!(matches!(err, WorkflowError::ParseError(_)), "got: {err}");
    }

    #[test]
    fn test_check_runnable_rejects_excess_retries() {
        let mut s = step("greedy", 0);
        s.max_retries = 6;
        let err = check_runnable(&Workflow::new("wf", vec![s])).unwrap_err();
        assert!(err.to_string().contains("max_retries 6"), "got: {err}");
    }

    #[test]
    fn test_check_runnable_rejects_duplicate_ids() {
        let a = step("a", 0);
        let mut b = step("b", 1);
        b.id = a.id;
        let err = check_runnable(&Workflow::new("wf", vec![a, b])).unwrap_err();
        assert!(err.to_string().contains("duplicate step ID"), "got: {err}");
    }

    #[test]
    fn test_check_runnable_accepts_empty_workflow() {
        assert!(check_runnable(&Workflow::new("", vec![])).is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_name_and_no_steps() {
        let err = validate_workflow(&Workflow::new(" ", vec![step("a", 0)])).unwrap_err();
        assert!(err.to_string().contains("must not be empty"), "got: {err}");

        let err = validate_workflow(&Workflow::new("wf", vec![])).unwrap_err();
        assert!(err.to_string().contains("at least one step"), "got: {err}");
    }

    #[test]
    fn test_import_regenerates_id_and_defaults_name() {
        let original = Workflow::new("source", vec![step("a", 0)]);
        let mut doc = serde_json::to_value(&original).unwrap();
        doc.as_object_mut().unwrap().remove("name");

        let imported = import_workflow(doc).expect("should import");
        assert_ne!(imported.id, original.id);
        assert_eq!(imported.name, IMPORTED_WORKFLOW_NAME);
        assert_eq!(imported.steps.len(), 1);
    }

    #[test]
    fn test_import_rejects_non_object() {
        let err = import_workflow(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, WorkflowError::ParseError(_)));
    }

    #[test]
    fn test_export_then_parse_preserves_steps() {
        let mut s = step("a", 4);
        s.validations = vec![ValidationRule::contains("ok"), ValidationRule::JsonValid];
        let wf = Workflow::new("wf", vec![s]);

        let exported = export_workflow_json(&wf).unwrap();
        let parsed = parse_workflow_json(&exported).unwrap();
        assert_eq!(parsed.id, wf.id);
        assert_eq!(parsed.steps[0].validations, wf.steps[0].validations);
        assert_eq!(parsed.steps[0].order, 4);
    }

    #[test]
    fn test_load_workflow_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let wf = Workflow::new("from-disk", vec![step("a", 0)]);

        let json_path = dir.path().join("wf.json");
        std::fs::write(&json_path, export_workflow_json(&wf).unwrap()).unwrap();
        assert_eq!(load_workflow_file(&json_path).unwrap().name, "from-disk");

        let yaml_path = dir.path().join("wf.yml");
        std::fs::write(&yaml_path, serde_yaml_ng::to_string(&wf).unwrap()).unwrap();
        assert_eq!(load_workflow_file(&yaml_path).unwrap().name, "from-disk");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_workflow_file(Path::new("/nonexistent/wf.json")).unwrap_err();
        assert!(matches!(err, WorkflowError::IoError(_)));
    }
}
