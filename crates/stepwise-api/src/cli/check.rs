//! `stepwise check`: apply a single validation rule outside of a run.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use console::style;
use tokio::io::AsyncReadExt;

use stepwise_core::validation::{ValidationDispatcher, ValidationOutcome};
use stepwise_infra::config::load_config;
use stepwise_infra::llm::{ProviderKind, create_provider};
use stepwise_types::workflow::ValidationRule;

use super::{CheckArgs, Output};

/// Parse the `--rule` argument.
pub fn parse_rule(rule: &str) -> Result<ValidationRule> {
    serde_json::from_str(rule).with_context(|| format!("Invalid rule JSON: {rule}"))
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Handle `stepwise check`.
pub async fn check_output(args: CheckArgs, output: Output) -> Result<ExitCode> {
    let outcome = evaluate(args, output).await?;
    Ok(if outcome.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn evaluate(args: CheckArgs, output: Output) -> Result<ValidationOutcome> {
    let rule = parse_rule(&args.rule)?;
    let text = read_input(args.input.as_deref()).await?;

    // Only the semantic judge needs a model.
    let provider = if matches!(rule, ValidationRule::LlmJudge { .. }) {
        let config = load_config(args.config.as_deref())
            .await
            .context("Failed to load configuration")?;
        let kind = if args.stub {
            ProviderKind::Stub
        } else {
            ProviderKind::Unbound
        };
        Some(create_provider(kind, &config.provider).context("Failed to create judge model client")?)
    } else {
        None
    };

    let outcome = ValidationDispatcher::new()
        .validate(&text, &rule, provider.as_ref())
        .await;
    report(&rule, &outcome, output)?;
    Ok(outcome)
}

fn report(rule: &ValidationRule, outcome: &ValidationOutcome, output: Output) -> Result<()> {
    if output.json {
        let out = serde_json::json!({
            "rule": rule.kind(),
            "passed": outcome.passed,
            "error": outcome.error,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    if output.quiet {
        if let Some(error) = &outcome.error {
            eprintln!("{error}");
        }
        return Ok(());
    }

    if outcome.passed {
        println!("  {} {} passed", style("✓").green().bold(), rule.kind());
    } else {
        println!("  {} {} failed", style("✗").red().bold(), rule.kind());
        if let Some(error) = &outcome.error {
            println!("    {error}");
        }
    }
    Ok(())
}
