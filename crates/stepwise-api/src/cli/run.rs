//! `stepwise run`: execute a workflow file end to end.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tokio_util::sync::CancellationToken;

use stepwise_core::event::{ChannelSink, EventSink};
use stepwise_core::workflow::definition::{WorkflowError, load_workflow_file};
use stepwise_core::workflow::{RateTable, RunController, StepExecutor};
use stepwise_infra::config::load_config;
use stepwise_infra::llm::{ProviderKind, create_provider};
use stepwise_infra::webhook::WebhookNotifier;
use stepwise_types::run::{RunStatus, WorkflowRun};
use stepwise_types::workflow::Workflow;

use super::display::{render_event, render_run_summary};
use super::{Output, RunArgs};

/// Load a workflow file, mapping definition errors to user-facing messages.
pub fn load_workflow(path: &Path) -> Result<Workflow> {
    load_workflow_file(path).map_err(|e| match e {
        WorkflowError::ParseError(msg) => anyhow::anyhow!("Failed to parse workflow: {msg}"),
        WorkflowError::ValidationError(msg) => anyhow::anyhow!("Workflow validation failed: {msg}"),
        other => anyhow::anyhow!("Failed to load workflow {}: {other}", path.display()),
    })
}

/// Handle `stepwise run`.
pub async fn run_workflow(args: RunArgs, output: Output) -> Result<ExitCode> {
    let run = execute(args, output).await?;
    Ok(match run.status {
        RunStatus::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Load, run and report; returns the terminal run.
async fn execute(args: RunArgs, output: Output) -> Result<WorkflowRun> {
    let config = load_config(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    let workflow = load_workflow(&args.file)?;

    let (sink, mut events) = ChannelSink::new(config.events.channel_capacity);
    let show_events = !output.json && !output.quiet;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if !show_events {
                continue;
            }
            if let Some(line) = render_event(&event) {
                println!("{line}");
            }
        }
    });

    let kind = if args.stub {
        ProviderKind::Stub
    } else {
        ProviderKind::Unbound
    };

    let run = match create_provider(kind, &config.provider) {
        Ok(provider) => {
            let sink: Arc<dyn EventSink> = Arc::new(sink);
            let executor = StepExecutor::new(Arc::new(provider), sink)
                .with_rates(RateTable::new(config.pricing.clone()))
                .with_temperature(config.provider.temperature)
                .with_max_tokens(config.provider.max_tokens);
            let controller = RunController::new(executor);

            let cancel = CancellationToken::new();
            let interrupt = spawn_interrupt_handler(cancel.clone());
            let run = controller
                .run_with_cancel(&workflow, &args.context, &cancel)
                .await;
            interrupt.abort();
            run
        }
        Err(e) => {
            let run = RunController::setup_failure(&workflow, &args.context, e.to_string(), &sink);
            drop(sink);
            run
        }
    };

    // Every sink handle is dropped by now, so the printer drains and exits.
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer task failed");
    }

    if let Some(url) = workflow.webhook_url.as_deref() {
        notify_webhook(url, &run, output).await;
    }

    report(&workflow, &run, output)?;
    Ok(run)
}

/// Cancel `token` on the first Ctrl-C.
fn spawn_interrupt_handler(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            eprintln!(
                "  {}",
                style("Cancelling after the current attempt...").yellow()
            );
            token.cancel();
        }
    })
}

async fn notify_webhook(url: &str, run: &WorkflowRun, output: Output) {
    let result = match WebhookNotifier::new() {
        Ok(notifier) => notifier.notify(url, run).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(run_id = %run.id, error = %e, "webhook delivery failed");
        if !output.quiet && !output.json {
            eprintln!("  {} {e}", style("Warning:").yellow());
        }
    }
}

fn report(workflow: &Workflow, run: &WorkflowRun, output: Output) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(run)?);
    } else if !output.quiet {
        println!("{}", render_run_summary(workflow, run));
    } else if let Some(reason) = &run.failure_reason {
        eprintln!("{reason}");
    }
    Ok(())
}
