/*
[INPUT]:  TaskSync service and parsed subcommand arguments
[OUTPUT]: Terminal output for each subcommand; anyhow errors for failures
[POS]:    CLI command handlers
[UPDATE]: When adding subcommands or changing their output
*/

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nextgen_cli::render::task_line;
use nextgen_client::{CreateTaskRequest, Task, TaskStatus, TaskSync};

#[derive(Debug, Default)]
pub struct SubmitOptions {
    pub negative_prompt: Option<String>,
    pub steps: Option<u32>,
    pub size: Option<(u32, u32)>,
    pub cfg_scale: Option<f32>,
    pub wait: bool,
}

pub async fn submit(sync: &TaskSync, prompt: &str, options: SubmitOptions) -> Result<()> {
    let mut request = CreateTaskRequest::new(prompt, options.negative_prompt);
    if let Some(steps) = options.steps {
        request = request.steps(steps);
    }
    if let Some((width, height)) = options.size {
        request = request.size(width, height);
    }
    if let Some(cfg_scale) = options.cfg_scale {
        request = request.cfg_scale(cfg_scale);
    }

    let task = sync
        .submit_with(request)
        .await
        .map_err(|err| anyhow!("{}", err.user_message()).context("submit task"))?;
    println!("{}", task_line(&task, |path| sync.resolve_resource_url(path)));

    if options.wait {
        watch(sync, Some(&task.id)).await?;
    }
    Ok(())
}

pub async fn history(sync: &TaskSync, json: bool) -> Result<()> {
    let tasks = sync
        .endpoint()
        .client()
        .try_fetch_history()
        .await
        .map_err(|err| anyhow!("{}", err.user_message()).context("fetch history"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("{}", style("No tasks yet").dim());
    }
    for task in &tasks {
        println!("{}", task_line(task, |path| sync.resolve_resource_url(path)));
    }
    Ok(())
}

pub async fn show_task(sync: &TaskSync, id: &str) -> Result<()> {
    let task = sync
        .endpoint()
        .client()
        .fetch_task(id)
        .await
        .map_err(|err| anyhow!("{}", err.user_message()).context("fetch task"))?
        .with_context(|| format!("task {id} not found"))?;
    println!("{}", task_line(&task, |path| sync.resolve_resource_url(path)));
    if let Some(negative) = &task.negative_prompt {
        println!("    negative: {negative}");
    }
    Ok(())
}

/// Poll until nothing is active. With `only`, poll until that task is final
/// or a successful pass no longer lists it.
pub async fn watch(sync: &TaskSync, only: Option<&str>) -> Result<()> {
    let shutdown = CancellationToken::new();
    setup_signal_handler(shutdown.clone());

    if !sync.refresh().await {
        warn!("initial refresh failed; will keep polling");
    }

    let mut rx = sync.subscribe();
    let mut seen: HashMap<String, TaskStatus> = HashMap::new();
    let initial = rx.borrow_and_update().clone();
    report_changes(sync, &initial, &mut seen, only);
    if is_done(sync, only) {
        println!("{}", finished_note(sync, only, "Nothing left to wait for"));
        return Ok(());
    }

    sync.start_polling();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("watch interrupted");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    bail!("task store closed");
                }
                let tasks = rx.borrow_and_update().clone();
                report_changes(sync, &tasks, &mut seen, only);
                if is_done(sync, only) {
                    println!("{}", finished_note(sync, only, "All tasks finished"));
                    break;
                }
            }
        }
    }
    sync.stop_polling();
    Ok(())
}

fn is_done(sync: &TaskSync, only: Option<&str>) -> bool {
    match only {
        Some(id) => sync.store().get(id).is_none_or(|task| task.is_terminal()),
        None => !sync.store().has_active(),
    }
}

fn finished_note(sync: &TaskSync, only: Option<&str>, done: &str) -> String {
    match only {
        Some(id) if sync.store().get(id).is_none() => style(format!(
            "Task {id} is no longer listed by the service"
        ))
        .yellow()
        .to_string(),
        _ => style(done).green().to_string(),
    }
}

fn report_changes(
    sync: &TaskSync,
    tasks: &[Task],
    seen: &mut HashMap<String, TaskStatus>,
    only: Option<&str>,
) {
    for task in tasks {
        if only.is_some_and(|id| id != task.id) {
            continue;
        }
        if seen.insert(task.id.clone(), task.status) != Some(task.status) {
            println!("{}", task_line(task, |path| sync.resolve_resource_url(path)));
        }
    }
}

pub async fn ping(sync: &TaskSync) -> Result<()> {
    let result = sync.endpoint().client().ping().await;
    let mark = if result.success {
        style("ok").green()
    } else {
        style("failed").red()
    };
    println!("{mark}  {}", result.message);
    if let Some(detail) = result.detail {
        println!("    {}", style(detail).dim());
    }
    if !result.success {
        bail!("ping failed");
    }
    Ok(())
}

pub async fn health(sync: &TaskSync) -> Result<()> {
    let result = sync.endpoint().client().health().await;
    let mark = if result.success {
        style("ok").green()
    } else {
        style("failed").red()
    };
    println!("{mark}  {}", result.message);
    if let Some(data) = &result.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    if !result.success {
        bail!("health check failed");
    }
    Ok(())
}

pub async fn diagnose(sync: &TaskSync, address: Option<&str>, json: bool) -> Result<()> {
    let report = match address {
        Some(address) => sync.diagnostics().probe_address(address).await,
        None => sync.diagnose().await,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }
    if !report.is_healthy() {
        bail!("service is not healthy");
    }
    Ok(())
}

pub fn show_address(sync: &TaskSync) -> Result<()> {
    println!("{}", sync.endpoint().base_url());
    Ok(())
}

pub fn set_address(sync: &TaskSync, address: &str) -> Result<()> {
    if address.trim().is_empty() {
        bail!("address must not be empty");
    }
    let changed = sync
        .set_address(address)
        .with_context(|| format!("set address {address}"))?;
    let mark = if changed {
        style("saved").green()
    } else {
        style("unchanged").dim()
    };
    println!("{mark}  {}", sync.endpoint().base_url());
    Ok(())
}

fn setup_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown.cancel();
    });
}
