/*
[INPUT]:  Task snapshots and diagnostic results
[OUTPUT]: Human-readable terminal lines
[POS]:    Presentation helpers for the CLI (no I/O)
[UPDATE]: When task fields or status styling change
*/

use console::style;

use nextgen_client::{Task, TaskStatus};

pub fn status_label(status: TaskStatus) -> String {
    let label = format!("{:<10}", status.as_str());
    match status {
        TaskStatus::Submitted => style(label).yellow().to_string(),
        TaskStatus::Processing => style(label).cyan().to_string(),
        TaskStatus::Completed => style(label).green().to_string(),
        TaskStatus::Failed => style(label).red().to_string(),
    }
}

/// One line per task; `resolve` turns the service-relative image path into a URL.
pub fn task_line(task: &Task, resolve: impl Fn(&str) -> String) -> String {
    let mut line = format!(
        "{}  {}  {}  {}",
        task.id,
        status_label(task.status),
        task.created_at.format("%Y-%m-%d %H:%M:%S"),
        truncate(&task.prompt, 48)
    );
    if let Some(image_url) = &task.image_url {
        line.push_str(&format!("\n    image: {}", resolve(image_url)));
    }
    if let Some(error) = &task.error {
        line.push_str(&format!("\n    error: {}", style(error).red()));
    }
    line
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
