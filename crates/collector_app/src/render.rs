use std::collections::HashMap;

use chrono::{DateTime, Local};
use collector_core::{BatchState, BatchSummary, BatchViewModel, JobId, JobRowView, JobStatus};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Turns successive batch snapshots into one line per job change.
#[derive(Debug, Default)]
pub struct Renderer {
    seen: HashMap<JobId, (JobStatus, String)>,
}

impl Renderer {
    pub fn changes(&mut self, view: &BatchViewModel) -> Vec<String> {
        view.rows
            .iter()
            .filter(|row| {
                let key = (row.status, row.message.clone());
                self.seen.insert(row.job_id, key.clone()) != Some(key)
            })
            .map(format_row)
            .collect()
    }
}

pub fn format_row(row: &JobRowView) -> String {
    let mut line = format!("[{:>3}] {:<10} {}", row.job_id, row.status.label(), row.url);
    if !row.message.is_empty() {
        line.push_str(" | ");
        line.push_str(&row.message);
    }
    if let Some(annotation) = &row.annotation {
        line.push_str(" (");
        line.push_str(annotation);
        line.push(')');
    }
    line
}

pub fn summary_lines(
    summary: &BatchSummary,
    aborted: bool,
    finished_at: DateTime<Local>,
) -> Vec<String> {
    let stamp = finished_at.format("%Y-%m-%d %H:%M:%S");
    let mut lines = vec![if aborted {
        format!(
            "{stamp} batch aborted: {} completed, {} failed, {} not started",
            summary.completed, summary.errors, summary.pending
        )
    } else {
        format!(
            "{stamp} batch finished: {} of {} completed, {} failed",
            summary.completed, summary.total, summary.errors
        )
    }];
    lines.extend(summary.advisory());
    lines
}

/// Print job changes until `stop` fires, then flush the final snapshot.
pub async fn follow(mut updates: watch::Receiver<BatchState>, stop: CancellationToken) {
    let mut renderer = Renderer::default();
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let view = updates.borrow_and_update().view();
        print_lines(renderer.changes(&view));
    }
    let view = updates.borrow().view();
    print_lines(renderer.changes(&view));
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
