use anyhow::Context;
use collector_core::{Candidate, JobId, SelectionChoice};
use dialoguer::theme::ColorfulTheme;
use dialoguer::MultiSelect;

/// Ask which detected entities to analyze. With `assume_yes` the default
/// pre-selection is accepted without prompting.
pub async fn prompt(
    job_id: JobId,
    candidates: Vec<Candidate>,
    preselected: Vec<String>,
    assume_yes: bool,
) -> anyhow::Result<SelectionChoice> {
    if assume_yes {
        return Ok(choice_from_ids(preselected));
    }
    tokio::task::spawn_blocking(move || ask(job_id, &candidates, &preselected))
        .await
        .context("selection prompt panicked")?
}

fn ask(
    job_id: JobId,
    candidates: &[Candidate],
    preselected: &[String],
) -> anyhow::Result<SelectionChoice> {
    let items: Vec<String> = candidates.iter().map(label).collect();
    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Job {job_id}: {} entities detected. Select the ones to analyze (none to skip)",
            candidates.len()
        ))
        .items(&items)
        .defaults(&checked(candidates, preselected))
        .interact()
        .context("reading entity selection")?;
    Ok(choice_from_indices(candidates, &picked))
}

fn label(candidate: &Candidate) -> String {
    if candidate.source.is_empty() {
        candidate.display_name.clone()
    } else {
        format!("{} ({})", candidate.display_name, candidate.source)
    }
}

fn checked(candidates: &[Candidate], preselected: &[String]) -> Vec<bool> {
    candidates
        .iter()
        .map(|candidate| preselected.contains(&candidate.entity_id))
        .collect()
}

fn choice_from_indices(candidates: &[Candidate], picked: &[usize]) -> SelectionChoice {
    choice_from_ids(
        picked
            .iter()
            .filter_map(|&index| candidates.get(index))
            .map(|candidate| candidate.entity_id.clone())
            .collect(),
    )
}

fn choice_from_ids(entity_ids: Vec<String>) -> SelectionChoice {
    if entity_ids.is_empty() {
        SelectionChoice::Skip
    } else {
        SelectionChoice::Confirm(entity_ids)
    }
}
