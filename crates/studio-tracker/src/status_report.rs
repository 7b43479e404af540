//! Project status report
//!
//! `build` turns a project and its tasks into a document model; renderers
//! turn the model into bytes. Only a plain-text renderer ships.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::format::{format_currency_br, format_hours, format_timestamp};
use crate::projects::Project;
use crate::tasks::{Task, TaskStatus};

/// Report header taken from the project
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub project_id: u64,
    pub client: String,
    pub city: String,
    pub project_type: String,
    pub status: String,
    pub contracted_value: f64,
}

/// One task line
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub done: bool,
    pub description: String,
    pub phase: String,
    pub status: TaskStatus,
    pub hours_spent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub header: ReportHeader,
    pub lines: Vec<ReportLine>,
    /// Share of tasks that are Concluído, 0 when there are no tasks
    pub completion_percentage: f64,
    pub total_hours: f64,
}

/// Build the report. Lines follow the workflow status order; tasks sharing a
/// status keep their stored order.
pub fn build(project: &Project, tasks: &[&Task]) -> StatusReport {
    let mut lines: Vec<ReportLine> = tasks
        .iter()
        .map(|task| ReportLine {
            done: task.status.is_done(),
            description: task.description.clone(),
            phase: task.phase.clone(),
            status: task.status,
            hours_spent: task.hours_spent,
        })
        .collect();
    lines.sort_by_key(|line| line.status);

    let completed = lines.iter().filter(|l| l.done).count();
    let completion_percentage = if lines.is_empty() {
        0.0
    } else {
        completed as f64 / lines.len() as f64 * 100.0
    };

    StatusReport {
        header: ReportHeader {
            project_id: project.project_id,
            client: project.client.clone(),
            city: project.city.clone(),
            project_type: project.project_type.map(|t| t.label().to_string()).unwrap_or_default(),
            status: project.status.label().to_string(),
            contracted_value: project.contracted_value,
        },
        total_hours: lines.iter().map(|l| l.hours_spent).sum(),
        lines,
        completion_percentage,
    }
}

/// Output backend for status reports
pub trait ReportRenderer {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, report: &StatusReport, issued_at: DateTime<FixedOffset>) -> Vec<u8>;
}

/// Plain UTF-8 text, one task per line
pub struct TextRenderer;

impl ReportRenderer for TextRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, report: &StatusReport, issued_at: DateTime<FixedOffset>) -> Vec<u8> {
        let h = &report.header;
        let or_dash = |s: &str| if s.trim().is_empty() { "-".to_string() } else { s.to_string() };

        let mut out = String::new();
        out.push_str(&format!("RELATÓRIO DE STATUS: PROJETO #{}\n", h.project_id));
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str(&format!("Cliente: {}\n", h.client));
        out.push_str(&format!("Local:   {}\n", or_dash(&h.city)));
        out.push_str(&format!("Tipo:    {}\n", or_dash(&h.project_type)));
        out.push_str(&format!("Status:  {}\n", h.status));
        out.push_str(&format!("Valor:   {}\n", format_currency_br(h.contracted_value)));
        out.push_str(&format!("Emitido: {}\n\n", format_timestamp(issued_at)));

        out.push_str("TAREFAS\n");
        out.push_str(&"-".repeat(60));
        out.push('\n');
        if report.lines.is_empty() {
            out.push_str("(nenhuma tarefa cadastrada)\n");
        }
        for line in &report.lines {
            let marker = if line.done { "[X]" } else { "[ ]" };
            let phase = if line.phase.is_empty() {
                String::new()
            } else {
                format!(" ({})", line.phase)
            };
            out.push_str(&format!(
                "{} {}{} - {} - {}\n",
                marker,
                line.description,
                phase,
                line.status,
                format_hours(line.hours_spent)
            ));
        }

        out.push_str(&"-".repeat(60));
        out.push('\n');
        out.push_str(&format!(
            "Progresso: {:.0}% concluído | Horas: {}\n",
            report.completion_percentage,
            format_hours(report.total_hours)
        ));
        out.into_bytes()
    }
}

/// Render and write `relatorio_projeto_<id>.<ext>` into `output_dir`
pub fn write_report(
    renderer: &dyn ReportRenderer,
    report: &StatusReport,
    output_dir: &Path,
    issued_at: DateTime<FixedOffset>,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let path = output_dir.join(format!(
        "{}{}.{}",
        constants::REPORT_FILENAME_PREFIX,
        report.header.project_id,
        renderer.extension()
    ));
    fs::write(&path, renderer.render(report, issued_at))
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    Ok(path)
}
