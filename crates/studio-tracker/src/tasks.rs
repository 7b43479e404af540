//! Task execution and timesheets
//!
//! Hours are typed in by hand and accumulate on the task; nothing is timed
//! automatically. Any status may move to any other status.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::changelog;
use crate::config::Config;
use crate::error::DomainError;
use crate::format::format_hours;
use crate::projects::{self, Project};
use crate::schema::{self, Collection, Record, Row};

/// Task entry
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: u64,
    pub project_id: u64,
    pub phase: String,
    pub discipline: String,
    pub description: String,
    pub responsible: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub hours_spent: f64,
    /// Set when the task enters Concluído, cleared when it is reopened
    pub completion_date: Option<NaiveDate>,
    pub change_log: String,
}

/// Task priority, ordered Baixa < Média < Alta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "Alta",
            Priority::Medium => "Média",
            Priority::Low => "Baixa",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match schema::fold_label(s).as_str() {
            "alta" | "high" => Ok(Priority::High),
            "media" | "medium" => Ok(Priority::Medium),
            "baixa" | "low" => Ok(Priority::Low),
            _ => Err(format!("Invalid priority '{}'. Use: Alta, Média, Baixa", s)),
        }
    }
}

/// Task status, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "A Fazer",
            TaskStatus::InProgress => "Em Andamento",
            TaskStatus::Review => "Revisão",
            TaskStatus::Done => "Concluído",
        }
    }

    pub fn is_done(self) -> bool {
        self == TaskStatus::Done
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match schema::fold_label(s).as_str() {
            "a fazer" | "todo" | "to-do" => Ok(TaskStatus::ToDo),
            "em andamento" | "in-progress" | "doing" => Ok(TaskStatus::InProgress),
            "revisao" | "review" => Ok(TaskStatus::Review),
            "concluido" | "done" => Ok(TaskStatus::Done),
            _ => Err(format!(
                "Invalid task status '{}'. Use: A Fazer, Em Andamento, Revisão, Concluído",
                s
            )),
        }
    }
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> u64 {
        self.task_id
    }

    fn from_row(row: &Row) -> Self {
        let get = |c| schema::cell(row, c);
        Self {
            task_id: schema::parse_id(get("ID_Tarefa")).unwrap_or(0),
            project_id: schema::parse_id(get("ID_Projeto")).unwrap_or(0),
            phase: get("Fase").to_string(),
            discipline: get("Disciplina").to_string(),
            description: get("Descricao").to_string(),
            responsible: get("Responsavel").to_string(),
            start_date: schema::parse_date(get("Data_Inicio")),
            due_date: schema::parse_date(get("Prazo")),
            priority: get("Prioridade").parse().unwrap_or(Priority::Medium),
            status: get("Status").parse().unwrap_or(TaskStatus::ToDo),
            hours_spent: schema::parse_number(get("Horas_Gastas")).max(0.0),
            completion_date: schema::parse_date(get("Data_Conclusao")),
            change_log: row.get("Historico").cloned().unwrap_or_default(),
        }
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        let mut put = |c: &str, v: String| {
            row.insert(c.to_string(), v);
        };
        put("ID_Tarefa", self.task_id.to_string());
        put("ID_Projeto", self.project_id.to_string());
        put("Fase", self.phase.clone());
        put("Disciplina", self.discipline.clone());
        put("Descricao", self.description.clone());
        put("Responsavel", self.responsible.clone());
        put("Data_Inicio", schema::date_cell(self.start_date));
        put("Prazo", schema::date_cell(self.due_date));
        put("Prioridade", self.priority.label().to_string());
        put("Status", self.status.label().to_string());
        put("Horas_Gastas", schema::number_cell(self.hours_spent));
        put("Data_Conclusao", schema::date_cell(self.completion_date));
        put("Historico", self.change_log.clone());
        row
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: u64,
    pub phase: String,
    pub discipline: String,
    pub description: String,
    pub responsible: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

/// Optional field edits; `None` leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub responsible: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Hours to add to the timesheet total
    pub add_hours: Option<f64>,
}

pub fn find(tasks: &[Task], task_id: u64) -> Option<&Task> {
    tasks.iter().find(|t| t.task_id == task_id)
}

/// Tasks belonging to one project, in stored order
pub fn for_project(tasks: &[Task], project_id: u64) -> Vec<&Task> {
    tasks.iter().filter(|t| t.project_id == project_id).collect()
}

fn check_dates(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Result<(), DomainError> {
    match (start, due) {
        (Some(s), Some(d)) if s > d => Err(DomainError::Validation(format!(
            "start date {} is after due date {}",
            s, d
        ))),
        _ => Ok(()),
    }
}

/// Create a task under an already allocated id.
/// The project must exist; the store itself does not enforce this.
pub fn create<'a>(
    tasks: &'a mut Vec<Task>,
    projects: &[Project],
    config: &Config,
    task_id: u64,
    input: NewTask,
    now: DateTime<FixedOffset>,
) -> Result<&'a Task, DomainError> {
    if projects::find(projects, input.project_id).is_none() {
        return Err(DomainError::NotFound { entity: "Project", id: input.project_id });
    }
    if input.description.trim().is_empty() {
        return Err(DomainError::Validation("description is required".to_string()));
    }
    if !config.is_team_member(&input.responsible) {
        return Err(DomainError::Validation(format!(
            "'{}' is not on the team ({})",
            input.responsible,
            config.team.join(", ")
        )));
    }
    check_dates(input.start_date, input.due_date)?;
    if find(tasks, task_id).is_some() {
        return Err(DomainError::DuplicateId { collection: Collection::Tasks, id: task_id });
    }

    let mut change_log = String::new();
    changelog::append(&mut change_log, now, "Tarefa criada");

    tasks.push(Task {
        task_id,
        project_id: input.project_id,
        phase: input.phase.trim().to_string(),
        discipline: input.discipline.trim().to_string(),
        description: input.description.trim().to_string(),
        responsible: input.responsible.trim().to_string(),
        start_date: input.start_date,
        due_date: input.due_date,
        priority: input.priority,
        status: TaskStatus::ToDo,
        hours_spent: 0.0,
        completion_date: None,
        change_log,
    });

    Ok(&tasks[tasks.len() - 1])
}

/// Apply edits and timesheet hours to a task, logging each change.
/// Returns the number of changes made.
pub fn apply_update(
    tasks: &mut [Task],
    config: &Config,
    task_id: u64,
    update: TaskUpdate,
    now: DateTime<FixedOffset>,
) -> Result<usize, DomainError> {
    if let Some(hours) = update.add_hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(DomainError::Validation(format!(
                "hours must be a non-negative number, got {}",
                hours
            )));
        }
    }
    if let Some(responsible) = &update.responsible {
        if !config.is_team_member(responsible) {
            return Err(DomainError::Validation(format!("'{}' is not on the team", responsible)));
        }
    }

    let task = tasks
        .iter_mut()
        .find(|t| t.task_id == task_id)
        .ok_or(DomainError::NotFound { entity: "Task", id: task_id })?;

    check_dates(
        update.start_date.or(task.start_date),
        update.due_date.or(task.due_date),
    )?;

    let mut changes = Vec::new();

    if let Some(status) = update.status.filter(|s| *s != task.status) {
        changes.push(changelog::change("Status", task.status.label(), status.label()));
        if status.is_done() {
            task.completion_date = Some(now.date_naive());
        } else if task.status.is_done() {
            task.completion_date = None;
        }
        task.status = status;
    }
    if let Some(priority) = update.priority.filter(|p| *p != task.priority) {
        changes.push(changelog::change("Prioridade", task.priority.label(), priority.label()));
        task.priority = priority;
    }
    if let Some(responsible) = update.responsible.filter(|r| *r != task.responsible) {
        changes.push(changelog::change("Responsável", &task.responsible, &responsible));
        task.responsible = responsible;
    }
    if let Some(start) = update.start_date.filter(|d| Some(*d) != task.start_date) {
        changes.push(changelog::change(
            "Início",
            &schema::date_cell(task.start_date),
            &schema::date_cell(Some(start)),
        ));
        task.start_date = Some(start);
    }
    if let Some(due) = update.due_date.filter(|d| Some(*d) != task.due_date) {
        changes.push(changelog::change(
            "Prazo",
            &schema::date_cell(task.due_date),
            &schema::date_cell(Some(due)),
        ));
        task.due_date = Some(due);
    }
    if let Some(hours) = update.add_hours.filter(|h| *h > 0.0) {
        task.hours_spent += hours;
        changes.push(format!(
            "Horas: +{} (total {})",
            format_hours(hours),
            format_hours(task.hours_spent)
        ));
    }

    for entry in &changes {
        changelog::append(&mut task.change_log, now, entry);
    }

    Ok(changes.len())
}
