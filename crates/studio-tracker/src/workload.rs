//! Team workload, deadline alerts and timeline input

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

use crate::tasks::Task;

/// Open (not Concluído) tasks per responsible, busiest first.
/// Ties keep alphabetical order.
pub fn workload_by_responsible(tasks: &[Task]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for task in tasks.iter().filter(|t| !t.status.is_done()) {
        let name = task.responsible.trim();
        let name = if name.is_empty() { "-" } else { name };
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut result: Vec<(String, usize)> = counts.into_iter().map(|(name, n)| (name.to_string(), n)).collect();
    result.sort_by(|a, b| b.1.cmp(&a.1));
    result
}

// =============================================================================
// Deadline Alerts
// =============================================================================

/// Deadline state of an open task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Deadline {
    Overdue,
    Urgent,
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deadline::Overdue => write!(f, "Atrasada"),
            Deadline::Urgent => write!(f, "Urgente"),
        }
    }
}

/// Classify one task against `today`.
///
/// Overdue means the due date has passed. Urgent means it falls within
/// `[today, today + urgent_window_days]`. The two never overlap. Completed
/// tasks and tasks without a due date get no alert.
pub fn classify(task: &Task, today: NaiveDate, urgent_window_days: i64) -> Option<Deadline> {
    if task.status.is_done() {
        return None;
    }
    let due = task.due_date?;
    let window_end = today
        .checked_add_days(Days::new(urgent_window_days.max(0) as u64))
        .unwrap_or(NaiveDate::MAX);

    if due < today {
        Some(Deadline::Overdue)
    } else if due <= window_end {
        Some(Deadline::Urgent)
    } else {
        None
    }
}

/// A task needing attention
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub task: &'a Task,
    pub deadline: Deadline,
    /// Negative when overdue
    pub days_left: i64,
}

/// All overdue and urgent tasks, overdue first, then by due date
pub fn alerts(tasks: &[Task], today: NaiveDate, urgent_window_days: i64) -> Vec<Alert<'_>> {
    let mut result: Vec<Alert<'_>> = tasks
        .iter()
        .filter_map(|task| {
            let deadline = classify(task, today, urgent_window_days)?;
            let due = task.due_date?;
            Some(Alert { task, deadline, days_left: (due - today).num_days() })
        })
        .collect();

    result.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.days_left.cmp(&b.days_left)));
    result
}

// =============================================================================
// Timeline
// =============================================================================

/// One Gantt bar
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineBar {
    pub task_id: u64,
    pub project_id: u64,
    pub description: String,
    pub responsible: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// The start date was filled in for display and does not exist in the store
    pub synthesized_start: bool,
}

/// Gantt input for the given tasks.
///
/// A task without a start date is drawn from `due - offset_days`. Tasks
/// without a due date cannot be placed and are skipped. Nothing here is
/// written back to the store.
pub fn timeline_bars(tasks: &[Task], offset_days: i64) -> Vec<TimelineBar> {
    let mut bars: Vec<TimelineBar> = tasks
        .iter()
        .filter_map(|task| {
            let end = task.due_date?;
            let (start, synthesized_start) = match task.start_date {
                Some(start) => (start, false),
                None => (
                    end.checked_sub_days(Days::new(offset_days.max(0) as u64)).unwrap_or(end),
                    true,
                ),
            };
            Some(TimelineBar {
                task_id: task.task_id,
                project_id: task.project_id,
                description: task.description.clone(),
                responsible: task.responsible.clone(),
                start,
                end,
                synthesized_start,
            })
        })
        .collect();

    bars.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Priority, TaskStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: u64, responsible: &str, status: TaskStatus, due: Option<NaiveDate>) -> Task {
        Task {
            task_id: id,
            project_id: 1,
            phase: "Projeto Executivo".to_string(),
            discipline: "Arquitetura".to_string(),
            description: format!("Tarefa {}", id),
            responsible: responsible.to_string(),
            start_date: None,
            due_date: due,
            priority: Priority::Medium,
            status,
            hours_spent: 0.0,
            completion_date: None,
            change_log: String::new(),
        }
    }

    #[test]
    fn test_workload_counts_open_tasks_only() {
        let tasks = vec![
            task(1, "Ana", TaskStatus::ToDo, None),
            task(2, "Ana", TaskStatus::InProgress, None),
            task(3, "Bruno", TaskStatus::Review, None),
            task(4, "Bruno", TaskStatus::Done, None),
            task(5, "Carla", TaskStatus::Done, None),
        ];

        let workload = workload_by_responsible(&tasks);

        assert_eq!(workload, vec![("Ana".to_string(), 2), ("Bruno".to_string(), 1)]);
    }

    #[test]
    fn test_overdue_and_urgent_are_disjoint() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "Ana", TaskStatus::ToDo, Some(date(2024, 6, 9))),
            task(2, "Ana", TaskStatus::ToDo, Some(date(2024, 6, 10))),
            task(3, "Ana", TaskStatus::InProgress, Some(date(2024, 6, 11))),
            task(4, "Ana", TaskStatus::Review, Some(date(2024, 6, 12))),
            task(5, "Ana", TaskStatus::Done, Some(date(2024, 6, 1))),
            task(6, "Ana", TaskStatus::ToDo, None),
        ];

        let states: Vec<Option<Deadline>> = tasks.iter().map(|t| classify(t, today, 1)).collect();

        assert_eq!(
            states,
            vec![
                Some(Deadline::Overdue),
                Some(Deadline::Urgent),
                Some(Deadline::Urgent),
                None,
                None,
                None,
            ]
        );
    }

    #[test]
    fn test_alerts_sorted_overdue_first() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "Ana", TaskStatus::ToDo, Some(date(2024, 6, 11))),
            task(2, "Ana", TaskStatus::ToDo, Some(date(2024, 6, 8))),
            task(3, "Ana", TaskStatus::ToDo, Some(date(2024, 6, 2))),
        ];

        let alerts = alerts(&tasks, today, 1);

        let ids: Vec<u64> = alerts.iter().map(|a| a.task.task_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(alerts[0].days_left, -8);
        assert_eq!(alerts[2].deadline, Deadline::Urgent);
    }

    #[test]
    fn test_timeline_synthesizes_missing_start() {
        let mut with_start = task(1, "Ana", TaskStatus::ToDo, Some(date(2024, 6, 20)));
        with_start.start_date = Some(date(2024, 6, 1));
        let without_start = task(2, "Bruno", TaskStatus::ToDo, Some(date(2024, 6, 10)));
        let without_due = task(3, "Carla", TaskStatus::ToDo, None);

        let bars = timeline_bars(&[with_start, without_start.clone(), without_due], 3);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].task_id, 1);
        assert!(!bars[0].synthesized_start);
        assert_eq!(bars[1].start, date(2024, 6, 7));
        assert!(bars[1].synthesized_start);
        // The source task is untouched
        assert_eq!(without_start.start_date, None);
    }
}
