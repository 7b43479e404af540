//! Financial dashboard metrics
//!
//! Everything here is a pure function of the loaded collections. Cash
//! figures use the year-filtered ledgers (see `reconcile`); the efficiency
//! ranking and price per m² use every project regardless of year or status.
//!
//! Zero denominators are handled per metric: the margin clamps to 0, the
//! hourly rate drops the row. The two policies are intentionally different.

use std::collections::BTreeMap;
use std::fmt;

use crate::finance::{Expense, ExpenseCategory, Receivable};
use crate::projects::{self, Project};
use crate::reconcile::{self, Dated, LedgerEntry};
use crate::tasks::Task;

// =============================================================================
// Cash Summary
// =============================================================================

/// Headline figures for one attribution year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSummary {
    /// Paid receivables (cash in)
    pub gross_revenue: f64,
    /// Tax captured on paid receivables
    pub taxes_paid: f64,
    /// Paid expenses
    pub fixed_costs_paid: f64,
    pub net_profit: f64,
    /// Percentage of gross revenue, 0 when there is no revenue
    pub profit_margin: f64,
    pub receivable_pending: f64,
    pub payable_pending: f64,
    /// Pending in minus pending out
    pub projected_future: f64,
}

impl FinancialSummary {
    pub fn compute(entradas: &[Dated<'_, Receivable>], saidas: &[Dated<'_, Expense>]) -> Self {
        let gross_revenue: f64 = entradas.iter().filter(|r| r.is_paid()).map(|r| r.entry.value).sum();
        let taxes_paid: f64 = entradas.iter().filter(|r| r.is_paid()).map(|r| r.entry.tax_value).sum();
        let fixed_costs_paid: f64 = saidas.iter().filter(|e| e.is_paid()).map(|e| e.entry.value).sum();
        let receivable_pending: f64 = entradas.iter().filter(|r| r.is_pending()).map(|r| r.entry.value).sum();
        let payable_pending: f64 = saidas.iter().filter(|e| e.is_pending()).map(|e| e.entry.value).sum();

        let net_profit = gross_revenue - taxes_paid - fixed_costs_paid;
        let profit_margin = if gross_revenue > 0.0 {
            net_profit / gross_revenue * 100.0
        } else {
            0.0
        };

        Self {
            gross_revenue,
            taxes_paid,
            fixed_costs_paid,
            net_profit,
            profit_margin,
            receivable_pending,
            payable_pending,
            projected_future: receivable_pending - payable_pending,
        }
    }

    /// Revenue composition bars: revenue, taxes and costs as negatives, profit
    pub fn composition(&self) -> [(&'static str, f64); 4] {
        [
            ("Receita Bruta", self.gross_revenue),
            ("Impostos", -self.taxes_paid),
            ("Custos Fixos", -self.fixed_costs_paid),
            ("Lucro Líquido", self.net_profit),
        ]
    }
}

// =============================================================================
// Monthly Cash Flow
// =============================================================================

/// Direction of a cash-flow bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Inflow,
    Outflow,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKind::Inflow => write!(f, "Entrada"),
            FlowKind::Outflow => write!(f, "Saída"),
        }
    }
}

/// One month's total in one direction
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowPoint {
    /// `YYYY-MM`
    pub month: String,
    pub kind: FlowKind,
    pub total: f64,
}

fn totals_by_month<T: LedgerEntry>(entries: &[Dated<'_, T>]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for entry in entries {
        *totals.entry(entry.month()).or_insert(0.0) += entry.entry.value();
    }
    totals
}

/// Monthly inflow and outflow totals, sorted by month.
/// Within a month the inflow comes first. No movement gives an empty series.
pub fn monthly_cash_flow(entradas: &[Dated<'_, Receivable>], saidas: &[Dated<'_, Expense>]) -> Vec<CashFlowPoint> {
    let inflows = totals_by_month(entradas)
        .into_iter()
        .map(|(month, total)| CashFlowPoint { month, kind: FlowKind::Inflow, total });
    let outflows = totals_by_month(saidas)
        .into_iter()
        .map(|(month, total)| CashFlowPoint { month, kind: FlowKind::Outflow, total });

    let mut series: Vec<CashFlowPoint> = inflows.chain(outflows).collect();
    // Stable sort keeps inflows ahead of outflows for the same month
    series.sort_by(|a, b| a.month.cmp(&b.month));
    series
}

// =============================================================================
// Revenue Breakdown
// =============================================================================

/// Project attribute used to break revenue down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Origin,
    Type,
    City,
}

impl Dimension {
    fn value_of(self, project: &Project) -> Option<String> {
        let value = match self {
            Dimension::Origin => project.origin.clone(),
            Dimension::Type => project.project_type.map(|t| t.label().to_string()).unwrap_or_default(),
            Dimension::City => project.city.clone(),
        };
        (!value.trim().is_empty()).then_some(value)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Origin => write!(f, "Origem"),
            Dimension::Type => write!(f, "Tipo"),
            Dimension::City => write!(f, "Cidade"),
        }
    }
}

/// Revenue total for one dimension value; `None` is the unknown bucket
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueBucket {
    pub label: Option<String>,
    pub total: f64,
}

/// Sum receivables of the year by a project attribute.
///
/// Receivables pointing at a missing project, or at a project with the
/// attribute blank, land in the unknown bucket instead of disappearing.
/// Buckets are sorted by label with the unknown bucket last.
pub fn revenue_by(dimension: Dimension, entradas: &[Dated<'_, Receivable>], projects: &[Project]) -> Vec<RevenueBucket> {
    let mut known: BTreeMap<String, f64> = BTreeMap::new();
    let mut unknown: Option<f64> = None;

    for entrada in entradas {
        let label = projects::find(projects, entrada.entry.project_id).and_then(|p| dimension.value_of(p));
        match label {
            Some(label) => *known.entry(label).or_insert(0.0) += entrada.entry.value,
            None => *unknown.get_or_insert(0.0) += entrada.entry.value,
        }
    }

    known
        .into_iter()
        .map(|(label, total)| RevenueBucket { label: Some(label), total })
        .chain(unknown.map(|total| RevenueBucket { label: None, total }))
        .collect()
}

/// Expenses of the year grouped by category, largest first
pub fn expenses_by_category(saidas: &[Dated<'_, Expense>]) -> Vec<(ExpenseCategory, f64)> {
    let mut totals: BTreeMap<ExpenseCategory, f64> = BTreeMap::new();
    for saida in saidas {
        *totals.entry(saida.entry.category).or_insert(0.0) += saida.entry.value;
    }

    let mut result: Vec<_> = totals.into_iter().collect();
    result.sort_by(|a, b| b.1.total_cmp(&a.1));
    result
}

// =============================================================================
// Efficiency
// =============================================================================

/// What a client effectively pays per hour worked
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRate {
    pub project_id: u64,
    pub client: String,
    pub contracted_value: f64,
    pub total_hours: f64,
    pub rate: f64,
}

/// Effective hourly rate per project, worst-paying first.
///
/// Hours come from every task regardless of year. Projects without tasks, or
/// whose tasks sum to zero hours, are left out rather than reported as 0 or
/// infinite. Tasks pointing at a missing project are ignored here.
pub fn efficiency_ranking(tasks: &[Task], projects: &[Project]) -> Vec<HourlyRate> {
    let mut hours: BTreeMap<u64, f64> = BTreeMap::new();
    for task in tasks {
        *hours.entry(task.project_id).or_insert(0.0) += task.hours_spent;
    }

    let mut ranking: Vec<HourlyRate> = projects
        .iter()
        .filter_map(|project| {
            let total_hours = *hours.get(&project.project_id)?;
            (total_hours > 0.0).then(|| HourlyRate {
                project_id: project.project_id,
                client: project.client.clone(),
                contracted_value: project.contracted_value,
                total_hours,
                rate: project.contracted_value / total_hours,
            })
        })
        .collect();

    ranking.sort_by(|a, b| a.rate.total_cmp(&b.rate));
    ranking
}

/// Contracted value per m² across all projects, 0 when no area is recorded
pub fn average_price_per_m2(projects: &[Project]) -> f64 {
    let total_value: f64 = projects.iter().map(|p| p.contracted_value).sum();
    let total_area: f64 = projects.iter().map(|p| p.area_m2).sum();

    if total_area > 0.0 {
        total_value / total_area
    } else {
        0.0
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Everything the financial dashboard shows for one year
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub year: i32,
    pub summary: FinancialSummary,
    pub cash_flow: Vec<CashFlowPoint>,
    pub by_origin: Vec<RevenueBucket>,
    pub by_type: Vec<RevenueBucket>,
    pub by_city: Vec<RevenueBucket>,
    pub by_category: Vec<(ExpenseCategory, f64)>,
    pub efficiency: Vec<HourlyRate>,
    pub price_per_m2: f64,
    /// Receivables/expenses attributed to the year
    pub entries_counted: usize,
}

/// Build the dashboard for an attribution year
pub fn build(
    year: i32,
    projects: &[Project],
    tasks: &[Task],
    receivables: &[Receivable],
    expenses: &[Expense],
) -> Dashboard {
    let entradas = reconcile::in_year(receivables, year);
    let saidas = reconcile::in_year(expenses, year);

    Dashboard {
        year,
        summary: FinancialSummary::compute(&entradas, &saidas),
        cash_flow: monthly_cash_flow(&entradas, &saidas),
        by_origin: revenue_by(Dimension::Origin, &entradas, projects),
        by_type: revenue_by(Dimension::Type, &entradas, projects),
        by_city: revenue_by(Dimension::City, &entradas, projects),
        by_category: expenses_by_category(&saidas),
        efficiency: efficiency_ranking(tasks, projects),
        price_per_m2: average_price_per_m2(projects),
        entries_counted: entradas.len() + saidas.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::FinanceStatus;
    use crate::projects::{ProjectStatus, ProjectType};
    use crate::tasks::{Priority, TaskStatus};
    use chrono::NaiveDate;

    fn date(s: &str) -> Option<NaiveDate> {
        crate::schema::parse_date(s)
    }

    fn project(id: u64, client: &str, origin: &str, city: &str, value: f64, area: f64) -> Project {
        Project {
            project_id: id,
            client: client.to_string(),
            origin: origin.to_string(),
            project_type: Some(ProjectType::ResidentialSingle),
            area_m2: area,
            contracted_value: value,
            services: Vec::new(),
            city: city.to_string(),
            proposal_link: String::new(),
            documents_link: String::new(),
            status: ProjectStatus::Active,
            registration_date: None,
            change_log: String::new(),
        }
    }

    fn receivable(id: u64, project_id: u64, value: f64, status: FinanceStatus, due: &str, paid: &str) -> Receivable {
        let is_paid = status == FinanceStatus::Paid;
        Receivable {
            lancamento_id: id,
            project_id,
            description: String::new(),
            value,
            due_date: date(due),
            status,
            payment_date: date(paid),
            tax_value: if is_paid { value * 0.155 } else { 0.0 },
        }
    }

    fn expense(id: u64, value: f64, status: FinanceStatus, due: &str) -> Expense {
        Expense {
            expense_id: id,
            description: String::new(),
            category: ExpenseCategory::Accounting,
            value,
            due_date: date(due),
            status,
            payment_date: if status == FinanceStatus::Paid { date(due) } else { None },
        }
    }

    fn task(id: u64, project_id: u64, hours: f64) -> Task {
        Task {
            task_id: id,
            project_id,
            phase: String::new(),
            discipline: String::new(),
            description: String::new(),
            responsible: "Ana".to_string(),
            start_date: None,
            due_date: None,
            priority: Priority::Medium,
            status: TaskStatus::InProgress,
            hours_spent: hours,
            completion_date: None,
            change_log: String::new(),
        }
    }

    #[test]
    fn test_summary_formulas() {
        let receivables = vec![
            receivable(1, 1, 1000.0, FinanceStatus::Paid, "2024-01-10", "2024-01-15"),
            receivable(2, 1, 2000.0, FinanceStatus::Pending, "2024-05-10", ""),
        ];
        let expenses = vec![
            expense(1, 300.0, FinanceStatus::Paid, "2024-01-05"),
            expense(2, 500.0, FinanceStatus::Pending, "2024-06-05"),
        ];
        let entradas = reconcile::in_year(&receivables, 2024);
        let saidas = reconcile::in_year(&expenses, 2024);

        let summary = FinancialSummary::compute(&entradas, &saidas);

        assert_eq!(summary.gross_revenue, 1000.0);
        assert_eq!(summary.taxes_paid, 155.0);
        assert_eq!(summary.fixed_costs_paid, 300.0);
        assert_eq!(summary.net_profit, 545.0);
        assert!((summary.profit_margin - 54.5).abs() < 1e-9);
        assert_eq!(summary.receivable_pending, 2000.0);
        assert_eq!(summary.payable_pending, 500.0);
        assert_eq!(summary.projected_future, 1500.0);
    }

    #[test]
    fn test_margin_zero_without_revenue() {
        let expenses = vec![expense(1, 300.0, FinanceStatus::Paid, "2024-01-05")];
        let saidas = reconcile::in_year(&expenses, 2024);

        let summary = FinancialSummary::compute(&[], &saidas);

        assert_eq!(summary.gross_revenue, 0.0);
        assert_eq!(summary.net_profit, -300.0);
        assert_eq!(summary.profit_margin, 0.0);
    }

    #[test]
    fn test_taxes_read_stored_field() {
        // Stored tax differs from value * rate: the stored figure wins
        let mut r = receivable(1, 1, 1000.0, FinanceStatus::Paid, "2024-01-10", "2024-01-15");
        r.value = 1200.0;
        let receivables = vec![r];
        let entradas = reconcile::in_year(&receivables, 2024);

        let summary = FinancialSummary::compute(&entradas, &[]);

        assert_eq!(summary.taxes_paid, 155.0);
        assert_eq!(summary.gross_revenue, 1200.0);
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        let summary = FinancialSummary::compute(&[], &[]);
        assert_eq!(summary, FinancialSummary::default());
        assert!(monthly_cash_flow(&[], &[]).is_empty());
    }

    #[test]
    fn test_monthly_flow_groups_and_sorts() {
        let receivables = vec![
            receivable(1, 1, 1000.0, FinanceStatus::Paid, "2024-01-10", "2024-03-02"),
            receivable(2, 1, 250.0, FinanceStatus::Pending, "2024-01-20", ""),
            receivable(3, 1, 750.0, FinanceStatus::Pending, "2024-01-25", ""),
        ];
        let expenses = vec![
            expense(1, 300.0, FinanceStatus::Paid, "2024-01-05"),
            expense(2, 100.0, FinanceStatus::Pending, "2024-02-05"),
        ];
        let entradas = reconcile::in_year(&receivables, 2024);
        let saidas = reconcile::in_year(&expenses, 2024);

        let series = monthly_cash_flow(&entradas, &saidas);

        let compact: Vec<_> = series.iter().map(|p| (p.month.as_str(), p.kind, p.total)).collect();
        assert_eq!(
            compact,
            vec![
                ("2024-01", FlowKind::Inflow, 1000.0),
                ("2024-01", FlowKind::Outflow, 300.0),
                ("2024-02", FlowKind::Outflow, 100.0),
                ("2024-03", FlowKind::Inflow, 1000.0),
            ]
        );

        let series_total: f64 = series.iter().map(|p| p.total).sum();
        let input_total: f64 = receivables.iter().map(|r| r.value).sum::<f64>() + expenses.iter().map(|e| e.value).sum::<f64>();
        assert_eq!(series_total, input_total);
    }

    #[test]
    fn test_revenue_by_keeps_unknown_bucket() {
        let projects = vec![
            project(1, "Ana", "Indicação", "Curitiba", 0.0, 0.0),
            project(2, "Bruno", "Instagram", "", 0.0, 0.0),
        ];
        let receivables = vec![
            receivable(1, 1, 100.0, FinanceStatus::Paid, "2024-01-10", "2024-01-10"),
            receivable(2, 1, 50.0, FinanceStatus::Pending, "2024-02-10", ""),
            receivable(3, 2, 70.0, FinanceStatus::Paid, "2024-01-10", "2024-01-10"),
            // Broken foreign key
            receivable(4, 99, 30.0, FinanceStatus::Paid, "2024-01-10", "2024-01-10"),
        ];
        let entradas = reconcile::in_year(&receivables, 2024);

        let by_origin = revenue_by(Dimension::Origin, &entradas, &projects);
        assert_eq!(
            by_origin,
            vec![
                RevenueBucket { label: Some("Indicação".to_string()), total: 150.0 },
                RevenueBucket { label: Some("Instagram".to_string()), total: 70.0 },
                RevenueBucket { label: None, total: 30.0 },
            ]
        );

        let by_city = revenue_by(Dimension::City, &entradas, &projects);
        assert_eq!(by_city.last(), Some(&RevenueBucket { label: None, total: 100.0 }));

        let total: f64 = by_origin.iter().map(|b| b.total).sum();
        assert_eq!(total, 250.0);
    }

    #[test]
    fn test_efficiency_excludes_zero_hours_and_missing_tasks() {
        let projects = vec![
            project(1, "Ana", "", "", 10_000.0, 0.0),
            project(2, "Bruno", "", "", 6_000.0, 0.0),
            project(3, "Carla", "", "", 8_000.0, 0.0),
            project(4, "Davi", "", "", 5_000.0, 0.0),
        ];
        let tasks = vec![
            task(1, 1, 40.0),
            task(2, 1, 60.0),
            task(3, 2, 20.0),
            task(4, 3, 0.0),
            // Orphan task
            task(5, 42, 10.0),
        ];

        let ranking = efficiency_ranking(&tasks, &projects);

        let ids: Vec<u64> = ranking.iter().map(|r| r.project_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(ranking[0].total_hours, 100.0);
        assert_eq!(ranking[0].rate, 100.0);
        assert_eq!(ranking[1].rate, 300.0);
    }

    #[test]
    fn test_price_per_m2() {
        let projects = vec![
            project(1, "Ana", "", "", 12_000.0, 100.0),
            project(2, "Bruno", "", "", 8_000.0, 100.0),
        ];
        assert_eq!(average_price_per_m2(&projects), 100.0);

        let no_area = vec![project(1, "Ana", "", "", 12_000.0, 0.0)];
        assert_eq!(average_price_per_m2(&no_area), 0.0);
        assert_eq!(average_price_per_m2(&[]), 0.0);
    }

    #[test]
    fn test_build_filters_by_year() {
        let projects = vec![project(1, "Ana", "Indicação", "Curitiba", 10_000.0, 100.0)];
        let receivables = vec![
            receivable(1, 1, 1000.0, FinanceStatus::Paid, "2023-12-10", "2024-01-03"),
            receivable(2, 1, 999.0, FinanceStatus::Paid, "2023-11-10", "2023-11-12"),
        ];

        let dashboard = build(2024, &projects, &[], &receivables, &[]);

        assert_eq!(dashboard.summary.gross_revenue, 1000.0);
        assert_eq!(dashboard.entries_counted, 1);
        assert_eq!(dashboard.price_per_m2, 100.0);
        assert!(dashboard.efficiency.is_empty());
    }

    #[test]
    fn test_composition_signs() {
        let summary = FinancialSummary {
            gross_revenue: 1000.0,
            taxes_paid: 155.0,
            fixed_costs_paid: 300.0,
            net_profit: 545.0,
            ..Default::default()
        };
        let bars = summary.composition();
        assert_eq!(bars[1], ("Impostos", -155.0));
        assert_eq!(bars[2], ("Custos Fixos", -300.0));
    }
}
