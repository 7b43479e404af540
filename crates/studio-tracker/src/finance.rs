//! Receivables (money in) and expenses (money out)
//!
//! Tax on a receivable is captured once, when it is marked paid, and stored
//! on the record. Aggregates read the stored value; they never recompute it
//! from the current amount.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::projects::{self, Project};
use crate::reconcile::LedgerEntry;
use crate::schema::{self, Collection, Record, Row};

/// Payment status shared by receivables and expenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinanceStatus {
    Pending,
    Paid,
}

impl FinanceStatus {
    pub fn label(self) -> &'static str {
        match self {
            FinanceStatus::Pending => "Pendente",
            FinanceStatus::Paid => "Pago",
        }
    }
}

impl fmt::Display for FinanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for FinanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match schema::fold_label(s).as_str() {
            "pendente" | "pending" => Ok(FinanceStatus::Pending),
            "pago" | "paid" => Ok(FinanceStatus::Paid),
            _ => Err(format!("Invalid status '{}'. Use: Pendente, Pago", s)),
        }
    }
}

/// Receivable entry (installment billed to a client)
#[derive(Debug, Clone, PartialEq)]
pub struct Receivable {
    pub lancamento_id: u64,
    pub project_id: u64,
    pub description: String,
    pub value: f64,
    pub due_date: Option<NaiveDate>,
    pub status: FinanceStatus,
    pub payment_date: Option<NaiveDate>,
    /// Captured at payment time, zero while pending
    pub tax_value: f64,
}

/// Expense entry (fixed cost of running the practice)
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub expense_id: u64,
    pub description: String,
    pub category: ExpenseCategory,
    pub value: f64,
    pub due_date: Option<NaiveDate>,
    pub status: FinanceStatus,
    pub payment_date: Option<NaiveDate>,
}

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExpenseCategory {
    Accounting,
    Software,
    ProLabore,
    Marketing,
    Fees,
    Other,
}

impl ExpenseCategory {
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Accounting => "Contabilidade",
            ExpenseCategory::Software => "Software/Licenças",
            ExpenseCategory::ProLabore => "Pró-labore",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Fees => "Taxas",
            ExpenseCategory::Other => "Outros",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match schema::fold_label(s).as_str() {
            "contabilidade" | "accounting" => Ok(ExpenseCategory::Accounting),
            "software/licencas" | "software" | "licencas" => Ok(ExpenseCategory::Software),
            "pro-labore" | "prolabore" | "pro_labore" => Ok(ExpenseCategory::ProLabore),
            "marketing" => Ok(ExpenseCategory::Marketing),
            "taxas" | "fees" => Ok(ExpenseCategory::Fees),
            "outros" | "other" => Ok(ExpenseCategory::Other),
            _ => Err(format!(
                "Invalid category '{}'. Use: Contabilidade, Software, Pro-labore, Marketing, Taxas, Outros",
                s
            )),
        }
    }
}

impl LedgerEntry for Receivable {
    fn value(&self) -> f64 {
        self.value
    }
    fn status(&self) -> FinanceStatus {
        self.status
    }
    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
    fn payment_date(&self) -> Option<NaiveDate> {
        self.payment_date
    }
}

impl LedgerEntry for Expense {
    fn value(&self) -> f64 {
        self.value
    }
    fn status(&self) -> FinanceStatus {
        self.status
    }
    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
    fn payment_date(&self) -> Option<NaiveDate> {
        self.payment_date
    }
}

impl Record for Receivable {
    const COLLECTION: Collection = Collection::Receivables;

    fn id(&self) -> u64 {
        self.lancamento_id
    }

    fn from_row(row: &Row) -> Self {
        let get = |c| schema::cell(row, c);
        Self {
            lancamento_id: schema::parse_id(get("ID_Lancamento")).unwrap_or(0),
            project_id: schema::parse_id(get("ID_Projeto")).unwrap_or(0),
            description: get("Descricao").to_string(),
            value: schema::parse_number(get("Valor")),
            due_date: schema::parse_date(get("Vencimento")),
            status: get("Status").parse().unwrap_or(FinanceStatus::Pending),
            payment_date: schema::parse_date(get("Data_Pagamento")),
            tax_value: schema::parse_number(get("Valor_Imposto")),
        }
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        let mut put = |c: &str, v: String| {
            row.insert(c.to_string(), v);
        };
        put("ID_Lancamento", self.lancamento_id.to_string());
        put("ID_Projeto", self.project_id.to_string());
        put("Descricao", self.description.clone());
        put("Valor", schema::number_cell(self.value));
        put("Vencimento", schema::date_cell(self.due_date));
        put("Status", self.status.label().to_string());
        put("Data_Pagamento", schema::date_cell(self.payment_date));
        put("Valor_Imposto", schema::number_cell(self.tax_value));
        row
    }
}

impl Record for Expense {
    const COLLECTION: Collection = Collection::Expenses;

    fn id(&self) -> u64 {
        self.expense_id
    }

    fn from_row(row: &Row) -> Self {
        let get = |c| schema::cell(row, c);
        Self {
            expense_id: schema::parse_id(get("ID_Despesa")).unwrap_or(0),
            description: get("Descricao").to_string(),
            category: get("Categoria").parse().unwrap_or(ExpenseCategory::Other),
            value: schema::parse_number(get("Valor")),
            due_date: schema::parse_date(get("Vencimento")),
            status: get("Status").parse().unwrap_or(FinanceStatus::Pending),
            payment_date: schema::parse_date(get("Data_Pagamento")),
        }
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        let mut put = |c: &str, v: String| {
            row.insert(c.to_string(), v);
        };
        put("ID_Despesa", self.expense_id.to_string());
        put("Descricao", self.description.clone());
        put("Categoria", self.category.label().to_string());
        put("Valor", schema::number_cell(self.value));
        put("Vencimento", schema::date_cell(self.due_date));
        put("Status", self.status.label().to_string());
        put("Data_Pagamento", schema::date_cell(self.payment_date));
        row
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Input for billing a receivable
#[derive(Debug, Clone)]
pub struct NewReceivable {
    pub project_id: u64,
    pub description: String,
    pub value: f64,
    pub due_date: NaiveDate,
}

/// Input for recording an expense
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub category: ExpenseCategory,
    pub value: f64,
    pub due_date: NaiveDate,
}

fn check_value(value: f64) -> Result<(), DomainError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::Validation(format!("value must be a non-negative number, got {}", value)))
    }
}

/// Add a pending receivable for an existing project
pub fn add_receivable<'a>(
    receivables: &'a mut Vec<Receivable>,
    projects: &[Project],
    lancamento_id: u64,
    input: NewReceivable,
) -> Result<&'a Receivable, DomainError> {
    check_value(input.value)?;
    if projects::find(projects, input.project_id).is_none() {
        return Err(DomainError::NotFound { entity: "Project", id: input.project_id });
    }
    if receivables.iter().any(|r| r.lancamento_id == lancamento_id) {
        return Err(DomainError::DuplicateId { collection: Collection::Receivables, id: lancamento_id });
    }

    receivables.push(Receivable {
        lancamento_id,
        project_id: input.project_id,
        description: input.description.trim().to_string(),
        value: input.value,
        due_date: Some(input.due_date),
        status: FinanceStatus::Pending,
        payment_date: None,
        tax_value: 0.0,
    });

    Ok(&receivables[receivables.len() - 1])
}

/// Mark a receivable paid and capture its tax at `tax_rate`.
///
/// A receivable that is already paid is rejected so the captured tax is
/// never overwritten.
pub fn mark_receivable_paid(
    receivables: &mut [Receivable],
    lancamento_id: u64,
    payment_date: NaiveDate,
    tax_rate: f64,
) -> Result<&Receivable, DomainError> {
    let receivable = receivables
        .iter_mut()
        .find(|r| r.lancamento_id == lancamento_id)
        .ok_or(DomainError::NotFound { entity: "Receivable", id: lancamento_id })?;

    if receivable.status == FinanceStatus::Paid {
        return Err(DomainError::AlreadyPaid { entity: "Receivable", id: lancamento_id });
    }

    receivable.status = FinanceStatus::Paid;
    receivable.payment_date = Some(payment_date);
    receivable.tax_value = receivable.value * tax_rate;

    Ok(receivable)
}

/// Undo a payment: back to pending, payment date and captured tax cleared
pub fn reopen_receivable(receivables: &mut [Receivable], lancamento_id: u64) -> Result<&Receivable, DomainError> {
    let receivable = receivables
        .iter_mut()
        .find(|r| r.lancamento_id == lancamento_id)
        .ok_or(DomainError::NotFound { entity: "Receivable", id: lancamento_id })?;

    if receivable.status != FinanceStatus::Paid {
        return Err(DomainError::NotPaid { entity: "Receivable", id: lancamento_id });
    }

    receivable.status = FinanceStatus::Pending;
    receivable.payment_date = None;
    receivable.tax_value = 0.0;

    Ok(receivable)
}

/// Add a pending expense
pub fn add_expense(expenses: &mut Vec<Expense>, expense_id: u64, input: NewExpense) -> Result<&Expense, DomainError> {
    check_value(input.value)?;
    if input.description.trim().is_empty() {
        return Err(DomainError::Validation("description is required".to_string()));
    }
    if expenses.iter().any(|e| e.expense_id == expense_id) {
        return Err(DomainError::DuplicateId { collection: Collection::Expenses, id: expense_id });
    }

    expenses.push(Expense {
        expense_id,
        description: input.description.trim().to_string(),
        category: input.category,
        value: input.value,
        due_date: Some(input.due_date),
        status: FinanceStatus::Pending,
        payment_date: None,
    });

    Ok(&expenses[expenses.len() - 1])
}

/// Mark an expense paid
pub fn mark_expense_paid(
    expenses: &mut [Expense],
    expense_id: u64,
    payment_date: NaiveDate,
) -> Result<&Expense, DomainError> {
    let expense = expenses
        .iter_mut()
        .find(|e| e.expense_id == expense_id)
        .ok_or(DomainError::NotFound { entity: "Expense", id: expense_id })?;

    if expense.status == FinanceStatus::Paid {
        return Err(DomainError::AlreadyPaid { entity: "Expense", id: expense_id });
    }

    expense.status = FinanceStatus::Paid;
    expense.payment_date = Some(payment_date);

    Ok(expense)
}

/// Undo an expense payment
pub fn reopen_expense(expenses: &mut [Expense], expense_id: u64) -> Result<&Expense, DomainError> {
    let expense = expenses
        .iter_mut()
        .find(|e| e.expense_id == expense_id)
        .ok_or(DomainError::NotFound { entity: "Expense", id: expense_id })?;

    if expense.status != FinanceStatus::Paid {
        return Err(DomainError::NotPaid { entity: "Expense", id: expense_id });
    }

    expense.status = FinanceStatus::Pending;
    expense.payment_date = None;

    Ok(expense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::{NewProject, register};
    use chrono::{FixedOffset, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn one_project() -> Vec<Project> {
        let now = FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 2, 9, 0, 0)
            .unwrap();
        let mut projects = Vec::new();
        register(&mut projects, 1, NewProject { client: "Ana".to_string(), ..Default::default() }, now).unwrap();
        projects
    }

    fn billed(value: f64) -> Vec<Receivable> {
        let mut receivables = Vec::new();
        add_receivable(
            &mut receivables,
            &one_project(),
            1,
            NewReceivable {
                project_id: 1,
                description: "Entrada 30%".to_string(),
                value,
                due_date: date(2024, 2, 10),
            },
        )
        .unwrap();
        receivables
    }

    #[test]
    fn test_tax_captured_on_payment() {
        let mut receivables = billed(1000.0);
        assert_eq!(receivables[0].tax_value, 0.0);

        let paid = mark_receivable_paid(&mut receivables, 1, date(2024, 2, 12), 0.155).unwrap();

        assert_eq!(paid.tax_value, 155.0);
        assert_eq!(paid.payment_date, Some(date(2024, 2, 12)));
        assert_eq!(paid.status, FinanceStatus::Paid);
    }

    #[test]
    fn test_tax_is_a_snapshot() {
        let mut receivables = billed(1000.0);
        mark_receivable_paid(&mut receivables, 1, date(2024, 2, 12), 0.155).unwrap();

        // Later edit of the amount does not touch the captured tax
        receivables[0].value = 2000.0;
        assert!(matches!(
            mark_receivable_paid(&mut receivables, 1, date(2024, 3, 1), 0.155),
            Err(DomainError::AlreadyPaid { .. })
        ));
        assert_eq!(receivables[0].tax_value, 155.0);
        assert_eq!(receivables[0].payment_date, Some(date(2024, 2, 12)));
    }

    #[test]
    fn test_reopen_clears_payment() {
        let mut receivables = billed(500.0);
        mark_receivable_paid(&mut receivables, 1, date(2024, 2, 12), 0.155).unwrap();
        let reopened = reopen_receivable(&mut receivables, 1).unwrap();

        assert_eq!(reopened.status, FinanceStatus::Pending);
        assert_eq!(reopened.payment_date, None);
        assert_eq!(reopened.tax_value, 0.0);
        assert!(reopen_receivable(&mut receivables, 1).is_err());
    }

    #[test]
    fn test_add_receivable_returns_the_new_entry() {
        let projects = one_project();
        let mut receivables = Vec::new();

        let added = add_receivable(
            &mut receivables,
            &projects,
            7,
            NewReceivable {
                project_id: 1,
                description: "Parcela final".to_string(),
                value: 2500.0,
                due_date: date(2024, 5, 20),
            },
        )
        .unwrap();

        assert_eq!(added.lancamento_id, 7);
        assert_eq!(added.status, FinanceStatus::Pending);
        assert_eq!(added.due_date, Some(date(2024, 5, 20)));
        assert_eq!(projects[0].client, "Ana");
    }

    #[test]
    fn test_receivable_requires_project() {
        let mut receivables = Vec::new();
        let result = add_receivable(
            &mut receivables,
            &one_project(),
            1,
            NewReceivable { project_id: 5, description: String::new(), value: 10.0, due_date: date(2024, 1, 1) },
        );
        assert!(matches!(result, Err(DomainError::NotFound { entity: "Project", id: 5 })));
    }

    #[test]
    fn test_expense_lifecycle() {
        let mut expenses = Vec::new();
        add_expense(
            &mut expenses,
            1,
            NewExpense {
                description: "Escritório contábil".to_string(),
                category: ExpenseCategory::Accounting,
                value: 450.0,
                due_date: date(2024, 3, 5),
            },
        )
        .unwrap();

        mark_expense_paid(&mut expenses, 1, date(2024, 3, 4)).unwrap();
        assert!(mark_expense_paid(&mut expenses, 1, date(2024, 3, 5)).is_err());
        assert_eq!(expenses[0].payment_date, Some(date(2024, 3, 4)));

        reopen_expense(&mut expenses, 1).unwrap();
        assert_eq!(expenses[0].status, FinanceStatus::Pending);
    }

    #[test]
    fn test_negative_value_rejected() {
        let mut expenses = Vec::new();
        let input = NewExpense {
            description: "Estorno".to_string(),
            category: ExpenseCategory::Other,
            value: -10.0,
            due_date: date(2024, 3, 5),
        };
        assert!(add_expense(&mut expenses, 1, input).is_err());
    }

    #[test]
    fn test_category_labels_parse() {
        for category in [
            ExpenseCategory::Accounting,
            ExpenseCategory::Software,
            ExpenseCategory::ProLabore,
            ExpenseCategory::Marketing,
            ExpenseCategory::Fees,
            ExpenseCategory::Other,
        ] {
            assert_eq!(category.label().parse::<ExpenseCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_rows_round_trip() {
        let mut receivables = billed(1234.56);
        mark_receivable_paid(&mut receivables, 1, date(2024, 2, 12), 0.155).unwrap();
        let row = receivables[0].to_row();
        assert_eq!(row["Status"], "Pago");
        assert_eq!(Receivable::from_row(&row), receivables[0]);
    }
}
