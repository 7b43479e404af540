//! Collection schemas and row migration
//!
//! The record store keeps every collection as a spreadsheet-like table: each
//! row maps a column header to a text cell. This module declares the columns
//! each collection must have, backfills rows written by older versions, and
//! converts between raw rows and typed records.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::constants;

/// One row of a collection: column header -> cell text
pub type Row = BTreeMap<String, String>;

/// A whole collection snapshot
pub type Table = Vec<Row>;

/// Named record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Projects,
    Tasks,
    Receivables,
    Expenses,
}

/// Column declaration with the default used when backfilling
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub default: &'static str,
}

const fn col(name: &'static str, default: &'static str) -> Column {
    Column { name, default }
}

// =============================================================================
// Column Declarations
// =============================================================================

pub const PROJECT_COLUMNS: &[Column] = &[
    col("ID_Projeto", ""),
    col("Cliente", ""),
    col("Origem", ""),
    col("Tipo", ""),
    col("Area_m2", "0"),
    col("Proposta_Aceita_R$", "0"),
    col("Servicos", ""),
    col("Cidade", ""),
    col("Link_Proposta", ""),
    col("Link_Documentos", ""),
    col("Status_Geral", "Ativo"),
    col("Data_Cadastro", ""),
    col("Historico", ""),
];

pub const TASK_COLUMNS: &[Column] = &[
    col("ID_Tarefa", ""),
    col("ID_Projeto", ""),
    col("Fase", ""),
    col("Disciplina", ""),
    col("Descricao", ""),
    col("Responsavel", ""),
    col("Data_Inicio", ""),
    col("Prazo", ""),
    col("Prioridade", "Média"),
    col("Status", "A Fazer"),
    col("Horas_Gastas", "0"),
    col("Data_Conclusao", ""),
    col("Historico", ""),
];

pub const RECEIVABLE_COLUMNS: &[Column] = &[
    col("ID_Lancamento", ""),
    col("ID_Projeto", ""),
    col("Descricao", ""),
    col("Valor", "0"),
    col("Vencimento", ""),
    col("Status", "Pendente"),
    col("Data_Pagamento", ""),
    col("Valor_Imposto", "0"),
];

pub const EXPENSE_COLUMNS: &[Column] = &[
    col("ID_Despesa", ""),
    col("Descricao", ""),
    col("Categoria", "Outros"),
    col("Valor", "0"),
    col("Vencimento", ""),
    col("Status", "Pendente"),
    col("Data_Pagamento", ""),
];

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Projects,
        Collection::Tasks,
        Collection::Receivables,
        Collection::Expenses,
    ];

    /// Sheet name used as the storage key
    pub fn sheet_name(self) -> &'static str {
        match self {
            Collection::Projects => "Projetos",
            Collection::Tasks => "Tarefas",
            Collection::Receivables => "Financeiro",
            Collection::Expenses => "Despesas",
        }
    }

    /// Declared columns, in display order
    pub fn columns(self) -> &'static [Column] {
        match self {
            Collection::Projects => PROJECT_COLUMNS,
            Collection::Tasks => TASK_COLUMNS,
            Collection::Receivables => RECEIVABLE_COLUMNS,
            Collection::Expenses => EXPENSE_COLUMNS,
        }
    }

    /// Column holding the record identity
    pub fn id_column(self) -> &'static str {
        self.columns()[0].name
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sheet_name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "projetos" | "projects" | "project" => Ok(Collection::Projects),
            "tarefas" | "tasks" | "task" => Ok(Collection::Tasks),
            "financeiro" | "receivables" | "receivable" => Ok(Collection::Receivables),
            "despesas" | "expenses" | "expense" => Ok(Collection::Expenses),
            _ => Err(format!(
                "Invalid collection '{}'. Use: projects, tasks, receivables, expenses",
                s
            )),
        }
    }
}

// =============================================================================
// Migration
// =============================================================================

/// Backfill missing columns with their declared default.
///
/// Existing cells (including columns this version does not know about) are
/// left untouched. Returns the number of cells added.
pub fn migrate_row(row: &mut Row, columns: &[Column]) -> usize {
    let mut added = 0;
    for column in columns {
        if !row.contains_key(column.name) {
            row.insert(column.name.to_string(), column.default.to_string());
            added += 1;
        }
    }
    added
}

/// Backfill every row of a collection, returns the number of cells added
pub fn migrate_table(table: &mut Table, collection: Collection) -> usize {
    let columns = collection.columns();
    table.iter_mut().map(|row| migrate_row(row, columns)).sum()
}

// =============================================================================
// Typed Records
// =============================================================================

/// A typed record stored in one collection
pub trait Record: Sized {
    const COLLECTION: Collection;

    fn id(&self) -> u64;

    /// Build from a raw row; malformed cells degrade to defaults
    fn from_row(row: &Row) -> Self;

    fn to_row(&self) -> Row;
}

/// Convert a table to typed records
pub fn records_from_table<R: Record>(table: &Table) -> Vec<R> {
    table.iter().map(R::from_row).collect()
}

/// Convert typed records back to a table, laid over the rows they were
/// loaded from.
///
/// A record whose id matches an original row keeps that row and only the
/// cells whose typed value changed are rewritten, so unknown columns and
/// raw cells the parsers normalise (`1.234,5`, unrecognised labels) survive
/// a save. Records with no original row start from a backfilled empty row.
pub fn merge_records<R: Record>(original: &[Row], records: &[R]) -> Table {
    let id_column = R::COLLECTION.id_column();
    let mut by_id: HashMap<u64, &Row> = HashMap::new();
    for row in original {
        if let Some(id) = parse_id(cell(row, id_column)) {
            by_id.entry(id).or_insert(row);
        }
    }

    records
        .iter()
        .map(|record| {
            let current = record.to_row();
            let Some(&raw) = by_id.get(&record.id()) else {
                let mut row = current;
                migrate_row(&mut row, R::COLLECTION.columns());
                return row;
            };

            let loaded = R::from_row(raw).to_row();
            let mut row = raw.clone();
            for (column, value) in current {
                if loaded.get(&column) != Some(&value) {
                    row.insert(column, value);
                }
            }
            row
        })
        .collect()
}

/// Highest id present in a collection (0 when empty)
pub fn max_id<R: Record>(records: &[R]) -> u64 {
    records.iter().map(Record::id).max().unwrap_or(0)
}

// =============================================================================
// Cell Parsing
// =============================================================================

/// Read a cell, empty when the column is missing
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map(|s| s.trim()).unwrap_or("")
}

/// Parse a numeric cell. Accepts `1234.56`, `1.234,56` and `R$ 1.234,56`;
/// anything unparseable becomes 0.
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse an id cell. Spreadsheets often hand back `3.0` for `3`.
pub fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u64>() {
        return Some(id);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u64)
}

/// Parse a date cell. Accepts ISO dates (optionally with a time part) and
/// `DD/MM/YYYY`; anything else is treated as missing.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, constants::DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, constants::DISPLAY_DATE_FORMAT) {
        return Some(date);
    }

    // "2024-03-01 00:00:00" or "2024-03-01T10:00:00"
    raw.get(..10)
        .filter(|_| matches!(raw.as_bytes().get(10), Some(b' ') | Some(b'T')))
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, constants::DATE_FORMAT).ok())
}

/// Render an optional date cell
pub fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(constants::DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Render a numeric cell (shortest representation that parses back exactly)
pub fn number_cell(value: f64) -> String {
    value.to_string()
}

/// Lowercase and strip Portuguese accents so labels match loosely
pub fn fold_label(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'Á' | 'À' | 'Â' | 'Ã' => 'a',
            'é' | 'ê' | 'É' | 'Ê' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'ô' | 'õ' | 'Ó' | 'Ô' | 'Õ' => 'o',
            'ú' | 'Ú' => 'u',
            'ç' | 'Ç' => 'c',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
