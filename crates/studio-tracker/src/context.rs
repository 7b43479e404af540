//! Per-command workbook: all four collections loaded from the store

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::finance::{Expense, Receivable};
use crate::projects::Project;
use crate::schema::{self, Collection, Record, Table};
use crate::store::{Store, StoreError};
use crate::tasks::Task;

/// A collection that could not be read and was treated as empty
#[derive(Debug)]
pub struct LoadFailure {
    pub collection: Collection,
    pub error: StoreError,
}

/// In-memory snapshot of every collection for one command
#[derive(Debug, Default)]
pub struct Workbook {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub receivables: Vec<Receivable>,
    pub expenses: Vec<Expense>,
    pub load_failures: Vec<LoadFailure>,
    /// Rows as read, so a save only rewrites the cells a command changed
    loaded_rows: HashMap<Collection, Table>,
}

impl Workbook {
    /// Load all collections. A collection that fails to load comes back
    /// empty and is listed in `load_failures`.
    pub async fn load(store: &Store) -> Self {
        let mut workbook = Workbook::default();

        workbook.projects = workbook.load_records(store).await;
        workbook.tasks = workbook.load_records(store).await;
        workbook.receivables = workbook.load_records(store).await;
        workbook.expenses = workbook.load_records(store).await;

        tracing::debug!(
            projects = workbook.projects.len(),
            tasks = workbook.tasks.len(),
            receivables = workbook.receivables.len(),
            expenses = workbook.expenses.len(),
            "workbook loaded"
        );
        workbook
    }

    async fn load_records<R: Record>(&mut self, store: &Store) -> Vec<R> {
        let (table, failure) = store.load_or_empty(R::COLLECTION).await;
        if let Some(error) = failure {
            self.load_failures.push(LoadFailure { collection: R::COLLECTION, error });
        }
        let records = schema::records_from_table(&table);
        self.loaded_rows.insert(R::COLLECTION, table);
        records
    }

    /// Write a collection back to the store. Cells outside the typed fields
    /// and unchanged raw cells are kept as they were loaded.
    pub async fn save<R: Record>(&self, store: &Store, records: &[R]) -> Result<()> {
        let original = self.loaded_rows.get(&R::COLLECTION).map(Vec::as_slice).unwrap_or(&[]);
        let table = schema::merge_records(original, records);
        store
            .save(R::COLLECTION, &table)
            .await
            .with_context(|| format!("Failed to save {}", R::COLLECTION))
    }

    pub fn is_degraded(&self) -> bool {
        !self.load_failures.is_empty()
    }

    /// Refuse to write a collection that could not be read, since saving
    /// would overwrite the unreadable rows with an empty table.
    pub fn ensure_writable(&self, collection: Collection) -> Result<()> {
        match self.load_failures.iter().find(|f| f.collection == collection) {
            Some(failure) => anyhow::bail!(
                "{} could not be loaded ({}); refusing to overwrite it",
                collection,
                failure.error
            ),
            None => Ok(()),
        }
    }
}

/// Next id for a collection, never reusing one already handed out
pub async fn next_id<R: Record>(store: &Store, records: &[R]) -> Result<u64> {
    store
        .allocate_id(R::COLLECTION, schema::max_id(records))
        .await
        .with_context(|| format!("Failed to allocate an id in {}", R::COLLECTION))
}
