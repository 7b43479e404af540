//! SQLite-backed record store
//!
//! Emulates the practice's spreadsheet: every collection is a sheet that is
//! read whole and overwritten whole. Rows are kept as JSON objects of column
//! header -> cell text, so rows written by older versions keep whatever
//! columns they had and are backfilled on load.
//!
//! Reads go through an in-process cache that is dropped for a collection on
//! every write to it.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::schema::{self, Collection, Row, Table};

/// Store failures, kept distinct from "collection is empty"
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row {position} in {collection}: {source}")]
    CorruptRow {
        collection: Collection,
        position: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode row for {collection}: {source}")]
    Encode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
}

/// Record store wrapper
pub struct Store {
    pool: SqlitePool,
    cache: Mutex<HashMap<Collection, Table>>,
}

/// Row type for sheet rows query
#[derive(FromRow)]
struct SheetRow {
    position: i64,
    data: String,
}

impl Store {
    /// Open or create the store database
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_millis(5000));

        let pool = SqlitePool::connect_with(options).await?;
        tracing::debug!(path = %path.display(), "opened record store");

        Self::with_pool(pool).await
    }

    /// Open a throwaway in-memory store (single connection so every query sees the same database)
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            cache: Mutex::new(HashMap::new()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "
            -- One row per sheet row, cells as a JSON object
            CREATE TABLE IF NOT EXISTS sheet_rows (
                collection TEXT NOT NULL,
                position INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, position)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "
            -- Monotonic id counters per collection
            CREATE TABLE IF NOT EXISTS sequences (
                collection TEXT PRIMARY KEY,
                last_id INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Load a whole collection, backfilling columns added since it was written
    pub async fn load(&self, collection: Collection) -> Result<Table, StoreError> {
        if let Some(table) = self.cached(collection) {
            return Ok(table);
        }

        let rows: Vec<SheetRow> = sqlx::query_as(
            "SELECT position, data FROM sheet_rows WHERE collection = ? ORDER BY position",
        )
        .bind(collection.sheet_name())
        .fetch_all(&self.pool)
        .await?;

        let mut table = rows
            .into_iter()
            .map(|r| {
                serde_json::from_str::<Row>(&r.data).map_err(|source| StoreError::CorruptRow {
                    collection,
                    position: r.position,
                    source,
                })
            })
            .collect::<Result<Table, _>>()?;

        let backfilled = schema::migrate_table(&mut table, collection);
        tracing::debug!(%collection, rows = table.len(), backfilled, "loaded collection");

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(collection, table.clone());
        }

        Ok(table)
    }

    /// Load a collection, degrading to an empty table when the store fails
    pub async fn load_or_empty(&self, collection: Collection) -> (Table, Option<StoreError>) {
        match self.load(collection).await {
            Ok(table) => (table, None),
            Err(e) => {
                tracing::warn!(%collection, error = %e, "load failed, continuing with an empty collection");
                (Vec::new(), Some(e))
            }
        }
    }

    /// Overwrite a whole collection (in a transaction so a failed write leaves the old sheet)
    pub async fn save(&self, collection: Collection, table: &Table) -> Result<(), StoreError> {
        self.invalidate(collection);

        let encoded = table
            .iter()
            .map(|row| {
                serde_json::to_string(row).map_err(|source| StoreError::Encode { collection, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sheet_rows WHERE collection = ?")
            .bind(collection.sheet_name())
            .execute(&mut *tx)
            .await?;

        for (position, data) in encoded.iter().enumerate() {
            sqlx::query("INSERT INTO sheet_rows (collection, position, data) VALUES (?, ?, ?)")
                .bind(collection.sheet_name())
                .bind(position as i64)
                .bind(data)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(%collection, rows = table.len(), "saved collection");

        Ok(())
    }

    fn cached(&self, collection: Collection) -> Option<Table> {
        self.cache.lock().ok()?.get(&collection).cloned()
    }

    fn invalidate(&self, collection: Collection) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(&collection);
        }
    }

    // =========================================================================
    // Id Allocation
    // =========================================================================

    /// Allocate the next id for a collection.
    ///
    /// The counter never goes backwards and never hands out an id at or below
    /// `highest_existing`, so ids stay unique even for sheets edited by hand.
    pub async fn allocate_id(&self, collection: Collection, highest_existing: u64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let last: Option<(i64,)> = sqlx::query_as("SELECT last_id FROM sequences WHERE collection = ?")
            .bind(collection.sheet_name())
            .fetch_optional(&mut *tx)
            .await?;

        let last = last.map(|(v,)| v.max(0) as u64).unwrap_or(0);
        let next = last.max(highest_existing) + 1;

        sqlx::query("INSERT OR REPLACE INTO sequences (collection, last_id) VALUES (?, ?)")
            .bind(collection.sheet_name())
            .bind(next as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(next)
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Get store statistics
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let mut counts = HashMap::new();
        for collection in Collection::ALL {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sheet_rows WHERE collection = ?")
                .bind(collection.sheet_name())
                .fetch_one(&self.pool)
                .await?;
            counts.insert(collection, count as u64);
        }

        let count = |c: Collection| counts.get(&c).copied().unwrap_or(0);
        Ok(StoreStats {
            projects: count(Collection::Projects),
            tasks: count(Collection::Tasks),
            receivables: count(Collection::Receivables),
            expenses: count(Collection::Expenses),
        })
    }
}

/// Store statistics
#[derive(Debug)]
pub struct StoreStats {
    pub projects: u64,
    pub tasks: u64,
    pub receivables: u64,
    pub expenses: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} projects, {} tasks, {} receivables, {} expenses",
            self.projects, self.tasks, self.receivables, self.expenses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> Row {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_expense_row(id: &str, value: &str) -> Row {
        let mut r = row(&[
            ("ID_Despesa", id),
            ("Descricao", "Contador"),
            ("Categoria", "Contabilidade"),
            ("Valor", value),
            ("Vencimento", "2024-02-05"),
            ("Status", "Pendente"),
            ("Data_Pagamento", ""),
        ]);
        r.insert("Observacao".to_string(), "planilha antiga".to_string());
        r
    }

    #[tokio::test]
    async fn test_missing_collection_loads_empty() {
        let store = Store::open_in_memory().await.unwrap();
        let table = store.load(Collection::Projects).await.unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload_reproduces_rows() {
        let store = Store::open_in_memory().await.unwrap();
        let table = vec![full_expense_row("1", "350.5"), full_expense_row("2", "1200")];

        store.save(Collection::Expenses, &table).await.unwrap();
        let reloaded = store.load(Collection::Expenses).await.unwrap();

        assert_eq!(reloaded, table);
    }

    #[tokio::test]
    async fn test_load_backfills_old_rows() {
        let store = Store::open_in_memory().await.unwrap();
        let old = vec![row(&[
            ("ID_Lancamento", "1"),
            ("ID_Projeto", "1"),
            ("Valor", "1000"),
            ("Status", "Pago"),
        ])];
        store.save(Collection::Receivables, &old).await.unwrap();

        let loaded = store.load(Collection::Receivables).await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0]["Valor_Imposto"], "0");
        assert_eq!(loaded[0]["Valor"], "1000");
        assert_eq!(loaded[0]["Status"], "Pago");
    }

    #[tokio::test]
    async fn test_save_invalidates_cache() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .save(Collection::Expenses, &vec![full_expense_row("1", "10")])
            .await
            .unwrap();
        assert_eq!(store.load(Collection::Expenses).await.unwrap().len(), 1);

        store
            .save(
                Collection::Expenses,
                &vec![full_expense_row("1", "10"), full_expense_row("2", "20")],
            )
            .await
            .unwrap();

        assert_eq!(store.load(Collection::Expenses).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .save(Collection::Expenses, &vec![full_expense_row("1", "10")])
            .await
            .unwrap();

        assert!(store.load(Collection::Tasks).await.unwrap().is_empty());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.expenses, 1);
        assert_eq!(stats.tasks, 0);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_an_error_not_empty() {
        let store = Store::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO sheet_rows (collection, position, data) VALUES ('Tarefas', 0, 'not json')")
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(matches!(
            store.load(Collection::Tasks).await,
            Err(StoreError::CorruptRow { position: 0, .. })
        ));

        let (table, failure) = store.load_or_empty(Collection::Tasks).await;
        assert!(table.is_empty());
        assert!(failure.is_some());
    }

    #[tokio::test]
    async fn test_allocate_id_is_monotonic() {
        let store = Store::open_in_memory().await.unwrap();

        assert_eq!(store.allocate_id(Collection::Projects, 0).await.unwrap(), 1);
        assert_eq!(store.allocate_id(Collection::Projects, 0).await.unwrap(), 2);
        // Hand-edited sheet already holds id 10
        assert_eq!(store.allocate_id(Collection::Projects, 10).await.unwrap(), 11);
        // Rows removed by hand do not make ids go backwards
        assert_eq!(store.allocate_id(Collection::Projects, 3).await.unwrap(), 12);
        // Counters are per collection
        assert_eq!(store.allocate_id(Collection::Tasks, 0).await.unwrap(), 1);
    }
}
