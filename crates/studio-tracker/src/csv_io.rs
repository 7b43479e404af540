//! CSV import/export of whole collections (migration and backup)

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io;
use std::path::Path;

use crate::schema::{self, Collection, Row, Table};

/// Outcome of reading a CSV into a collection table
#[derive(Debug)]
pub struct Imported {
    pub table: Table,
    /// Cells added by schema backfill
    pub backfilled: usize,
    /// Fully blank lines that were skipped
    pub skipped_blank: usize,
}

/// Read a header-keyed CSV file into a collection table
pub fn load_from_csv(collection: Collection, path: &Path) -> Result<Imported> {
    let rdr = csv::Reader::from_path(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_table(collection, rdr).with_context(|| format!("Failed to import {}", path.display()))
}

fn read_table<R: io::Read>(collection: Collection, mut rdr: csv::Reader<R>) -> Result<Imported> {
    let mut table = Table::new();
    let mut skipped_blank = 0;

    for result in rdr.deserialize() {
        let row: Row = result?;
        if row.values().all(|v| v.trim().is_empty()) {
            skipped_blank += 1;
            continue;
        }
        table.push(row);
    }

    let backfilled = schema::migrate_table(&mut table, collection);
    check_ids(collection, &table)?;

    Ok(Imported { table, backfilled, skipped_blank })
}

/// Every row needs a readable id and no id may repeat
fn check_ids(collection: Collection, table: &Table) -> Result<()> {
    let id_column = collection.id_column();
    let mut seen = HashSet::new();

    for (line, row) in table.iter().enumerate() {
        let raw = schema::cell(row, id_column);
        let id = schema::parse_id(raw)
            .with_context(|| format!("Row {}: invalid {} '{}'", line + 1, id_column, raw))?;
        if !seen.insert(id) {
            anyhow::bail!("Row {}: duplicate {} {}", line + 1, id_column, id);
        }
    }
    Ok(())
}

/// Export a collection to CSV: declared columns first, unknown columns after
pub fn export_to_csv(collection: Collection, table: &[Row], path: &Path) -> Result<()> {
    let wtr = csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_table(collection, table, wtr)
}

fn write_table<W: io::Write>(collection: Collection, table: &[Row], mut wtr: csv::Writer<W>) -> Result<()> {
    let mut headers: Vec<&str> = collection.columns().iter().map(|c| c.name).collect();
    for row in table {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    wtr.write_record(&headers)?;
    for row in table {
        wtr.write_record(headers.iter().map(|h| schema::cell(row, h)))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn test_import_backfills_and_skips_blank_lines() {
        let data = "ID_Despesa,Descricao,Valor\n1,Contador,450\n,,\n2,Licença CAD,\"1.200,00\"\n";

        let imported = read_table(Collection::Expenses, reader(data)).unwrap();

        assert_eq!(imported.table.len(), 2);
        assert_eq!(imported.skipped_blank, 1);
        // 4 missing columns per row
        assert_eq!(imported.backfilled, 8);
        assert_eq!(schema::cell(&imported.table[0], "Status"), "Pendente");
        assert_eq!(schema::cell(&imported.table[1], "Valor"), "1.200,00");
    }

    #[test]
    fn test_import_rejects_duplicate_ids() {
        let data = "ID_Projeto,Cliente\n1,Ana\n1.0,Bruno\n";
        let err = read_table(Collection::Projects, reader(data)).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_import_rejects_missing_id() {
        let data = "ID_Projeto,Cliente\n,Ana\n";
        assert!(read_table(Collection::Projects, reader(data)).is_err());
    }

    #[test]
    fn test_export_keeps_declared_order_and_extra_columns() {
        let mut row = Row::new();
        row.insert("ID_Despesa".to_string(), "3".to_string());
        row.insert("Valor".to_string(), "99.5".to_string());
        row.insert("Observacao".to_string(), "anual".to_string());
        schema::migrate_row(&mut row, schema::EXPENSE_COLUMNS);

        let mut out = Vec::new();
        write_table(Collection::Expenses, &[row], csv::Writer::from_writer(&mut out)).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID_Despesa,Descricao,Categoria,Valor,Vencimento,Status,Data_Pagamento,Observacao")
        );
        assert_eq!(lines.next(), Some("3,,Outros,99.5,,Pendente,,anual"));
    }
}
