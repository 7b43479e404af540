//! Dashboard output (CSV exports and console summary)

use anyhow::Result;
use csv::Writer;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::dashboard::{Dashboard, RevenueBucket};
use crate::format::{format_currency_br, truncate};

/// Write every dashboard CSV into `output_dir`, returns the written paths
pub fn generate_all_reports(output_dir: &Path, dashboard: &Dashboard) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    Ok(vec![
        generate_cash_flow(output_dir, dashboard)?,
        generate_efficiency(output_dir, dashboard)?,
        generate_revenue_breakdown(output_dir, dashboard)?,
    ])
}

/// Generate fluxo_mensal.csv
fn generate_cash_flow(output_dir: &Path, dashboard: &Dashboard) -> Result<PathBuf> {
    let path = output_dir.join(constants::CASH_FLOW_FILENAME);
    let mut wtr = Writer::from_path(&path)?;

    wtr.write_record(["Mes", "Tipo", "Valor"])?;
    for point in &dashboard.cash_flow {
        wtr.write_record([point.month.clone(), point.kind.to_string(), format!("{:.2}", point.total)])?;
    }

    wtr.flush()?;
    Ok(path)
}

/// Generate eficiencia_horas.csv
fn generate_efficiency(output_dir: &Path, dashboard: &Dashboard) -> Result<PathBuf> {
    let path = output_dir.join(constants::EFFICIENCY_FILENAME);
    let mut wtr = Writer::from_path(&path)?;

    wtr.write_record(["ID_Projeto", "Cliente", "Proposta_Aceita_R$", "Horas_Gastas", "Valor_Hora_Real"])?;
    for row in &dashboard.efficiency {
        wtr.write_record([
            row.project_id.to_string(),
            row.client.clone(),
            format!("{:.2}", row.contracted_value),
            format!("{:.1}", row.total_hours),
            format!("{:.2}", row.rate),
        ])?;
    }

    wtr.flush()?;
    Ok(path)
}

/// Generate receita_por_dimensao.csv
fn generate_revenue_breakdown(output_dir: &Path, dashboard: &Dashboard) -> Result<PathBuf> {
    let path = output_dir.join(constants::REVENUE_BREAKDOWN_FILENAME);
    let mut wtr = Writer::from_path(&path)?;

    wtr.write_record(["Dimensao", "Valor_Dimensao", "Receita"])?;
    let sections = [
        ("Origem", &dashboard.by_origin),
        ("Tipo", &dashboard.by_type),
        ("Cidade", &dashboard.by_city),
    ];
    for (dimension, buckets) in sections {
        for bucket in buckets {
            wtr.write_record([dimension.to_string(), bucket_label(bucket), format!("{:.2}", bucket.total)])?;
        }
    }

    wtr.flush()?;
    Ok(path)
}

fn bucket_label(bucket: &RevenueBucket) -> String {
    bucket.label.clone().unwrap_or_else(|| "(não informado)".to_string())
}

/// Normalize -0.0 to 0.0 for cleaner display
fn normalize_zero(val: f64) -> f64 {
    if val == 0.0 { 0.0 } else { val }
}

/// Print the dashboard to the console
pub fn print_dashboard(dashboard: &Dashboard) {
    let s = &dashboard.summary;

    println!("\n============================================================");
    println!("             DASHBOARD FINANCEIRO ({})", dashboard.year);
    println!("============================================================\n");

    println!("CAIXA:");
    for (label, value) in s.composition() {
        if label == "Lucro Líquido" {
            println!("  ─────────────────────────────────────────────");
        }
        println!("  {:<26}{:>18}", format!("{}:", label), format_currency_br(normalize_zero(value)));
    }
    println!("  {:<26}{:>17.1}%", "Margem:", normalize_zero(s.profit_margin));

    println!("\nPREVISÃO:");
    println!("  A Receber:                {:>18}", format_currency_br(s.receivable_pending));
    println!("  A Pagar:                  {:>18}", format_currency_br(s.payable_pending));
    println!("  Previsão Futura:          {:>18}", format_currency_br(s.projected_future));

    println!("\nFLUXO MENSAL:");
    if dashboard.cash_flow.is_empty() {
        println!("  Sem movimentações.");
    }
    for point in &dashboard.cash_flow {
        println!("  {:<8} {:<8} {:>18}", point.month, point.kind.to_string(), format_currency_br(point.total));
    }

    if !dashboard.by_category.is_empty() {
        println!("\nDESPESAS POR CATEGORIA:");
        for (category, total) in &dashboard.by_category {
            println!("  {:<20} {:>18}", category.label(), format_currency_br(*total));
        }
    }

    let breakdowns = [
        ("RECEITA POR ORIGEM", &dashboard.by_origin),
        ("RECEITA POR TIPO", &dashboard.by_type),
        ("RECEITA POR CIDADE", &dashboard.by_city),
    ];
    for (title, buckets) in breakdowns {
        if buckets.is_empty() {
            continue;
        }
        println!("\n{}:", title);
        for bucket in buckets {
            println!("  {:<28} {:>18}", truncate(&bucket_label(bucket), 28), format_currency_br(bucket.total));
        }
    }

    println!("\nEFICIÊNCIA (R$/h, pior primeiro):");
    if dashboard.efficiency.is_empty() {
        println!("  Nenhuma hora registrada nos projetos ainda.");
    }
    for row in &dashboard.efficiency {
        println!(
            "  #{:<4} {:<24} {:>8.1}h {:>14}/h",
            row.project_id,
            truncate(&row.client, 24),
            row.total_hours,
            format_currency_br(row.rate)
        );
    }

    println!("\nPreço médio por m²: {}", format_currency_br(dashboard.price_per_m2));
    println!("============================================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{CashFlowPoint, FinancialSummary, FlowKind, HourlyRate};

    fn dashboard() -> Dashboard {
        Dashboard {
            year: 2024,
            summary: FinancialSummary::default(),
            cash_flow: vec![CashFlowPoint { month: "2024-01".to_string(), kind: FlowKind::Outflow, total: 300.0 }],
            by_origin: vec![RevenueBucket { label: None, total: 120.0 }],
            by_type: Vec::new(),
            by_city: vec![RevenueBucket { label: Some("Curitiba".to_string()), total: 80.5 }],
            by_category: Vec::new(),
            efficiency: vec![HourlyRate {
                project_id: 3,
                client: "Ana".to_string(),
                contracted_value: 1000.0,
                total_hours: 8.0,
                rate: 125.0,
            }],
            price_per_m2: 0.0,
            entries_counted: 1,
        }
    }

    #[test]
    fn test_generate_all_reports_writes_csvs() {
        let dir = std::env::temp_dir().join(format!("studio-tracker-reports-{}", std::process::id()));

        let paths = generate_all_reports(&dir, &dashboard()).unwrap();

        assert_eq!(paths.len(), 3);
        let flow = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(flow, "Mes,Tipo,Valor\n2024-01,Saída,300.00\n");
        let efficiency = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(efficiency.contains("3,Ana,1000.00,8.0,125.00"));
        let breakdown = std::fs::read_to_string(&paths[2]).unwrap();
        assert!(breakdown.contains("Origem,(não informado),120.00"));
        assert!(breakdown.contains("Cidade,Curitiba,80.50"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(normalize_zero(-0.0).to_string(), "0");
        assert_eq!(normalize_zero(-1.5), -1.5);
    }
}
