//! Studio Tracker
//!
//! Projects, timesheets and cash flow for a small architecture and
//! engineering practice. Records live in a local SQLite workbook with one
//! sheet per collection; dashboards and status reports are derived from it.

mod changelog;
mod config;
mod constants;
mod context;
mod csv_io;
mod dashboard;
mod error;
mod finance;
mod format;
mod projects;
mod reconcile;
mod reports;
mod schema;
mod status_report;
mod store;
mod tasks;
mod workload;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, FileConfig};
use context::Workbook;
use finance::{ExpenseCategory, FinanceStatus, NewExpense, NewReceivable};
use format::{format_currency_br, format_date_br, format_hours, format_opt_date, now_local, truncate};
use projects::{NewProject, ProjectStatus, ProjectType, ProjectUpdate};
use schema::Collection;
use status_report::TextRenderer;
use store::Store;
use tasks::{NewTask, Priority, TaskStatus, TaskUpdate};

#[derive(Parser, Debug)]
#[command(name = "studio-tracker")]
#[command(about = "Project, timesheet and cash-flow tracking for an architecture practice")]
struct Args {
    /// Data directory for the record store
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Output directory for dashboard CSVs and status reports
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register and manage projects
    Project {
        #[command(subcommand)]
        action: ProjectCommand,
    },

    /// Tasks, timesheets and deadlines
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },

    /// Receivables (Financeiro)
    Receivable {
        #[command(subcommand)]
        action: ReceivableCommand,
    },

    /// Fixed costs (Despesas)
    Expense {
        #[command(subcommand)]
        action: ExpenseCommand,
    },

    /// Financial dashboard for one year
    Dashboard {
        /// Attribution year (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Write a project status report
    Report {
        /// Project ID
        project_id: u64,
    },

    /// Replace a collection with the rows of a CSV file
    Import {
        /// projects, tasks, receivables or expenses
        collection: Collection,

        /// Path to CSV file
        file: PathBuf,
    },

    /// Export a collection to a CSV file
    Export {
        /// projects, tasks, receivables or expenses
        collection: Collection,

        /// Path to output CSV file
        file: PathBuf,
    },

    /// Show record store statistics
    Stats,
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// List projects
    List {
        /// Only projects with this status (Ativo, Concluído, Suspenso, Cancelado)
        #[arg(long)]
        status: Option<ProjectStatus>,
    },

    /// Show one project with its change log
    Show {
        /// Project ID
        id: u64,
    },

    /// Register a new project
    Add {
        /// Client name
        #[arg(long)]
        client: String,

        /// Lead source (e.g., Indicação, Instagram)
        #[arg(long, default_value = "")]
        origin: String,

        /// Residencial Unifamiliar, Residencial Multifamiliar, Comercial, Reforma, Industrial
        #[arg(long = "type")]
        project_type: Option<ProjectType>,

        /// Built area in m²
        #[arg(long, default_value_t = 0.0)]
        area: f64,

        /// Accepted proposal value in R$
        #[arg(long, default_value_t = 0.0)]
        value: f64,

        /// Contracted services, comma separated
        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,

        /// City
        #[arg(long, default_value = "")]
        city: String,

        /// Link to the proposal document
        #[arg(long, default_value = "")]
        proposal_link: String,

        /// Link to the project folder
        #[arg(long, default_value = "")]
        documents_link: String,
    },

    /// Edit a project; every change is appended to its log
    Update {
        /// Project ID
        id: u64,

        #[arg(long)]
        status: Option<ProjectStatus>,

        #[arg(long)]
        origin: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        area: Option<f64>,

        #[arg(long)]
        value: Option<f64>,

        #[arg(long)]
        proposal_link: Option<String>,

        #[arg(long)]
        documents_link: Option<String>,

        /// Free-text note for the change log
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// List tasks
    List {
        /// Only tasks of this project
        #[arg(long)]
        project: Option<u64>,

        /// Only tasks of this person
        #[arg(long)]
        responsible: Option<String>,

        /// Hide completed tasks
        #[arg(long)]
        open: bool,
    },

    /// Create a task
    Add {
        /// Project ID
        #[arg(long)]
        project: u64,

        #[arg(long)]
        description: String,

        #[arg(long)]
        responsible: String,

        /// Project phase (e.g., Estudo Preliminar, Executivo)
        #[arg(long, default_value = "")]
        phase: String,

        /// Discipline (e.g., Arquitetura, Estrutural)
        #[arg(long, default_value = "")]
        discipline: String,

        /// Start date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,

        /// Due date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long, value_parser = parse_date_arg)]
        due: Option<NaiveDate>,

        /// Alta, Média or Baixa
        #[arg(long, default_value = "Média")]
        priority: Priority,
    },

    /// Change a task and/or log hours
    Update {
        /// Task ID
        id: u64,

        /// A Fazer, Em Andamento, Revisão, Concluído
        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        responsible: Option<String>,

        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date_arg)]
        due: Option<NaiveDate>,

        /// Hours worked to add to the timesheet
        #[arg(long)]
        hours: Option<f64>,
    },

    /// Overdue and urgent tasks
    Alerts,

    /// Open tasks per person
    Workload,

    /// Timeline bars (missing start dates are estimated)
    Timeline {
        /// Only tasks of this project
        #[arg(long)]
        project: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum ReceivableCommand {
    /// List receivables
    List {
        /// Only entries attributed to this year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Bill a new receivable
    Add {
        /// Project ID
        #[arg(long)]
        project: u64,

        #[arg(long, default_value = "")]
        description: String,

        /// Amount in R$
        #[arg(long)]
        value: f64,

        /// Due date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long, value_parser = parse_date_arg)]
        due: NaiveDate,
    },

    /// Mark a receivable paid (captures the tax)
    Pay {
        /// Entry ID
        id: u64,

        /// Payment date (default: today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Undo a payment
    Reopen {
        /// Entry ID
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    /// List expenses
    List {
        /// Only entries attributed to this year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Record a new expense
    Add {
        #[arg(long)]
        description: String,

        /// Contabilidade, Software/Licenças, Pró-labore, Marketing, Taxas, Outros
        #[arg(long, default_value = "Outros")]
        category: ExpenseCategory,

        /// Amount in R$
        #[arg(long)]
        value: f64,

        /// Due date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long, value_parser = parse_date_arg)]
        due: NaiveDate,
    },

    /// Mark an expense paid
    Pay {
        /// Expense ID
        id: u64,

        /// Payment date (default: today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Undo a payment
    Reopen {
        /// Expense ID
        id: u64,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    schema::parse_date(s).ok_or_else(|| format!("Invalid date '{}'. Use YYYY-MM-DD or DD/MM/YYYY", s))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("studio_tracker=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "studio_tracker=info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let file_config = FileConfig::load_or_default(Path::new(constants::CONFIG_FILENAME))?;
    let config = Config::from_file(&file_config)?;

    // Open record store (in data directory)
    let store_path = args.data_dir.join(constants::STORE_FILENAME);
    let store = Store::open(&store_path)
        .await
        .with_context(|| format!("Failed to open record store at {}", store_path.display()))?;

    let app = App {
        store: &store,
        config: &config,
        output_dir: &args.output_dir,
    };
    handle_command(args.command, &app).await
}

/// Everything a command handler needs
struct App<'a> {
    store: &'a Store,
    config: &'a Config,
    output_dir: &'a Path,
}

impl App<'_> {
    /// Load the workbook, warning about collections that could not be read
    async fn workbook(&self) -> Workbook {
        let workbook = Workbook::load(self.store).await;
        for failure in &workbook.load_failures {
            eprintln!(
                "Warning: {} could not be loaded and is shown as empty ({})",
                failure.collection, failure.error
            );
        }
        workbook
    }

    fn today(&self) -> NaiveDate {
        now_local(self.config.timezone).date_naive()
    }
}

async fn handle_command(command: Command, app: &App<'_>) -> Result<()> {
    match command {
        Command::Project { action } => handle_project_command(action, app).await,
        Command::Task { action } => handle_task_command(action, app).await,
        Command::Receivable { action } => handle_receivable_command(action, app).await,
        Command::Expense { action } => handle_expense_command(action, app).await,
        Command::Dashboard { year } => run_dashboard(year, app).await,
        Command::Report { project_id } => run_status_report(project_id, app).await,
        Command::Import { collection, file } => {
            let imported = csv_io::load_from_csv(collection, &file)?;
            app.store
                .save(collection, &imported.table)
                .await
                .with_context(|| format!("Failed to save {}", collection))?;
            println!(
                "Imported {} rows into {} from {} ({} cells backfilled, {} blank lines skipped)",
                imported.table.len(),
                collection,
                file.display(),
                imported.backfilled,
                imported.skipped_blank
            );
            Ok(())
        }
        Command::Export { collection, file } => {
            let table = app
                .store
                .load(collection)
                .await
                .with_context(|| format!("Failed to load {}", collection))?;
            csv_io::export_to_csv(collection, &table, &file)?;
            println!("Exported {} rows of {} to {}", table.len(), collection, file.display());
            Ok(())
        }
        Command::Stats => {
            let stats = app.store.stats().await?;
            println!("Record store: {}", stats);
            Ok(())
        }
    }
}

// =============================================================================
// Projects
// =============================================================================

async fn handle_project_command(action: ProjectCommand, app: &App<'_>) -> Result<()> {
    match action {
        ProjectCommand::List { status } => {
            let workbook = app.workbook().await;
            let listed: Vec<_> = workbook
                .projects
                .iter()
                .filter(|p| status.is_none_or(|s| p.status == s))
                .collect();

            if listed.is_empty() {
                println!("No projects recorded.");
                println!("\nUse 'studio-tracker project add' to register one");
                return Ok(());
            }

            println!(
                "{:<4} {:<24} {:<14} {:<24} {:>16}  Status",
                "ID", "Client", "City", "Type", "Value"
            );
            println!("{}", "-".repeat(100));
            let mut total = 0.0;
            for project in &listed {
                println!(
                    "{:<4} {:<24} {:<14} {:<24} {:>16}  {}",
                    project.project_id,
                    truncate(&project.client, 23),
                    truncate(&project.city, 13),
                    project.project_type.map(|t| t.label()).unwrap_or("-"),
                    format_currency_br(project.contracted_value),
                    project.status.label(),
                );
                total += project.contracted_value;
            }
            println!("{}", "-".repeat(100));
            println!("{:>68} {:>16}", "Total:", format_currency_br(total));
            println!("\n{} project(s)", listed.len());
            Ok(())
        }

        ProjectCommand::Show { id } => {
            let workbook = app.workbook().await;
            let project = projects::find(&workbook.projects, id).with_context(|| format!("Project #{} not found", id))?;

            println!("Project #{}: {}", project.project_id, project.client);
            println!("  Status:     {}", project.status.label());
            println!("  Type:       {}", project.project_type.map(|t| t.label()).unwrap_or("-"));
            println!("  Origin:     {}", project.origin);
            println!("  City:       {}", project.city);
            println!("  Area:       {} m²", project.area_m2);
            println!("  Value:      {}", format_currency_br(project.contracted_value));
            println!("  Services:   {}", project.services.join(", "));
            println!("  Registered: {}", format_opt_date(project.registration_date));
            if !project.proposal_link.is_empty() {
                println!("  Proposal:   {}", project.proposal_link);
            }
            if !project.documents_link.is_empty() {
                println!("  Documents:  {}", project.documents_link);
            }

            let project_tasks = tasks::for_project(&workbook.tasks, id);
            let hours: f64 = project_tasks.iter().map(|t| t.hours_spent).sum();
            println!("  Tasks:      {} ({} logged)", project_tasks.len(), format_hours(hours));

            println!("\nHistory:");
            for line in project.change_log.lines() {
                println!("  {}", line);
            }
            Ok(())
        }

        ProjectCommand::Add {
            client,
            origin,
            project_type,
            area,
            value,
            services,
            city,
            proposal_link,
            documents_link,
        } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Projects)?;

            let id = context::next_id(app.store, &workbook.projects).await?;
            let input = NewProject {
                client,
                origin,
                project_type,
                area_m2: area,
                contracted_value: value,
                services,
                city,
                proposal_link,
                documents_link,
            };
            let project = projects::register(&mut workbook.projects, id, input, now_local(app.config.timezone))?;
            let summary = format!("{} - {}", project.client, format_currency_br(project.contracted_value));

            workbook.save(app.store, &workbook.projects).await?;
            println!("Added project #{}: {}", id, summary);
            Ok(())
        }

        ProjectCommand::Update {
            id,
            status,
            origin,
            city,
            area,
            value,
            proposal_link,
            documents_link,
            note,
        } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Projects)?;

            let update = ProjectUpdate {
                status,
                origin,
                city,
                area_m2: area,
                contracted_value: value,
                proposal_link,
                documents_link,
                note,
            };
            let changes = projects::apply_update(&mut workbook.projects, id, update, now_local(app.config.timezone))?;

            if changes == 0 {
                println!("Project #{} unchanged", id);
                return Ok(());
            }
            workbook.save(app.store, &workbook.projects).await?;
            println!("Updated project #{} ({} change(s))", id, changes);
            Ok(())
        }
    }
}

// =============================================================================
// Tasks
// =============================================================================

async fn handle_task_command(action: TaskCommand, app: &App<'_>) -> Result<()> {
    match action {
        TaskCommand::List {
            project,
            responsible,
            open,
        } => {
            let workbook = app.workbook().await;
            let listed: Vec<_> = workbook
                .tasks
                .iter()
                .filter(|t| project.is_none_or(|p| t.project_id == p))
                .filter(|t| {
                    responsible
                        .as_deref()
                        .is_none_or(|r| t.responsible.eq_ignore_ascii_case(r))
                })
                .filter(|t| !open || !t.status.is_done())
                .collect();

            if listed.is_empty() {
                println!("No tasks found.");
                return Ok(());
            }

            println!(
                "{:<4} {:<5} {:<28} {:<10} {:<11} {:<6} {:<13} {:>7}",
                "ID", "Proj", "Description", "Who", "Due", "Prio", "Status", "Hours"
            );
            println!("{}", "-".repeat(92));
            let mut total_hours = 0.0;
            for task in &listed {
                println!(
                    "{:<4} {:<5} {:<28} {:<10} {:<11} {:<6} {:<13} {:>7}",
                    task.task_id,
                    task.project_id,
                    truncate(&task.description, 27),
                    truncate(&task.responsible, 9),
                    format_opt_date(task.due_date),
                    task.priority.label(),
                    task.status.label(),
                    format_hours(task.hours_spent),
                );
                total_hours += task.hours_spent;
            }
            println!("{}", "-".repeat(92));
            println!("{:>84} {:>7}", "Total:", format_hours(total_hours));
            println!("\n{} task(s)", listed.len());
            Ok(())
        }

        TaskCommand::Add {
            project,
            description,
            responsible,
            phase,
            discipline,
            start,
            due,
            priority,
        } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Tasks)?;

            let id = context::next_id(app.store, &workbook.tasks).await?;
            let input = NewTask {
                project_id: project,
                phase,
                discipline,
                description,
                responsible,
                start_date: start,
                due_date: due,
                priority,
            };
            let now = now_local(app.config.timezone);
            let task = tasks::create(&mut workbook.tasks, &workbook.projects, app.config, id, input, now)?;
            let summary = format!("{} ({}, due {})", task.description, task.responsible, format_opt_date(task.due_date));

            workbook.save(app.store, &workbook.tasks).await?;
            println!("Added task #{} to project #{}: {}", id, project, summary);
            Ok(())
        }

        TaskCommand::Update {
            id,
            status,
            priority,
            responsible,
            start,
            due,
            hours,
        } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Tasks)?;

            let update = TaskUpdate {
                status,
                priority,
                responsible,
                start_date: start,
                due_date: due,
                add_hours: hours,
            };
            let now = now_local(app.config.timezone);
            let changes = tasks::apply_update(&mut workbook.tasks, app.config, id, update, now)?;

            if changes == 0 {
                println!("Task #{} unchanged", id);
                return Ok(());
            }
            workbook.save(app.store, &workbook.tasks).await?;

            if let Some(task) = tasks::find(&workbook.tasks, id) {
                println!(
                    "Updated task #{}: {} - {} logged",
                    id,
                    task.status.label(),
                    format_hours(task.hours_spent)
                );
            }
            Ok(())
        }

        TaskCommand::Alerts => {
            let workbook = app.workbook().await;
            let today = app.today();
            let alerts = workload::alerts(&workbook.tasks, today, app.config.urgent_window_days);

            if alerts.is_empty() {
                println!("No overdue or urgent tasks as of {}.", format_date_br(today));
                return Ok(());
            }

            println!("{:<10} {:<4} {:<28} {:<10} {:<11} {:>6}", "Alert", "ID", "Description", "Who", "Due", "Days");
            println!("{}", "-".repeat(74));
            for alert in &alerts {
                println!(
                    "{:<10} {:<4} {:<28} {:<10} {:<11} {:>6}",
                    alert.deadline.to_string(),
                    alert.task.task_id,
                    truncate(&alert.task.description, 27),
                    truncate(&alert.task.responsible, 9),
                    format_opt_date(alert.task.due_date),
                    alert.days_left,
                );
            }
            Ok(())
        }

        TaskCommand::Workload => {
            let workbook = app.workbook().await;
            let workload = workload::workload_by_responsible(&workbook.tasks);

            if workload.is_empty() {
                println!("No open tasks.");
                return Ok(());
            }
            for (responsible, count) in &workload {
                println!("  {:<16} {:>3}  {}", responsible, count, "#".repeat(*count));
            }
            Ok(())
        }

        TaskCommand::Timeline { project } => {
            let workbook = app.workbook().await;
            let selected: Vec<_> = workbook
                .tasks
                .iter()
                .filter(|t| project.is_none_or(|p| t.project_id == p))
                .cloned()
                .collect();
            let bars = workload::timeline_bars(&selected, app.config.timeline_offset_days);

            if bars.is_empty() {
                println!("No tasks with a due date.");
                return Ok(());
            }

            println!("{:<4} {:<5} {:<28} {:<10} {:<12} {:<11}", "ID", "Proj", "Description", "Who", "Start", "End");
            println!("{}", "-".repeat(74));
            for bar in &bars {
                let start = format_date_br(bar.start);
                println!(
                    "{:<4} {:<5} {:<28} {:<10} {:<12} {:<11}",
                    bar.task_id,
                    bar.project_id,
                    truncate(&bar.description, 27),
                    truncate(&bar.responsible, 9),
                    if bar.synthesized_start { format!("{}*", start) } else { start },
                    format_date_br(bar.end),
                );
            }
            if bars.iter().any(|b| b.synthesized_start) {
                println!(
                    "\n* estimated as {} day(s) before the due date",
                    app.config.timeline_offset_days
                );
            }
            Ok(())
        }
    }
}

// =============================================================================
// Finance
// =============================================================================

async fn handle_receivable_command(action: ReceivableCommand, app: &App<'_>) -> Result<()> {
    match action {
        ReceivableCommand::List { year } => {
            let workbook = app.workbook().await;
            let listed: Vec<&finance::Receivable> = match year {
                Some(year) => reconcile::in_year(&workbook.receivables, year)
                    .into_iter()
                    .map(|d| d.entry)
                    .collect(),
                None => workbook.receivables.iter().collect(),
            };

            if listed.is_empty() {
                println!("No receivables recorded.");
                return Ok(());
            }

            println!(
                "{:<4} {:<5} {:<26} {:>16} {:<11} {:<9} {:<11} {:>14}",
                "ID", "Proj", "Description", "Value", "Due", "Status", "Paid", "Tax"
            );
            println!("{}", "-".repeat(102));
            for r in &listed {
                println!(
                    "{:<4} {:<5} {:<26} {:>16} {:<11} {:<9} {:<11} {:>14}",
                    r.lancamento_id,
                    r.project_id,
                    truncate(&r.description, 25),
                    format_currency_br(r.value),
                    format_opt_date(r.due_date),
                    r.status.label(),
                    format_opt_date(r.payment_date),
                    format_currency_br(r.tax_value),
                );
            }
            let pending: f64 = listed
                .iter()
                .filter(|r| r.status == FinanceStatus::Pending)
                .map(|r| r.value)
                .sum();
            println!("{}", "-".repeat(102));
            println!("\n{} receivable(s), {} pending", listed.len(), format_currency_br(pending));
            Ok(())
        }

        ReceivableCommand::Add {
            project,
            description,
            value,
            due,
        } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Receivables)?;

            let id = context::next_id(app.store, &workbook.receivables).await?;
            let input = NewReceivable {
                project_id: project,
                description,
                value,
                due_date: due,
            };
            finance::add_receivable(&mut workbook.receivables, &workbook.projects, id, input)?;

            workbook.save(app.store, &workbook.receivables).await?;
            println!(
                "Added receivable #{} for project #{}: {} due {}",
                id,
                project,
                format_currency_br(value),
                format_date_br(due)
            );
            Ok(())
        }

        ReceivableCommand::Pay { id, date } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Receivables)?;

            let paid_on = date.unwrap_or_else(|| app.today());
            let receivable =
                finance::mark_receivable_paid(&mut workbook.receivables, id, paid_on, app.config.tax_rate)?;
            let summary = format!(
                "{} (tax {})",
                format_currency_br(receivable.value),
                format_currency_br(receivable.tax_value)
            );

            workbook.save(app.store, &workbook.receivables).await?;
            println!("Receivable #{} paid on {}: {}", id, format_date_br(paid_on), summary);
            Ok(())
        }

        ReceivableCommand::Reopen { id } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Receivables)?;

            finance::reopen_receivable(&mut workbook.receivables, id)?;
            workbook.save(app.store, &workbook.receivables).await?;
            println!("Receivable #{} is pending again", id);
            Ok(())
        }
    }
}

async fn handle_expense_command(action: ExpenseCommand, app: &App<'_>) -> Result<()> {
    match action {
        ExpenseCommand::List { year } => {
            let workbook = app.workbook().await;
            let listed: Vec<&finance::Expense> = match year {
                Some(year) => reconcile::in_year(&workbook.expenses, year)
                    .into_iter()
                    .map(|d| d.entry)
                    .collect(),
                None => workbook.expenses.iter().collect(),
            };

            if listed.is_empty() {
                println!("No expenses recorded.");
                println!("\nUse 'studio-tracker expense add' to add expenses");
                println!("Or 'studio-tracker import expenses <file.csv>' to import from CSV");
                return Ok(());
            }

            println!(
                "{:<4} {:<26} {:<18} {:>16} {:<11} {:<9} {:<11}",
                "ID", "Description", "Category", "Value", "Due", "Status", "Paid"
            );
            println!("{}", "-".repeat(100));
            let mut total = 0.0;
            for e in &listed {
                println!(
                    "{:<4} {:<26} {:<18} {:>16} {:<11} {:<9} {:<11}",
                    e.expense_id,
                    truncate(&e.description, 25),
                    e.category.label(),
                    format_currency_br(e.value),
                    format_opt_date(e.due_date),
                    e.status.label(),
                    format_opt_date(e.payment_date),
                );
                total += e.value;
            }
            println!("{}", "-".repeat(100));
            println!("{:>49} {:>16}", "Total:", format_currency_br(total));
            println!("\n{} expense(s)", listed.len());
            Ok(())
        }

        ExpenseCommand::Add {
            description,
            category,
            value,
            due,
        } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Expenses)?;

            let id = context::next_id(app.store, &workbook.expenses).await?;
            let input = NewExpense {
                description,
                category,
                value,
                due_date: due,
            };
            let expense = finance::add_expense(&mut workbook.expenses, id, input)?;
            let summary = format!("{} - {}", expense.description, format_currency_br(expense.value));

            workbook.save(app.store, &workbook.expenses).await?;
            println!("Added expense #{}: {}", id, summary);
            Ok(())
        }

        ExpenseCommand::Pay { id, date } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Expenses)?;

            let paid_on = date.unwrap_or_else(|| app.today());
            finance::mark_expense_paid(&mut workbook.expenses, id, paid_on)?;
            workbook.save(app.store, &workbook.expenses).await?;
            println!("Expense #{} paid on {}", id, format_date_br(paid_on));
            Ok(())
        }

        ExpenseCommand::Reopen { id } => {
            let mut workbook = app.workbook().await;
            workbook.ensure_writable(Collection::Expenses)?;

            finance::reopen_expense(&mut workbook.expenses, id)?;
            workbook.save(app.store, &workbook.expenses).await?;
            println!("Expense #{} is pending again", id);
            Ok(())
        }
    }
}

// =============================================================================
// Dashboard and Reports
// =============================================================================

async fn run_dashboard(year: Option<i32>, app: &App<'_>) -> Result<()> {
    let workbook = app.workbook().await;
    let year = year.unwrap_or_else(|| app.today().year());

    let dashboard = dashboard::build(
        year,
        &workbook.projects,
        &workbook.tasks,
        &workbook.receivables,
        &workbook.expenses,
    );

    if dashboard.entries_counted == 0 {
        println!("No financial entries attributed to {}.", year);
    }
    reports::print_dashboard(&dashboard);

    println!("\nWriting dashboard CSVs...");
    for path in reports::generate_all_reports(app.output_dir, &dashboard)? {
        println!("  Generated: {}", path.display());
    }
    if workbook.is_degraded() {
        println!("\nSome collections could not be loaded; figures above are incomplete.");
    }
    Ok(())
}

async fn run_status_report(project_id: u64, app: &App<'_>) -> Result<()> {
    let workbook = app.workbook().await;
    let project = projects::find(&workbook.projects, project_id)
        .with_context(|| format!("Project #{} not found", project_id))?;
    let project_tasks = tasks::for_project(&workbook.tasks, project_id);

    let report = status_report::build(project, &project_tasks);
    let path = status_report::write_report(
        &TextRenderer,
        &report,
        app.output_dir,
        now_local(app.config.timezone),
    )?;

    println!(
        "Status report for #{} ({}): {:.0}% complete, {} task(s)",
        project_id,
        report.header.client,
        report.completion_percentage,
        report.lines.len()
    );
    println!("  Generated: {}", path.display());
    Ok(())
}
