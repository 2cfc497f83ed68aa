use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobboard::tui::{self, truncate};
use jobboard::view::{SortDirection, SortField, TableView};
use jobboard::{
    Application, ApplicationDraft, ApplicationPatch, ApplicationStore, BoardError, Config,
    DragOutcome, DragReconciler, HttpBackend, ListQuery, MigrateOptions, MigrationMarker, Notifier,
    PatchOutcome, Status,
};

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Track job applications on a kanban board backed by the board API")]
struct Cli {
    /// Base URL of the board API (overrides config and JOBBOARD_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Company name
    #[arg(long)]
    company: Option<String>,

    /// Role name
    #[arg(long)]
    role: Option<String>,

    /// Date of application (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Status (applied, rejected, online-assessment, interview, offer)
    #[arg(short, long)]
    status: Option<Status>,

    /// Job posting URL
    #[arg(long)]
    link: Option<String>,

    /// Resume was tailored for this application
    #[arg(long)]
    tailored: Option<bool>,

    /// Job description text
    #[arg(long)]
    description: Option<String>,

    /// Who referred you
    #[arg(long)]
    referral: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List applications
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<Status>,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Page size (defaults to config page_size)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// List every application in one status column
    Column {
        status: Status,
    },

    /// Show application details
    Show {
        id: String,
    },

    /// Add an application
    Add {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Overwrite an application; unspecified fields keep their current values
    Edit {
        id: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Change only the status of an application
    SetStatus {
        id: String,
        status: Status,
    },

    /// Drop an application onto a target, as on the board: another card's id
    /// or a status spelled exactly (e.g. ONLINE_ASSESSMENT)
    Move {
        id: String,
        target: String,
    },

    /// Delete an application
    Delete {
        id: String,
    },

    /// Show a sortable, searchable table
    Table {
        /// Case-insensitive search over company and role
        #[arg(long, default_value = "")]
        search: String,

        #[arg(long, value_enum, default_value = "date")]
        sort: SortField,

        /// Sort ascending (default is descending)
        #[arg(long)]
        asc: bool,

        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Only this status
        #[arg(short, long)]
        status: Option<Status>,
    },

    /// Interactive kanban board
    Board,

    /// Rewrite status ordinals stored under the old four-status vocabulary
    Migrate {
        /// Report what would change without patching
        #[arg(long)]
        dry_run: bool,

        /// Run even if this backend was already migrated
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "jobboard=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("JOBBOARD_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
        config.validate()?;
    }
    init_tracing(cli.verbose, config.log_json);

    let backend = HttpBackend::from_config(&config)?;
    let (notifier, mut notices) = Notifier::channel();
    let store = ApplicationStore::new(Arc::new(backend))
        .with_notifier(notifier)
        .with_rollback(config.rollback_on_failure);

    match cli.command {
        Commands::List { status, page, limit } => {
            let query = ListQuery {
                status,
                page: Some(page),
                limit: Some(limit.unwrap_or(config.page_size)),
            };
            let listed = store.list(&query).await.context("Failed to fetch applications")?;
            print_rows(&listed.items);
            report_failures(&listed.failures);
        }

        Commands::Column { status } => {
            let listed = store
                .list_by_status(status)
                .await
                .with_context(|| format!("Failed to fetch {} applications", status.label()))?;
            println!("{} ({})", status.label(), listed.items.len());
            print_rows(&listed.items);
            report_failures(&listed.failures);
        }

        Commands::Show { id } => match store.get(&id).await {
            Ok(app) => print_detail(&app),
            Err(BoardError::NotFound { .. }) => println!("Application {} not found.", id),
            Err(e) => return Err(e).context("Failed to fetch application"),
        },

        Commands::Add { fields } => {
            let draft = fields.into_draft()?;
            let app = store.create(draft).await.context("Failed to add application")?;
            println!("Added application {} ({} at {})", app.id, app.role_name, app.company_name);
        }

        Commands::Edit { id, fields } => {
            let current = store.get(&id).await.with_context(|| format!("Failed to load {}", id))?;
            let draft = fields.merge_into(current.into());
            let app = store.replace(&id, draft).await.context("Failed to update application")?;
            println!("Updated application {}", app.id);
            print_detail(&app);
        }

        Commands::SetStatus { id, status } => {
            let app = store
                .patch(&id, ApplicationPatch::status(status))
                .await
                .context("Failed to update status")?;
            println!("{} is now {}", app.id, app.status.label());
        }

        Commands::Move { id, target } => {
            let mut reconciler = DragReconciler::new(store.clone(), config.activation_distance);
            let outcome = match reconciler.move_card(&id, &target).await {
                Ok(outcome) => outcome,
                Err(BoardError::NotFound { .. }) => {
                    println!("Application {} not found.", id);
                    return Ok(());
                }
                Err(e) => return Err(e).context("Failed to move application"),
            };
            match outcome {
                DragOutcome::Cancelled(reason) => println!("Nothing moved: {:?}", reason),
                DragOutcome::Unchanged { status, .. } => {
                    println!("{} is already {}", id, status.label())
                }
                DragOutcome::Dispatched { from, to, handle, .. } => {
                    println!("Moving {} from {} to {}...", id, from.label(), to.label());
                    match handle.await.context("Status update task failed")? {
                        PatchOutcome::Confirmed(app) => println!("{} is now {}", app.id, app.status.label()),
                        PatchOutcome::Stale => println!("Superseded by a newer change."),
                        PatchOutcome::RolledBack(e) | PatchOutcome::Kept(e) => {
                            return Err(e).context("Failed to update status");
                        }
                    }
                }
            }
        }

        Commands::Delete { id } => match store.remove(&id).await {
            Ok(()) => println!("Deleted application {}", id),
            // Already gone is fine from the user's point of view.
            Err(BoardError::NotFound { .. }) => println!("Application {} was already deleted.", id),
            Err(e) => return Err(e).context("Failed to delete application"),
        },

        Commands::Table {
            search,
            sort,
            asc,
            page,
            status,
        } => {
            let listed = match status {
                Some(s) => store.list_by_status(s).await,
                None => {
                    store
                        .list(&ListQuery {
                            limit: Some(config.page_size),
                            ..ListQuery::default()
                        })
                        .await
                }
            }
            .context("Failed to fetch applications")?;

            let view = TableView {
                search,
                sort_field: sort,
                sort_direction: if asc { SortDirection::Asc } else { SortDirection::Desc },
                page,
                per_page: config.page_size as usize,
            };
            let table = view.page_of(&listed.items);
            if table.rows.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<10} {:<24} {:<28} {:<12} {:<18}",
                    "ID",
                    format!("COMPANY{}", header_arrow(&view, SortField::Company)),
                    format!("ROLE{}", header_arrow(&view, SortField::Role)),
                    format!("DATE{}", header_arrow(&view, SortField::Date)),
                    "STATUS"
                );
                println!("{}", "-".repeat(96));
                for app in &table.rows {
                    println!(
                        "{:<10} {:<24} {:<28} {:<12} {:<18}",
                        truncate(&app.id, 10),
                        truncate(&app.company_name, 22),
                        truncate(&app.role_name, 26),
                        app.date_of_application,
                        app.status.label()
                    );
                }
                println!(
                    "\nPage {} of {} ({} applications)",
                    table.page, table.total_pages, table.total_items
                );
            }
            report_failures(&listed.failures);
        }

        Commands::Board => {
            let mut reconciler = DragReconciler::new(store.clone(), config.activation_distance);
            let query = ListQuery {
                limit: Some(config.page_size),
                ..ListQuery::default()
            };
            tokio::task::block_in_place(|| tui::run_board(&mut reconciler, &mut notices, query))?;
        }

        Commands::Migrate { dry_run, force } => {
            let marker = MigrationMarker::for_base_url(&config.base_url)
                .context("Could not determine a data directory for the migration marker")?;
            let report = match store.migrate_legacy(&marker, MigrateOptions { dry_run, force }).await {
                Ok(report) => report,
                Err(e @ BoardError::AlreadyMigrated { .. }) => {
                    return Err(e).context("Refusing to migrate twice; pass --force to run anyway");
                }
                Err(e) => return Err(e).context("Migration failed"),
            };
            for (id, from, to) in &report.migrated {
                println!("  {}: {} -> {}", id, from, to);
            }
            println!("\nExamined:  {}", report.examined);
            println!("Migrated:  {}", report.migrated.len());
            println!("Unchanged: {}", report.unchanged);
            if !report.failed.is_empty() {
                println!("Failed:    {}", report.failed.len());
                report_failures(&report.failed);
            }
            if dry_run {
                println!("\n(Dry run - nothing was patched)");
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

impl FieldArgs {
    fn into_draft(self) -> Result<ApplicationDraft> {
        let company = self.company.context("--company is required")?;
        let role = self.role.context("--role is required")?;
        let date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let base = ApplicationDraft::new(company, role, date, self.status.unwrap_or(Status::Applied));
        Ok(Self {
            company: None,
            role: None,
            date: None,
            status: None,
            ..self
        }
        .merge_into(base))
    }

    fn merge_into(self, mut draft: ApplicationDraft) -> ApplicationDraft {
        if let Some(v) = self.company {
            draft.company_name = v;
        }
        if let Some(v) = self.role {
            draft.role_name = v;
        }
        if let Some(v) = self.date {
            draft.date_of_application = v;
        }
        if let Some(v) = self.status {
            draft.status = v;
        }
        if let Some(v) = self.link {
            draft.job_link = Some(v);
        }
        if let Some(v) = self.tailored {
            draft.tailored = v;
        }
        if let Some(v) = self.description {
            draft.job_description = Some(v);
        }
        if let Some(v) = self.referral {
            draft.referral = Some(v);
        }
        draft
    }
}

fn header_arrow(view: &TableView, field: SortField) -> &'static str {
    if view.sort_field == field {
        view.sort_direction.arrow()
    } else {
        ""
    }
}

fn print_rows(apps: &[Application]) {
    if apps.is_empty() {
        println!("No applications found.");
        return;
    }
    println!(
        "{:<10} {:<18} {:<24} {:<28} {:<12}",
        "ID", "STATUS", "COMPANY", "ROLE", "DATE"
    );
    println!("{}", "-".repeat(96));
    for app in apps {
        println!(
            "{:<10} {:<18} {:<24} {:<28} {:<12}",
            truncate(&app.id, 10),
            app.status.label(),
            truncate(&app.company_name, 22),
            truncate(&app.role_name, 26),
            app.date_of_application
        );
    }
}

fn print_detail(app: &Application) {
    println!("Application {}", app.id);
    println!("Company: {}", app.company_name);
    println!("Role: {}", app.role_name);
    println!("Status: {}", app.status.label());
    println!("Applied: {}", app.date_of_application.format("%b %-d, %Y"));
    println!("Tailored: {}", if app.tailored { "yes" } else { "no" });
    if let Some(link) = &app.job_link {
        println!("Link: {}", link);
    }
    if let Some(referral) = &app.referral {
        println!("Referral: {}", referral);
    }
    if let Some(description) = &app.job_description {
        println!("\n--- Job Description ---\n{}", textwrap::fill(description, 80));
    }
}

fn report_failures(failures: &[jobboard::models::RecordFailure]) {
    for failure in failures {
        eprintln!("warning: skipped application {}: {}", failure.id, failure.error);
    }
}
