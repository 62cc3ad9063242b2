use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use folio_printer::PageMode;
use folio_store::live::queries;
use folio_store::printing::DocumentSink;
use folio_store::quotes::format_money;
use folio_store::quotes::templates::{search_templates, template_categories};
use folio_store::services::backup_file_name;
use folio_store::{AppError, AppResult, AppState, Config};
use shared::models::{Quote, QuoteStatus};
use shared::util::display_date;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "folio", version, about = "Local-first quotes and invoices")]
struct Cli {
    /// Work directory (database, logs, exports)
    #[arg(long, env = "FOLIO_WORK_DIR", global = true)]
    work_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the business profile
    Profile,
    /// List catalog items
    Catalog,
    /// Browse service templates
    Templates {
        /// Filter by name or category
        term: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Quote history
    #[command(subcommand)]
    Quotes(QuotesCommand),
    /// Paid revenue per month
    Revenue {
        #[arg(long, default_value_t = 6)]
        months: u32,
    },
    /// Render a quote to PDF in the export directory
    ExportPdf {
        id: String,
        /// One bitmap per page instead of vector text
        #[arg(long)]
        raster: bool,
    },
    /// Backup import and export
    #[command(subcommand)]
    Backup(BackupCommand),
}

#[derive(Subcommand)]
enum QuotesCommand {
    /// List quotes, newest first
    List {
        /// Match client, folio or date
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<QuoteStatus>,
    },
    /// Pending quotes older than a week
    Stale,
    /// Set the payment status of a quote
    Status { id: String, status: QuoteStatus },
    /// Copy a quote under the next folio
    Duplicate { id: String },
    Delete { id: String },
    /// Print the list again whenever it changes (Ctrl-C to stop)
    Watch {
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Write a backup file (default: export directory)
    Export { path: Option<PathBuf> },
    /// Replace all data with a backup file
    Import { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(work_dir) = cli.work_dir.clone() {
        config.work_dir = work_dir;
    }

    let log_dir = config.log_dir();
    if let Err(e) = folio_store::init_logger_with_file(&config.log_level, config.log_json, log_dir.to_str()) {
        eprintln!("logging disabled: {e}");
    }

    let result = match AppState::initialize(&config) {
        Ok(state) => {
            let result = run(cli.command, &state).await;
            state.shutdown();
            result
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Command failed");
            eprintln!("error[{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, state: &AppState) -> AppResult<()> {
    match command {
        Command::Profile => {
            let profile = state.profile.get()?;
            println!("{}", profile.name);
            if !profile.slogan.is_empty() {
                println!("{}", profile.slogan);
            }
            println!("Phone:       {}", profile.phone);
            if let Some(city) = &profile.city {
                println!("City:        {city}");
            }
            println!("Color:       {}", profile.color);
            println!("Next folio:  {}", state.quotes.sequencer().reserve_next_folio()?);
        }
        Command::Catalog => {
            for item in state.catalog.list()? {
                println!(
                    "{:<14} {:<40} {:>5} {:>12}",
                    item.category,
                    item.description,
                    item.unit,
                    format_money(item.price)
                );
            }
        }
        Command::Templates { term, category } => {
            let templates = search_templates(term.as_deref().unwrap_or(""), category.as_deref());
            for t in &templates {
                let value = t.items.iter().map(|i| i.qty * i.price).sum();
                println!("{:<8} {:<12} {:<40} {:>12}", t.id, t.category, t.name, format_money(value));
            }
            if templates.is_empty() {
                println!("No templates. Categories: {}", template_categories().join(", "));
            }
        }
        Command::Quotes(cmd) => run_quotes(cmd, state).await?,
        Command::Revenue { months } => {
            let rows = state
                .storage
                .read(queries::paid_revenue_by_month(chrono::Utc::now(), months))?
                .value;
            for row in rows {
                println!("{}  {:>14}", row.month, format_money(row.total));
            }
        }
        Command::ExportPdf { id, raster } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let doc = if raster {
                let export = state.export.clone().with_page_mode(PageMode::Raster {
                    dpi: state.config.raster_dpi,
                });
                export.export_quote(&id, &cancel).await?
            } else {
                state.export.export_quote(&id, &cancel).await?
            };
            for degraded in &doc.degraded {
                eprintln!("warning: {degraded}");
            }
            let path = state.sink.save(&doc.file_name, &doc.bytes).await?;
            println!("{} ({} pages)", path.display(), doc.page_count);
        }
        Command::Backup(BackupCommand::Export { path }) => {
            let text = state.backup.export_json()?;
            let path = match path {
                Some(path) => path,
                None => state
                    .config
                    .export_dir()
                    .join(backup_file_name(chrono::Local::now().date_naive())),
            };
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
            }
            tokio::fs::write(&path, text).await.map_err(io_error)?;
            println!("{}", path.display());
        }
        Command::Backup(BackupCommand::Import { path }) => {
            let text = tokio::fs::read_to_string(&path).await.map_err(io_error)?;
            let summary = state.backup.import_json(&text)?;
            println!("Imported {} catalog items and {} quotes", summary.catalog, summary.quotes);
        }
    }
    Ok(())
}

async fn run_quotes(command: QuotesCommand, state: &AppState) -> AppResult<()> {
    match command {
        QuotesCommand::List { search, status } => {
            let quotes = match (search, status) {
                (Some(term), _) => state.storage.read(queries::search_quotes(term))?.value,
                (None, Some(status)) => state.storage.read(queries::quotes_by_status(status))?.value,
                (None, None) => state.quotes.list()?,
            };
            print_quotes(&quotes);
        }
        QuotesCommand::Stale => {
            let quotes = state
                .storage
                .read(queries::stale_pending_quotes(chrono::Utc::now()))?
                .value;
            print_quotes(&quotes);
        }
        QuotesCommand::Status { id, status } => {
            let quote = state.quotes.set_status(&id, status)?;
            println!("{} {}", quote.folio, quote.status.label());
        }
        QuotesCommand::Duplicate { id } => {
            let draft = state.quotes.duplicate(&id)?;
            let saved = state.quotes.save(draft).await?;
            println!("{} {}", saved.quote.folio, saved.quote.client_name);
        }
        QuotesCommand::Delete { id } => {
            if !state.quotes.delete(&id)? {
                return Err(AppError::not_found(format!("Quote {id}")));
            }
        }
        QuotesCommand::Watch { search } => {
            let (initial, mut subscription) = state
                .live
                .subscribe(queries::search_quotes(search.unwrap_or_default()))?;
            print_quotes(&initial);
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    update = subscription.changed() => match update {
                        Some(quotes) => {
                            println!();
                            print_quotes(&quotes);
                        }
                        None => break,
                    },
                }
            }
            subscription.unsubscribe();
        }
    }
    Ok(())
}

fn print_quotes(quotes: &[Quote]) {
    for q in quotes {
        println!(
            "{:<6} {:<12} {:<28} {:<8} {:>14}  {}",
            q.folio,
            display_date(&q.date),
            q.client_name,
            q.status.label(),
            format_money(q.total),
            q.id
        );
    }
    if quotes.is_empty() {
        println!("No quotes.");
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::internal(format!("I/O error: {e}"))
}
