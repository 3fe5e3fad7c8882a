// Metabolite DB command line
// Database setup, bulk imports, CSV export, the HTTP API and a mass calculator

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use metabolite_db::chem::{Formula, IonMode};
use metabolite_db::config::{DatabaseArgs, DatabaseConfig, ServeArgs, ServerConfig};
use metabolite_db::export;
use metabolite_db::import::{self, ImportRequest};
use metabolite_db::state::{
    compounds_with_retention_times, queries, retention_time_means, DbConnection,
};
use metabolite_db::web::{create_router, AppState};

/// Metabolite DB - compounds, retention times and masses of metabolomics standards
#[derive(Parser)]
#[command(name = "metabolite-db")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Serve the HTTP/JSON API
    Serve(ServeArgs),

    /// Import retention times measured in one standard run
    ImportCsv {
        /// CSV file with Name, Formula and RT columns
        #[arg(value_name = "CSVFILE")]
        csvfile: PathBuf,

        /// Chromatography method name (created if missing)
        method: String,

        /// Run date, e.g. 2019-03-07 or 2019-03-07T14:30:00
        date: String,

        /// Operator who recorded the run
        operator: String,

        /// Raw data file of the run
        #[arg(long)]
        raw_data_file: Option<String>,

        /// Append a JSONL trace of the import to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Add compounds to a compound list, one id, name or formula per line
    ImportList {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Compound list name (created if missing)
        list_name: String,

        /// Description used when the list is created
        #[arg(long)]
        description: Option<String>,
    },

    /// Export mean retention times of a method as CSV
    Export {
        /// Chromatography method name
        method: String,

        /// Comma separated standard run ids (default: all runs of the method)
        #[arg(long, value_delimiter = ',')]
        runs: Option<Vec<i64>>,

        /// Only compounds of this list (0 for all)
        #[arg(long, default_value_t = 0)]
        compound_list: i64,

        /// Export every observation instead of means
        #[arg(long)]
        raw: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Monoisotopic mass and m/z of a molecular formula
    Mass {
        formula: String,

        /// Ionization charge, e.g. -1 or 1
        #[arg(long, allow_hyphen_values = true)]
        mode: Option<IonMode>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Init => run_init(&cli.database),
        Commands::Serve(args) => run_serve(&cli.database, &args),
        Commands::ImportCsv {
            csvfile,
            method,
            date,
            operator,
            raw_data_file,
            trace,
        } => run_import_csv(
            &cli.database,
            &csvfile,
            ImportRequest {
                method,
                date: import::parse_run_date(&date)?,
                operator,
                raw_data_file,
            },
            trace.as_deref(),
        ),
        Commands::ImportList {
            file,
            list_name,
            description,
        } => run_import_list(&cli.database, &file, &list_name, description.as_deref()),
        Commands::Export {
            method,
            runs,
            compound_list,
            raw,
            output,
        } => run_export(&cli.database, &method, runs, compound_list, raw, output),
        Commands::Mass { formula, mode } => run_mass(&formula, mode),
    }
}

fn open_database(args: &DatabaseArgs) -> Result<DbConnection> {
    let config = DatabaseConfig::from_args(args)?;
    DbConnection::open(&config.path, config.busy_timeout)
        .with_context(|| format!("Failed to open database {}", config.path.display()))
}

fn run_init(args: &DatabaseArgs) -> Result<()> {
    let config = DatabaseConfig::from_args(args)?;
    open_database(args)?;
    println!("Database ready at {}", config.path.display());
    Ok(())
}

fn run_serve(db_args: &DatabaseArgs, args: &ServeArgs) -> Result<()> {
    let db = open_database(db_args)?;
    let config = ServerConfig::try_from(args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let listen_addr = config.listen_addr;
        let app = create_router(AppState::new(db, config));

        let listener = tokio::net::TcpListener::bind(listen_addr).await?;
        log::info!("Listening on {}", listen_addr);

        axum::serve(listener, app).await?;
        Ok(())
    })
}

fn run_import_csv(
    args: &DatabaseArgs,
    csvfile: &Path,
    request: ImportRequest,
    trace: Option<&Path>,
) -> Result<()> {
    let db = open_database(args)?;
    println!("Importing records from '{}'", csvfile.display());

    let report = import::run_import(&db, csvfile, &request, trace)
        .with_context(|| format!("Import of {} failed", csvfile.display()))?;

    println!("Created {} new Compounds", report.compounds_created);
    println!("Recorded {} new Retention Times", report.retention_times_created);
    println!("Updated {} Retention Times", report.retention_times_updated);
    println!("Skipped {} rows without a retention time", report.rows_skipped);

    if !report.failures.is_empty() {
        eprintln!("{} rows failed:", report.failures.len());
        for failure in &report.failures {
            eprintln!("  line {}: {}", failure.line, failure.reason);
        }
    }

    Ok(())
}

fn run_import_list(
    args: &DatabaseArgs,
    file: &Path,
    list_name: &str,
    description: Option<&str>,
) -> Result<()> {
    let db = open_database(args)?;
    let report = import::run_list_import(&db, file, list_name, description)
        .with_context(|| format!("Import of {} failed", file.display()))?;

    if report.list_created {
        println!("Created compound list {}", report.list.name);
    }
    println!(
        "Added {} compounds ({} already present)",
        report.added, report.already_present
    );

    for entry in &report.unresolved {
        eprintln!(
            "  line {}: {:?} unresolved ({:?})",
            entry.line, entry.reference, entry.reason
        );
    }

    Ok(())
}

fn run_export(
    args: &DatabaseArgs,
    method_name: &str,
    runs: Option<Vec<i64>>,
    compound_list: i64,
    raw: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let db = open_database(args)?;
    let conn = db.lock();

    let Some(method) = queries::get_method_by_name(&conn, method_name)? else {
        bail!("Unknown chromatography method: {}", method_name);
    };
    let compound_list = Some(compound_list).filter(|&id| id != 0);
    if let Some(list_id) = compound_list {
        if queries::get_compound_list(&conn, list_id)?.is_none() {
            bail!("Unknown compound list: {}", list_id);
        }
    }

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    if raw {
        let observations = compounds_with_retention_times(&conn, &method, runs.as_deref())?;
        export::write_observations_csv(writer, &observations)?;
    } else {
        let means = retention_time_means(&conn, &method, runs.as_deref(), compound_list)?;
        export::write_means_csv(writer, &means)?;
    }

    if let Some(path) = output {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_mass(formula: &str, mode: Option<IonMode>) -> Result<()> {
    let formula = Formula::parse(formula)?;
    println!("Monoisotopic mass: {}", formula.monoisotopic_mass());

    if let Some(mode) = mode {
        println!("m/z {}: {}", mode.label(), formula.m_z(mode));
    }
    Ok(())
}
