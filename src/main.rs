use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use doc_importer::config::Config;
use doc_importer::storage::{NdjsonWriter, RecordWriter};
use doc_importer::{logging, metrics, BatchDriver, BatchReport, DocumentNormalizer};

#[derive(Parser)]
#[command(name = "doc_importer")]
#[command(about = "Load a Solr export batch into a database table")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to doc_importer.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the table, then normalize and write the batch
    Import {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Normalize the batch and print canonical documents as NDJSON without touching the database
    Check {
        #[command(flatten)]
        source: SourceArgs,
        /// Write NDJSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Only create the destination table
    Bootstrap {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// JSON export on disk
    #[arg(long, conflicts_with = "url")]
    file: Option<PathBuf>,
    /// Solr select endpoint
    #[arg(long)]
    url: Option<String>,
    /// Number of documents to take from the export
    #[arg(long)]
    rows: Option<usize>,
}

#[derive(Args)]
struct TargetArgs {
    #[arg(long)]
    keyspace: Option<String>,
    #[arg(long)]
    table: Option<String>,
    /// DDL template with keyspace_name/table_name placeholders
    #[arg(long)]
    schema_template: Option<PathBuf>,
}

impl SourceArgs {
    fn apply(self, config: &mut Config) {
        if let Some(file) = self.file {
            config.source.path = Some(file);
            config.source.url = None;
        }
        if let Some(url) = self.url {
            config.source.url = Some(url);
            config.source.path = None;
        }
        if let Some(rows) = self.rows {
            config.source.rows = rows;
        }
    }
}

impl TargetArgs {
    fn apply(self, config: &mut Config) {
        if let Some(keyspace) = self.keyspace {
            config.target.keyspace = keyspace;
        }
        if let Some(table) = self.table {
            config.target.table = table;
        }
        if let Some(template) = self.schema_template {
            config.target.schema_template = Some(template);
        }
    }
}

fn print_report(report: &BatchReport) {
    eprintln!("\n📊 Import results:");
    eprintln!("   Total documents: {}", report.total_documents);
    eprintln!("   Written: {}", report.written_documents);
    eprintln!("   Skipped (no title): {}", report.skipped_documents);
    eprintln!("   Fields coerced: {}", report.coerced_fields);
    eprintln!("   Duration: {:.2}s", report.duration_secs);
}

#[cfg(feature = "db")]
async fn open_table(config: &Config) -> anyhow::Result<doc_importer::db::LibsqlWriter> {
    use doc_importer::db::{LibsqlWriter, DEFAULT_SCHEMA_TEMPLATE};

    let table = config.target.table_ref()?;
    let target = config.target.database_target()?;
    let writer = LibsqlWriter::open(&target, table).await?;
    if let Some(version) = writer.server_version().await? {
        info!("Database engine version {}", version);
    }
    match &config.target.schema_template {
        Some(path) => writer.bootstrap_from_file(path).await?,
        None => writer.bootstrap(DEFAULT_SCHEMA_TEMPLATE).await?,
    }
    Ok(writer)
}

#[cfg(not(feature = "db"))]
async fn open_table(_: &Config) -> anyhow::Result<doc_importer::storage::InMemoryWriter> {
    anyhow::bail!("this build has no database support; rebuild with the `db` feature")
}

async fn run_batch(config: &Config, writer: &dyn RecordWriter) -> anyhow::Result<BatchReport> {
    let reader = config.source.reader()?;
    info!("📡 Reading batch from {}", reader.describe());
    let docs = reader
        .read_batch()
        .await
        .with_context(|| format!("failed to read batch from {}", reader.describe()))?;

    let normalizer = DocumentNormalizer::new(config.normalize.clone());
    let report = BatchDriver::new(&normalizer, writer).run(docs).await?;
    Ok(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging("logs");

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();

    if let Some(addr) = config.metrics_addr()? {
        metrics::init_metrics(addr);
    }

    match cli.command {
        Commands::Import { source, target } => {
            source.apply(&mut config);
            target.apply(&mut config);
            eprintln!("🚀 Importing into {}.{}", config.target.keyspace, config.target.table);

            let writer = open_table(&config).await?;
            let report = run_batch(&config, &writer).await?;
            print_report(&report);
            eprintln!("✅ All documents processed");
        }
        Commands::Check { source, output } => {
            source.apply(&mut config);
            let writer = match &output {
                Some(path) => NdjsonWriter::create(path).await?,
                None => NdjsonWriter::stdout(),
            };
            let report = run_batch(&config, &writer).await?;
            print_report(&report);
        }
        Commands::Bootstrap { target } => {
            target.apply(&mut config);
            open_table(&config).await?;
            eprintln!("✅ Table {}.{} is ready", config.target.keyspace, config.target.table);
        }
    }
    Ok(())
}
