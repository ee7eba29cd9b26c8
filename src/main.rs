use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payment_lifecycle::application::directory::MerchantDirectory;
use payment_lifecycle::application::engine::TransactionEngine;
use payment_lifecycle::application::purge::PurgeScheduler;
use payment_lifecycle::config::Settings;
use payment_lifecycle::domain::ports::{MerchantStoreRef, TransactionStoreRef};
use payment_lifecycle::error::PaymentError;
use payment_lifecycle::infrastructure::in_memory::InMemoryStore;
use payment_lifecycle::interfaces::batch::BatchRunner;
use payment_lifecycle::interfaces::report::ReportWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Transaction candidates CSV file
    transactions: PathBuf,

    /// Merchants CSV file, created before any transaction is processed
    #[arg(long)]
    merchants: Option<PathBuf>,

    /// Admins CSV file
    #[arg(long)]
    admins: Option<PathBuf>,

    #[command(flatten)]
    settings: Settings,
}

type Stores = (MerchantStoreRef, TransactionStoreRef);

fn open_stores(settings: &Settings) -> payment_lifecycle::error::Result<Stores> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &settings.db_path {
        use payment_lifecycle::infrastructure::rocksdb::RocksDBStore;

        let store = RocksDBStore::open(db_path)?;
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if settings.db_path.is_some() {
        return Err(PaymentError::invalid_field(
            "db_path",
            "built without the `storage-rocksdb` feature",
        ));
    }

    let store = InMemoryStore::new();
    Ok((Arc::new(store.clone()), Arc::new(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let (merchant_store, transaction_store) = open_stores(&cli.settings).into_diagnostic()?;
    let directory = MerchantDirectory::new(merchant_store.clone(), transaction_store.clone());
    let engine = TransactionEngine::new(merchant_store, transaction_store);

    let purge = PurgeScheduler::start(
        engine.clone(),
        cli.settings.purge_interval(),
        cli.settings.retention(),
    );

    let mut runner = BatchRunner::new(directory, engine);
    let outcome = async {
        if let Some(path) = &cli.admins {
            runner.load_admins(File::open(path)?).await?;
        }
        if let Some(path) = &cli.merchants {
            runner.load_merchants(File::open(path)?).await?;
        }
        runner.run_transactions(File::open(&cli.transactions)?).await?;
        Ok::<_, PaymentError>(())
    }
    .await;

    purge.stop().await;
    outcome.into_diagnostic()?;

    let report = runner.into_report().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    Ok(())
}
