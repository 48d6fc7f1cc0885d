use anyhow::{Context, Result};
use clap::Parser;
use shelf::config::ShelfConfig;
use shelf::store::fs::FileStore;
use shelf::store::memory::InMemoryStore;
use shelf::store::{DocumentStore, RecordStore};
use shelf::web::{Server, WebContent};
use shelf::RecordService;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::info;

mod args;
use args::Cli;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_config(cli: &Cli) -> Result<ShelfConfig> {
    let mut config = match &cli.config {
        Some(path) => ShelfConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ShelfConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(db) = &cli.dbds {
        config.db = db.clone();
    }
    if let Some(root) = &cli.web_root {
        config.web_root = root.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Ok(config)
}

fn open_backend(config: &ShelfConfig) -> Result<Arc<dyn DocumentStore>> {
    if config.uses_memory_store() {
        info!("using in-memory store, records will not persist");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    let store = FileStore::open(&config.db)
        .with_context(|| format!("opening data directory {}", config.db))?;
    info!(db = %store.root().display(), "using file store");
    Ok(Arc::new(store))
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let registry = Arc::new(config.build_registry().context("invalid formats")?);

    let mut store = RecordStore::new(open_backend(&config)?);
    let report = store
        .initialize_indexes(&registry)
        .context("initializing text indexes")?;
    if report.is_noop() {
        info!(formats = registry.len(), "text indexes up to date");
    } else {
        info!(
            created = ?report.created,
            recreated = ?report.recreated,
            "text indexes reconciled"
        );
    }

    let content = WebContent::load(&config.web_root, &registry).context("loading web content")?;
    let service = Arc::new(RecordService::new(registry, store));

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("installing signal handler")?;

    let server = Server::start(
        &config.url,
        service.clone(),
        Arc::new(content),
        config.workers,
    )?;

    let _ = stop_rx.recv();
    info!("shutting down");
    server.shutdown(Duration::from_secs(config.shutdown_timeout_secs));
    service.close().context("closing record store")?;
    info!("bye");
    Ok(())
}
