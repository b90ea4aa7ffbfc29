//! relaystore CLI: ingest relay event feeds, repair reorgs and query records.
//!
//! Usage:
//! ```bash
//! relaystore --config config/relaystore.yaml init
//! relaystore ingest  --file fixtures/feed/reorg.jsonl
//! relaystore reorg   --from 90 --to 100
//! relaystore fills   page --filter market=LRC-WETH --page 1 --size 20
//! relaystore fills   recent --owner 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045
//! relaystore fills   get --ring 0x… --order 0x…
//! relaystore cancels get --tx 0x… --order 0x…
//! relaystore cancels range --from 49 --to 52
//! relaystore cutoffs latest --owner 0x…
//! relaystore info
//! ```

mod config;
mod logging;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use relaystore_core::query::BlockRange;
use relaystore_core::{
    CancelEvent, ChainEvent, EventSink, FieldFilter, FillEvent, IngestOutcome, QueryService,
    Reconciler, Record, RecentFilter, RecordStore, StoreError, StoreSink, TimeWindow,
};

use crate::config::{AppConfig, ENV_DATABASE_URL, ENV_TABLE_PREFIX};

#[derive(Parser)]
#[command(
    name = "relaystore",
    about = "Reorg-aware store for relay exchange events",
    long_about = "
relaystore: persist OrderFilled / OrderCancelled / Cutoff events and keep them
consistent across chain reorganizations. All output is JSON on stdout; logs go
to stderr.

ENVIRONMENT VARIABLES:
  RELAYSTORE_DATABASE_URL    SQLite path or Postgres URL (overrides the config file)
  RELAYSTORE_TABLE_PREFIX    Table name prefix (overrides the config file)
  RUST_LOG                   Log filter (overrides log.level)
",
    version
)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite path or Postgres URL; overrides config and environment
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Info,

    /// Create tables and indexes if absent
    Init,

    /// Apply a JSON-lines chain-event feed
    Ingest {
        /// One `ChainEvent` JSON object per line
        #[arg(short, long)]
        file: PathBuf,
        /// Count duplicate records as skipped instead of failing
        #[arg(long)]
        skip_duplicates: bool,
    },

    /// Repair records from abandoned blocks in (from, to]
    Reorg {
        /// Last block known to be canonical (excluded)
        #[arg(long)]
        from: i64,
        /// Highest abandoned block (included)
        #[arg(long)]
        to: i64,
    },

    /// Query fill records
    #[command(subcommand)]
    Fills(FillCmd),

    /// Query cancel records
    #[command(subcommand)]
    Cancels(CancelCmd),

    /// Query cutoff records
    #[command(subcommand)]
    Cutoffs(CutoffCmd),
}

#[derive(Subcommand)]
enum FillCmd {
    /// One page, newest first, with the total match count
    Page(PageArgs),
    /// Up to 100 most recent live fills
    Recent(RecentArgs),
    /// Look up one fill by ring hash and order hash
    Get {
        #[arg(long)]
        ring: String,
        #[arg(long)]
        order: String,
    },
}

#[derive(Subcommand)]
enum CancelCmd {
    /// Look up one cancel by transaction hash and order hash
    Get {
        #[arg(long)]
        tx: String,
        #[arg(long)]
        order: String,
    },
    /// Live cancels with block number in (from, to]
    Range {
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
    },
}

#[derive(Subcommand)]
enum CutoffCmd {
    /// The owner's most recent live cutoff
    Latest {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Equality filter `column=value`; repeatable
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    filters: Vec<String>,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 20)]
    size: u64,
}

#[derive(Args)]
struct RecentArgs {
    #[arg(long)]
    market: Option<String>,
    #[arg(long)]
    owner: Option<String>,
    /// Earliest create time (inclusive)
    #[arg(long)]
    start: Option<i64>,
    /// Latest create time (inclusive)
    #[arg(long)]
    end: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url.clone() {
        cfg.set_database_url(url);
    }
    if cli.verbose {
        cfg.log.level = "debug".into();
    }
    logging::init_tracing(&cfg.log);

    match cli.command {
        Commands::Info => cmd_info(&cfg),
        Commands::Init => {
            let store = open(&cfg).await?;
            print_json(&store.create_schema().await?)
        }
        Commands::Ingest {
            file,
            skip_duplicates,
        } => cmd_ingest(&cfg, &file, skip_duplicates).await,
        Commands::Reorg { from, to } => {
            let store = open(&cfg).await?;
            let report = reconciler(&cfg, &store).reconcile(from, to).await?;
            print_json(&report)
        }
        Commands::Fills(cmd) => {
            let queries = QueryService::new(open(&cfg).await?);
            match cmd {
                FillCmd::Page(args) => {
                    let fields = parse_filters::<FillEvent>(&args.filters)?;
                    print_json(&queries.page_query::<FillEvent>(&fields, args.page, args.size).await?)
                }
                FillCmd::Recent(args) => {
                    let filter = RecentFilter {
                        market: args.market,
                        owner: args.owner,
                        window: TimeWindow::new(args.start, args.end),
                    };
                    print_json(&queries.query_recent::<FillEvent>(&filter).await?)
                }
                FillCmd::Get { ring, order } => print_json(&queries.fill_by_ring_and_order(&ring, &order).await?),
            }
        }
        Commands::Cancels(cmd) => {
            let queries = QueryService::new(open(&cfg).await?);
            match cmd {
                CancelCmd::Get { tx, order } => print_json(&queries.cancel_by_tx_and_order(&tx, &order).await?),
                CancelCmd::Range { from, to } => {
                    if from > to {
                        return Err(anyhow!("--from ({from}) must not exceed --to ({to})"));
                    }
                    let found = queries
                        .find_forked_in_range::<CancelEvent>(BlockRange::new(from, to))
                        .await?;
                    print_json(&found)
                }
            }
        }
        Commands::Cutoffs(CutoffCmd::Latest { owner }) => {
            let queries = QueryService::new(open(&cfg).await?);
            print_json(&queries.latest_cutoff(&owner).await?)
        }
    }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

fn cmd_info(cfg: &AppConfig) -> Result<()> {
    #[derive(Serialize)]
    struct Info<'a> {
        version: &'static str,
        config: &'a AppConfig,
        env: [&'static str; 2],
    }
    print_json(&Info {
        version: env!("CARGO_PKG_VERSION"),
        config: cfg,
        env: [ENV_DATABASE_URL, ENV_TABLE_PREFIX],
    })
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestSummary {
    stored: u64,
    skipped: u64,
    reconciled: Vec<IngestOutcome>,
}

async fn cmd_ingest(cfg: &AppConfig, file: &Path, skip_duplicates: bool) -> Result<()> {
    let store = open(cfg).await?;
    let sink = StoreSink::new(store.clone(), reconciler(cfg, &store));

    let reader = std::io::BufReader::new(
        std::fs::File::open(file).with_context(|| format!("opening {}", file.display()))?,
    );
    let mut summary = IngestSummary::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", file.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let lineno = n + 1;
        let event: ChainEvent =
            serde_json::from_str(&line).with_context(|| format!("line {lineno}: invalid event"))?;

        match sink.handle(&event).await {
            Ok(outcome @ IngestOutcome::Reconciled(_)) => summary.reconciled.push(outcome),
            Ok(IngestOutcome::Stored { .. }) => summary.stored += 1,
            Err(err @ StoreError::DuplicateKind { .. }) if skip_duplicates => {
                warn!(line = lineno, error = %err, "skipping duplicate");
                summary.skipped += 1;
            }
            Err(err) => return Err(err).with_context(|| format!("line {lineno}: {}", event.name())),
        }
    }

    info!(stored = summary.stored, skipped = summary.skipped, "feed applied");
    print_json(&summary)
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Open the configured store and create any missing tables.
async fn open(cfg: &AppConfig) -> Result<RecordStore> {
    let store = cfg
        .store
        .open()
        .await
        .with_context(|| format!("opening {} store", cfg.store.backend))?;
    store.create_schema().await.context("creating tables")?;
    Ok(store)
}

fn reconciler(cfg: &AppConfig, store: &RecordStore) -> Reconciler {
    Reconciler::new(QueryService::new(store.clone()), cfg.store.fork_policy)
}

/// Parse `column=value` pairs using the record kind's column types.
fn parse_filters<R: Record>(raw: &[String]) -> Result<FieldFilter> {
    let mut fields = FieldFilter::new();
    for item in raw {
        let (column, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("filter '{item}' is not COLUMN=VALUE"))?;
        let value = R::SCHEMA.parse_value(column.trim(), value.trim())?;
        fields.insert(column.trim().to_string(), value);
    }
    Ok(fields)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
