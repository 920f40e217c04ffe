use clap::{Parser, Subcommand};
use colloc_core::config::Config;
use colloc_core::ingest::{read_pair_freqs_file, read_single_freqs_file};
use colloc_core::{CollocationEngine, CollocationQuery, FileStore, FreqDb, Result, SchemaVersion};
use crossterm::style::Stylize;
use std::path::PathBuf;
use std::process;
use tracing::info;

#[derive(Parser)]
#[command(name = "scoll", about = "Collocation statistics store", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the store file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pair value format of a new store: v1 (frequency) or v2 (frequency + distance)
    #[arg(long, global = true)]
    schema: Option<SchemaVersion>,

    /// Enable info-level logging
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all logging
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load single and pair frequency tables (tab separated)
    Load {
        /// lemma<TAB>freq
        #[arg(long)]
        singles: PathBuf,
        /// lemma1<TAB>lemma2<TAB>freq[<TAB>distance]
        #[arg(long)]
        pairs: PathBuf,
        /// Drop pairs seen fewer times than this
        #[arg(long)]
        min_pair_freq: Option<u32>,
        /// Wipe the store before loading
        #[arg(long)]
        wipe: bool,
    },
    /// Search collocations of a lemma
    Search {
        lemma: String,
        #[arg(long, allow_hyphen_values = true)]
        corpus_size: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<i64>,
        /// ldice or tscore
        #[arg(long)]
        sort_by: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add to the frequency of a single lemma
    IncrSingle {
        lemma: String,
        #[arg(long, default_value_t = 1)]
        by: u32,
    },
    /// Add to the frequency of a lemma pair
    IncrPair {
        left: String,
        right: String,
        #[arg(long, default_value_t = 1)]
        by: u32,
    },
    /// Show store size and schema
    Info,
    /// Remove all data from the store
    Flush,
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(if e.is_fatal() { 2 } else { 1 });
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(db) = &cli.db {
        cfg.db_path = db.clone();
    }
    if let Some(schema) = cli.schema {
        cfg.schema = schema;
    }
    Ok(cfg)
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli)?;
    let store = FileStore::open(&cfg.db_path, cfg.store_options())?;

    match cli.command {
        Commands::Load { singles, pairs, min_pair_freq, wipe } => {
            let db = FreqDb::open(store, cfg.schema)?;
            if wipe {
                db.flush_all()?;
            }
            let single_freqs = read_single_freqs_file(&singles)?;
            let pair_freqs = read_pair_freqs_file(&pairs)?;
            let mut seq = db.token_sequence()?;
            let summary = db.store_data(
                &mut seq,
                &single_freqs,
                &pair_freqs,
                min_pair_freq.unwrap_or(cfg.min_pair_freq),
            )?;
            println!(
                "lemmas: {}, pairs stored: {}, below threshold: {}, skipped: {}",
                summary.lemmas,
                summary.pairs_stored,
                summary.pairs_below_threshold,
                summary.pairs_skipped
            );
            db.into_inner().close()
        }
        Commands::Search { lemma, corpus_size, limit, sort_by, json } => {
            let db = FreqDb::open_existing(store)?;
            let query = CollocationQuery::from_raw(
                &lemma,
                corpus_size.unwrap_or(cfg.corpus_size as i64),
                limit.unwrap_or(cfg.limit as i64),
                &sort_by.unwrap_or_else(|| cfg.sort_by.to_string()),
            )?;
            let results = CollocationEngine::new(&db).calculate_measures(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for item in &results {
                    println!("{}", item.tab_string());
                }
            }
            Ok(())
        }
        Commands::IncrSingle { lemma, by } => {
            let db = FreqDb::open_existing(store)?;
            let mut seq = db.token_sequence()?;
            let id = db.register_lemma(&mut seq, &lemma)?;
            let updated = db.increment_single(id, by)?;
            println!("{}\t{}", lemma, updated);
            db.into_inner().close()
        }
        Commands::IncrPair { left, right, by } => {
            let db = FreqDb::open_existing(store)?;
            let mut seq = db.token_sequence()?;
            let left_id = db.register_lemma(&mut seq, &left)?;
            let right_id = db.register_lemma(&mut seq, &right)?;
            let updated = db.increment_pair(left_id, right_id, by)?;
            println!("{}\t{}\t{}", left, right, updated);
            db.into_inner().close()
        }
        Commands::Info => {
            let db = FreqDb::open_existing(store)?;
            let store = db.store();
            println!("path:    {}", store.path().display());
            println!("schema:  {}", db.schema());
            println!("entries: {}", store.len());
            println!("size:    {} bytes", store.size()?);
            Ok(())
        }
        Commands::Flush => {
            let db = FreqDb::open_existing(store)?;
            db.flush_all()?;
            info!(path = %cfg.db_path.display(), "store wiped");
            db.into_inner().close()
        }
    }
}
