mod simulate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kgr_core::{
    ParameterSource, QueueClass, ReorderCache, SchedulerEngine, score as knowledge_score,
};
use kgr_store::{Collection, Settings};

#[derive(Parser)]
#[command(name = "kgr", about = "Knowledge-gain review ordering")]
struct Cli {
    /// Settings file (TOML); falls back to $KGR_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print today's Learning/Review cards in priority order
    Rank {
        /// Collection JSON file
        collection: PathBuf,
    },

    /// Print the model version each deck resolves to
    Params {
        /// Collection JSON file
        collection: PathBuf,
    },

    /// Run review sessions day by day and report the served order
    Simulate {
        /// Collection JSON file
        collection: PathBuf,

        /// Number of days to simulate
        #[arg(long, default_value_t = 1)]
        days: u32,

        /// RNG seed; overrides [simulation] seed
        #[arg(long)]
        seed: Option<u64>,

        /// Serve cards in engine order instead of reordering
        #[arg(long)]
        default_order: bool,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("KGR_CONFIG").ok().map(PathBuf::from));
    Settings::load_or_default(path.as_deref()).context("failed to load settings")
}

fn open_collection(path: &Path) -> Result<Collection> {
    Collection::load(path).with_context(|| format!("failed to load collection {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Rank { collection } => cmd_rank(collection),
        Commands::Params { collection } => cmd_params(collection),
        Commands::Simulate {
            collection,
            days,
            seed,
            default_order,
        } => {
            let mut settings = load_settings(&cli)?;
            if let Some(seed) = seed {
                settings.simulation.seed = *seed;
            }
            if *default_order {
                settings.reorder.reorder_cards = false;
            }
            let mut collection = open_collection(collection)?;
            let report = simulate::run(&mut collection, &settings, *days)?;
            print!("{report}");
            Ok(())
        }
    }
}

fn cmd_rank(path: &Path) -> Result<()> {
    let mut collection = open_collection(path)?;
    let counts = collection.queued_cards(1).counts;
    let mut cache = ReorderCache::new();
    cache.rebuild(&mut collection, &counts);

    let today = collection.today();
    for (rank, queued) in cache.stack().iter().rev().enumerate() {
        let home = queued.card.home_deck_id();
        let params = collection.deck_parameters(home);
        let (score, version) = match params {
            Some(params) => (
                knowledge_score(
                    queued.card.memory_state,
                    queued.card.elapsed_days(today),
                    params,
                ),
                params.resolve().map_or("neutral", |v| v.name()),
            ),
            None => (0.0, "neutral"),
        };
        let class = match queued.queue {
            QueueClass::Learning => "learning",
            QueueClass::Review => "review",
            QueueClass::New => "new",
        };
        println!(
            "{:>4}  card {:<8} {:<8}  score {:>10.4}  {version}",
            rank + 1,
            queued.id(),
            class,
            score,
        );
    }
    if cache.stack().is_empty() {
        println!("nothing due");
    }
    Ok(())
}

fn cmd_params(path: &Path) -> Result<()> {
    let collection = open_collection(path)?;
    for deck in collection.decks() {
        let version = deck
            .params
            .resolve()
            .map_or("none (neutral scores)", |v| v.name());
        println!("{:<6} {:<24} {version}", deck.id, deck.name);
    }
    Ok(())
}
