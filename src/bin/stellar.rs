use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stellar_cartography::input::{read_dataset_file, read_sector_file};
use stellar_cartography::{
    BalancedSectorIndex, KdTree, NearestNeighborClassifier, POSITIVE_LABEL, SectorIndex, TraversalOrder,
    UnbalancedSectorIndex,
};

#[derive(Parser)]
#[command(name = "stellar")]
#[command(about = "Map space sectors and classify planet habitability")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(short, long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load sectors into an unbalanced binary search tree
    Bst(SectorArgs),

    /// Load sectors into a left-leaning red-black tree
    Llrb(SectorArgs),

    /// Train the habitability classifier and evaluate it on a test set
    Knn {
        /// Training CSV: feature columns then a label column
        train: PathBuf,

        /// Test CSV with the same layout
        test: PathBuf,

        /// Number of neighbors
        #[arg(short, default_value_t = NearestNeighborClassifier::<f64>::DEFAULT_K)]
        k: usize,

        /// Points per k-d tree leaf
        #[arg(long, default_value_t = KdTree::<f64>::DEFAULT_LEAF_CAPACITY)]
        leaf_capacity: usize,

        /// Stored with the datasets
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,
    },
}

#[derive(Args)]
struct SectorArgs {
    /// CSV with an `x,y,z` header followed by integer rows
    file: PathBuf,

    /// Print the stellar path from `0SSS` to this sector code
    #[arg(short, long)]
    path: Option<String>,

    /// Remove sectors by code before printing
    #[arg(short, long)]
    delete: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.into())?;

    match cli.command {
        Commands::Bst(args) => run_sectors(UnbalancedSectorIndex::new(), &args, false),
        Commands::Llrb(args) => run_sectors(BalancedSectorIndex::new(), &args, true),
        Commands::Knn { train, test, k, leaf_capacity, threshold } => {
            run_knn(&train, &test, k, leaf_capacity, threshold)
        }
    }
}

fn run_sectors<I: SectorIndex>(mut index: I, args: &SectorArgs, colored: bool) -> Result<()> {
    let coordinates = read_sector_file(&args.file)
        .with_context(|| format!("Failed to load sectors from {}", args.file.display()))?;
    let inserted = index.extend_from_coordinates(coordinates);
    info!(sectors = inserted, file = %args.file.display(), "Loaded sectors");

    for code in &args.delete {
        match index.delete(code) {
            Some(sector) => info!(code = %sector.code, "Deleted sector"),
            None => println!("Sector {code} does not exist."),
        }
    }

    for (title, order) in [
        ("inorder", TraversalOrder::InOrder),
        ("preorder", TraversalOrder::PreOrder),
        ("postorder", TraversalOrder::PostOrder),
    ] {
        println!("Space sectors {title} traversal:");
        for node in index.traverse(order) {
            if colored {
                println!("{} sector: {}", node.color(), node.code());
            } else {
                println!("{}", node.code());
            }
        }
        println!();
    }

    if let Some(target) = &args.path {
        let path = index.stellar_path(target);
        if path.is_empty() {
            println!("A path to Dr. Elara could not be found.");
        } else {
            let codes: Vec<&str> = path.iter().map(|s| s.code.as_str()).collect();
            println!("The stellar path to Dr. Elara: {}", codes.join("->"));
        }
    }
    Ok(())
}

fn run_knn(train: &Path, test: &Path, k: usize, leaf_capacity: usize, threshold: f64) -> Result<()> {
    let training = read_dataset_file(train, threshold).context("Failed to load training data")?;
    let testing = read_dataset_file(test, threshold).context("Failed to load test data")?;
    if testing.is_empty() {
        bail!("Test set {} contains no rows", test.display());
    }

    let mut classifier = NearestNeighborClassifier::new(k, leaf_capacity)?;
    classifier.train(&training).context("Failed to train classifier")?;

    for (row, point) in testing.points.iter().enumerate() {
        let prediction = classifier.predict(&point.features)?;
        let expected = point.label.as_deref().unwrap_or("-");
        let verdict = if prediction == 1 { POSITIVE_LABEL } else { "Not habitable" };
        println!("Row {}: predicted {prediction} ({verdict}), actual {expected}", row + 1);
    }

    match classifier.accuracy(&testing) {
        Ok(accuracy) => println!("Accuracy: {:.2}%", accuracy * 100.0),
        Err(_) => println!("Accuracy: n/a (test set has no labels)"),
    }
    Ok(())
}

fn init_logging(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stellar={level},stellar_cartography={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();

    Ok(())
}
