mod config;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use quadrant_codec::CodecError;
use quadrant_core::error::CoreError;
use quadrant_core::{NamespaceId, NamespaceIdN, NAMESPACE_SIZE};
use quadrant_fec::{ErasureEncoder, FecError, OriginalSquare, ReedSolomonEncoder};
use quadrant_node::{
    get_leaf, load_dah_from_path, load_store_from_path, put_square, save_dah_to_path,
    save_store_to_path, BuildError, CachingStore, FetchError, MemoryStore, PersistenceError,
    RangeRetriever, RetrieveError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{error, info};

use crate::config::CliConfig;

const DAH_FILE: &str = "dah.cbor";
const STORE_FILE: &str = "store.cbor";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extend a square, commit it and write the header and node snapshot
    Build {
        /// File with one hex-encoded share per line, sorted by namespace
        #[arg(long, conflicts_with = "random", required_unless_present = "random")]
        shares: Option<PathBuf>,
        /// Generate this many random shares instead
        #[arg(long)]
        random: Option<usize>,
        /// Seed for generated shares
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Output directory (defaults to the configured data dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print every share of a namespace
    Retrieve {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Namespace id in hex
        #[arg(long)]
        namespace: String,
    },
    /// Print a single leaf of a row tree
    Leaf {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        index: usize,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the default configuration file
    Init,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load config: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid share on line {line}: {reason}")]
    Share { line: usize, reason: String },
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Fec(#[from] FecError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("row {row} out of range for width {width}")]
    RowOutOfRange { row: usize, width: usize },
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Retrieve(RetrieveError::NotFoundInRange { .. } | RetrieveError::Range(_)) => 3,
            _ => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = std::env::var("QUADRANT_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Config {
        action: ConfigCommands::Init,
    } = cli.command
    {
        print!("{}", CliConfig::default_toml()?);
        return Ok(());
    }

    let config = CliConfig::new(cli.config)?;
    match cli.command {
        Commands::Build {
            shares,
            random,
            seed,
            out,
        } => {
            let shares = match (shares, random) {
                (Some(path), _) => read_shares(&path, config.share_size)?,
                (None, Some(count)) => random_shares(count, config.share_size, seed),
                (None, None) => unreachable!("clap requires --shares or --random"),
            };
            build(&config, shares, &out.unwrap_or_else(|| config.data_dir.clone())).await
        }
        Commands::Retrieve { dir, namespace } => {
            let namespace: NamespaceId = namespace.parse()?;
            retrieve(&config, &dir.unwrap_or_else(|| config.data_dir.clone()), &namespace).await
        }
        Commands::Leaf { dir, row, index } => {
            leaf(&dir.unwrap_or_else(|| config.data_dir.clone()), row, index).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn build(config: &CliConfig, shares: Vec<Vec<u8>>, out: &Path) -> Result<(), CliError> {
    let original = OriginalSquare::from_shares(shares, config.share_size)?;
    let square = ReedSolomonEncoder.extend(&original)?;
    let store = MemoryStore::new();
    let dah = put_square(&store, &square).await?;

    fs::create_dir_all(out).map_err(|source| CliError::Io {
        path: out.to_path_buf(),
        source,
    })?;
    save_dah_to_path(out.join(DAH_FILE), &dah)?;
    save_store_to_path(out.join(STORE_FILE), &store)?;
    info!(dir = %out.display(), width = dah.width(), nodes = store.len(), "square written");

    for (i, root) in dah.row_roots.iter().enumerate() {
        println!("row {i:>3} {root}");
    }
    for (i, root) in dah.column_roots.iter().enumerate() {
        println!("col {i:>3} {root}");
    }
    println!("dah {}", hex::encode(dah.hash()));
    Ok(())
}

async fn retrieve(config: &CliConfig, dir: &Path, namespace: &NamespaceId) -> Result<(), CliError> {
    let dah = load_dah_from_path(dir.join(DAH_FILE))?;
    let store = load_store_from_path(dir.join(STORE_FILE))?;
    let cached = CachingStore::new(store, config.cache_capacity);
    let retriever = RangeRetriever::new(cached, config.retriever_config());

    let shares = retriever.retrieve(namespace, &dah).await?;
    for share in &shares {
        println!("{}", hex::encode(share));
    }
    Ok(())
}

async fn leaf(dir: &Path, row: usize, index: usize) -> Result<(), CliError> {
    let dah = load_dah_from_path(dir.join(DAH_FILE))?;
    let store = load_store_from_path(dir.join(STORE_FILE))?;
    let width = dah.width();
    let root = dah
        .row_roots
        .get(row)
        .ok_or(CliError::RowOutOfRange { row, width })?;
    let share = get_leaf(&store, root, index, width).await?;
    println!("{}", hex::encode(share));
    Ok(())
}

fn read_shares(path: &Path, share_size: usize) -> Result<Vec<Vec<u8>>, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let share = hex::decode(line.trim()).map_err(|e| CliError::Share {
                line: i + 1,
                reason: e.to_string(),
            })?;
            if share.len() != share_size {
                return Err(CliError::Share {
                    line: i + 1,
                    reason: format!("expected {share_size} bytes, got {}", share.len()),
                });
            }
            Ok(share)
        })
        .collect()
}

/// Sorted shares with namespaces above the reserved range.
fn random_shares(count: usize, share_size: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut namespaces: Vec<NamespaceId> = (0..count)
        .map(|_| NamespaceIdN(rng.gen_range(0x100..0x1_0000_u64).to_be_bytes()))
        .collect();
    namespaces.sort_unstable();
    namespaces
        .into_iter()
        .map(|namespace| {
            let mut share = Vec::with_capacity(share_size);
            share.extend_from_slice(namespace.as_bytes());
            share.extend((NAMESPACE_SIZE..share_size).map(|_| rng.gen::<u8>()));
            share
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["quadrant", "build", "--random", "12"]).unwrap();
        match cli.command {
            Commands::Build {
                random: Some(12),
                shares: None,
                seed: 0,
                out: None,
            } => {}
            _ => panic!("expected Build command"),
        }

        let cli = Cli::try_parse_from([
            "quadrant",
            "--config",
            "q.toml",
            "retrieve",
            "--dir",
            "out",
            "--namespace",
            "0000000000000105",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("q.toml")));
        match cli.command {
            Commands::Retrieve { ref namespace, .. } => assert_eq!(namespace, "0000000000000105"),
            _ => panic!("expected Retrieve command"),
        }

        assert!(Cli::try_parse_from(["quadrant", "build"]).is_err());
        let both = ["quadrant", "build", "--random", "4", "--shares", "f"];
        assert!(Cli::try_parse_from(both).is_err());
        assert!(matches!(
            Cli::try_parse_from(["quadrant", "config", "init"]).unwrap().command,
            Commands::Config {
                action: ConfigCommands::Init
            }
        ));
    }

    #[test]
    fn random_shares_are_sorted_and_sized() {
        let shares = random_shares(40, 64, 9);
        assert_eq!(shares.len(), 40);
        assert!(shares.iter().all(|s| s.len() == 64));
        assert!(shares.windows(2).all(|w| w[0][..8] <= w[1][..8]));
        assert_eq!(shares, random_shares(40, 64, 9));
    }

    #[test]
    fn read_shares_reports_bad_lines() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("shares.txt");
        let good = hex::encode([0x11_u8; 16]);
        fs::write(&path, format!("{good}\n\n{good}\nzz\n")).expect("write shares");
        assert!(matches!(
            read_shares(&path, 16),
            Err(CliError::Share { line: 4, .. })
        ));
        fs::write(&path, format!("{good}\n{good}\n")).expect("write shares");
        assert_eq!(read_shares(&path, 16).expect("shares").len(), 2);
    }

    #[tokio::test]
    async fn build_then_retrieve_and_leaf_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = CliConfig {
            share_size: 64,
            ..CliConfig::default()
        };
        let shares = random_shares(10, 64, 3);
        build(&config, shares.clone(), dir.path()).await.expect("build");
        assert!(dir.path().join(DAH_FILE).exists());

        let namespace = NamespaceIdN::from_prefix(&shares[0]).expect("namespace");
        retrieve(&config, dir.path(), &namespace).await.expect("retrieve");
        leaf(dir.path(), 0, 1).await.expect("leaf");
        assert!(matches!(
            leaf(dir.path(), 99, 0).await,
            Err(CliError::RowOutOfRange { row: 99, .. })
        ));

        let err = retrieve(&config, dir.path(), &NamespaceIdN([0; 8]))
            .await
            .expect_err("below minimum");
        assert_eq!(err.exit_code(), 3);
    }
}
