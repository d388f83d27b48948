//! mdelta CLI - build, alter, compare and inspect trie snapshots
//!
//! Each replica builds a snapshot of its key set, ships the file to its peer,
//! and `mdelta diff` lists the keys that need reconciling.

use anyhow::Context;
use clap::{Parser, Subcommand};
use merkle_delta::store::DEFAULT_LEVEL;
use merkle_delta::{Alteration, Digest, MerkleTrie, Node, Snapshot};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdelta")]
#[command(about = "Fingerprint key/value sets and diff them with a Merkle trie")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long, default_value = "json", global = true)]
    format: OutputFormat,

    /// Read and write the bare wire encoding instead of snapshot files
    #[arg(long, global = true)]
    raw: bool,

    /// zstd level for snapshot files
    #[arg(long, default_value_t = DEFAULT_LEVEL, global = true)]
    level: i32,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); MDELTA_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a new trie from a JSON batch
    Build {
        /// Batch file (`-` for stdin): [{"key": "...", "value": "..." | null}]
        batch: PathBuf,
        /// Where to write the trie
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply a JSON batch to an existing trie
    Alter {
        /// The trie to alter
        trie: PathBuf,
        /// Batch file (`-` for stdin)
        batch: PathBuf,
        /// Where to write the result (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the keys that differ between two tries
    Diff {
        /// First trie
        a: PathBuf,
        /// Second trie
        b: PathBuf,
    },

    /// List every key in a trie
    Keys {
        /// The trie to read
        trie: PathBuf,
    },

    /// Show the value digest stored for a key
    Get {
        /// The trie to read
        trie: PathBuf,
        /// The key to look up
        key: String,
    },

    /// Show root digest, shape and integrity of a trie
    Inspect {
        /// The trie to read
        trie: PathBuf,
        /// Hex root digest the trie is expected to have
        #[arg(long)]
        expect_root: Option<String>,
    },
}

/// One line of a JSON batch file
#[derive(Debug, Deserialize)]
struct BatchEntry {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

impl From<BatchEntry> for Alteration {
    fn from(entry: BatchEntry) -> Self {
        Alteration {
            key: entry.key.into_bytes(),
            value: entry.value.map(String::into_bytes),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Build { batch, output } => {
            let batch = read_batch(batch)?;
            let trie = MerkleTrie::from_batch(&batch)?;
            write_trie(&cli, output, &trie)?;
            info!(keys = trie.len(), "built trie");
            emit(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "keys": trie.len(),
                    "root": root_hex(&trie),
                    "path": output.display().to_string()
                }),
            );
        }

        Commands::Alter {
            trie: path,
            batch,
            output,
        } => {
            let trie = read_trie(&cli, path)?;
            let batch = read_batch(batch)?;
            let altered = trie.alter(&batch)?;
            let output = output.as_ref().unwrap_or(path);
            write_trie(&cli, output, &altered)?;
            emit(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "applied": batch.len(),
                    "keys": altered.len(),
                    "previous_root": root_hex(&trie),
                    "root": root_hex(&altered),
                    "changed": trie.diff(&altered).to_strings()
                }),
            );
        }

        Commands::Diff { a, b } => {
            let a = read_trie(&cli, a)?;
            let b = read_trie(&cli, b)?;
            let diff = a.diff(&b);
            emit(
                cli.format,
                &serde_json::json!({
                    "count": diff.len(),
                    "keys": diff.to_strings()
                }),
            );
        }

        Commands::Keys { trie } => {
            let trie = read_trie(&cli, trie)?;
            let keys: Vec<_> = trie
                .keys()
                .iter()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .collect();
            emit(
                cli.format,
                &serde_json::json!({
                    "count": keys.len(),
                    "keys": keys
                }),
            );
        }

        Commands::Get { trie, key } => {
            let trie = read_trie(&cli, trie)?;
            match trie.get(key.as_bytes()) {
                Some(digest) => emit(
                    cli.format,
                    &serde_json::json!({
                        "key": key,
                        "digest": digest.to_hex()
                    }),
                ),
                None => {
                    emit(
                        cli.format,
                        &serde_json::json!({
                            "status": "error",
                            "message": format!("Key not found: {}", key)
                        }),
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Inspect {
            trie: path,
            expect_root,
        } => {
            let expected = expect_root
                .as_deref()
                .map(Digest::from_hex)
                .transpose()
                .context("parsing --expect-root")?;
            let trie = read_trie_unverified(&cli, path)?;
            let (kind, height) = match trie.root() {
                None => ("empty", 0),
                Some(node @ Node::Leaf(_)) => ("leaf", node.height()),
                Some(node @ Node::Branch(_)) => ("branch", node.height()),
            };
            let verified = trie.verify();
            emit(
                cli.format,
                &serde_json::json!({
                    "root": root_hex(&trie),
                    "kind": kind,
                    "keys": trie.len(),
                    "height": height,
                    "encoded_bytes": trie.root().map_or(0, Node::encoded_size),
                    "verified": verified.is_ok(),
                    "error": verified.err().map(|e| e.to_string()),
                    "root_matches": expected.map(|d| trie.root_digest() == Some(d))
                }),
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("MDELTA_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_batch(path: &Path) -> anyhow::Result<Vec<Alteration>> {
    let mut data = String::new();
    if path == Path::new("-") {
        std::io::stdin().read_to_string(&mut data)?;
    } else {
        data = std::fs::read_to_string(path)
            .with_context(|| format!("reading batch {}", path.display()))?;
    }
    let entries: Vec<BatchEntry> = serde_json::from_str(&data)
        .with_context(|| format!("parsing batch {}", path.display()))?;
    Ok(entries.into_iter().map(Alteration::from).collect())
}

fn read_trie(cli: &Cli, path: &Path) -> anyhow::Result<MerkleTrie> {
    let trie = if cli.raw {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading trie {}", path.display()))?;
        MerkleTrie::decode_verified(&bytes)?
    } else {
        Snapshot::load(path).with_context(|| format!("loading snapshot {}", path.display()))?
    };
    Ok(trie)
}

/// Load a trie keeping whatever digests it carries, for `inspect`
fn read_trie_unverified(cli: &Cli, path: &Path) -> anyhow::Result<MerkleTrie> {
    let trie = if cli.raw {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading trie {}", path.display()))?;
        MerkleTrie::decode(&bytes)?
    } else {
        Snapshot::load_unverified(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?
    };
    Ok(trie)
}

fn write_trie(cli: &Cli, path: &Path, trie: &MerkleTrie) -> anyhow::Result<()> {
    if cli.raw {
        std::fs::write(path, trie.encode()?)
            .with_context(|| format!("writing trie {}", path.display()))?;
    } else {
        Snapshot::with_level(cli.level).save(path, trie)?;
    }
    Ok(())
}

fn root_hex(trie: &MerkleTrie) -> Option<String> {
    trie.root_digest().map(|d| d.to_hex())
}

fn emit(format: OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => println!("{value}"),
        OutputFormat::Text => match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{value}"),
        },
    }
}
