//! # Patricia CLI
//!
//! Command-line interface for computing tree roots and proofs, and for
//! maintaining a file-backed tree.
//!
//! Usage:
//!   patricia root <changes.json>
//!   patricia prove <changes.json> <key>
//!   patricia apply <changes.json>
//!   patricia get <key>
//!   patricia show
//!
//! Examples:
//!   patricia -c patricia.toml apply demos/puppy.json
//!   patricia -v get 646f6700

use clap::{Parser, Subcommand};
use patricia_error::Result;
use patricia_tree::{
    apply_changes, BasePatriciaTree, FileKeyValueStore, Hash256, MemoryDataSource, PatriciaTree,
    PersistentDataSource, Proof, Sha3ValueEncoder, TreeNode,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod state;

use config::CliConfig;
use input::{parse_key, ChangeFile};
use state::TreeState;

/// Byte keys, string values stored as their SHA3-256
type CliEncoder = Sha3ValueEncoder<Vec<u8>, String>;

type FileBase = BasePatriciaTree<CliEncoder, PersistentDataSource<FileKeyValueStore>>;

const DEFAULT_CONFIG_FILE: &str = "patricia.toml";

#[derive(Parser)]
#[command(name = "patricia")]
#[command(author, version, about = "Compact Merkle Patricia tree tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./patricia.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging and node details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only print results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the root of the tree built from a change file
    Root {
        /// Path to the change file
        file: PathBuf,
    },
    /// Look a key up in the tree built from a change file and verify its proof
    Prove {
        /// Path to the change file
        file: PathBuf,

        /// Hex key
        key: String,
    },
    /// Apply a change file to the persisted tree
    Apply {
        /// Path to the change file
        file: PathBuf,
    },
    /// Look a key up in the persisted tree
    Get {
        /// Hex key
        key: String,
    },
    /// Show the persisted root and node count
    Show,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&cli, &config);

    if let Err(e) = run(&cli, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli, config: &CliConfig) {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(cli: &Cli) -> Result<CliConfig> {
    if let Some(path) = &cli.config {
        return CliConfig::from_file(path);
    }

    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        return CliConfig::from_file(path);
    }
    Ok(CliConfig::default())
}

fn run(cli: &Cli, config: &CliConfig) -> Result<()> {
    match &cli.command {
        Commands::Root { file } => {
            let tree = build_tree(config, file)?;
            println!("{}", tree.root());
        }

        Commands::Prove { file, key } => {
            let (root, proof) = prove_key(config, file, key)?;

            match proof.value {
                Some(value) => println!("value:    {}", value),
                None => println!("value:    not found"),
            }
            if !cli.quiet {
                println!("root:     {}", root);
                println!("nodes:    {}", proof.nodes.len());
                for (depth, node) in proof.nodes.iter().enumerate() {
                    println!("  {:>2}: {}", depth, describe_node(node, cli.verbose));
                }
            }
            println!("verified: {}", proof.verify(&root));
        }

        Commands::Apply { file } => {
            let (state, moved) = apply_file(config, file)?;
            println!("{}", state.root);
            if !cli.quiet {
                println!("nodes written: {}", moved);
                println!("nodes stored:  {}", state.node_count);
            }
        }

        Commands::Get { key } => match get_persisted(config, key)? {
            Some(value) => println!("{}", value),
            None => println!("not found"),
        },

        Commands::Show => {
            let state = TreeState::load(&config.state_path())?;
            println!("root:  {}", state.root);
            println!("nodes: {}", state.node_count);
        }
    }

    Ok(())
}

/// Build an in-memory tree from a change file
fn build_tree(config: &CliConfig, file: &Path) -> Result<PatriciaTree<CliEncoder, MemoryDataSource>> {
    let changes = ChangeFile::from_file(file)?.to_change_set(config.key_size)?;

    let mut tree = PatriciaTree::new(MemoryDataSource::new());
    apply_changes(&mut tree, &changes)?;
    Ok(tree)
}

/// Root of the tree built from a change file and the proof for `key`
fn prove_key(config: &CliConfig, file: &Path, key: &str) -> Result<(Hash256, Proof)> {
    let tree = build_tree(config, file)?;
    let key = parse_key(key, config.key_size)?;
    Ok((tree.root(), tree.prove(&key)?))
}

fn open_base(config: &CliConfig, state: &TreeState) -> Result<FileBase> {
    let store = FileKeyValueStore::open(config.nodes_dir())?;
    let backing = PersistentDataSource::with_size(store, state.node_count);
    BasePatriciaTree::with_root(backing, state.root)
}

/// Apply a change file through rebase, commit and flush, then save the new
/// state. Returns the state and the number of nodes flushed.
fn apply_file(config: &CliConfig, file: &Path) -> Result<(TreeState, usize)> {
    let changes = ChangeFile::from_file(file)?.to_change_set(config.key_size)?;
    let state_path = config.state_path();
    let state = TreeState::load(&state_path)?;

    let mut base = open_base(config, &state)?;
    let mut delta = base.rebase()?;
    delta.apply(&changes)?;
    delta.set_checkpoint()?;
    base.commit()?;
    let moved = base.flush()?;

    let node_count = {
        let mut source = base.data_source_mut();
        let count = source.backing().store().keys()?.len() as u64;
        source.backing_mut().set_size(count);
        count
    };

    let state = TreeState {
        root: base.root(),
        node_count,
    };
    state.save(&state_path)?;

    info!(root = %state.root, nodes = node_count, "applied change file");
    Ok((state, moved))
}

fn get_persisted(config: &CliConfig, key: &str) -> Result<Option<Hash256>> {
    let key = parse_key(key, config.key_size)?;
    let state = TreeState::load(&config.state_path())?;
    open_base(config, &state)?.get(&key)
}

fn describe_node(node: &TreeNode, verbose: bool) -> String {
    let kind = match node {
        TreeNode::Empty => "empty",
        TreeNode::Leaf(_) => "leaf",
        TreeNode::Branch(_) => "branch",
    };

    let mut line = format!("{:<6} {} {}", kind, node.hash(), node.path());
    if verbose {
        match node {
            TreeNode::Leaf(leaf) => line.push_str(&format!(" value {}", leaf.value())),
            TreeNode::Branch(branch) => {
                let links: Vec<String> = branch.link_indexes().map(|i| format!("{:X}", i)).collect();
                line.push_str(&format!(" links [{}]", links.join(" ")));
            }
            TreeNode::Empty => {}
        }
    }
    line
}
