//! Binary entrypoint for the skilltree operator CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directories
//! - `validate` - load every skill tree seed and report integrity problems
//! - `tree <skill>` - list a tree's nodes and prerequisite edges
//! - `status <character> [skill]` - show balances and node states
//! - `grant <character> <skill> <tier> <amount>` - credit tokens
//! - `preview|unlock <character> <skill> <node>` - price or buy the next level
//! - `reset <character> [skill]` - reset one tree, or every tree of a character
//!
//! See the library crate docs for module-level details: `skilltree::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};

use skilltree::config::Config;
use skilltree::skills::{
    format_ledger, format_refund, format_tier_amounts, format_tree_status, format_unlock,
    SkillRegistry, SkillService, SkillStore, SkillTreeError, TokenTier,
};

#[derive(Parser)]
#[command(name = "skilltree")]
#[command(about = "Skill tree progression engine for island game servers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create data directories
    Init,
    /// Load and validate every skill tree seed
    Validate,
    /// List the nodes and edges of a skill tree
    Tree {
        skill: String,
    },
    /// Show token balances and node states for a character
    Status {
        character: String,
        /// Limit output to one skill
        skill: Option<String>,
    },
    /// Credit tokens to a character's ledger for a skill
    Grant {
        character: String,
        skill: String,
        /// basic, advanced or master (or b/a/m)
        tier: TokenTier,
        amount: u64,
    },
    /// Show what the next unlock of a node would cost
    Preview {
        character: String,
        skill: String,
        node: String,
    },
    /// Unlock or upgrade a node by one level
    Unlock {
        character: String,
        skill: String,
        node: String,
    },
    /// Reset a skill tree and refund ordinary nodes
    Reset {
        character: String,
        /// Reset only this skill; every stored skill when omitted
        skill: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new skilltree configuration");
        let cfg = Config::default();
        Config::create_default(&cli.config).await?;
        tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
        tokio::fs::create_dir_all(&cfg.skills.seed_dir).await?;
        info!("Configuration file created at {}", cli.config);
        info!("Place skill tree seeds in {}", cfg.skills.seed_dir);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    if let Commands::Validate = cli.command {
        match SkillRegistry::load_dir(&config.skills.seed_dir) {
            Ok(registry) => {
                for tree in registry.trees() {
                    println!(
                        "{} ({}): {} nodes, {} edges, root {}",
                        tree.id(),
                        tree.name(),
                        tree.node_count(),
                        tree.edges().len(),
                        tree.root()
                    );
                }
                println!("{} skill tree(s) valid", registry.len());
                return Ok(());
            }
            Err(e) => {
                error!("Skill tree validation failed: {}", e);
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    let service = open_service(&config)?;
    match run(&service, cli.command) {
        Ok(()) => Ok(()),
        Err(e) if e.is_player_error() => {
            println!("Refused: {e}");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn open_service(config: &Config) -> Result<SkillService> {
    let registry = SkillRegistry::load_dir(&config.skills.seed_dir)?;
    let store = SkillStore::open(config.storage.db_path())?;
    info!(
        "Loaded {} skill tree(s); state at {}",
        registry.len(),
        config.storage.db_path().display()
    );
    Ok(SkillService::new(registry, store).with_policy(config.progression.dormant_reunlock))
}

fn run(service: &SkillService, command: Commands) -> Result<(), SkillTreeError> {
    match command {
        Commands::Init | Commands::Validate => {}
        Commands::Tree { skill } => {
            let tree = service.registry().require(&skill)?;
            println!("{} ({}), root {}", tree.id(), tree.name(), tree.root());
            for node in tree.nodes() {
                let costs: Vec<String> = node.costs.iter().map(|c| c.to_string()).collect();
                println!(
                    "  {} \"{}\" max {} cost [{}] {} @({},{}){}",
                    node.id,
                    node.name,
                    node.max_level,
                    costs.join(","),
                    node.required_tier,
                    node.anchor.x,
                    node.anchor.y,
                    if node.special { " special" } else { "" }
                );
            }
            for edge in tree.edges() {
                println!("  {} -> {} (level {})", edge.from, edge.to, edge.min_level);
            }
        }
        Commands::Status { character, skill } => {
            let skills = match skill {
                Some(skill) => vec![skill],
                None => service.stored_skills(&character)?,
            };
            if skills.is_empty() {
                println!("{} has no skill progress yet", character);
            }
            for skill in skills {
                let state = service.state(&character, &skill)?;
                println!("{} [{}]", skill, format_ledger(&state.ledger));
                println!("{}", format_tree_status(&service.tree_status(&character, &skill)?));
            }
        }
        Commands::Grant {
            character,
            skill,
            tier,
            amount,
        } => {
            let balances = service.grant(&character, &skill, tier, amount)?;
            println!("{} {}: {}", character, skill, format_tier_amounts(&balances));
        }
        Commands::Preview {
            character,
            skill,
            node,
        } => {
            let preview = service.preview(&character, &skill, &node)?;
            println!(
                "{} {} -> {}: {} {}{} ({})",
                preview.node_id,
                preview.current_level,
                preview.next_level,
                preview.cost,
                preview.tier,
                if preview.restores_dormant { ", restores dormant level" } else { "" },
                if preview.affordable { "affordable" } else { "not affordable" }
            );
        }
        Commands::Unlock {
            character,
            skill,
            node,
        } => {
            let outcome = service.unlock(&character, &skill, &node)?;
            println!("{}", format_unlock(&outcome));
            println!("balance {}", format_tier_amounts(&outcome.balances));
        }
        Commands::Reset { character, skill } => match skill {
            Some(skill) => {
                let outcome = service.reset(&character, &skill)?;
                println!("{}: {}", skill, format_refund(&outcome));
            }
            None => {
                for (skill, outcome) in service.reset_all(&character)? {
                    println!("{}: {}", skill, format_refund(&outcome));
                }
            }
        },
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
