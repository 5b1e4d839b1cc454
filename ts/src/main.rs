//! taskstore - inspect a todone state directory

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};

use taskstore::Store;

#[derive(Parser)]
#[command(name = "taskstore", about = "Inspect namespaced todone state", version)]
struct Cli {
    /// Store directory (defaults to the todone data directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stored keys
    Keys {
        /// Only keys starting with this prefix
        prefix: Option<String>,
    },
    /// Print the value stored under a key
    Get {
        key: String,
        /// Pretty-print JSON values
        #[arg(long)]
        pretty: bool,
    },
    /// Remove a key
    Remove { key: String },
}

fn default_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("todone"))
        .unwrap_or_else(|| PathBuf::from(".todone"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli.path.unwrap_or_else(default_path);
    let mut store = Store::open(&path).context(format!("Failed to open store at {}", path.display()))?;

    match cli.command {
        Command::Keys { prefix } => {
            for key in store.keys(prefix.as_deref())? {
                let updated = store.updated_at(&key)?.unwrap_or_default();
                println!("{}  {}", key.bold(), updated.to_string().dimmed());
            }
        }
        Command::Get { key, pretty } => match store.get_raw(&key)? {
            Some(raw) if pretty => {
                let value: serde_json::Value = serde_json::from_str(&raw).context("Value is not valid JSON")?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            Some(raw) => println!("{}", raw),
            None => {
                eprintln!("{} {}", "No value for".yellow(), key);
                std::process::exit(1);
            }
        },
        Command::Remove { key } => {
            if store.remove(&key)? {
                println!("{} {}", "Removed".green(), key);
            } else {
                println!("{} {}", "Not found:".yellow(), key);
            }
        }
    }

    Ok(())
}
