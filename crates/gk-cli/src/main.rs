//! GreaseKit CLI
//!
//! Developer tool for exercising the pattern compiler outside a browser:
//! evaluate pattern lists, compile them to host-native match patterns, emit
//! guard code, rewrite CSP headers, and dry-run a synchronization against an
//! in-memory host.

use std::fs;

use clap::{Parser, Subcommand};

use gk_core::types::{RegisteredScript, StoredScript};
use gk_core::CspHeader;
use gk_sync::{MemoryHost, Passthrough, SyncEngine};

#[derive(Parser)]
#[command(name = "gk-cli")]
#[command(about = "GreaseKit pattern compiler and sync tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a pattern list against a URL
    Match {
        /// URL to test
        #[arg(short, long)]
        url: String,

        /// Raw patterns, in author order
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Compile a pattern list into host-native include/exclude sets
    Compile {
        /// Raw patterns, in author order
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Emit the JavaScript guard prologue for a pattern list
    Guard {
        /// Raw patterns, in author order
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Rewrite a CSP header so inline scripts may run
    Csp {
        /// Header value to rewrite
        #[arg(short = 'H', long)]
        header: String,
    },

    /// Print the sync plan for stored vs registered script JSON files
    Plan {
        /// JSON file with the stored script list
        #[arg(short, long)]
        stored: String,

        /// JSON file with the host's registered scripts
        #[arg(short, long)]
        registered: Option<String>,
    },

    /// Dry-run a full resynchronization against an in-memory host
    Sync {
        /// JSON file with the stored script list
        #[arg(short, long)]
        stored: String,

        /// JSON file seeding the host's registered scripts
        #[arg(short, long)]
        registered: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match { url, patterns } => cmd_match(&url, &patterns),
        Commands::Compile { patterns } => cmd_compile(&patterns),
        Commands::Guard { patterns } => cmd_guard(&patterns),
        Commands::Csp { header } => cmd_csp(&header),
        Commands::Plan { stored, registered } => cmd_plan(&stored, registered.as_deref()),
        Commands::Sync { stored, registered } => cmd_sync(&stored, registered.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_match(url: &str, patterns: &[String]) -> Result<(), String> {
    let matched = gk_core::evaluate(url, patterns);
    println!("{}", if matched { "match" } else { "no match" });
    Ok(())
}

fn cmd_compile(patterns: &[String]) -> Result<(), String> {
    let set = gk_compiler::compile(patterns);
    let json = serde_json::to_string_pretty(&set)
        .map_err(|e| format!("Failed to serialize pattern set: {e}"))?;
    println!("{json}");
    Ok(())
}

fn cmd_guard(patterns: &[String]) -> Result<(), String> {
    println!("{}", gk_compiler::guard_code(patterns));
    Ok(())
}

fn cmd_csp(header: &str) -> Result<(), String> {
    let mut parsed = CspHeader::parse(header);
    parsed.allow_inline_scripts();
    println!("{}", parsed.serialize());
    Ok(())
}

fn cmd_plan(stored_path: &str, registered_path: Option<&str>) -> Result<(), String> {
    let stored = load_stored(stored_path)?;
    let registered = match registered_path {
        Some(path) => load_registered(path)?,
        None => Vec::new(),
    };

    let plan = gk_sync::plan(&Passthrough, &stored, &registered)
        .map_err(|e| format!("Planning failed: {e}"))?;
    let json = serde_json::to_string_pretty(&plan)
        .map_err(|e| format!("Failed to serialize plan: {e}"))?;
    println!("{json}");
    Ok(())
}

async fn cmd_sync(stored_path: &str, registered_path: Option<&str>) -> Result<(), String> {
    let stored = load_stored(stored_path)?;
    let host = MemoryHost::new();
    if let Some(path) = registered_path {
        host.seed(load_registered(path)?);
    }

    let engine = SyncEngine::new(host, Passthrough);
    engine
        .resynchronize(stored)
        .await
        .map_err(|e| format!("Synchronization failed: {e}"))?;

    let now = engine.host().registered();
    println!("Registered {} script(s):", now.len());
    for entry in &now {
        println!("  {} matches={:?} excludes={:?}", entry.id, entry.matches, entry.exclude_matches);
    }
    Ok(())
}

fn load_stored(path: &str) -> Result<Vec<StoredScript>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid stored script JSON: {e}"))
}

fn load_registered(path: &str) -> Result<Vec<RegisteredScript>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid registered script JSON: {e}"))
}
