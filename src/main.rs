//! Binary entrypoint for the Omegahunt CLI.
//!
//! Commands:
//! - `start [--bind <addr>]` - run the HTTP hunt server
//! - `init` - write a starter `config.toml`
//! - `status` - print the puzzle catalog and effective configuration
//! - `play [--session <id>]` - drive the dispatcher from the terminal, one line per message
//!
//! See the library crate docs for module-level details: `omegahunt::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use omegahunt::config::{Config, API_KEY_ENV};
use omegahunt::hunt::catalog::Catalog;
use omegahunt::hunt::dispatch::{ChatDispatcher, ChatRequest};
use omegahunt::hunt::HuntServer;

#[derive(Parser)]
#[command(name = "omegahunt")]
#[command(about = "Puzzle hunt chat server with a language model fallback")]
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
    /// Start the HTTP hunt server
    Start {
        /// Listen address, overrides `server.bind` (e.g., 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// Show the puzzle catalog and effective configuration
    Status,
    /// Play in the terminal against the same dispatcher the server uses
    Play {
        /// Resume an existing session id instead of generating one
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(None, cli.verbose);
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let loaded = Config::load(&cli.config).await;
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => {
            let mut config = Config::default();
            config.oracle.apply_env();
            config
        }
    };
    init_logging(Some(&config), cli.verbose);
    if let Err(e) = loaded {
        warn!("{} (continuing with defaults)", e);
    }

    match cli.command {
        Commands::Start { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            info!("Starting Omegahunt v{}", env!("CARGO_PKG_VERSION"));
            if config.oracle.enabled && config.oracle.api_key.is_empty() {
                warn!(
                    "No oracle API key (set oracle.api_key or {}); free-form chat will fail",
                    API_KEY_ENV
                );
            }
            HuntServer::new(config).run().await?;
        }
        Commands::Status => show_status(&config),
        Commands::Play { session } => play(&config, session).await?,
        Commands::Init => {}
    }

    Ok(())
}

fn show_status(config: &Config) {
    let catalog = Catalog::standard();
    println!("Omegahunt v{}", env!("CARGO_PKG_VERSION"));
    println!("Listen: http://{}{}", config.server.bind, config.server.chat_path);
    println!(
        "Oracle: {} model={} timeout={}s retry={} key={}",
        if config.oracle.enabled { "enabled" } else { "disabled" },
        config.oracle.model,
        config.oracle.timeout_seconds,
        config.oracle.retry,
        if config.oracle.api_key.is_empty() { "missing" } else { "set" }
    );
    println!("Help order: {:?}", config.hunt.help_order);
    println!("Chains:");
    for chain in catalog.chains() {
        println!(
            "  {:<9} {} steps -> [ {} ]",
            chain.name,
            chain.step_count(),
            chain.encoded
        );
    }
}

async fn play(config: &Config, session: Option<String>) -> Result<()> {
    let dispatcher = ChatDispatcher::from_config(config);
    let mut session_id = session;
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"OMEGA INTERFACE ONLINE. AWAITING DIRECTIVE... (/help, Ctrl-D to exit)\n> ")
        .await?;
    stdout.flush().await?;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        let request = ChatRequest {
            message: line,
            session_id: session_id.clone(),
        };
        let out = match dispatcher.handle(request).await {
            Ok(reply) => {
                session_id = Some(reply.session_id.clone());
                let mut out = reply.reply;
                if reply.mission_complete == Some(true) {
                    out.push_str("\n[MISSION COMPLETE]");
                }
                out
            }
            Err(e) => e.public_message(),
        };
        stdout.write_all(format!("{}\n> ", out).as_bytes()).await?;
        stdout.flush().await?;
    }
    stdout.write_all(b"\n").await?;
    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
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
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
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
