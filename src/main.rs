mod api;
mod auth;
mod balance;
mod catalog;
mod cli;
mod config;
mod model;
mod notify;
mod session;
mod storage;
mod storefront;
#[cfg(test)]
mod testing;
mod transcript;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tickpay", about = "TickPay digital goods storefront")]
pub struct Args {
    #[arg(short, long, help = "Run one command (e.g. \"/deposit 500\") and exit")]
    pub command: Option<String>,

    #[arg(long, env = "TICKPAY_AUTH_URL", help = "Auth endpoint URL")]
    pub auth_url: Option<String>,

    #[arg(long, env = "TICKPAY_BALANCE_URL", help = "Balance endpoint URL")]
    pub balance_url: Option<String>,

    #[arg(long, help = "Session storage file")]
    pub storage: Option<PathBuf>,

    #[arg(long, help = "Guest mode: keep the session in memory only")]
    pub ephemeral: bool,

    #[arg(long, help = "Activity log directory")]
    pub activity_dir: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Echo activity events to stderr")]
    pub trace: bool,

    #[arg(long, help = "Debug output (print resolved settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config: {}", e);
            config::Config::default()
        })
    };

    // CLI flags and env take priority over config files
    if let Some(url) = &args.auth_url {
        cfg.endpoints.auth_url = Some(url.clone());
    }
    if let Some(url) = &args.balance_url {
        cfg.endpoints.balance_url = Some(url.clone());
    }
    if let Some(path) = &args.storage {
        cfg.storage.path = Some(path.clone());
    }
    if let Some(dir) = &args.activity_dir {
        cfg.storage.activity_dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!("Invalid configuration"));
    }

    let (store, storage_label): (Box<dyn storage::KvStore>, String) = if args.ephemeral {
        (Box::new(storage::MemoryStore::new()), "<memory>".to_string())
    } else {
        let opened = cfg
            .storage
            .resolved_path()
            .ok_or_else(|| anyhow::anyhow!("cannot locate home directory; pass --storage"))
            .and_then(|path| {
                let store = storage::FileStore::open(&path)
                    .with_context(|| format!("opening {}", path.display()))?;
                Ok((store, path))
            });
        match opened {
            Ok((store, path)) => (Box::new(store), path.display().to_string()),
            Err(e) => {
                eprintln!("Warning: session storage unavailable, using memory: {:#}", e);
                (Box::new(storage::MemoryStore::new()), "<memory>".to_string())
            }
        }
    };

    let run_id = uuid::Uuid::new_v4().to_string();
    let mut log = match cfg.storage.resolved_activity_dir() {
        Some(dir) => std::fs::create_dir_all(&dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| {
                transcript::Transcript::new(&dir.join(format!("{}.jsonl", run_id)), &run_id)
            })
            .unwrap_or_else(|e| {
                eprintln!("Warning: activity log disabled: {}", e);
                transcript::Transcript::in_memory(&run_id)
            }),
        None => transcript::Transcript::in_memory(&run_id),
    };
    log.set_echo(args.trace);

    if args.debug {
        eprintln!("[DEBUG] Auth endpoint: {}", cfg.endpoints.auth_url());
        eprintln!("[DEBUG] Balance endpoint: {}", cfg.endpoints.balance_url());
        eprintln!("[DEBUG] Storage: {}", storage_label);
        eprintln!(
            "[DEBUG] Activity log: {}",
            log.path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        );
    }

    let backend = api::HttpBackend::new(cfg.endpoints.auth_url(), cfg.endpoints.balance_url());
    let mut front = storefront::Storefront::new(backend, store, log);
    front.load();

    let ctx = cli::Context {
        config: cfg,
        storefront: RefCell::new(front),
    };

    if let Some(command) = &args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
