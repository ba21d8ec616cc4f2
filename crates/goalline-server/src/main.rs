//! Goal Line Report server binary.
//!
//! Reads `goalline.toml` (or the path given with `--config`), opens the
//! SQLite store and either serves the JSON API with the feed scheduler and
//! mail dispatcher running in the background, or runs one administrative
//! command and exits.
//!
//! # Examples
//!
//! ```text
//! goalline serve
//! goalline init-sources --force
//! goalline fetch-feeds --source bbc_sport
//! echo 'correct horse' | goalline create-account --username chief \
//!   --email chief@example.com --role chief_editor
//! ```

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use goalline_api::{AppState, Newsroom, auth::hash_password, newsroom::Registration};
use goalline_core::{account::Role, feed::HealthStatus, feed::SourceKind};
use goalline_feeds::{FeedFetcher, spawn_scheduler};
use goalline_notify::{DeliveryPolicy, LogMailer, Mailer, spawn_dispatcher};
use goalline_store_sqlite::SqliteStore;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Goal Line Report news server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "goalline.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create the built-in feed sources.
  InitSources {
    /// Delete every source, with its items and logs, first.
    #[arg(long)]
    force: bool,
  },
  /// Fetch one source, or every active source.
  FetchFeeds {
    #[arg(long)]
    source: Option<SourceKind>,
  },
  /// Archive old items and delete old archived items.
  CleanupFeeds {
    #[arg(long)]
    archive_after_days: Option<i64>,
    #[arg(long)]
    delete_after_days:  Option<i64>,
  },
  /// Print the feed health report. Exits non-zero on `error`.
  Health,
  /// Create an account. The password is read from stdin.
  CreateAccount {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email:    String,
    #[arg(long, default_value = "customer")]
    role:     Role,
  },
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Serve);

  if let Command::HashPassword = command {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)?;
  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let store = Arc::new(store);
  let fetcher = FeedFetcher::new(Arc::clone(&store), cfg.feeds.clone())
    .context("failed to build feed fetcher")?;

  match command {
    Command::Serve => serve(cfg, store, fetcher).await,
    Command::InitSources { force } => {
      let sources = fetcher.init_sources(force).await?;
      for source in sources {
        println!("{:<12} {:<24} {}", source.kind.as_ref(), source.name, source.feed_url);
      }
      Ok(())
    }
    Command::FetchFeeds { source: Some(kind) } => {
      match fetcher.fetch_kind(kind).await? {
        Some(outcome) => print_json(&outcome),
        None => anyhow::bail!("{kind} is already being fetched"),
      }
    }
    Command::FetchFeeds { source: None } => {
      print_json(&fetcher.fetch_all_active().await?)
    }
    Command::CleanupFeeds {
      archive_after_days,
      delete_after_days,
    } => {
      let report = fetcher
        .cleanup_with(
          archive_after_days.unwrap_or(cfg.feeds.archive_after_days),
          delete_after_days.unwrap_or(cfg.feeds.delete_after_days),
        )
        .await?;
      print_json(&report)
    }
    Command::Health => {
      let report = fetcher.health().await?;
      print_json(&report)?;
      if report.status == HealthStatus::Error {
        anyhow::bail!("feed ingestion is unhealthy");
      }
      Ok(())
    }
    Command::CreateAccount {
      username,
      email,
      role,
    } => {
      let password = read_password()?;
      let (outbox, dispatcher) = spawn_dispatcher(LogMailer, DeliveryPolicy::from(&cfg.mail));
      let newsroom = Newsroom::new(store, Arc::new(outbox), cfg.newsroom());
      let member = newsroom
        .register(Registration { username, email, password }, role)
        .await?;
      drop(newsroom);
      dispatcher.finish().await?;
      println!("created {} ({})", member.account.username, member.profile.role);
      Ok(())
    }
    // Handled before the store is opened.
    Command::HashPassword => Ok(()),
  }
}

async fn serve(
  cfg: ServerConfig,
  store: Arc<SqliteStore>,
  fetcher: FeedFetcher<SqliteStore>,
) -> anyhow::Result<()> {
  let mailer = Mailer::from_config(&cfg.mail).context("failed to configure mail transport")?;
  let (outbox, dispatcher) = spawn_dispatcher(mailer, DeliveryPolicy::from(&cfg.mail));

  let fetcher = Arc::new(fetcher);
  let scheduler = spawn_scheduler(Arc::clone(&fetcher));

  let state = AppState {
    newsroom: Arc::new(Newsroom::new(store, Arc::new(outbox), cfg.newsroom())),
    feeds:    fetcher,
  };
  let app = goalline_api::router(state).layer(TraceLayer::new_for_http());
  let address = cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  info!("shutting down");
  scheduler.stop().await.context("scheduler did not stop cleanly")?;
  dispatcher.finish().await.context("mail dispatcher did not drain")?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Read one line from stdin as the password.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
