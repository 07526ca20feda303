//! yuletide server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `YULETIDE_*` environment variables, opens the SQLite store, and serves
//! either the snowball wall or the New Year bell.
//!
//! # Creating a superuser
//!
//! ```text
//! echo 'correct horse battery' | yuletide create-user admin admin@example.com --superuser
//! ```

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use yuletide_core::{
  account::{NewAccount, Signup, SignupOutcome},
  store::AccountStore as _,
};
use yuletide_server::{AppKind, ServerConfig, expand_tilde};
use yuletide_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Yuletide seasonal sites")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve one of the sites over HTTP.
  Serve {
    /// Overrides the `app` configuration key.
    #[arg(long, value_enum)]
    app: Option<AppKind>,
  },
  /// Create an account; the password is read from stdin.
  CreateUser {
    username:  String,
    email:     String,
    /// Exempt the account from the one-submission rules.
    #[arg(long)]
    superuser: bool,
  },
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("YULETIDE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Serve { app } => serve(server_cfg, store, app).await,
    Command::CreateUser { username, email, superuser } => {
      create_user(store, &username, &email, superuser).await
    }
  }
}

async fn serve(cfg: ServerConfig, store: SqliteStore, app: Option<AppKind>) -> anyhow::Result<()> {
  let kind = app.unwrap_or(cfg.app);
  let api_config = cfg.api_config().context("invalid configuration")?;
  let store = Arc::new(store);
  let router = match kind {
    AppKind::Wall => yuletide_api::wall_router(store, api_config),
    AppKind::Bell => yuletide_api::bell_router(store, api_config),
  }
  .layer(TraceLayer::new_for_http());

  let address = cfg.address();
  tracing::info!(app = ?kind, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(
    listener,
    router.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .with_graceful_shutdown(shutdown_signal())
  .await
  .context("server error")?;

  Ok(())
}

async fn create_user(
  store: SqliteStore,
  username: &str,
  email: &str,
  superuser: bool,
) -> anyhow::Result<()> {
  let password = read_password()?;
  let signup = Signup::parse(username, email, &password).context("invalid account details")?;
  let password_hash = yuletide_api::auth::hash_password(&signup.password)?;

  let outcome = store
    .create_account(NewAccount {
      username: signup.username,
      email: signup.email,
      password_hash,
      is_superuser: superuser,
    })
    .await
    .context("failed to create account")?;

  match outcome {
    SignupOutcome::Created(account) => {
      tracing::info!(username = %account.username, superuser, "account created");
      Ok(())
    }
    SignupOutcome::UsernameTaken => anyhow::bail!("username {username:?} is already taken"),
    SignupOutcome::EmailTaken => anyhow::bail!("email {email:?} is already registered"),
  }
}

/// Read one password line from stdin; the prompt goes to stderr.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    tracing::info!("Received Ctrl+C, shutting down");
  }
}
