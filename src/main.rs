//! Command-line front end for the URL shortener.
//!
//! # Usage
//!
//! ```bash
//! # Register an anonymous user and print its token
//! shortener user register
//!
//! # Shorten one URL (registers a user if no token is given)
//! shortener --token "$TOKEN" shorten https://example.com/a/long/path
//!
//! # Shorten a batch: [{"correlation_id": "1", "original_url": "https://..."}]
//! shortener --token "$TOKEN" batch urls.json
//!
//! # Resolve, list and delete
//! shortener get aBcDeFgH
//! shortener --token "$TOKEN" list
//! shortener --token "$TOKEN" delete aBcDeFgH xYzXyZxY -y
//! ```
//!
//! # Environment Variables
//!
//! See [`url_shortener::config`]. `SHORTENER_TOKEN` supplies `--token`.

use url_shortener::app::{self, App};
use url_shortener::application::dto::BatchItem;
use url_shortener::config::{Config, ConfigOverrides};
use url_shortener::error::AppError;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Shorten URLs and manage your short links.
#[derive(Parser)]
#[command(name = "shortener")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session token issued by `user register`
    #[arg(long, env = "SHORTENER_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Prefix of generated short links
    #[arg(short = 'b', long, global = true)]
    base_url: Option<String>,

    /// Snapshot file for the file store
    #[arg(short = 'f', long, global = true)]
    file_storage_path: Option<PathBuf>,

    /// PostgreSQL connection string
    #[arg(short = 'd', long, global = true)]
    database_dsn: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log the effective configuration
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Shorten a URL
    Shorten {
        /// URL to shorten
        url: String,
    },

    /// Shorten every URL listed in a JSON file
    Batch {
        /// File holding `[{"correlation_id": ..., "original_url": ...}]`
        file: PathBuf,
    },

    /// Resolve a slug to its original URL
    Get {
        slug: String,
    },

    /// List your short links
    List,

    /// Delete some of your short links
    Delete {
        /// Slugs to delete
        #[arg(required = true)]
        slugs: Vec<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Check storage connectivity
    Ping,
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new anonymous user
    Register,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &anyhow::Error) {
    match e.downcast_ref::<AppError>() {
        Some(app_error) => {
            eprintln!(
                "{} {}",
                format!("error[{}]:", app_error.code()).red().bold(),
                app_error
            );
            let details = app_error.details();
            if details.as_object().is_some_and(|d| !d.is_empty()) {
                eprintln!("  {}", details.to_string().bright_black());
            }
        }
        None => eprintln!("{} {:#}", "error:".red().bold(), e),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    config.apply_overrides(ConfigOverrides {
        base_url: cli.base_url,
        file_storage_path: cli.file_storage_path,
        database_dsn: cli.database_dsn,
    });
    config.validate()?;

    init_tracing(&config);
    if cli.verbose {
        config.print_summary();
    }

    let app = app::start(&config).await?;
    let output = Output { json: cli.json };

    let result = dispatch(&app, cli.command, cli.token.as_deref(), &output).await;

    app.shutdown().await?;
    result
}

async fn dispatch(app: &App, command: Commands, token: Option<&str>, out: &Output) -> Result<()> {
    let state = &app.state;

    match command {
        Commands::User {
            action: UserAction::Register,
        } => {
            let session = state.sessions.register().await?;
            out.value(&session_json(&session.user.id, &session.token), || {
                println!("{}", "User registered".green().bold());
                println!("  ID:    {}", session.user.id.cyan());
                println!("  Token: {}", session.token.bright_yellow());
                println!();
                println!("  export SHORTENER_TOKEN={}", session.token);
            })?;
        }

        Commands::Shorten { url } => {
            let session = state.sessions.authenticate_or_register(token).await?;
            announce_new_session(&session);

            let outcome = state.links.shorten(&session.user.id, &url).await?;
            out.value(&outcome, || {
                if outcome.is_created() {
                    println!("{} {}", "Created".green().bold(), outcome.short_url().cyan());
                } else {
                    println!(
                        "{} {}",
                        "Already shortened".yellow().bold(),
                        outcome.short_url().cyan()
                    );
                }
            })?;
        }

        Commands::Batch { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let items: Vec<BatchItem> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid batch", file.display()))?;

            let session = state.sessions.authenticate_or_register(token).await?;
            announce_new_session(&session);

            let results = state.links.shorten_batch(&session.user.id, items).await?;
            out.value(&results, || {
                for item in &results {
                    println!("  {:<20} {}", item.correlation_id.bright_black(), item.short_url.cyan());
                }
                println!();
                println!("  Total: {}", results.len().to_string().bright_white().bold());
            })?;
        }

        Commands::Get { slug } => {
            let original = state.links.resolve(&slug).await?;
            out.value(&serde_json::json!({ "slug": slug, "original_url": original }), || {
                println!("{}", original);
            })?;
        }

        Commands::List => {
            let user = state.sessions.authenticate(require_token(token)?).await?;
            let urls = state.links.list_user_urls(&user.id).await?;

            out.value(&urls, || {
                if urls.is_empty() {
                    println!("{}", "  No short links found".yellow());
                    return;
                }
                println!(
                    "  {:<40} {}",
                    "Short URL".bright_white().bold(),
                    "Original URL".bright_white().bold()
                );
                println!("  {}", "─".repeat(75).bright_black());
                for url in &urls {
                    println!("  {:<40} {}", url.short_url.cyan(), url.original_url);
                }
                println!();
                println!("  Total: {}", urls.len().to_string().bright_white().bold());
            })?;
        }

        Commands::Delete { slugs, yes } => {
            let user = state.sessions.authenticate(require_token(token)?).await?;

            if !yes && !out.json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete {} short link(s)?", slugs.len()))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "Cancelled".red());
                    return Ok(());
                }
            }

            let accepted = state.links.request_deletion(&user.id, slugs).await?;
            out.value(&serde_json::json!({ "accepted": accepted }), || {
                println!(
                    "{} {} deletion request(s)",
                    "Accepted".green().bold(),
                    accepted
                );
            })?;
        }

        Commands::Ping => {
            state.links.ping().await?;
            out.value(&serde_json::json!({ "status": "ok" }), || {
                println!("{}", "Storage is reachable".green());
            })?;
        }
    }

    Ok(())
}

fn require_token(token: Option<&str>) -> Result<&str> {
    token.ok_or_else(|| {
        AppError::unauthorized(
            "A session token is required; pass --token or set SHORTENER_TOKEN",
            serde_json::json!({}),
        )
        .into()
    })
}

fn session_json(user_id: &str, token: &str) -> serde_json::Value {
    serde_json::json!({ "user_id": user_id, "token": token })
}

fn announce_new_session(session: &url_shortener::application::services::Session) {
    if session.registered {
        eprintln!(
            "{} {}",
            "New user registered, token:".yellow(),
            session.token.bright_yellow()
        );
    }
}

struct Output {
    json: bool,
}

impl Output {
    /// Prints `value` as JSON in `--json` mode, otherwise runs `human`.
    fn value<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}
