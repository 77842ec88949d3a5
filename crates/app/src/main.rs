use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use api::{AppState, build_router};
use chrono::{Days, FixedOffset, Weekday};
use clap::{Args, Parser, Subcommand};
use planner_core::model::Priority;
use planner_core::time::{Clock, parse_utc_offset};
use services::{AppServices, Locale, NewStudyItem, PlanRequest, PlannerSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "study-planner")]
#[command(about = "Study item and session planner served over HTTP")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// SQLite URL or file path
    #[arg(long = "db", global = true, default_value = "study-planner.sqlite3", env = "PLANNER_DB_URL")]
    db: String,

    /// Offset used as local time, e.g. +09:00
    #[arg(long, global = true, default_value = "Z", env = "PLANNER_UTC_OFFSET", value_parser = parse_utc_offset)]
    utc_offset: FixedOffset,

    /// First day of the calendar week
    #[arg(long, global = true, default_value = "sun", env = "PLANNER_WEEK_START")]
    week_start: Weekday,

    /// Locale used when a request names none
    #[arg(long, global = true, default_value = "ja", env = "PLANNER_LOCALE")]
    locale: Locale,

    /// Log filter; RUST_LOG syntax
    #[arg(long, global = true, env = "RUST_LOG")]
    log: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000", env = "PLANNER_BIND")]
        bind: SocketAddr,
    },
    /// Insert a few demo study items with generated plans
    Seed,
}

impl GlobalArgs {
    fn settings(&self) -> PlannerSettings {
        PlannerSettings {
            utc_offset: self.utc_offset,
            week_start: self.week_start,
            default_locale: self.locale,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.global.log.as_deref() {
        Some(directives) => EnvFilter::try_new(directives).context("invalid --log filter")?,
        None => EnvFilter::new("info,tower_http=debug"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting study-planner v{}", env!("CARGO_PKG_VERSION"));

    let db_url = normalize_sqlite_url(&cli.global.db);
    prepare_sqlite_file(&db_url)?;
    info!(%db_url, "opening database");

    let settings = cli.global.settings();
    let services = AppServices::new_sqlite(&db_url, Clock::default_clock(), &settings)
        .await
        .with_context(|| format!("failed to open {db_url}"))?;

    match cli.command {
        Some(Command::Seed) => seed(&services).await,
        Some(Command::Serve { bind }) => serve(services, bind).await,
        None => serve(services, SocketAddr::from(([127, 0, 0, 1], 3000))).await,
    }
}

async fn serve(services: AppServices, bind: SocketAddr) -> Result<()> {
    let app = build_router(AppState::new(services));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("listening on http://{bind}");
    info!("Health check: http://{bind}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn seed(services: &AppServices) -> Result<()> {
    let items = services.study_items();
    if !items.list_items().await?.is_empty() {
        info!("database already has study items, skipping seed");
        return Ok(());
    }

    let today = Clock::default_clock().today(services.settings().utc_offset);
    let demo = [
        ("Rust ownership", Priority::High, Some(10.0)),
        ("Linear algebra", Priority::Medium, Some(5.0)),
        ("Japanese kana", Priority::Low, Some(3.5)),
        ("Read SQLite docs", Priority::Low, None),
    ];

    for (title, priority, hours) in demo {
        let planned = items
            .create_item(NewStudyItem {
                title: title.to_owned(),
                description: None,
                priority,
                due_date: today.checked_add_days(Days::new(14)),
                plan: hours.map(|total_hours| PlanRequest {
                    total_hours,
                    start_date: Some(today),
                }),
            })
            .await
            .with_context(|| format!("failed to seed {title:?}"))?;
        info!(
            item = %planned.item.id(),
            sessions = planned.sessions.len(),
            "seeded {title}"
        );
    }
    Ok(())
}

/// Bare paths become absolute `sqlite://` URLs that create the file.
fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite::memory:") || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}?mode=rwc", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    let Some(rest) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_paths_become_rwc_urls() {
        let url = normalize_sqlite_url("/tmp/planner.db");
        assert_eq!(url, "sqlite:///tmp/planner.db?mode=rwc");
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///var/x.db"),
            "sqlite:///var/x.db"
        );
    }

    #[test]
    fn cli_parses_settings() {
        let cli = Cli::try_parse_from([
            "study-planner",
            "--utc-offset",
            "+09:00",
            "--week-start",
            "mon",
            "--locale",
            "en",
            "serve",
            "--bind",
            "0.0.0.0:8080",
        ])
        .unwrap();
        let settings = cli.global.settings();
        assert_eq!(settings.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(settings.week_start, Weekday::Mon);
        assert_eq!(settings.default_locale, Locale::En);
        assert!(matches!(cli.command, Some(Command::Serve { .. })));
    }
}
