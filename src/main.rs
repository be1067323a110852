use anyhow::Result;
use clap::CommandFactory;
use std::{fs, io, path::Path, process::ExitCode, sync::Arc};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod db;
mod errors;
mod models;
mod output;
mod services;

use config::{Args, Command};
use services::{media_store::MediaStore, site_service::SiteService};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // --- Logging setup (stderr keeps stdout for command output) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // --- Parse config ---
    let (cfg, args) = config::AppConfig::from_env_and_args()?;
    tracing::debug!("Starting multisite with config: {:?}", cfg);

    // --- Ensure media directory exists ---
    if !Path::new(&cfg.media_dir).exists() {
        fs::create_dir_all(&cfg.media_dir)?;
        tracing::info!("Created media directory at {}", cfg.media_dir);
    }

    // --- Initialize SQLite and schema ---
    let pool = Arc::new(db::connect(&cfg.database_url).await?);
    db::run_migrations(&pool).await?;

    let service = SiteService::new(pool, MediaStore::new(&cfg.media_dir), cfg.network_id);

    // --- Handle migration mode ---
    if args.migrate {
        if let Some(domain) = &args.network_domain {
            let admin_email = args.admin_email.as_deref().unwrap_or("");
            let (network, site) = service
                .install_network(cfg.network_id, domain, args.subdomains, admin_email)
                .await?;
            println!(
                "Success: Network {} installed at {} (main site {}).",
                network.id,
                network.domain,
                site.blog_id
            );
        }
        tracing::info!("Database migration complete.");
        return Ok(ExitCode::SUCCESS);
    }

    let Some(Command::Site(command)) = args.command else {
        Args::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let mut stdout = io::stdout().lock();
    match commands::dispatch(&cfg, &service, command, &mut stdout).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!(kind = ?err.kind, "command failed");
            eprintln!("Error: {}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}
