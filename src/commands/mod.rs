//! Handlers for the `site` subcommands.
//!
//! Each handler validates its preconditions before touching any data,
//! delegates to the services, and writes operator-facing messages to the
//! provided output. Warnings go to stderr so machine-readable output stays
//! clean.

pub mod create;
pub mod delete;
pub mod empty;
pub mod list;
pub mod move_posts;

use crate::{
    config::{AppConfig, SiteCommand},
    errors::{AppError, ErrorKind},
    models::site::Site,
    services::{content_store::StorageError, site_service::SiteService},
};
use std::io::{self, BufRead, Write};

/// Run one `site` subcommand.
pub async fn dispatch(
    cfg: &AppConfig,
    service: &SiteService,
    command: SiteCommand,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    match command {
        SiteCommand::Empty { yes } => empty::run(cfg, service, yes, out).await,
        SiteCommand::Move { blog_id, term_id } => {
            move_posts::run(cfg, service, blog_id, term_id, out).await
        }
        SiteCommand::Delete {
            site_id,
            slug,
            yes,
            keep_tables,
        } => delete::run(service, site_id, slug, yes, keep_tables, out).await,
        SiteCommand::Create {
            slug,
            title,
            email,
            network_id,
            private,
            porcelain,
        } => {
            let args = create::CreateArgs {
                slug,
                title,
                email,
                network_id,
                private,
                porcelain,
            };
            create::run(service, args, out).await
        }
        SiteCommand::List {
            network,
            format,
            fields,
        } => list::run(service, network, format, fields, out).await,
    }
}

/// The site commands act on: `--url` when given, else the current
/// network's main site.
pub async fn current_site(cfg: &AppConfig, service: &SiteService) -> Result<Site, AppError> {
    service.require_multisite().await?;
    match &cfg.url {
        Some(url) => service
            .find_site_by_url(url)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Site '{}' not found.", url))),
        None => {
            let network = service.current_network().await?;
            service
                .main_site(&network)
                .await?
                .ok_or_else(|| StorageError::SiteNotFound(network.domain.clone()).into())
        }
    }
}

/// Ask a yes/no question on stdin unless `assume_yes` is set.
pub fn confirm(question: &str, assume_yes: bool, out: &mut dyn Write) -> Result<(), AppError> {
    if assume_yes {
        return Ok(());
    }
    let stdin = io::stdin();
    confirm_from(question, &mut stdin.lock(), out)
}

/// Anything but an answer starting with `y` aborts.
fn confirm_from(question: &str, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<(), AppError> {
    write!(out, "{} [y/n] ", question)?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if answer.trim().to_ascii_lowercase().starts_with('y') {
        Ok(())
    } else {
        Err(AppError::new(ErrorKind::Aborted, "Aborted."))
    }
}

/// Print a `Success:` line.
pub fn success(out: &mut dyn Write, message: &str) -> Result<(), AppError> {
    writeln!(out, "Success: {}", message)?;
    Ok(())
}

/// Print a `Warning:` line to stderr.
pub fn warning(message: &str) {
    eprintln!("Warning: {}", message);
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn confirm_accepts_yes() {
        let mut out = Vec::new();
        confirm_from("Sure?", &mut Cursor::new("Yes\n"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Sure? [y/n] ");
    }

    #[test]
    fn confirm_rejects_anything_else() {
        let mut out = Vec::new();
        let err = confirm_from("Sure?", &mut Cursor::new("n\n"), &mut out).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Aborted);
        let err = confirm_from("Sure?", &mut Cursor::new(""), &mut out).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Aborted);
    }

    #[test]
    fn assume_yes_skips_prompt() {
        let mut out = Vec::new();
        confirm("Sure?", true, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn current_site_defaults_to_main_site() {
        let (service, _dir) = test_support::service().await;
        let mut cfg = test_support::config();
        assert_eq!(current_site(&cfg, &service).await.unwrap().blog_id, 1);

        cfg.url = Some("http://example.com/missing/".into());
        let err = current_site(&cfg, &service).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
