//! `site move`: copy the current site's posts into another site.

use super::{current_site, success, warning};
use crate::{
    config::AppConfig,
    errors::AppError,
    services::{
        migrator::{ContentMigrator, ItemStatus, MoveOptions},
        site_service::SiteService,
    },
};
use std::io::Write;
use tracing::warn;

pub async fn run(
    cfg: &AppConfig,
    service: &SiteService,
    blog_id: Option<i64>,
    term_id: Option<i64>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let Some(blog_id) = blog_id.filter(|id| *id > 0) else {
        warn!("site move called without --blog_id; nothing to do");
        return Ok(());
    };
    let term_id = term_id.filter(|id| *id > 0);

    let source = current_site(cfg, service).await?;
    let dest = service
        .get_site(blog_id)
        .await?
        .ok_or_else(|| AppError::not_found("Site not found."))?;
    if dest.blog_id == source.blog_id {
        return Err(AppError::precondition(
            "Source and destination sites are the same.",
        ));
    }
    let sites = service.list_sites(None).await?;

    writeln!(out, "Moving objects to {}", dest.blog_id)?;

    let migrator = ContentMigrator::new(service.content.clone(), service.media.clone());
    let opts = MoveOptions {
        term_id,
        ..Default::default()
    };
    let report = migrator.move_posts(&source, &dest, &sites, &opts).await?;
    writeln!(out, "Total Posts: {}", report.total)?;

    for (source_id, reason) in report.failures() {
        warning(&format!("Post {} failed to be moved: {}", source_id, reason));
    }
    for outcome in &report.outcomes {
        if let ItemStatus::Migrated { warnings, .. } = &outcome.status {
            for detail in warnings {
                warning(&format!("Post {}: {}", outcome.source_id, detail));
            }
        }
    }

    writeln!(
        out,
        "Moved {} of {} posts ({} failed).",
        report.migrated(),
        report.total,
        report.failed()
    )?;
    success(out, "Posts moved!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::test_support,
        errors::ErrorKind,
        models::{post::NewPost, term::TAXONOMY_CATEGORY},
        services::{content_store::SiteScope, site_service::CreateSiteRequest},
    };

    async fn dest(service: &SiteService) -> i64 {
        service
            .create_site(CreateSiteRequest {
                slug: "archive".into(),
                title: None,
                email: None,
                network_id: None,
                public: true,
            })
            .await
            .unwrap()
            .site
            .blog_id
    }

    #[tokio::test]
    async fn moves_posts_and_reports_progress() {
        let (service, _dir) = test_support::service().await;
        let dest_id = dest(&service).await;
        for title in ["a", "b"] {
            service
                .content
                .insert_post(SiteScope::new(1), &NewPost::post(title, ""))
                .await
                .unwrap();
        }

        let mut out = Vec::new();
        run(&test_support::config(), &service, Some(dest_id), None, &mut out)
            .await
            .unwrap();

        let text = test_support::text(out);
        assert!(text.starts_with(&format!("Moving objects to {}\nTotal Posts: 2\n", dest_id)));
        assert!(text.ends_with("Moved 2 of 2 posts (0 failed).\nSuccess: Posts moved!\n"));
        assert_eq!(
            service
                .content
                .count_posts(SiteScope::new(dest_id), None)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn total_reflects_term_filter() {
        let (service, _dir) = test_support::service().await;
        let dest_id = dest(&service).await;
        let scope = SiteScope::new(1);
        let tagged = service
            .content
            .insert_post(scope, &NewPost::post("tagged", ""))
            .await
            .unwrap();
        service
            .content
            .insert_post(scope, &NewPost::post("loose", ""))
            .await
            .unwrap();
        let news = service
            .content
            .ensure_term(scope, TAXONOMY_CATEGORY, "News", "news", "", 0)
            .await
            .unwrap();
        service
            .content
            .relate_term(scope, tagged, news.term_taxonomy_id)
            .await
            .unwrap();

        let mut out = Vec::new();
        run(&test_support::config(), &service, Some(dest_id), Some(news.term_id), &mut out)
            .await
            .unwrap();

        let text = test_support::text(out);
        assert!(text.contains("Total Posts: 1\n"));
        assert!(text.contains("Moved 1 of 1 posts (0 failed).\n"));
    }

    #[tokio::test]
    async fn missing_blog_id_is_a_no_op() {
        let (service, _dir) = test_support::service().await;
        let mut out = Vec::new();
        run(&test_support::config(), &service, None, None, &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unknown_or_same_destination_is_rejected() {
        let (service, _dir) = test_support::service().await;
        let mut out = Vec::new();

        let err = run(&test_support::config(), &service, Some(42), None, &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = run(&test_support::config(), &service, Some(1), None, &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Precondition);
        assert!(out.is_empty());
    }
}
