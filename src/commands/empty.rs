//! `site empty`: remove all posts, comments and terms of the current site.

use super::{confirm, current_site, success};
use crate::{config::AppConfig, errors::AppError, services::site_service::SiteService};
use std::io::Write;

pub async fn run(
    cfg: &AppConfig,
    service: &SiteService,
    yes: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let site = current_site(cfg, service).await?;
    let site_url = service.site_url(&site).await?;

    confirm(
        &format!(
            "Are you sure you want to empty the site at {} of all posts, comments, and terms?",
            site_url
        ),
        yes,
        out,
    )?;

    service.empty_site(&site).await?;
    success(out, &format!("The site at {} was emptied.", site_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::test_support,
        models::post::NewPost,
        services::content_store::SiteScope,
    };

    #[tokio::test]
    async fn empties_current_site() {
        let (service, _dir) = test_support::service().await;
        let scope = SiteScope::new(1);
        service
            .content
            .insert_post(scope, &NewPost::post("hello", ""))
            .await
            .unwrap();

        let mut out = Vec::new();
        run(&test_support::config(), &service, true, &mut out)
            .await
            .unwrap();

        assert_eq!(
            test_support::text(out),
            "Success: The site at http://example.com/ was emptied.\n"
        );
        assert_eq!(service.content.count_posts(scope, None).await.unwrap(), 0);
    }
}
