//! `site delete`: remove a site by id or slug.

use super::{confirm, success};
use crate::{errors::AppError, services::site_service::SiteService};
use std::io::Write;

pub async fn run(
    service: &SiteService,
    site_id: Option<i64>,
    slug: Option<String>,
    yes: bool,
    keep_tables: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    service.require_multisite().await?;

    let site = match (slug, site_id) {
        (Some(slug), _) => service.find_site_by_slug(slug.trim_matches('/')).await?,
        (None, Some(id)) => service.get_site(id).await?,
        (None, None) => return Err(AppError::precondition("Need to specify a blog id.")),
    };
    let site = site.ok_or_else(|| AppError::not_found("Site not found."))?;
    let site_url = service.site_url(&site).await?;

    confirm(
        &format!("Are you sure you want to delete the {} site?", site_url),
        yes,
        out,
    )?;

    service.delete_site(&site, !keep_tables).await?;
    success(out, &format!("The site at {} was deleted.", site_url))
}
