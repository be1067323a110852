//! `site list`: print the sites of the install.

use crate::{
    errors::AppError,
    output::{self, DEFAULT_FIELDS, OutputFormat},
    services::site_service::SiteService,
};
use std::io::Write;

pub async fn run(
    service: &SiteService,
    network: Option<i64>,
    format: OutputFormat,
    fields: Option<String>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    service.require_multisite().await?;

    let fields = match fields {
        Some(raw) => output::parse_fields(&raw),
        None => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
    };
    let sites = service.list_sites(network).await?;
    let rendered = output::render_sites(&sites, &fields, format)?;
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::test_support, services::site_service::CreateSiteRequest};

    #[tokio::test]
    async fn filters_by_network() {
        let (service, _dir) = test_support::service().await;
        service
            .create_site(CreateSiteRequest {
                slug: "docs".into(),
                title: None,
                email: None,
                network_id: None,
                public: true,
            })
            .await
            .unwrap();

        let mut out = Vec::new();
        run(&service, None, OutputFormat::Csv, Some("blog_id, url".into()), &mut out)
            .await
            .unwrap();
        assert_eq!(
            test_support::text(out),
            "blog_id,url\n1,example.com/\n2,example.com/docs/\n"
        );

        let mut out = Vec::new();
        run(&service, Some(5), OutputFormat::Url, None, &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn default_fields_in_table() {
        let (service, _dir) = test_support::service().await;
        let mut out = Vec::new();
        run(&service, None, OutputFormat::Table, None, &mut out)
            .await
            .unwrap();
        let text = test_support::text(out);
        assert!(text.contains("| blog_id | url          | last_updated        | registered          |"));
    }
}
