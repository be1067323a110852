//! `site create`: provision a new site.

use super::success;
use crate::{
    errors::AppError,
    services::site_service::{CreateSiteRequest, SiteService},
};
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub slug: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub network_id: Option<i64>,
    pub private: bool,
    pub porcelain: bool,
}

pub async fn run(service: &SiteService, args: CreateArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let created = service
        .create_site(CreateSiteRequest {
            slug: args.slug,
            title: args.title,
            email: args.email,
            network_id: args.network_id.filter(|id| *id > 0),
            public: !args.private,
        })
        .await?;

    if created.generated_password.is_some() {
        info!(
            user_id = created.admin_user_id,
            "created admin user with a generated password"
        );
    }

    if args.porcelain {
        writeln!(out, "{}", created.site.blog_id)?;
        Ok(())
    } else {
        success(
            out,
            &format!("Site {} created: {}", created.site.blog_id, created.site.url()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::test_support, errors::ErrorKind};

    fn args(slug: &str) -> CreateArgs {
        CreateArgs {
            slug: slug.into(),
            title: None,
            email: None,
            network_id: None,
            private: false,
            porcelain: false,
        }
    }

    #[tokio::test]
    async fn prints_success_line() {
        let (service, _dir) = test_support::service().await;
        let mut out = Vec::new();
        run(&service, args("docs"), &mut out).await.unwrap();
        assert_eq!(
            test_support::text(out),
            "Success: Site 2 created: example.com/docs/\n"
        );
    }

    #[tokio::test]
    async fn porcelain_prints_only_id() {
        let (service, _dir) = test_support::service().await;
        let mut out = Vec::new();
        let mut a = args("quiet");
        a.porcelain = true;
        a.private = true;
        run(&service, a, &mut out).await.unwrap();
        assert_eq!(test_support::text(out), "2\n");
        assert!(!service.get_site(2).await.unwrap().unwrap().public);
    }

    #[tokio::test]
    async fn reserved_slug_is_a_precondition_error() {
        let (service, _dir) = test_support::service().await;
        let mut out = Vec::new();
        let err = run(&service, args("page"), &mut out).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Precondition);
        assert!(out.is_empty());
    }
}
