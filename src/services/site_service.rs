//! src/services/site_service.rs
//!
//! SiteService: the network's site registry plus everything needed to
//! provision, empty and tear down a site: options, default terms, the admin
//! user, and the site's media directory.

use crate::{
    models::{network::Network, site::Site, term::TAXONOMY_CATEGORY, user::User},
    services::{
        content_store::{ContentStore, PurgeSummary, SiteScope, StorageError, StorageResult},
        media_store::MediaStore,
    },
};
use chrono::Utc;
use regex::Regex;
use sqlx::SqlitePool;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Slugs that would collide with platform routes on subdirectory installs.
pub const RESERVED_SUBDIRECTORY_NAMES: [&str; 5] = ["page", "comments", "blog", "files", "feed"];

const DEFAULT_CATEGORY_NAME: &str = "Uncategorized";
const DEFAULT_CATEGORY_SLUG: &str = "uncategorized";
const GENERATED_PASSWORD_LEN: usize = 12;

const SITE_COLUMNS: &str =
    "blog_id, network_id, domain, path, registered, last_updated, public, deleted";
const USER_COLUMNS: &str = "id, login, email, password_hash, registered, is_super_admin";

static SIMPLE_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$").unwrap()
});

/// Parameters of `site create`.
#[derive(Debug, Clone)]
pub struct CreateSiteRequest {
    pub slug: String,
    pub title: Option<String>,
    pub email: Option<String>,
    /// Network to create the site in; the current network when `None`.
    pub network_id: Option<i64>,
    pub public: bool,
}

#[derive(Debug, Clone)]
pub struct CreatedSite {
    pub site: Site,
    pub admin_user_id: i64,
    /// Set when a new admin account had to be created for the site.
    pub generated_password: Option<String>,
}

#[derive(Clone)]
pub struct SiteService {
    pub db: Arc<SqlitePool>,
    pub content: ContentStore,
    pub media: MediaStore,
    /// Network used when a command does not name one.
    pub current_network_id: i64,
}

impl SiteService {
    pub fn new(db: Arc<SqlitePool>, media: MediaStore, current_network_id: i64) -> Self {
        Self {
            content: ContentStore::new(db.clone()),
            db,
            media,
            current_network_id,
        }
    }

    /// Fail with [`StorageError::NotMultisite`] unless a network is installed.
    pub async fn require_multisite(&self) -> StorageResult<()> {
        let networks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM networks")
            .fetch_one(&*self.db)
            .await?;
        if networks == 0 {
            return Err(StorageError::NotMultisite);
        }
        Ok(())
    }

    pub async fn get_network(&self, id: i64) -> StorageResult<Option<Network>> {
        let network = sqlx::query_as::<_, Network>(
            "SELECT id, domain, path, subdomain_install FROM networks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(network)
    }

    pub async fn current_network(&self) -> StorageResult<Network> {
        self.get_network(self.current_network_id)
            .await?
            .ok_or(StorageError::NetworkNotFound(self.current_network_id))
    }

    /// Install the network with its main site and a super admin.
    ///
    /// Does nothing beyond returning the existing records when the network
    /// is already installed.
    pub async fn install_network(
        &self,
        network_id: i64,
        domain: &str,
        subdomain_install: bool,
        admin_email: &str,
    ) -> StorageResult<(Network, Site)> {
        if let Some(network) = self.get_network(network_id).await? {
            if let Some(site) = self.main_site(&network).await? {
                debug!("network {} already installed", network_id);
                return Ok((network, site));
            }
        } else {
            sqlx::query(
                "INSERT INTO networks (id, domain, path, subdomain_install) VALUES (?, ?, '/', ?)",
            )
            .bind(network_id)
            .bind(domain)
            .bind(subdomain_install)
            .execute(&*self.db)
            .await?;
        }

        let network = self
            .get_network(network_id)
            .await?
            .ok_or(StorageError::NetworkNotFound(network_id))?;

        let admin = match self.user_by_login("admin").await? {
            Some(user) => user,
            None => self.create_user("admin", admin_email, true).await?.0,
        };

        let site = self
            .insert_site(&network, &network.domain, &network.path, true)
            .await?;
        self.provision_site(&site, "My Network", admin.id).await?;

        info!(
            "installed network {} at {} (main site {})",
            network.id, network.domain, site.blog_id
        );
        Ok((network, site))
    }

    /// The site living at the network's own address.
    pub async fn main_site(&self, network: &Network) -> StorageResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites
             WHERE network_id = ? AND domain = ? AND path = ?
             ORDER BY blog_id ASC LIMIT 1"
        ))
        .bind(network.id)
        .bind(&network.domain)
        .bind(&network.path)
        .fetch_optional(&*self.db)
        .await?;
        Ok(site)
    }

    pub async fn get_site(&self, blog_id: i64) -> StorageResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE blog_id = ?"
        ))
        .bind(blog_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(site)
    }

    async fn site_at(&self, domain: &str, path: &str) -> StorageResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE domain = ? AND path = ? ORDER BY blog_id ASC LIMIT 1"
        ))
        .bind(domain)
        .bind(path)
        .fetch_optional(&*self.db)
        .await?;
        Ok(site)
    }

    /// Look a site up by its slug within the current network: the
    /// subdomain on subdomain installs, the directory otherwise.
    pub async fn find_site_by_slug(&self, slug: &str) -> StorageResult<Option<Site>> {
        let network = self.current_network().await?;
        let slug = slug.trim_matches('/');
        let (domain, path) = site_address(&network, slug);
        self.site_at(&domain, &path).await
    }

    /// Look a site up by URL, with or without scheme.
    pub async fn find_site_by_url(&self, url: &str) -> StorageResult<Option<Site>> {
        let bare = url
            .trim()
            .trim_start_matches("http://")
            .trim_start_matches("https://");
        let (domain, path) = match bare.find('/') {
            Some(idx) => (&bare[..idx], &bare[idx..]),
            None => (bare, "/"),
        };
        let path = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{}/", path)
        };
        self.site_at(domain, &path).await
    }

    /// All sites, optionally restricted to one network, in id order.
    pub async fn list_sites(&self, network_id: Option<i64>) -> StorageResult<Vec<Site>> {
        let rows = match network_id {
            Some(id) => {
                sqlx::query_as::<_, Site>(&format!(
                    "SELECT {SITE_COLUMNS} FROM sites WHERE network_id = ? ORDER BY blog_id ASC"
                ))
                .bind(id)
                .fetch_all(&*self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Site>(&format!(
                    "SELECT {SITE_COLUMNS} FROM sites ORDER BY blog_id ASC"
                ))
                .fetch_all(&*self.db)
                .await?
            }
        };
        Ok(rows)
    }

    /// Create a site following the provisioning rules of `site create`.
    pub async fn create_site(&self, req: CreateSiteRequest) -> StorageResult<CreatedSite> {
        self.require_multisite().await?;

        let mut base = req.slug.clone();
        let title = req.title.clone().unwrap_or_else(|| ucfirst(&base));

        let network = match req.network_id {
            Some(id) => self
                .get_network(id)
                .await?
                .ok_or(StorageError::NetworkNotFound(id))?,
            None => self.current_network().await?,
        };

        if SIMPLE_SLUG.is_match(&base) {
            base = base.to_lowercase();
        }

        if !network.subdomain_install && RESERVED_SUBDIRECTORY_NAMES.contains(&base.as_str()) {
            return Err(StorageError::ReservedSlug(
                RESERVED_SUBDIRECTORY_NAMES.join(", "),
            ));
        }

        let mut email = req.email.as_deref().unwrap_or("").trim().to_string();
        if !is_email(&email) {
            email = match self.super_admins().await?.into_iter().next() {
                Some(admin) => admin.email,
                None => String::new(),
            };
        }

        let (domain, path) = site_address(&network, &base);

        let mut generated_password = None;
        let user = match self.user_by_email(&email).await? {
            Some(user) => user,
            None => {
                let (user, password) = self.create_user(&base, &email, false).await?;
                generated_password = Some(password);
                user
            }
        };

        let site = self.insert_site(&network, &domain, &path, req.public).await?;
        self.provision_site(&site, &title, user.id).await?;

        if !user.is_super_admin && self.get_user_option(user.id, "primary_blog").await?.is_none() {
            self.set_user_option(user.id, "primary_blog", &site.blog_id.to_string())
                .await?;
        }

        info!("created site {} at {}", site.blog_id, site.url());
        Ok(CreatedSite {
            site,
            admin_user_id: user.id,
            generated_password,
        })
    }

    async fn insert_site(
        &self,
        network: &Network,
        domain: &str,
        path: &str,
        public: bool,
    ) -> StorageResult<Site> {
        let now = Utc::now();
        let result = sqlx::query_as::<_, Site>(&format!(
            "INSERT INTO sites (network_id, domain, path, registered, last_updated, public, deleted)
             VALUES (?, ?, ?, ?, ?, ?, 0)
             RETURNING {SITE_COLUMNS}"
        ))
        .bind(network.id)
        .bind(domain)
        .bind(path)
        .bind(now)
        .bind(now)
        .bind(public)
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(site) => Ok(site),
            Err(err) if is_unique_violation(&err) => Err(StorageError::SiteExists {
                domain: domain.to_string(),
                path: path.to_string(),
            }),
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }

    /// Seed the options and default category of a fresh site.
    async fn provision_site(&self, site: &Site, title: &str, admin_user_id: i64) -> StorageResult<()> {
        let scope = SiteScope::new(site.blog_id);
        let site_url = site.site_url();
        self.content.set_option(scope, "siteurl", &site_url).await?;
        self.content.set_option(scope, "home", &site_url).await?;
        self.content.set_option(scope, "blogname", title).await?;
        self.content
            .set_option(scope, "blog_public", if site.public { "1" } else { "0" })
            .await?;
        self.content
            .set_option(scope, "admin_user_id", &admin_user_id.to_string())
            .await?;
        self.insert_default_terms(scope).await?;
        Ok(())
    }

    /// Create the `Uncategorized` category and point `default_category` at it.
    async fn insert_default_terms(&self, scope: SiteScope) -> StorageResult<i64> {
        let term = self
            .content
            .ensure_term(
                scope,
                TAXONOMY_CATEGORY,
                DEFAULT_CATEGORY_NAME,
                DEFAULT_CATEGORY_SLUG,
                "",
                1,
            )
            .await?;
        self.content
            .set_option(scope, "default_category", &term.term_id.to_string())
            .await?;
        Ok(term.term_id)
    }

    /// The site's `siteurl` option, falling back to the address it is
    /// registered under.
    pub async fn site_url(&self, site: &Site) -> StorageResult<String> {
        let stored = self
            .content
            .get_option(SiteScope::new(site.blog_id), "siteurl")
            .await?;
        Ok(stored.unwrap_or_else(|| site.site_url()))
    }

    /// Remove all posts, comments and terms of a site, then restore the
    /// default category.
    pub async fn empty_site(&self, site: &Site) -> StorageResult<PurgeSummary> {
        let scope = SiteScope::new(site.blog_id);
        let taxonomies = self.content.taxonomies(scope).await?;

        let summary = self.content.purge_content(scope).await?;
        for taxonomy in &taxonomies {
            self.content
                .delete_option(scope, &format!("{}_children", taxonomy))
                .await?;
        }
        self.insert_default_terms(scope).await?;
        self.touch_site(site.blog_id).await?;

        info!(
            "emptied site {}: {} posts, {} comments, {} terms removed",
            site.blog_id, summary.posts, summary.comments, summary.terms
        );
        Ok(summary)
    }

    /// True when `site` lives at its network's own address.
    pub async fn is_main_site(&self, site: &Site) -> StorageResult<bool> {
        let Some(network) = self.get_network(site.network_id).await? else {
            return Ok(false);
        };
        let main = self.main_site(&network).await?;
        Ok(main.is_some_and(|main| main.blog_id == site.blog_id))
    }

    /// Delete a site. With `drop_tables` its content, options and media go
    /// too; otherwise it is only flagged as deleted. A network's main site
    /// is never dropped, only flagged.
    pub async fn delete_site(&self, site: &Site, drop_tables: bool) -> StorageResult<()> {
        let drop_tables = if drop_tables && self.is_main_site(site).await? {
            warn!(
                "site {} is the main site of network {}; keeping its tables",
                site.blog_id, site.network_id
            );
            false
        } else {
            drop_tables
        };

        if drop_tables {
            self.content
                .drop_site_tables(SiteScope::new(site.blog_id))
                .await?;
            if let Err(err) = self.media.remove_site(site.blog_id).await {
                warn!("failed to remove media of site {}: {}", site.blog_id, err);
            }
            sqlx::query("DELETE FROM sites WHERE blog_id = ?")
                .bind(site.blog_id)
                .execute(&*self.db)
                .await?;
        } else {
            sqlx::query("UPDATE sites SET deleted = 1, last_updated = ? WHERE blog_id = ?")
                .bind(Utc::now())
                .bind(site.blog_id)
                .execute(&*self.db)
                .await?;
        }
        info!("deleted site {} (drop tables: {})", site.blog_id, drop_tables);
        Ok(())
    }

    async fn touch_site(&self, blog_id: i64) -> StorageResult<()> {
        sqlx::query("UPDATE sites SET last_updated = ? WHERE blog_id = ?")
            .bind(Utc::now())
            .bind(blog_id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    pub async fn user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        if email.is_empty() {
            return Ok(None);
        }
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? ORDER BY id ASC LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    pub async fn user_by_login(&self, login: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = ?"
        ))
        .bind(login)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    pub async fn super_admins(&self) -> StorageResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_super_admin = 1 ORDER BY id ASC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(users)
    }

    /// Create a user with a random password; returns the user and the
    /// plain-text password.
    pub async fn create_user(
        &self,
        login: &str,
        email: &str,
        super_admin: bool,
    ) -> StorageResult<(User, String)> {
        let password: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(GENERATED_PASSWORD_LEN)
            .collect();
        let password_hash = format!("{:x}", md5::compute(password.as_bytes()));

        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (login, email, password_hash, registered, is_super_admin)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(login)
        .bind(email)
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(super_admin)
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(user) => {
                debug!("created user {} ({})", user.login, user.id);
                Ok((user, password))
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::UserCreation(login.to_string()))
            }
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }

    pub async fn get_user_option(&self, user_id: i64, name: &str) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM user_options WHERE user_id = ? AND name = ?")
            .bind(user_id)
            .bind(name)
            .fetch_optional(&*self.db)
            .await?;
        Ok(value)
    }

    pub async fn set_user_option(&self, user_id: i64, name: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO user_options (user_id, name, value) VALUES (?, ?, ?)
             ON CONFLICT(user_id, name) DO UPDATE SET value = excluded.value",
        )
        .bind(user_id)
        .bind(name)
        .bind(value)
        .execute(&*self.db)
        .await?;
        Ok(())
    }
}

/// Domain and path a slug maps to within `network`.
pub fn site_address(network: &Network, slug: &str) -> (String, String) {
    if network.subdomain_install {
        (format!("{}.{}", slug, network.bare_domain()), "/".to_string())
    } else {
        (
            network.domain.clone(),
            format!("/{}/", slug.trim_matches('/')),
        )
    }
}

/// Upper-case the first character.
fn ucfirst(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_email(value: &str) -> bool {
    value.len() >= 6 && EMAIL.is_match(value)
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, models::post::NewPost};

    async fn service(subdomains: bool) -> (SiteService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(db::memory_pool().await.unwrap());
        let service = SiteService::new(pool, MediaStore::new(dir.path()), 1);
        service
            .install_network(1, "www.example.com", subdomains, "root@example.com")
            .await
            .unwrap();
        (service, dir)
    }

    fn request(slug: &str) -> CreateSiteRequest {
        CreateSiteRequest {
            slug: slug.into(),
            title: None,
            email: None,
            network_id: None,
            public: true,
        }
    }

    #[tokio::test]
    async fn commands_require_a_network() {
        let pool = Arc::new(db::memory_pool().await.unwrap());
        let service = SiteService::new(pool, MediaStore::new("unused"), 1);
        assert!(matches!(
            service.require_multisite().await,
            Err(StorageError::NotMultisite)
        ));
        assert!(matches!(
            service.create_site(request("docs")).await,
            Err(StorageError::NotMultisite)
        ));
    }

    #[tokio::test]
    async fn install_is_idempotent() {
        let (service, _dir) = service(false).await;
        let (_, again) = service
            .install_network(1, "www.example.com", false, "root@example.com")
            .await
            .unwrap();
        assert_eq!(again.blog_id, 1);
        assert_eq!(service.list_sites(None).await.unwrap().len(), 1);
        assert_eq!(service.super_admins().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_subdirectory_site() {
        let (service, _dir) = service(false).await;
        let created = service.create_site(request("Docs")).await.unwrap();

        assert_eq!(created.site.domain, "www.example.com");
        assert_eq!(created.site.path, "/docs/");
        assert_eq!(created.site.url(), "www.example.com/docs/");

        let scope = SiteScope::new(created.site.blog_id);
        let name = service.content.get_option(scope, "blogname").await.unwrap();
        assert_eq!(name.as_deref(), Some("Docs"));

        // No valid email given: the first super admin owns the site.
        let admin = service.user_by_login("admin").await.unwrap().unwrap();
        assert_eq!(created.admin_user_id, admin.id);
        assert!(created.generated_password.is_none());

        let default_category = service
            .content
            .get_option(scope, "default_category")
            .await
            .unwrap();
        assert!(default_category.is_some());

        assert!(matches!(
            service.create_site(request("docs")).await,
            Err(StorageError::SiteExists { .. })
        ));
    }

    #[tokio::test]
    async fn create_subdomain_site_strips_www() {
        let (service, _dir) = service(true).await;
        let mut req = request("shop");
        req.title = Some("The Shop".into());
        req.public = false;
        let created = service.create_site(req).await.unwrap();

        assert_eq!(created.site.domain, "shop.example.com");
        assert_eq!(created.site.path, "/");
        assert!(!created.site.public);

        // Reserved names only matter for subdirectory installs.
        assert!(service.create_site(request("blog")).await.is_ok());
    }

    #[tokio::test]
    async fn reserved_slugs_are_rejected() {
        let (service, _dir) = service(false).await;
        let err = service.create_site(request("Feed")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following words are reserved and cannot be used as blog names: page, comments, blog, files, feed"
        );
    }

    #[tokio::test]
    async fn create_with_new_email_provisions_user() {
        let (service, _dir) = service(false).await;
        let mut req = request("team");
        req.email = Some("  lead@team.test ".into());
        let created = service.create_site(req).await.unwrap();

        let user = service.user_by_email("lead@team.test").await.unwrap().unwrap();
        assert_eq!(user.login, "team");
        assert_eq!(created.admin_user_id, user.id);
        let password = created.generated_password.unwrap();
        assert_eq!(password.len(), 12);
        assert_eq!(user.password_hash, format!("{:x}", md5::compute(password.as_bytes())));

        let primary = service.get_user_option(user.id, "primary_blog").await.unwrap();
        assert_eq!(primary, Some(created.site.blog_id.to_string()));
    }

    #[tokio::test]
    async fn unknown_network_is_reported() {
        let (service, _dir) = service(false).await;
        let mut req = request("x1");
        req.network_id = Some(7);
        let err = service.create_site(req).await.unwrap_err();
        assert_eq!(err.to_string(), "Network with id 7 does not exist.");
    }

    #[tokio::test]
    async fn lookup_by_slug_and_url() {
        let (service, _dir) = service(false).await;
        let created = service.create_site(request("news")).await.unwrap();

        let by_slug = service.find_site_by_slug("/news/").await.unwrap().unwrap();
        assert_eq!(by_slug.blog_id, created.site.blog_id);

        let by_url = service
            .find_site_by_url("https://www.example.com/news")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_url.blog_id, created.site.blog_id);

        let main = service.find_site_by_url("www.example.com").await.unwrap().unwrap();
        assert_eq!(main.blog_id, 1);

        assert!(service.find_site_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_site_keeps_only_default_category() {
        let (service, _dir) = service(false).await;
        let site = service.get_site(1).await.unwrap().unwrap();
        let scope = SiteScope::new(1);

        service
            .content
            .insert_post(scope, &NewPost::post("hello", "world"))
            .await
            .unwrap();
        service
            .content
            .ensure_term(scope, "post_tag", "Rust", "rust", "", 0)
            .await
            .unwrap();
        service
            .content
            .set_option(scope, "post_tag_children", "a:0:{}")
            .await
            .unwrap();

        let summary = service.empty_site(&site).await.unwrap();
        assert_eq!(summary.posts, 1);
        assert_eq!(summary.terms, 2);

        assert_eq!(service.content.count_posts(scope, None).await.unwrap(), 0);
        assert_eq!(
            service.content.taxonomies(scope).await.unwrap(),
            vec![TAXONOMY_CATEGORY.to_string()]
        );
        let default = service
            .content
            .find_term(scope, TAXONOMY_CATEGORY, DEFAULT_CATEGORY_SLUG)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(default.count, 1);
        assert_eq!(
            service.content.get_option(scope, "default_category").await.unwrap(),
            Some(default.term_id.to_string())
        );
        assert!(service
            .content
            .get_option(scope, "post_tag_children")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_keep_tables_only_flags_site() {
        let (service, _dir) = service(false).await;
        let created = service.create_site(request("old")).await.unwrap();
        let scope = SiteScope::new(created.site.blog_id);
        service
            .content
            .insert_post(scope, &NewPost::post("keep", ""))
            .await
            .unwrap();

        service.delete_site(&created.site, false).await.unwrap();
        let site = service.get_site(created.site.blog_id).await.unwrap().unwrap();
        assert!(site.deleted);
        assert_eq!(service.content.count_posts(scope, None).await.unwrap(), 1);

        service.delete_site(&site, true).await.unwrap();
        assert!(service.get_site(site.blog_id).await.unwrap().is_none());
        assert_eq!(service.content.count_posts(scope, None).await.unwrap(), 0);
        assert!(service.content.get_option(scope, "siteurl").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn main_site_is_never_dropped() {
        let (service, _dir) = service(false).await;
        let network = service.current_network().await.unwrap();
        let main = service.main_site(&network).await.unwrap().unwrap();
        let other = service.create_site(request("side")).await.unwrap().site;
        assert!(service.is_main_site(&main).await.unwrap());
        assert!(!service.is_main_site(&other).await.unwrap());

        let scope = SiteScope::new(main.blog_id);
        service
            .content
            .insert_post(scope, &NewPost::post("home", ""))
            .await
            .unwrap();

        service.delete_site(&main, true).await.unwrap();
        let kept = service.get_site(main.blog_id).await.unwrap().unwrap();
        assert!(kept.deleted);
        assert_eq!(service.content.count_posts(scope, None).await.unwrap(), 1);
        assert!(service.content.get_option(scope, "siteurl").await.unwrap().is_some());
    }

    #[test]
    fn title_defaults_to_capitalised_slug() {
        assert_eq!(ucfirst("docs"), "Docs");
        assert_eq!(ucfirst(""), "");
    }

    #[test]
    fn email_validation() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("a@b"));
        assert!(!is_email(""));
    }
}
