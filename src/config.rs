use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub media_dir: String,
    /// Network used when a command does not name one.
    pub network_id: i64,
    /// URL of the site commands act on; the network's main site when unset.
    pub url: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(
    name = "multisite",
    author,
    version,
    about = "Administer the sites of a multisite content network"
)]
pub struct Args {
    /// Database URL (overrides MULTISITE_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Directory where site media is stored (overrides MULTISITE_MEDIA_DIR)
    #[arg(long, global = true)]
    pub media_dir: Option<String>,

    /// Current network (overrides MULTISITE_NETWORK_ID)
    #[arg(long = "network-id", global = true)]
    pub current_network: Option<i64>,

    /// URL of the site to act on (overrides MULTISITE_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Apply the database schema and exit
    #[arg(long)]
    pub migrate: bool,

    /// Install the network at this domain while migrating
    #[arg(long, requires = "migrate")]
    pub network_domain: Option<String>,

    /// Give new sites their own subdomain instead of a directory
    #[arg(long, requires = "network_domain")]
    pub subdomains: bool,

    /// Email of the super admin created on install
    #[arg(long, requires = "network_domain")]
    pub admin_email: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Perform site-wide operations
    #[command(subcommand)]
    Site(SiteCommand),
}

#[derive(Subcommand, Debug)]
pub enum SiteCommand {
    /// Empty a site of its content (posts, comments, and terms)
    Empty {
        /// Proceed without a confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Copy the current site's posts into another site
    Move {
        /// Destination site
        #[arg(long = "blog_id")]
        blog_id: Option<i64>,

        /// Only move posts in this category or other term
        #[arg(long = "term_id")]
        term_id: Option<i64>,
    },

    /// Delete a site in a multisite install
    Delete {
        /// The id of the site to delete. If not provided, --slug is required
        site_id: Option<i64>,

        /// Path of the site to delete. Subdomain on subdomain installs,
        /// directory on subdirectory installs
        #[arg(long)]
        slug: Option<String>,

        /// Answer yes to the confirmation message
        #[arg(long)]
        yes: bool,

        /// Remove the site from the list, but keep its content
        #[arg(long = "keep-tables")]
        keep_tables: bool,
    },

    /// Create a site in a multisite install
    Create {
        /// Path for the new site. Subdomain on subdomain installs, directory
        /// on subdirectory installs
        #[arg(long)]
        slug: String,

        /// Title of the new site. Default: prettified slug
        #[arg(long)]
        title: Option<String>,

        /// Email for the admin user. Created if none exists; the first super
        /// admin is used when omitted
        #[arg(long)]
        email: Option<String>,

        /// Network to associate the new site with
        #[arg(long = "network_id")]
        network_id: Option<i64>,

        /// Make the new site non-public (not indexed)
        #[arg(long)]
        private: bool,

        /// Only print the site id on success
        #[arg(long)]
        porcelain: bool,
    },

    /// List all sites in a multisite install
    List {
        /// The network to which the sites belong
        #[arg(long)]
        network: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Comma-separated list of fields to show
        #[arg(long)]
        fields: Option<String>,
    },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the
    /// remaining invocation.
    pub fn from_env_and_args() -> Result<(Self, Args)> {
        let args = Args::parse();
        let cfg = Self::merge(&args)?;
        Ok((cfg, args))
    }

    fn merge(args: &Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_db = env::var("MULTISITE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/multisite.db".into());
        let env_media = env::var("MULTISITE_MEDIA_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_network = match env::var("MULTISITE_NETWORK_ID") {
            Ok(value) => value
                .parse::<i64>()
                .with_context(|| format!("parsing MULTISITE_NETWORK_ID value `{}`", value))?,
            Err(env::VarError::NotPresent) => 1,
            Err(err) => return Err(err).context("reading MULTISITE_NETWORK_ID"),
        };
        let env_url = env::var("MULTISITE_URL").ok().filter(|v| !v.is_empty());

        // --- Merge ---
        Ok(Self {
            database_url: args.database_url.clone().unwrap_or(env_db),
            media_dir: args.media_dir.clone().unwrap_or(env_media),
            network_id: args.current_network.unwrap_or(env_network),
            url: args.url.clone().or(env_url),
        })
    }
}
