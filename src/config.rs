use crate::services::storage_service::BucketPolicy;
use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_PUBLIC_BUCKETS: &str = "posters,thumbnails,services,projects,uploads";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Origin prepended to `/storage/...` when building public URLs.
    pub public_base_url: String,
    pub public_buckets: Vec<String>,
    pub private_buckets: Vec<String>,
    /// Bearer token for admin routes; admin routes reject everything when unset.
    pub admin_token: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Portfolio media and ads API")]
pub struct Args {
    /// Host to bind to (overrides PORTFOLIO_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORTFOLIO_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where objects are stored (overrides PORTFOLIO_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides PORTFOLIO_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Base URL for public object links (overrides PORTFOLIO_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Comma-separated publicly readable buckets (overrides PORTFOLIO_PUBLIC_BUCKETS)
    #[arg(long)]
    pub public_buckets: Option<String>,

    /// Comma-separated private buckets (overrides PORTFOLIO_PRIVATE_BUCKETS)
    #[arg(long)]
    pub private_buckets: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_args(Args::parse(), |name| env::var(name))
    }

    /// Merge parsed args over values read through `lookup`.
    pub fn from_args<F>(args: Args, lookup: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var_or = |name: &str, default: &str| -> Result<String> {
            match lookup(name) {
                Ok(value) => Ok(value),
                Err(env::VarError::NotPresent) => Ok(default.to_string()),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        // --- Environment fallback ---
        let env_host = var_or("PORTFOLIO_HOST", "0.0.0.0")?;
        let env_port = match lookup("PORTFOLIO_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORTFOLIO_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading PORTFOLIO_PORT"),
        };
        let env_storage = var_or("PORTFOLIO_STORAGE_DIR", "./data/objects")?;
        let env_db = var_or("PORTFOLIO_DATABASE_URL", "sqlite://./data/meta/portfolio.db")?;
        let env_base_url = var_or("PORTFOLIO_PUBLIC_BASE_URL", "http://localhost:3000")?;
        let env_public = var_or("PORTFOLIO_PUBLIC_BUCKETS", DEFAULT_PUBLIC_BUCKETS)?;
        let env_private = var_or("PORTFOLIO_PRIVATE_BUCKETS", "")?;
        let admin_token = var_or("PORTFOLIO_ADMIN_TOKEN", "")?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url: args.public_base_url.unwrap_or(env_base_url),
            public_buckets: parse_bucket_list(&args.public_buckets.unwrap_or(env_public)),
            private_buckets: parse_bucket_list(&args.private_buckets.unwrap_or(env_private)),
            admin_token: Some(admin_token.trim().to_string()).filter(|t| !t.is_empty()),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Declared buckets; a name listed as both public and private is private.
    pub fn bucket_policies(&self) -> Vec<BucketPolicy> {
        let public = self
            .public_buckets
            .iter()
            .filter(|name| !self.private_buckets.contains(*name))
            .map(BucketPolicy::public);
        let private = self.private_buckets.iter().map(BucketPolicy::private);
        public.chain(private).collect()
    }
}

/// Split a comma-separated list, dropping blanks and duplicates.
fn parse_bucket_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

// Logged at start-up; the admin token is redacted.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("public_base_url", &self.public_base_url)
            .field("public_buckets", &self.public_buckets)
            .field("private_buckets", &self.private_buckets)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
