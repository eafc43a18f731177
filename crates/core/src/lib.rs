pub mod catalog;
pub mod domain;
pub mod engine;
pub mod session;

pub mod config {
    use anyhow::Context;
    use std::str::FromStr;

    pub const DEFAULT_IMAGE_BUCKET: &str = "rackets";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CatalogBackend {
        Rest,
        Postgres,
        File,
    }

    impl FromStr for CatalogBackend {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "rest" | "supabase" => Ok(CatalogBackend::Rest),
                "postgres" | "pg" => Ok(CatalogBackend::Postgres),
                "file" | "memory" => Ok(CatalogBackend::File),
                other => anyhow::bail!("unknown CATALOG_BACKEND: {other}"),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub supabase_url: Option<String>,
        /// Anon key for the public read/insert policies; the service-role key also works.
        pub supabase_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub catalog_backend: Option<String>,
        pub catalog_file: Option<String>,
        pub image_bucket: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                supabase_url: std::env::var("SUPABASE_URL").ok(),
                supabase_key: std::env::var("SUPABASE_ANON_KEY")
                    .or_else(|_| std::env::var("SUPABASE_SERVICE_ROLE_KEY"))
                    .ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                catalog_backend: std::env::var("CATALOG_BACKEND").ok(),
                catalog_file: std::env::var("CATALOG_FILE").ok(),
                image_bucket: std::env::var("RACKET_IMAGE_BUCKET")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_BUCKET.to_string()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_supabase_url(&self) -> anyhow::Result<&str> {
            self.supabase_url
                .as_deref()
                .context("SUPABASE_URL is required")
        }

        pub fn require_supabase_key(&self) -> anyhow::Result<&str> {
            self.supabase_key
                .as_deref()
                .context("SUPABASE_ANON_KEY (or SUPABASE_SERVICE_ROLE_KEY) is required")
        }

        pub fn require_catalog_file(&self) -> anyhow::Result<&str> {
            self.catalog_file
                .as_deref()
                .context("CATALOG_FILE is required for the file backend")
        }

        /// Explicit `CATALOG_BACKEND` wins; otherwise REST when Supabase is configured, then
        /// Postgres.
        pub fn catalog_backend(&self) -> anyhow::Result<CatalogBackend> {
            if let Some(raw) = self.catalog_backend.as_deref() {
                return raw.parse();
            }
            if self.supabase_url.is_some() {
                return Ok(CatalogBackend::Rest);
            }
            if self.database_url.is_some() {
                return Ok(CatalogBackend::Postgres);
            }
            anyhow::bail!("no catalog configured: set SUPABASE_URL, DATABASE_URL or CATALOG_BACKEND")
        }
    }

}
