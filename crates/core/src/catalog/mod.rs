use crate::config::{CatalogBackend, Settings};
use crate::domain::racket::Racket;
use crate::domain::review::{NewReview, Review};
use std::sync::Arc;

pub mod images;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod supabase;

pub use query::{CatalogQuery, Column, Filter};

/// Read side of the racket catalog.
#[async_trait::async_trait]
pub trait RacketCatalog: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Returns matching rackets in catalog order, at most `query.limit` of them.
    async fn query_rackets(&self, query: &CatalogQuery) -> anyhow::Result<Vec<Racket>>;
}

/// Turns an opaque stored image reference into a fetchable URL.
pub trait ImageResolver: Send + Sync {
    fn public_url(&self, image_path: Option<&str>) -> Option<String>;
}

#[async_trait::async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, review: &NewReview) -> anyhow::Result<Review>;

    /// Newest first.
    async fn list_reviews(&self, racket_id: i64) -> anyhow::Result<Vec<Review>>;
}

#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn RacketCatalog>,
    pub images: Arc<dyn ImageResolver>,
    pub reviews: Arc<dyn ReviewStore>,
}

/// Builds the configured backend set. The Postgres and file backends still resolve images
/// against the Supabase storage bucket when `SUPABASE_URL` is set.
pub async fn connect(settings: &Settings) -> anyhow::Result<Backends> {
    let backend = settings.catalog_backend()?;
    let images: Arc<dyn ImageResolver> = match images::PublicBucketImages::from_settings(settings) {
        Some(bucket) => Arc::new(bucket),
        None => Arc::new(images::NoImages),
    };

    let backends = match backend {
        CatalogBackend::Rest => {
            let rest = Arc::new(supabase::SupabaseRest::from_settings(settings)?);
            Backends {
                catalog: rest.clone(),
                images,
                reviews: rest,
            }
        }
        CatalogBackend::Postgres => {
            let pg = Arc::new(postgres::PgCatalog::connect(settings.require_database_url()?).await?);
            Backends {
                catalog: pg.clone(),
                images,
                reviews: pg,
            }
        }
        CatalogBackend::File => {
            let mem = Arc::new(memory::InMemoryCatalog::from_json_file(
                settings.require_catalog_file()?,
            )?);
            Backends {
                catalog: mem.clone(),
                images,
                reviews: mem,
            }
        }
    };

    tracing::info!(backend = backends.catalog.backend_name(), "catalog backend ready");
    Ok(backends)
}
