use crate::catalog::query::CatalogQuery;
use crate::catalog::{RacketCatalog, ReviewStore};
use crate::domain::racket::Racket;
use crate::domain::review::{NewReview, Review};
use anyhow::Context;
use std::path::Path;
use tokio::sync::Mutex;

/// A fixed racket list (e.g. a JSON export of the catalog table) with session-local reviews.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    rackets: Vec<Racket>,
    reviews: Mutex<Vec<Review>>,
}

impl InMemoryCatalog {
    pub fn new(mut rackets: Vec<Racket>) -> Self {
        rackets.sort_by_key(|r| r.id);
        Self {
            rackets,
            reviews: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let rackets: Vec<Racket> = serde_json::from_str(&text)
            .with_context(|| format!("catalog file {} is not a racket list", path.display()))?;
        anyhow::ensure!(
            rackets.iter().all(|r| r.price >= 0.0),
            "catalog file {} contains a negative price",
            path.display()
        );
        Ok(Self::new(rackets))
    }
}

#[async_trait::async_trait]
impl RacketCatalog for InMemoryCatalog {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn query_rackets(&self, query: &CatalogQuery) -> anyhow::Result<Vec<Racket>> {
        Ok(self
            .rackets
            .iter()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ReviewStore for InMemoryCatalog {
    async fn create_review(&self, review: &NewReview) -> anyhow::Result<Review> {
        let mut reviews = self.reviews.lock().await;
        let created = Review {
            id: reviews.len() as i64 + 1,
            racket_id: review.racket_id,
            reviewer_name: review.reviewer_name.clone(),
            rating: review.rating,
            comment: Some(review.comment.clone()).filter(|c| !c.is_empty()),
            created_at: chrono::Utc::now(),
        };
        reviews.push(created.clone());
        Ok(created)
    }

    async fn list_reviews(&self, racket_id: i64) -> anyhow::Result<Vec<Review>> {
        let reviews = self.reviews.lock().await;
        let mut out: Vec<Review> = reviews
            .iter()
            .filter(|r| r.racket_id == racket_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(out)
    }
}
