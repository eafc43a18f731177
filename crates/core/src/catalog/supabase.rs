use crate::catalog::query::{CatalogQuery, Filter};
use crate::catalog::{RacketCatalog, ReviewStore};
use crate::config::Settings;
use crate::domain::racket::Racket;
use crate::domain::review::{NewReview, Review};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const RACKETS_TABLE: &str = "rackets";
const REVIEWS_TABLE: &str = "reviews";

/// Catalog and review tables served by Supabase's PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct SupabaseRest {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseRest {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_supabase_url()?.to_string();
        let api_key = settings.require_supabase_key()?.to_string();

        let timeout_secs = std::env::var("CATALOG_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build catalog http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        Ok(headers)
    }

    async fn read_json<T: DeserializeOwned>(res: reqwest::Response, what: &str) -> Result<T> {
        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read {what} response"))?;

        if !status.is_success() {
            anyhow::bail!("{what} HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse {what} response: {text}"))
    }
}

/// Renders a query as PostgREST query-string pairs.
pub fn postgrest_params(query: &CatalogQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        match filter {
            Filter::Eq { column, value } => {
                params.push((column.as_str().to_string(), format!("eq.{value}")));
            }
            Filter::ContainsIgnoreCase { column, needle } => {
                // `*` is PostgREST's wildcard inside like/ilike patterns.
                let needle = needle.replace('*', "");
                params.push((column.as_str().to_string(), format!("ilike.*{needle}*")));
            }
            Filter::AtMost { column, value } => {
                params.push((column.as_str().to_string(), format!("lte.{value}")));
            }
            Filter::AtLeast { column, value } => {
                params.push((column.as_str().to_string(), format!("gte.{value}")));
            }
            Filter::Between { column, min, max } => {
                params.push((column.as_str().to_string(), format!("gte.{min}")));
                params.push((column.as_str().to_string(), format!("lte.{max}")));
            }
        }
    }

    params.push(("order".to_string(), "id.asc".to_string()));
    params.push(("limit".to_string(), query.limit.to_string()));
    params
}

#[async_trait::async_trait]
impl RacketCatalog for SupabaseRest {
    fn backend_name(&self) -> &'static str {
        "supabase_rest"
    }

    async fn query_rackets(&self, query: &CatalogQuery) -> Result<Vec<Racket>> {
        let res = self
            .http
            .get(self.table_url(RACKETS_TABLE))
            .headers(self.headers()?)
            .query(&postgrest_params(query))
            .send()
            .await
            .context("catalog request failed")?;

        let rackets: Vec<Racket> = Self::read_json(res, "catalog").await?;
        tracing::debug!(
            filters = query.filters.len(),
            rows = rackets.len(),
            "supabase catalog read"
        );
        Ok(rackets)
    }
}

#[async_trait::async_trait]
impl ReviewStore for SupabaseRest {
    async fn create_review(&self, review: &NewReview) -> Result<Review> {
        let mut headers = self.headers()?;
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let res = self
            .http
            .post(self.table_url(REVIEWS_TABLE))
            .headers(headers)
            .json(&[review])
            .send()
            .await
            .context("review insert request failed")?;

        let mut created: Vec<Review> = Self::read_json(res, "review insert").await?;
        anyhow::ensure!(!created.is_empty(), "review insert returned no rows");
        Ok(created.swap_remove(0))
    }

    async fn list_reviews(&self, racket_id: i64) -> Result<Vec<Review>> {
        let res = self
            .http
            .get(self.table_url(REVIEWS_TABLE))
            .headers(self.headers()?)
            .query(&[
                ("select", "*".to_string()),
                ("racket_id", format!("eq.{racket_id}")),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await
            .context("review list request failed")?;

        Self::read_json(res, "review list").await
    }
}
