use crate::catalog::query::{CatalogQuery, Filter};
use crate::catalog::{RacketCatalog, ReviewStore};
use crate::domain::racket::Racket;
use crate::domain::review::{NewReview, Review};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

type RacketRow = (
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    f64,
    Option<String>,
    Option<String>,
);

type ReviewRow = (i64, i64, String, i32, Option<String>, DateTime<Utc>);

const RACKET_COLUMNS: &str = "SELECT id::int8, brand, model_name, style_tag, balance_tag, \
     player_level, flex, price::float8, description, image_path FROM rackets WHERE TRUE";

const REVIEW_COLUMNS: &str = "id::int8, racket_id::int8, reviewer_name, rating::int4, comment, created_at";

/// Direct Postgres access to the same `rackets`/`reviews` tables the REST backend reads.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("connect DATABASE_URL failed")?;
        Ok(Self::new(pool))
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Appends the query's filters and cap. Column names come from a closed enum, values are bound.
pub fn push_query(qb: &mut QueryBuilder<'_, Postgres>, query: &CatalogQuery) {
    for filter in &query.filters {
        match filter {
            Filter::Eq { column, value } => {
                qb.push(format!(" AND {} = ", column.as_str()))
                    .push_bind(value.clone());
            }
            Filter::ContainsIgnoreCase { column, needle } => {
                qb.push(format!(" AND {} ILIKE ", column.as_str()))
                    .push_bind(format!("%{}%", escape_like(needle)));
            }
            Filter::AtMost { column, value } => {
                qb.push(format!(" AND {} <= ", column.as_str()))
                    .push_bind(*value);
            }
            Filter::AtLeast { column, value } => {
                qb.push(format!(" AND {} >= ", column.as_str()))
                    .push_bind(*value);
            }
            Filter::Between { column, min, max } => {
                qb.push(format!(" AND {} BETWEEN ", column.as_str()))
                    .push_bind(*min)
                    .push(" AND ")
                    .push_bind(*max);
            }
        }
    }
    qb.push(" ORDER BY id ASC LIMIT ")
        .push_bind(query.limit as i64);
}

fn racket_from_row(row: RacketRow) -> Racket {
    let (id, brand, model_name, style_tag, balance_tag, player_level, flex, price, description, image_path) =
        row;
    Racket {
        id,
        brand,
        model_name,
        style_tag,
        balance_tag,
        player_level,
        flex,
        price,
        description,
        image_path,
    }
}

fn review_from_row(row: ReviewRow) -> anyhow::Result<Review> {
    let (id, racket_id, reviewer_name, rating, comment, created_at) = row;
    let rating = u8::try_from(rating)
        .with_context(|| format!("invalid rating in DB for review id={id}: {rating}"))?;
    Ok(Review {
        id,
        racket_id,
        reviewer_name,
        rating,
        comment,
        created_at,
    })
}

#[async_trait::async_trait]
impl RacketCatalog for PgCatalog {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn query_rackets(&self, query: &CatalogQuery) -> anyhow::Result<Vec<Racket>> {
        let mut qb = QueryBuilder::<Postgres>::new(RACKET_COLUMNS);
        push_query(&mut qb, query);

        let rows = qb
            .build_query_as::<RacketRow>()
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .context("select rackets failed")?;

        Ok(rows.into_iter().map(racket_from_row).collect())
    }
}

#[async_trait::async_trait]
impl ReviewStore for PgCatalog {
    async fn create_review(&self, review: &NewReview) -> anyhow::Result<Review> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "INSERT INTO reviews (racket_id, rating, comment, reviewer_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.racket_id)
        .bind(i32::from(review.rating))
        .bind(&review.comment)
        .bind(&review.reviewer_name)
        .fetch_one(&self.pool)
        .await
        .context("insert reviews failed")?;

        review_from_row(row)
    }

    async fn list_reviews(&self, racket_id: i64) -> anyhow::Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews \
             WHERE racket_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(racket_id)
        .fetch_all(&self.pool)
        .await
        .context("select reviews failed")?;

        rows.into_iter().map(review_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::query::Column;

    #[test]
    fn builds_parameterised_sql() {
        let query = CatalogQuery {
            filters: vec![
                Filter::ContainsIgnoreCase {
                    column: Column::StyleTag,
                    needle: "Power smash".to_string(),
                },
                Filter::Eq {
                    column: Column::BalanceTag,
                    value: "Head-heavy".to_string(),
                },
                Filter::Between {
                    column: Column::Price,
                    min: 1500.0,
                    max: 3000.0,
                },
            ],
            limit: 50,
        };
        let mut qb = QueryBuilder::<Postgres>::new(RACKET_COLUMNS);
        push_query(&mut qb, &query);

        let sql = qb.sql();
        assert!(sql.ends_with(
            "WHERE TRUE AND style_tag ILIKE $1 AND balance_tag = $2 \
             AND price BETWEEN $3 AND $4 ORDER BY id ASC LIMIT $5"
        ));
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn rejects_out_of_range_ratings_from_db() {
        let row: ReviewRow = (1, 2, "Guest".to_string(), 300, None, Utc::now());
        assert!(review_from_row(row).is_err());
    }
}
