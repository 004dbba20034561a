//! Persistence collaborator
//!
//! CRUD over catalog products, sessions, and recommendations. The trait is
//! the seam the session assembler is tested against; the Postgres
//! implementation uses runtime-checked queries so the crate builds without
//! a live database.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CandidateProduct, CatalogProduct, GiftFinderRequest, GiftSession, NewRecommendation,
        Recommendation},
};

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait GiftStore: Send + Sync {
    /// Writes the immutable session request facts once, at creation
    async fn insert_session(&self, request: &GiftFinderRequest) -> AppResult<GiftSession>;

    async fn fetch_session(&self, session_id: Uuid) -> AppResult<Option<GiftSession>>;

    /// Persists a minimal catalog record, returning the existing row when a
    /// product of the same name is already cataloged
    async fn upsert_product(&self, product: &CandidateProduct) -> AppResult<CatalogProduct>;

    async fn fetch_product(&self, product_id: Uuid) -> AppResult<Option<CatalogProduct>>;

    async fn list_catalog(&self) -> AppResult<Vec<CatalogProduct>>;

    async fn insert_recommendation(&self, rec: &NewRecommendation) -> AppResult<Recommendation>;

    async fn session_recommendations(&self, session_id: Uuid) -> AppResult<Vec<Recommendation>>;

    async fn fetch_recommendation(&self, id: Uuid) -> AppResult<Option<Recommendation>>;

    /// Overwrites the personal message; never skipped, never cached
    async fn set_personal_message(&self, id: Uuid, message: &str) -> AppResult<()>;
}

const PRODUCT_COLUMNS: &str = "id, name, description, category, price_min, price_max, \
     price_label, currency, image_url, marketplace_url, interest_tags, occasion_tags, \
     relationship_tags, prime, best_seller, featured";

const RECOMMENDATION_COLUMNS: &str =
    "id, session_id, product_id, reasoning, score, personal_message, marketplace_url, created_at";

const SESSION_COLUMNS: &str = "id, recipient_name, age, relationship, interests, personality, \
     budget, occasion, created_at";

#[derive(Clone)]
pub struct PostgresGiftStore {
    pool: PgPool,
}

impl PostgresGiftStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GiftStore for PostgresGiftStore {
    async fn insert_session(&self, request: &GiftFinderRequest) -> AppResult<GiftSession> {
        let sql = format!(
            "INSERT INTO gift_sessions \
             (id, recipient_name, age, relationship, interests, personality, budget, occasion) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {SESSION_COLUMNS}"
        );

        let session = sqlx::query_as::<_, GiftSession>(&sql)
            .bind(Uuid::new_v4())
            .bind(&request.recipient_name)
            .bind(request.age)
            .bind(&request.relationship)
            .bind(&request.interests)
            .bind(&request.personality)
            .bind(&request.budget)
            .bind(&request.occasion)
            .fetch_one(&self.pool)
            .await?;

        Ok(session)
    }

    async fn fetch_session(&self, session_id: Uuid) -> AppResult<Option<GiftSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM gift_sessions WHERE id = $1");

        let session = sqlx::query_as::<_, GiftSession>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn upsert_product(&self, product: &CandidateProduct) -> AppResult<CatalogProduct> {
        // Same-named products are considered the same catalog entry; the
        // existing row wins so earlier recommendations keep their fields
        let sql = format!(
            "INSERT INTO catalog_products \
             (id, name, description, category, price_min, price_max, price_label, currency, \
              image_url, marketplace_url, interest_tags, occasion_tags, relationship_tags, \
              prime, best_seller, featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING {PRODUCT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(Uuid::new_v4())
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.category)
            .bind(product.price_min)
            .bind(product.price_max)
            .bind(&product.price_label)
            .bind(&product.currency)
            .bind(&product.image_url)
            .bind(&product.marketplace_url)
            .bind(&product.interest_tags)
            .bind(&product.occasion_tags)
            .bind(&product.relationship_tags)
            .bind(product.badges.prime)
            .bind(product.badges.best_seller)
            .bind(product.badges.featured)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn fetch_product(&self, product_id: Uuid) -> AppResult<Option<CatalogProduct>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog_products WHERE id = $1");

        let product = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    async fn list_catalog(&self) -> AppResult<Vec<CatalogProduct>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog_products ORDER BY name");

        let products = sqlx::query_as::<_, CatalogProduct>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    async fn insert_recommendation(&self, rec: &NewRecommendation) -> AppResult<Recommendation> {
        let sql = format!(
            "INSERT INTO recommendations \
             (id, session_id, product_id, reasoning, score, marketplace_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {RECOMMENDATION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(Uuid::new_v4())
            .bind(rec.session_id)
            .bind(rec.product_id)
            .bind(&rec.reasoning)
            .bind(rec.score)
            .bind(&rec.marketplace_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn session_recommendations(&self, session_id: Uuid) -> AppResult<Vec<Recommendation>> {
        let sql = format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations \
             WHERE session_id = $1 ORDER BY created_at, id"
        );

        let rows = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn fetch_recommendation(&self, id: Uuid) -> AppResult<Option<Recommendation>> {
        let sql = format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE id = $1");

        let row = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn set_personal_message(&self, id: Uuid, message: &str) -> AppResult<()> {
        sqlx::query("UPDATE recommendations SET personal_message = $2 WHERE id = $1")
            .bind(id)
            .bind(message)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
