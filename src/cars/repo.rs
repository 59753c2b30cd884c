use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::cars::query::CarQuery;
use crate::cars::repo_types::{Car, CarChanges, NewCar};
use crate::error::StoreError;

const CAR_COLUMNS: &str =
    "id, user_ref, title, description, tags, images, offer, created_at, updated_at";

/// Listing persistence.
///
/// `update_owned` and `delete_owned` must check id and owner in the same
/// atomic step as the mutation; `None` means "no such listing for this owner".
#[async_trait]
pub trait CarStore: Send + Sync {
    async fn insert(&self, new: NewCar) -> Result<Car, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Car>, StoreError>;
    /// Returns at most `query.fetch_limit()` rows.
    async fn search(&self, query: &CarQuery) -> Result<Vec<Car>, StoreError>;
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Car>, StoreError>;
    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        changes: CarChanges,
    ) -> Result<Option<Car>, StoreError>;
    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Car>, StoreError>;
}

#[derive(Clone)]
pub struct PgCarStore {
    db: PgPool,
}

impl PgCarStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CarStore for PgCarStore {
    async fn insert(&self, new: NewCar) -> Result<Car, StoreError> {
        let car = sqlx::query_as::<_, Car>(&format!(
            r#"
            INSERT INTO cars (id, user_ref, title, description, tags, images, offer)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CAR_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.owner)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.tags)
        .bind(&new.images)
        .bind(new.offer)
        .fetch_one(&self.db)
        .await?;
        Ok(car)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        let car = sqlx::query_as::<_, Car>(&format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(car)
    }

    async fn search(&self, query: &CarQuery) -> Result<Vec<Car>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {CAR_COLUMNS} FROM cars"));
        query.push_sql(&mut qb);
        let rows = qb.build_query_as::<Car>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Car>, StoreError> {
        let rows = sqlx::query_as::<_, Car>(&format!(
            r#"
            SELECT {CAR_COLUMNS}
            FROM cars
            WHERE user_ref = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        changes: CarChanges,
    ) -> Result<Option<Car>, StoreError> {
        let car = sqlx::query_as::<_, Car>(&format!(
            r#"
            UPDATE cars
               SET title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   tags        = COALESCE($5, tags),
                   images      = COALESCE($6, images),
                   offer       = COALESCE($7, offer),
                   updated_at  = now()
             WHERE id = $1 AND user_ref = $2
            RETURNING {CAR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.tags)
        .bind(changes.images)
        .bind(changes.offer)
        .fetch_optional(&self.db)
        .await?;
        Ok(car)
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Car>, StoreError> {
        let car = sqlx::query_as::<_, Car>(&format!(
            "DELETE FROM cars WHERE id = $1 AND user_ref = $2 RETURNING {CAR_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(car)
    }
}
