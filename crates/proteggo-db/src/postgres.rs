//! Postgres backend: one JSONB row per document in the `documents` table.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::{DocumentError, DocumentResult};
use crate::query::{Direction, Document, Fields, Filter, Query};
use crate::store::DocumentStore;

/// Connect to Postgres and apply the embedded migrations.
pub async fn setup_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    use anyhow::Context;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(max_connections, "Database connected successfully");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
        match filter {
            Filter::Eq(field, value) => {
                builder.push(" AND fields -> ");
                builder.push_bind(field.clone());
                builder.push(" = ");
                builder.push_bind(Json(value.clone()));
            }
            Filter::In(field, values) => {
                if values.is_empty() {
                    builder.push(" AND FALSE");
                    return;
                }
                builder.push(" AND fields -> ");
                builder.push_bind(field.clone());
                builder.push(" IN (");
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(Json(value.clone()));
                }
                separated.push_unseparated(")");
            }
            Filter::IsNull(field) => {
                builder.push(" AND COALESCE(fields -> ");
                builder.push_bind(field.clone());
                builder.push(", 'null'::jsonb) = 'null'::jsonb");
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Fields>> {
        let row = sqlx::query_scalar::<Postgres, Json<Value>>(
            "SELECT fields FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(Json(Value::Object(fields))) => Ok(Some(fields)),
            Some(_) => Err(DocumentError::data(collection, id, "document body is not an object")),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, fields), fields(db.table = "documents", db.operation = "upsert"))]
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> DocumentResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET fields = EXCLUDED.fields, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, fields), fields(db.table = "documents", db.operation = "merge"))]
    async fn merge_update(&self, collection: &str, id: &str, fields: Fields) -> DocumentResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET fields = documents.fields || EXCLUDED.fields, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete"))]
    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, query), fields(db.table = "documents", db.operation = "select"))]
    async fn query(&self, collection: &str, query: &Query) -> DocumentResult<Vec<Document>> {
        if let Some(token) = &query.start_after {
            let exists = sqlx::query_scalar::<Postgres, bool>(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND id = $2)",
            )
            .bind(collection)
            .bind(token)
            .fetch_one(&self.pool)
            .await?;

            if !exists {
                return Err(DocumentError::NotFound(format!("{}/{}", collection, token)));
            }
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, fields FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());

        for filter in &query.filters {
            Self::push_filter(&mut builder, filter);
        }

        let direction = query
            .order_by
            .as_ref()
            .map(|o| o.direction)
            .unwrap_or(Direction::Asc);
        let (cmp, sql_direction) = match direction {
            Direction::Asc => (">", "ASC"),
            Direction::Desc => ("<", "DESC"),
        };

        if let Some(token) = &query.start_after {
            match &query.order_by {
                Some(order) => {
                    builder.push(" AND (COALESCE(fields -> ");
                    builder.push_bind(order.field.clone());
                    builder.push(", 'null'::jsonb), id) ");
                    builder.push(cmp);
                    builder.push(" (SELECT COALESCE(fields -> ");
                    builder.push_bind(order.field.clone());
                    builder.push(", 'null'::jsonb), id FROM documents WHERE collection = ");
                    builder.push_bind(collection.to_string());
                    builder.push(" AND id = ");
                    builder.push_bind(token.clone());
                    builder.push(")");
                }
                None => {
                    builder.push(" AND id ");
                    builder.push(cmp);
                    builder.push(" ");
                    builder.push_bind(token.clone());
                }
            }
        }

        match &query.order_by {
            Some(order) => {
                builder.push(" ORDER BY COALESCE(fields -> ");
                builder.push_bind(order.field.clone());
                builder.push(", 'null'::jsonb) ");
                builder.push(sql_direction);
                builder.push(", id ");
                builder.push(sql_direction);
            }
            None => {
                builder.push(" ORDER BY id ASC");
            }
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows: Vec<(String, Json<Value>)> = builder
            .build_query_as::<(String, Json<Value>)>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id, Json(value))| match value {
                Value::Object(fields) => Ok(Document { id, fields }),
                _ => Err(DocumentError::data(collection, &id, "document body is not an object")),
            })
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
