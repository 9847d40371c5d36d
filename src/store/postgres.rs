//! Postgres-backed document store: one JSONB `documents` table, row locks for
//! read-modify-write.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Clause, DocumentStore, Filter, Update, INVENTORY, PRODUCTS};
use crate::domain::aggregates::{inventory, Inventory, Product, StockLevels, StockOp};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connect and run pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

/// `body ->> field` yields text, so filter values are compared in their text form.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) -> Result<()> {
    filter.check()?;
    for clause in filter.clauses() {
        match clause {
            Clause::Eq(field, value) => {
                qb.push(" AND body ->> ").push_bind(field.clone()).push(" = ").push_bind(text_of(value));
            }
            Clause::In(field, values) => {
                qb.push(" AND body ->> ")
                    .push_bind(field.clone())
                    .push(" = ANY(")
                    .push_bind(values.iter().map(text_of).collect::<Vec<_>>())
                    .push(")");
            }
        }
    }
    Ok(())
}

async fn upsert<'e, E>(executor: E, collection: &str, id: Uuid, doc: &Value) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) \
         ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body",
    )
    .bind(collection)
    .bind(id)
    .bind(Json(doc))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let doc = sqlx::query_scalar::<_, Value>("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        push_filter(&mut qb, filter)?;
        qb.push(" ORDER BY id");
        let docs = qb.build_query_scalar::<Value>().fetch_all(&self.pool).await?;
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        push_filter(&mut qb, filter)?;
        qb.push(" ORDER BY id LIMIT 1");
        let doc = qb.build_query_scalar::<Value>().fetch_optional(&self.pool).await?;
        Ok(doc)
    }

    async fn save(&self, collection: &str, id: Uuid, doc: Value) -> Result<()> {
        upsert(&self.pool, collection, id, &doc).await
    }

    async fn find_by_id_and_update(&self, collection: &str, id: Uuid, guard: &Filter, update: &Update) -> Result<Option<Value>> {
        guard.check()?;
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_scalar::<_, Value>("SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut doc) = current else { return Ok(None) };
        if !guard.matches(&doc) {
            return Ok(None);
        }
        update.apply(&mut doc)?;
        upsert(&mut *tx, collection, id, &doc).await?;
        tx.commit().await?;
        Ok(Some(doc))
    }

    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let doc = sqlx::query_scalar::<_, Value>("DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    async fn adjust_stock(&self, product_id: Uuid, op: StockOp) -> Result<StockLevels> {
        let mut tx = self.pool.begin().await?;

        // The product row lock serialises every stock change for this product,
        // including lazy creation of its inventory record.
        let product_doc = sqlx::query_scalar::<_, Value>("SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE")
            .bind(PRODUCTS)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EcommerceError::ProductNotFound(product_id))?;
        let mut product: Product = serde_json::from_value(product_doc)?;

        let existing = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND body ->> 'product' = $2 FOR UPDATE",
        )
        .bind(INVENTORY)
        .bind(product_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .map(serde_json::from_value::<Inventory>)
        .transpose()?;

        let inventory = inventory::apply_stock(op, &mut product, existing, Utc::now())?;

        upsert(&mut *tx, INVENTORY, inventory.id, &serde_json::to_value(&inventory)?).await?;
        upsert(&mut *tx, PRODUCTS, product.id, &serde_json::to_value(&product)?).await?;
        tx.commit().await?;
        Ok(StockLevels { product, inventory })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_of_matches_json_text_extraction() {
        let id = Uuid::now_v7();
        assert_eq!(text_of(&json!(id)), id.to_string());
        assert_eq!(text_of(&json!("pending")), "pending");
        assert_eq!(text_of(&json!(42)), "42");
        assert_eq!(text_of(&json!(true)), "true");
    }
}
