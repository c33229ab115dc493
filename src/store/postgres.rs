use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

use super::{new_document_id, Direction, Document, DocumentStore, Fields, Filter, NewDocument, Query};
use crate::error::PersistenceError;

/// Server timestamps come from the database clock so every writer agrees on ordering.
const UPSERT_SQL: &str = r#"
    WITH stamp AS (
        SELECT jsonb_build_object(
            'seconds', floor(extract(epoch FROM now()))::bigint,
            'nanos', (extract(microseconds FROM now())::bigint % 1000000) * 1000
        ) AS ts
    )
    INSERT INTO documents (collection, id, data)
    SELECT $1, $2, $3::jsonb || COALESCE(
        (SELECT jsonb_object_agg(field, stamp.ts) FROM unnest($4::text[]) AS field),
        '{}'::jsonb
    )
    FROM stamp
    ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data
"#;

const INSERT_SQL: &str = r#"
    WITH stamp AS (
        SELECT jsonb_build_object(
            'seconds', floor(extract(epoch FROM now()))::bigint,
            'nanos', (extract(microseconds FROM now())::bigint % 1000000) * 1000
        ) AS ts
    )
    INSERT INTO documents (collection, id, data)
    SELECT $1, $2, $3::jsonb || COALESCE(
        (SELECT jsonb_object_agg(field, stamp.ts) FROM unnest($4::text[]) AS field),
        '{}'::jsonb
    )
    FROM stamp
"#;

/// Documents stored as JSONB rows in a single `documents` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn write(
        &self,
        sql: &str,
        collection: &str,
        id: &str,
        doc: NewDocument,
    ) -> anyhow::Result<()> {
        sqlx::query(sql)
            .bind(collection)
            .bind(id)
            .bind(Value::Object(doc.fields))
            .bind(doc.server_timestamps)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn into_fields(id: &str, data: Value) -> Result<Fields, PersistenceError> {
    match data {
        Value::Object(fields) => Ok(fields),
        _ => Err(PersistenceError::msg(format!("document {id} is not a JSON object"))),
    }
}

fn build_select<'a>(collection: &'a str, query: &'a Query) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
    qb.push_bind(collection);

    for filter in &query.filters {
        match filter {
            Filter::Eq(field, value) => {
                qb.push(" AND data -> ");
                qb.push_bind(field.as_str());
                qb.push(" = ");
                qb.push_bind(value.clone());
                qb.push("::jsonb");
            }
            Filter::In(field, values) => {
                qb.push(" AND ");
                qb.push_bind(Value::Array(values.clone()));
                qb.push("::jsonb @> jsonb_build_array(data -> ");
                qb.push_bind(field.as_str());
                qb.push(")");
            }
        }
    }

    if let Some(order) = &query.order_by {
        let dir = match order.direction {
            Direction::Asc => "ASC NULLS FIRST",
            Direction::Desc => "DESC NULLS LAST",
        };
        // Timestamps order by (seconds, nanos); other values by their jsonb order.
        qb.push(" ORDER BY COALESCE(data -> ");
        qb.push_bind(order.field.as_str());
        qb.push(" -> 'seconds', data -> ");
        qb.push_bind(order.field.as_str());
        qb.push(format!(") {dir}, data -> "));
        qb.push_bind(order.field.as_str());
        qb.push(format!(" -> 'nanos' {dir}, id"));
    } else {
        qb.push(" ORDER BY id");
    }
    qb
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn add(&self, collection: &str, doc: NewDocument) -> Result<String, PersistenceError> {
        let id = new_document_id();
        self.write(INSERT_SQL, collection, &id, doc)
            .await
            .with_context(|| format!("insert {collection}/{id}"))?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, PersistenceError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("get {collection}/{id}"))?;

        row.map(|(data,)| {
            Ok(Document {
                id: id.to_string(),
                fields: into_fields(id, data)?,
            })
        })
        .transpose()
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        doc: NewDocument,
    ) -> Result<(), PersistenceError> {
        self.write(UPSERT_SQL, collection, id, doc)
            .await
            .with_context(|| format!("set {collection}/{id}"))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete {collection}/{id}"))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<Vec<Document>, PersistenceError> {
        query.validate()?;
        let rows: Vec<(String, Value)> = build_select(collection, &query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("query {collection}"))?;

        rows.into_iter()
            .map(|(id, data)| {
                let fields = into_fields(&id, data)?;
                Ok(Document { id, fields })
            })
            .collect()
    }
}
