use sqlx::PgPool;
use tracing::debug;

use crate::persistence::{PersistenceError, Persister};
use crate::types::PersistenceRecord;

/// Persister writing entity documents to Postgres.
///
/// Documents live in `ingest.entity_counts` and publication counters in `ingest.publications`.
/// Both writes are upserts that add to the existing row. The tables are created by the
/// daemon's migrations.
#[derive(Debug, Clone)]
pub struct PostgresPersister {
    pool: PgPool,
}

impl PostgresPersister {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_bigint(value: u64, record: &PersistenceRecord, field: &str) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::InvalidRecord {
        publication: record.publication.clone(),
        record_id: record.record_id.clone(),
        reason: format!("{field} {value} does not fit a bigint"),
    })
}

impl Persister for PostgresPersister {
    fn name() -> &'static str {
        "postgres"
    }

    async fn persist(&self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        let articles = to_bigint(record.fields.articles, record, "articles")?;
        let count = to_bigint(record.fields.count, record, "count")?;

        sqlx::query(
            r#"
            insert into ingest.entity_counts (publication, collection, record_id, articles, count)
            values ($1, $2, $3, $4, $5)
            on conflict (publication, collection, record_id) do update
            set articles = entity_counts.articles + excluded.articles,
                count = entity_counts.count + excluded.count,
                updated_at = now()
            "#,
        )
        .bind(&record.publication)
        .bind(&record.collection)
        .bind(&record.record_id)
        .bind(articles)
        .bind(count)
        .execute(&self.pool)
        .await?;

        debug!(
            publication = %record.publication,
            record_id = %record.record_id,
            "upserted entity count"
        );

        Ok(())
    }

    async fn increment_publication(
        &self,
        publication: &str,
        articles: u64,
    ) -> Result<(), PersistenceError> {
        let articles =
            i64::try_from(articles).map_err(|_| PersistenceError::InvalidRecord {
                publication: publication.to_string(),
                record_id: publication.to_string(),
                reason: format!("articles {articles} does not fit a bigint"),
            })?;

        sqlx::query(
            r#"
            insert into ingest.publications (publication, articles)
            values ($1, $2)
            on conflict (publication) do update
            set articles = publications.articles + excluded.articles,
                updated_at = now()
            "#,
        )
        .bind(publication)
        .bind(articles)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
