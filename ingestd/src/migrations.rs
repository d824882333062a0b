use ingest_config::shared::PgConnectionConfig;
use sqlx::{Executor, postgres::PgPoolOptions};
use tracing::info;

/// Runs the document store migrations in the `ingest` schema.
///
/// The connection used here sets `search_path` to `ingest` so that the `_sqlx_migrations`
/// metadata table lands next to the counters instead of in the public schema. The pool is
/// closed once migrations are applied.
pub async fn apply_store_migrations(
    connection_config: &PgConnectionConfig,
) -> Result<(), sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("create schema if not exists ingest;").await?;
                conn.execute("set search_path = 'ingest';").await?;

                Ok(())
            })
        })
        .connect_with(connection_config.connect_options())
        .await?;

    info!("applying document store migrations");

    let migrator = sqlx::migrate!("./migrations");
    migrator.run(&pool).await?;
    pool.close().await;

    info!("document store migrations successfully applied");

    Ok(())
}
