use sqlx::{postgres::PgPoolOptions, PgPool};

/// Opens the Postgres pool backing variant vectors and taste profiles
///
/// Pool size comes from configuration. The first connection is
/// established eagerly, so a bad `DATABASE_URL` fails at startup instead
/// of on the first rating.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}
