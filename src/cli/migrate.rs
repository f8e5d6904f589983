use tracing::info;

use crate::database::PostgresConnection;

pub struct MigrationOpts {
    pub database_url: String,
}

/// Apply the migrations embedded from the `migrations` directory.
pub async fn run_migrations(opts: MigrationOpts) -> anyhow::Result<()> {
    let db = PostgresConnection::connect(&opts.database_url, 1, 5).await?;

    sqlx::migrate!().run(&*db).await?;
    info!("Applied database migrations.");

    Ok(())
}
