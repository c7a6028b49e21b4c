use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Error, Result, schema};

#[derive(Clone)]
pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &mneme_config::Postgres) -> Result<Self> {
		let pool = pool_options(cfg)
			.connect(&cfg.dsn)
			.await
			.map_err(Error::storage("Failed to connect to Postgres."))?;

		Ok(Self { pool })
	}

	/// Builds the pool without opening a connection. The first query connects.
	pub fn connect_lazy(cfg: &mneme_config::Postgres) -> Result<Self> {
		let pool = pool_options(cfg)
			.connect_lazy(&cfg.dsn)
			.map_err(Error::storage("Failed to parse Postgres DSN."))?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = schema::render_schema(vector_dim);
		let lock_id: i64 = 6_366_110;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed)
				.execute(&mut *tx)
				.await
				.map_err(Error::storage("Failed to apply schema statement."))?;
		}

		tx.commit().await?;

		Ok(())
	}
}

fn pool_options(cfg: &mneme_config::Postgres) -> PgPoolOptions {
	let options = PgPoolOptions::new().max_connections(cfg.pool_max_conns);

	match cfg.acquire_timeout_ms {
		Some(timeout_ms) => options.acquire_timeout(Duration::from_millis(timeout_ms)),
		None => options,
	}
}
