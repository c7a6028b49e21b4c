//! Throwaway Postgres databases for integration tests.
//!
//! Tests create a [`TestDatabase`] next to the database named by `MNEME_PG_DSN`, bootstrap the
//! schema into it, and hand it back to [`TestDatabase::cleanup`] once they are done.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

use mneme_config::Postgres;
use mneme_storage::db::Db;

/// Maintenance databases tried, in order, for `CREATE DATABASE` and `DROP DATABASE`.
const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];

pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse MNEME_PG_DSN: {err}.")))?;
		let (maintenance, mut conn) = open_maintenance(&base).await?;
		let name = format!("mneme_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create {name}: {err}.")))?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Connects to the test database and bootstraps the schema with `vector_dim` wide vectors.
	pub async fn bootstrap(&self, vector_dim: u32) -> Result<Db> {
		let cfg = Postgres { dsn: self.dsn.clone(), pool_max_conns: 2, acquire_timeout_ms: None };
		let db = Db::connect(&cfg).await?;

		db.ensure_schema(vector_dim).await?;

		Ok(db)
	}

	/// Drops the database, disconnecting any pool that still holds it open.
	pub async fn cleanup(self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.maintenance).await.map_err(|err| {
			Error::Message(format!("Failed to reconnect for cleanup of {}: {err}.", self.name))
		})?;

		sqlx::query(
			"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
		)
		.bind(&self.name)
		.fetch_all(&mut conn)
		.await?;
		conn.execute(format!(r#"DROP DATABASE IF EXISTS "{}""#, self.name).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to drop {}: {err}.", self.name)))?;

		Ok(())
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("MNEME_PG_DSN").ok()
}

async fn open_maintenance(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut failures = Vec::new();

	for database in MAINTENANCE_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => failures.push(format!("{database}: {err}")),
		}
	}

	Err(Error::Message(format!(
		"Failed to reach a maintenance database ({}).",
		failures.join("; ")
	)))
}
