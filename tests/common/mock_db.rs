use std::sync::LazyLock;

use common::{DbConn, DbPool};
use deadpool_diesel::postgres::{Manager, Pool};
use diesel::RunQueryDsl;
use diesel_migrations::{
	EmbeddedMigrations,
	MigrationHarness,
	embed_migrations,
};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Creates throwaway databases next to the one in `DATABASE_URL`
pub static DATABASE_PROVIDER: LazyLock<DatabaseProvider> =
	LazyLock::new(DatabaseProvider::new);

pub struct DatabaseProvider {
	server_url: String,
	admin_pool: DbPool,
}

/// A migrated test database that is dropped together with this guard
pub struct DatabaseGuard {
	admin_conn: DbConn,
	name:       String,
	pool:       DbPool,
}

fn build_pool(url: String) -> DbPool {
	let manager = Manager::new(url, deadpool_diesel::Runtime::Tokio1);

	Pool::builder(manager).build().unwrap()
}

async fn execute(conn: &DbConn, query: String) {
	conn.interact(move |conn| diesel::sql_query(query).execute(conn))
		.await
		.expect("could not interact with admin connection")
		.expect("could not execute admin query");
}

impl DatabaseProvider {
	fn new() -> Self {
		let database_url = std::env::var("DATABASE_URL")
			.expect("DATABASE_URL must be set for database tests");
		let (server_url, _) = database_url
			.rsplit_once('/')
			.expect("DATABASE_URL must name a database");

		Self {
			server_url: server_url.to_string(),
			admin_pool: build_pool(database_url.clone()),
		}
	}

	/// Create and migrate a fresh database
	///
	/// # Panics
	/// Panics if the database server is unreachable or migrating fails
	pub async fn acquire(&self) -> DatabaseGuard {
		let name = format!("test_{}", Uuid::new_v4().simple());

		let admin_conn = self
			.admin_pool
			.get()
			.await
			.expect("could not get admin pool connection");

		execute(&admin_conn, format!("CREATE DATABASE {name};")).await;

		let pool = build_pool(format!("{}/{name}", self.server_url));

		pool.get()
			.await
			.expect("could not connect to test database")
			.interact(|conn| conn.run_pending_migrations(MIGRATIONS).map(|_| ()))
			.await
			.expect("could not interact with test database")
			.expect("could not run migrations");

		DatabaseGuard { admin_conn, name, pool }
	}
}

impl DatabaseGuard {
	#[must_use]
	pub fn pool(&self) -> DbPool { self.pool.clone() }
}

impl Drop for DatabaseGuard {
	fn drop(&mut self) {
		let query = format!("DROP DATABASE {} WITH (FORCE);", self.name);

		futures::executor::block_on(execute(&self.admin_conn, query));
	}
}
