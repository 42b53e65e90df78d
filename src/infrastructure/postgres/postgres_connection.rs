use anyhow::Result;
use diesel::{
    Connection, PgConnection,
    connection::CacheSize,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};
use std::time::Duration;
use tracing::info;

use crate::config::config_model::Database;

/// Poolers in transaction mode (pgbouncer, supavisor) cannot keep named
/// prepared statements across checkouts.
#[derive(Debug, Default)]
struct DisablePreparedStatements;

impl CustomizeConnection<PgConnection, R2d2Error> for DisablePreparedStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

pub fn establish_connection(database: &Database) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(&database.url);
    let pool = Pool::builder()
        .max_size(database.max_connections)
        .connection_timeout(Duration::from_secs(database.connect_timeout))
        .connection_customizer(Box::new(DisablePreparedStatements))
        .build(manager)?;

    info!(
        max_connections = database.max_connections,
        connect_timeout_secs = database.connect_timeout,
        "postgres: connection pool ready"
    );

    Ok(pool)
}
