//! Blocking operation helpers shared by the `PostgreSQL` adapters.
//!
//! Diesel is synchronous; every query runs on the blocking thread pool via
//! [`tokio::task::spawn_blocking`] so async worker threads stay free.

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};

/// `PostgreSQL` connection pool type shared by the relay adapters.
pub type RelayPgPool = Pool<ConnectionManager<PgConnection>>;

/// Builds a connection pool for `database_url`.
///
/// # Errors
///
/// Returns [`PoolError`] if the initial connections cannot be established.
pub fn build_pool(database_url: &str, max_size: u32) -> Result<RelayPgPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().max_size(max_size).build(manager)
}

/// Runs `f` with a pooled connection on the blocking thread pool.
///
/// Pool checkout failures and join errors are mapped through `map_err`.
pub(super) async fn run_blocking_with<F, T, E>(
    pool: &RelayPgPool,
    f: F,
    map_err: fn(String) -> E,
) -> Result<T, E>
where
    F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(|err| map_err(err.to_string()))?;
        f(&mut connection)
    })
    .await
    .map_err(|err| map_err(format!("task join error: {err}")))?
}
