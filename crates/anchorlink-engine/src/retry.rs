//! Bounded retry with fixed backoff for whole pipeline passes.
//!
//! Each pass commits atomically or not at all, so retrying the entire pass
//! is always safe. Only connectivity-class failures retry; anything else is
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use anchorlink_db::DbError;

use crate::error::EngineError;

/// Returns `true` for errors that are worth retrying after the backoff
/// delay.
///
/// **Retriable:** network-level failures against the relational store
/// (I/O errors, pool acquire timeouts) and the vector store (timeouts,
/// connection failures, 5xx responses).
///
/// **Not retriable:** SQL/constraint errors, decode failures, and
/// vector-store API errors — retrying won't fix them.
pub(crate) fn is_retriable(err: &EngineError) -> bool {
    match err {
        EngineError::Db(DbError::Sqlx(e)) => {
            matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
        }
        EngineError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        EngineError::Db(_) | EngineError::VectorStore(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors, sleeping a fixed `backoff_secs` between attempts.
pub(crate) async fn retry_pass<T, F, Fut>(
    max_retries: u32,
    backoff_secs: u64,
    mut operation: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt = 0_u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    backoff_secs,
                    error = %err,
                    "transient failure — retrying pass after backoff"
                );
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }
        }
    }
}
