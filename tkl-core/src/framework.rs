use sqlx::PgPool;

/// Runs single-statement queries against the pool.
///
/// Each query is a plain struct with a `kanau::processor::Processor` impl
/// on this type; see the `entities` module.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
