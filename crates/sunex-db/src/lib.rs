use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use sunex_schemas::MeasurementRecord;

pub const ENV_DB_URL: &str = "SUNEX_DATABASE_URL";

/// Connect to Postgres using SUNEX_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='measurements'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_measurements_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_measurements_table: bool,
}

/// Errors a [`Recorder`] implementation may return.
#[derive(Debug)]
pub enum RecorderError {
    /// The record shape is incompatible with the store's current schema.
    /// Reconciling schema (running migrations) is the caller's job.
    SchemaMismatch(String),
    /// Connectivity or any other store-side failure.
    Unavailable(String),
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            RecorderError::Unavailable(msg) => write!(f, "record store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RecorderError {}

/// Appends accepted measurements to the analytical table. Append-only: a
/// record, once written, is never edited or deleted by this system.
#[async_trait]
pub trait Recorder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn append(&self, record: &MeasurementRecord) -> Result<(), RecorderError>;
}

/// SQLSTATEs that indicate the table shape disagrees with the record shape:
/// undefined_table, undefined_column, datatype_mismatch.
fn is_schema_mismatch_code(code: &str) -> bool {
    matches!(code, "42P01" | "42703" | "42804")
}

fn map_sqlx_error(e: sqlx::Error) -> RecorderError {
    if let sqlx::Error::Database(db) = &e {
        if let Some(code) = db.code() {
            if is_schema_mismatch_code(&code) {
                return RecorderError::SchemaMismatch(db.to_string());
            }
        }
    }
    RecorderError::Unavailable(e.to_string())
}

/// Postgres-backed recorder writing to the `measurements` table.
pub struct PgRecorder {
    pool: PgPool,
}

impl PgRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Recorder for PgRecorder {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, record: &MeasurementRecord) -> Result<(), RecorderError> {
        let readings = serde_json::to_value(&record.readings)
            .map_err(|e| RecorderError::Unavailable(format!("encode readings: {e}")))?;

        sqlx::query(
            r#"
            insert into measurements (inserted_at, readings)
            values ($1, $2)
            "#,
        )
        .bind(record.inserted_at)
        .bind(readings)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(map_sqlx_error)
    }
}

/// Recorder used when the analytical store integration is disabled. Accepts
/// every append so the pipeline still advances the checkpoint.
pub struct NoopRecorder;

#[async_trait]
impl Recorder for NoopRecorder {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn append(&self, _record: &MeasurementRecord) -> Result<(), RecorderError> {
        Ok(())
    }
}
