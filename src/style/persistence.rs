use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use super::types::{AgeBand, LearnerClassificationRecord, StyleCategory};

const SQLITE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "learner_classifications" (
    "learner_id" TEXT PRIMARY KEY NOT NULL,
    "style" TEXT NOT NULL,
    "age_band" TEXT NOT NULL,
    "confidence" INTEGER NOT NULL DEFAULT 0,
    "updated_at" TEXT NOT NULL
)
"#;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Where a learner's classification record lives between processes.
#[derive(Debug, Clone)]
pub enum PersistenceBackend {
    Memory,
    JsonFile(PathBuf),
    Sqlite { pool: SqlitePool, learner_id: String },
}

impl PersistenceBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::JsonFile(_) => "json",
            Self::Sqlite { .. } => "sqlite",
        }
    }

    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }

    /// Reads the stored record; `None` when nothing has been saved yet.
    pub async fn read(&self) -> Result<Option<LearnerClassificationRecord>, PersistenceError> {
        match self {
            Self::Memory => Ok(None),
            Self::JsonFile(path) => read_json_record(path).await,
            Self::Sqlite { pool, learner_id } => read_sqlite_record(pool, learner_id).await,
        }
    }

    pub async fn write(&self, record: &LearnerClassificationRecord) -> Result<(), PersistenceError> {
        match self {
            Self::Memory => Ok(()),
            Self::JsonFile(path) => write_json_record(path, record).await,
            Self::Sqlite { pool, learner_id } => write_sqlite_record(pool, learner_id, record).await,
        }
    }

    pub async fn clear(&self) -> Result<(), PersistenceError> {
        match self {
            Self::Memory => Ok(()),
            Self::JsonFile(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            },
            Self::Sqlite { pool, learner_id } => {
                sqlx::query(r#"DELETE FROM "learner_classifications" WHERE "learner_id" = ?"#)
                    .bind(learner_id)
                    .execute(pool)
                    .await?;
                Ok(())
            }
        }
    }
}

async fn read_json_record(
    path: &Path,
) -> Result<Option<LearnerClassificationRecord>, PersistenceError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let record: LearnerClassificationRecord = serde_json::from_slice(&raw)?;
    Ok(Some(LearnerClassificationRecord::new(
        record.style,
        record.age_band,
        record.confidence,
    )))
}

// Written to a sibling temp file first so a reader sees either the old or the new record.
async fn write_json_record(
    path: &Path,
    record: &LearnerClassificationRecord,
) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let body = serde_json::to_vec_pretty(record)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub async fn open_sqlite_pool(db_path: &Path) -> Result<SqlitePool, PersistenceError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query(SQLITE_SCHEMA_SQL).execute(&pool).await?;

    Ok(pool)
}

async fn read_sqlite_record(
    pool: &SqlitePool,
    learner_id: &str,
) -> Result<Option<LearnerClassificationRecord>, PersistenceError> {
    let row = sqlx::query(
        r#"
        SELECT "style", "age_band", "confidence"
        FROM "learner_classifications"
        WHERE "learner_id" = ?
        LIMIT 1
        "#,
    )
    .bind(learner_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let style = row
        .try_get::<String, _>("style")
        .ok()
        .and_then(|s| StyleCategory::parse(&s))
        .unwrap_or_default();
    let age_band = row
        .try_get::<String, _>("age_band")
        .ok()
        .and_then(|s| AgeBand::parse(&s))
        .unwrap_or_default();
    let confidence: i64 = row.try_get("confidence").unwrap_or(0);

    Ok(Some(LearnerClassificationRecord::new(
        style,
        age_band,
        confidence.clamp(0, 100) as u8,
    )))
}

async fn write_sqlite_record(
    pool: &SqlitePool,
    learner_id: &str,
    record: &LearnerClassificationRecord,
) -> Result<(), PersistenceError> {
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO "learner_classifications" (
            "learner_id", "style", "age_band", "confidence", "updated_at"
        ) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT ("learner_id") DO UPDATE SET
            "style" = EXCLUDED."style",
            "age_band" = EXCLUDED."age_band",
            "confidence" = EXCLUDED."confidence",
            "updated_at" = EXCLUDED."updated_at"
        "#,
    )
    .bind(learner_id)
    .bind(record.style.as_str())
    .bind(record.age_band.as_str())
    .bind(i64::from(record.confidence))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
