use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::persistence::{open_sqlite_pool, PersistenceBackend, PersistenceError};
use super::types::{AgeBand, LearnerClassificationRecord, StyleCategory};
use crate::config::{StoreBackendKind, StoreConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    Persistent,
    /// A persistence error was seen; the store is memory-only for the rest of the process.
    Degraded,
}

impl StoreHealth {
    pub const fn as_str(self) -> &'static str {
        match self {
            StoreHealth::Persistent => "PERSISTENT",
            StoreHealth::Degraded => "DEGRADED",
        }
    }
}

/// Holds the learner's classification record.
///
/// The in-memory copy is authoritative for the process. Backend failures are
/// logged and switch the store to [`StoreHealth::Degraded`]; callers never see them.
///
/// At most one questionnaire session may be open against a store at a time;
/// controllers claim it with [`try_claim_session`](Self::try_claim_session).
#[derive(Debug)]
pub struct ClassificationStore {
    backend: PersistenceBackend,
    current: RwLock<LearnerClassificationRecord>,
    health: RwLock<StoreHealth>,
    session_claimed: AtomicBool,
}

impl ClassificationStore {
    pub fn in_memory() -> Self {
        Self::with_backend(PersistenceBackend::Memory)
    }

    fn with_backend(backend: PersistenceBackend) -> Self {
        Self {
            backend,
            current: RwLock::new(LearnerClassificationRecord::default()),
            health: RwLock::new(StoreHealth::Persistent),
            session_claimed: AtomicBool::new(false),
        }
    }

    /// Opens the store and hydrates it from `backend`.
    pub async fn open(backend: PersistenceBackend) -> Self {
        let store = Self::with_backend(backend);

        match store.backend.read().await {
            Ok(Some(record)) => {
                tracing::debug!(
                    backend = store.backend.kind(),
                    style = %record.style,
                    age_band = %record.age_band,
                    "classification record loaded"
                );
                *store.current.write() = record;
            }
            Ok(None) => {
                tracing::debug!(backend = store.backend.kind(), "no stored classification");
            }
            Err(err) => store.degrade("open", &err),
        }

        store
    }

    pub async fn from_config(config: &StoreConfig) -> Self {
        match config.backend {
            StoreBackendKind::Memory => Self::in_memory(),
            StoreBackendKind::Json => {
                Self::open(PersistenceBackend::JsonFile(config.path.clone())).await
            }
            StoreBackendKind::Sqlite => match open_sqlite_pool(&config.path).await {
                Ok(pool) => {
                    Self::open(PersistenceBackend::Sqlite {
                        pool,
                        learner_id: config.learner_id.clone(),
                    })
                    .await
                }
                Err(err) => {
                    let store = Self::in_memory();
                    store.degrade("open", &err);
                    store
                }
            },
        }
    }

    pub fn backend(&self) -> &PersistenceBackend {
        &self.backend
    }

    pub fn health(&self) -> StoreHealth {
        *self.health.read()
    }

    pub fn is_degraded(&self) -> bool {
        self.health() == StoreHealth::Degraded
    }

    /// Marks a session as open. Returns `false` if another one already is.
    pub fn try_claim_session(&self) -> bool {
        self.session_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release_session(&self) {
        self.session_claimed.store(false, Ordering::Release);
    }

    pub fn has_open_session(&self) -> bool {
        self.session_claimed.load(Ordering::Acquire)
    }

    /// Snapshot of the in-memory record without touching the backend.
    pub fn current(&self) -> LearnerClassificationRecord {
        *self.current.read()
    }

    /// Returns the last persisted record, or the default when none exists.
    pub async fn load(&self) -> LearnerClassificationRecord {
        if !self.uses_backend() {
            return self.current();
        }

        match self.backend.read().await {
            Ok(stored) => {
                let record = stored.unwrap_or_default();
                *self.current.write() = record;
                record
            }
            Err(err) => {
                self.degrade("load", &err);
                self.current()
            }
        }
    }

    pub async fn save(&self, record: LearnerClassificationRecord) {
        *self.current.write() = record;

        if !self.uses_backend() {
            return;
        }

        match self.backend.write(&record).await {
            Ok(()) => tracing::info!(
                backend = self.backend.kind(),
                style = %record.style,
                age_band = %record.age_band,
                confidence = record.confidence,
                "classification record saved"
            ),
            Err(err) => self.degrade("save", &err),
        }
    }

    /// Restores the default record and clears the persisted copy.
    pub async fn reset(&self) -> LearnerClassificationRecord {
        let record = LearnerClassificationRecord::default();
        *self.current.write() = record;

        if self.uses_backend() {
            match self.backend.clear().await {
                Ok(()) => tracing::info!(backend = self.backend.kind(), "classification reset"),
                Err(err) => self.degrade("reset", &err),
            }
        }

        record
    }

    /// Sets the style directly. Confidence is carried over unchanged.
    pub async fn set_style(&self, style: StyleCategory) -> LearnerClassificationRecord {
        let record = LearnerClassificationRecord {
            style,
            ..self.current()
        };
        self.save(record).await;
        record
    }

    pub async fn set_age_band(&self, age_band: AgeBand) -> LearnerClassificationRecord {
        let record = LearnerClassificationRecord {
            age_band,
            ..self.current()
        };
        self.save(record).await;
        record
    }

    fn uses_backend(&self) -> bool {
        self.backend.is_persistent() && !self.is_degraded()
    }

    fn degrade(&self, operation: &'static str, err: &PersistenceError) {
        let mut health = self.health.write();
        if *health != StoreHealth::Degraded {
            tracing::warn!(
                backend = self.backend.kind(),
                operation,
                error = %err,
                "classification persistence unavailable, continuing in memory"
            );
        }
        *health = StoreHealth::Degraded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_access_yields_default() {
        let store = ClassificationStore::in_memory();
        assert_eq!(store.load().await, LearnerClassificationRecord::default());
        assert!(!store.is_degraded());
    }

    #[tokio::test]
    async fn save_then_load_returns_record() {
        let store = ClassificationStore::in_memory();
        let record = LearnerClassificationRecord::new(StyleCategory::Visual, AgeBand::Adult, 60);
        store.save(record).await;
        assert_eq!(store.load().await, record);
        assert_eq!(store.current(), record);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let store = ClassificationStore::in_memory();
        store
            .save(LearnerClassificationRecord::new(
                StyleCategory::Auditory,
                AgeBand::Secondary,
                80,
            ))
            .await;
        let once = store.reset().await;
        let twice = store.reset().await;
        assert_eq!(once, twice);
        assert_eq!(store.load().await, LearnerClassificationRecord::default());
    }

    #[tokio::test]
    async fn preference_edits_keep_confidence() {
        let store = ClassificationStore::in_memory();
        store
            .save(LearnerClassificationRecord::new(
                StyleCategory::Visual,
                AgeBand::Primary,
                60,
            ))
            .await;

        let record = store.set_style(StyleCategory::Kinesthetic).await;
        assert_eq!(record.confidence, 60);
        assert_eq!(record.age_band, AgeBand::Primary);

        let record = store.set_age_band(AgeBand::Adult).await;
        assert_eq!(record.style, StyleCategory::Kinesthetic);
        assert_eq!(record.confidence, 60);
        assert_eq!(store.load().await, record);
    }

    #[tokio::test]
    async fn style_edit_without_questionnaire_has_zero_confidence() {
        let store = ClassificationStore::in_memory();
        let record = store.set_style(StyleCategory::ReadingWriting).await;
        assert_eq!(record.confidence, 0);
    }

    #[test]
    fn session_claim_is_exclusive() {
        let store = ClassificationStore::in_memory();
        assert!(!store.has_open_session());
        assert!(store.try_claim_session());
        assert!(!store.try_claim_session());
        assert!(store.has_open_session());

        store.release_session();
        assert!(!store.has_open_session());
        assert!(store.try_claim_session());
    }

    #[tokio::test]
    async fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learner.json");
        let record =
            LearnerClassificationRecord::new(StyleCategory::Multimodal, AgeBand::EarlyYears, 40);

        let store = ClassificationStore::open(PersistenceBackend::JsonFile(path.clone())).await;
        store.save(record).await;
        drop(store);

        let reopened = ClassificationStore::open(PersistenceBackend::JsonFile(path)).await;
        assert_eq!(reopened.current(), record);
        assert_eq!(reopened.load().await, record);
    }

    #[tokio::test]
    async fn unwritable_path_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("profiles");
        let path = parent.join("learner.json");

        let store = ClassificationStore::open(PersistenceBackend::JsonFile(path)).await;
        assert!(!store.is_degraded());

        // The parent directory can no longer be created.
        std::fs::write(&parent, b"file, not a directory").unwrap();

        let record = LearnerClassificationRecord::new(StyleCategory::Visual, AgeBand::Adult, 90);
        store.save(record).await;
        assert!(store.is_degraded());
        assert_eq!(store.health(), StoreHealth::Degraded);
        assert_eq!(store.load().await, record);

        store.reset().await;
        assert_eq!(store.load().await, LearnerClassificationRecord::default());
    }

    #[tokio::test]
    async fn corrupt_file_opens_degraded_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learner.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = ClassificationStore::open(PersistenceBackend::JsonFile(path.clone())).await;
        assert!(store.is_degraded());
        assert_eq!(store.load().await, LearnerClassificationRecord::default());

        store
            .save(LearnerClassificationRecord::new(
                StyleCategory::Visual,
                AgeBand::Adult,
                70,
            ))
            .await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }
}
