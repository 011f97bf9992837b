pub mod error;
pub mod persistence;
pub mod questionnaire;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;

pub use error::{ClassificationError, EngineResult};
pub use persistence::{open_sqlite_pool, PersistenceBackend, PersistenceError};
pub use questionnaire::{
    AnswerOption, ItemBank, ItemBankLoadError, Questionnaire, QuestionnaireItem,
    QuestionnaireResponseSet,
};
pub use resolver::{confidence_percent, resolve, resolve_with_tally, tally};
pub use session::{SessionController, SessionState, SessionStateMachine, StateTransition, TransitionError};
pub use store::{ClassificationStore, StoreHealth};
pub use types::{
    AgeBand, ClassificationResult, LearnerClassificationRecord, QuestionnaireProgress,
    StyleCategory, StyleTally,
};
